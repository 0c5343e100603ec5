//! Error types for voicekit.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceKitError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio capture errors
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    // Engine errors
    #[error("Engine not loaded: {engine}")]
    EngineNotLoaded { engine: String },

    #[error("Engine construction failed: {message}")]
    EngineBuild { message: String },

    #[error("Recognition failed: {message}")]
    Recognition { message: String },

    #[error("Synthesis failed: {message}")]
    Synthesis { message: String },

    // Operation cancelled by the caller. Normal termination, not a fault.
    #[error("Operation cancelled")]
    Cancelled,

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, VoiceKitError>;
