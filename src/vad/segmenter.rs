//! Speech segmentation state machine.
//!
//! Consumes fixed-size audio windows, classifies each through a
//! [`SpeechScorer`], and tracks speech/silence state. Completed utterances
//! are queued as [`SpeechSegment`]s and drained in FIFO order.
//!
//! All threshold comparisons are inclusive (`>=`): a window scoring exactly
//! at the threshold counts as speech, and a duration reaching exactly its
//! bound triggers the transition.

use crate::config::VadConfig;
use crate::logging::{Logger, Severity, stderr_logger};
use crate::vad::scorer::SpeechScorer;
use crate::vad::segment::SpeechSegment;
use std::collections::VecDeque;

/// Current segmentation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadState {
    /// No utterance in progress.
    Silence,
    /// An utterance is being accumulated.
    Speech,
}

/// State transition produced by a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadTransition {
    /// An utterance opened.
    SpeechStart,
    /// An utterance closed; exactly one segment was queued.
    SpeechEnd,
}

/// Voice activity segmenter over fixed-size windows.
pub struct Segmenter<S: SpeechScorer> {
    config: VadConfig,
    scorer: S,
    state: VadState,
    /// Absolute sample position of the next window.
    position: u64,
    /// Buffered sub-minimum speech while still in Silence.
    candidate: Vec<f32>,
    candidate_start: u64,
    /// Samples of the utterance currently being accumulated.
    segment_buf: Vec<f32>,
    segment_start: u64,
    /// Trailing sub-threshold samples inside the current utterance.
    trailing_silence: usize,
    completed: VecDeque<SpeechSegment>,
    min_speech_samples: usize,
    min_silence_samples: usize,
    max_speech_samples: usize,
    logger: Logger,
}

impl<S: SpeechScorer> Segmenter<S> {
    pub fn new(config: VadConfig, scorer: S) -> Self {
        Self::with_logger(config, scorer, stderr_logger())
    }

    pub fn with_logger(config: VadConfig, scorer: S, logger: Logger) -> Self {
        let rate = config.sample_rate as f32;
        let min_speech_samples = (config.min_speech_secs * rate) as usize;
        let min_silence_samples = (config.min_silence_secs * rate) as usize;
        let max_speech_samples = (config.max_speech_secs * rate) as usize;

        Self {
            config,
            scorer,
            state: VadState::Silence,
            position: 0,
            candidate: Vec::new(),
            candidate_start: 0,
            segment_buf: Vec::new(),
            segment_start: 0,
            trailing_silence: 0,
            completed: VecDeque::new(),
            min_speech_samples,
            min_silence_samples,
            max_speech_samples,
            logger,
        }
    }

    /// Window size this segmenter accepts, in samples.
    pub fn window_size(&self) -> usize {
        self.config.window_size
    }

    pub fn state(&self) -> VadState {
        self.state
    }

    /// True while an utterance is being accumulated.
    pub fn is_speech_active(&self) -> bool {
        self.state == VadState::Speech
    }

    /// True when the scorer can classify windows.
    pub fn is_ready(&self) -> bool {
        self.scorer.is_ready()
    }

    /// Feeds one window of exactly [`window_size`](Self::window_size) samples.
    ///
    /// Wrong-sized windows are logged and ignored; the caller is responsible
    /// for pre-buffering to the exact size. Returns the state transition the
    /// window caused, if any.
    pub fn accept_window(&mut self, window: &[f32]) -> Option<VadTransition> {
        if window.len() != self.config.window_size {
            self.logger.emit(
                Severity::Error,
                &format!(
                    "segmenter expects windows of {} samples, got {}",
                    self.config.window_size,
                    window.len()
                ),
            );
            return None;
        }

        let score = self.scorer.score(window);
        let is_speech = score >= self.config.threshold;
        let window_start = self.position;
        self.position += window.len() as u64;

        match self.state {
            VadState::Silence => {
                if is_speech {
                    if self.candidate.is_empty() {
                        self.candidate_start = window_start;
                    }
                    self.candidate.extend_from_slice(window);

                    if self.candidate.len() >= self.min_speech_samples {
                        self.state = VadState::Speech;
                        self.segment_buf = std::mem::take(&mut self.candidate);
                        self.segment_start = self.candidate_start;
                        self.trailing_silence = 0;
                        return Some(VadTransition::SpeechStart);
                    }
                } else {
                    // Burst too short to qualify as speech.
                    self.candidate.clear();
                }
                None
            }
            VadState::Speech => {
                self.segment_buf.extend_from_slice(window);

                if is_speech {
                    self.trailing_silence = 0;
                } else {
                    self.trailing_silence += window.len();
                }

                let silence_closed = self.trailing_silence >= self.min_silence_samples;
                let forced_cut = self.segment_buf.len() >= self.max_speech_samples;

                if silence_closed || forced_cut {
                    self.close_segment();
                    return Some(VadTransition::SpeechEnd);
                }
                None
            }
        }
    }

    /// Forces closure of any in-progress utterance regardless of trailing
    /// silence. Used at end of recording. Never duplicates a segment already
    /// closed by a normal transition.
    pub fn flush(&mut self) -> Option<VadTransition> {
        self.candidate.clear();

        if self.state == VadState::Speech {
            self.close_segment();
            return Some(VadTransition::SpeechEnd);
        }
        None
    }

    /// Discards in-progress state without emitting a segment and rewinds the
    /// stream position. Used on stream reconfiguration.
    pub fn reset(&mut self) {
        self.state = VadState::Silence;
        self.position = 0;
        self.candidate.clear();
        self.candidate_start = 0;
        self.segment_buf.clear();
        self.segment_start = 0;
        self.trailing_silence = 0;
        self.completed.clear();
        self.scorer.reset();
    }

    /// Returns completed segments in FIFO order, removing them from the
    /// internal queue (at-most-once delivery).
    pub fn drain_segments(&mut self) -> Vec<SpeechSegment> {
        self.completed.drain(..).collect()
    }

    fn close_segment(&mut self) {
        let samples = std::mem::take(&mut self.segment_buf);
        self.completed.push_back(SpeechSegment::new(
            self.segment_start,
            samples,
            self.config.sample_rate,
        ));
        self.state = VadState::Silence;
        self.trailing_silence = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vad::scorer::EnergyScorer;

    const WINDOW: usize = 512;

    /// Scorer that replays a scripted score per window.
    struct ScriptedScorer {
        scores: Vec<f32>,
        index: usize,
    }

    impl ScriptedScorer {
        fn new(scores: Vec<f32>) -> Self {
            Self { scores, index: 0 }
        }
    }

    impl SpeechScorer for ScriptedScorer {
        fn score(&mut self, _window: &[f32]) -> f32 {
            let score = self.scores.get(self.index).copied().unwrap_or(0.0);
            self.index += 1;
            score
        }

        fn reset(&mut self) {
            self.index = 0;
        }
    }

    /// Config with thresholds expressed in whole windows for readability:
    /// one window of speech opens, two windows of silence close,
    /// eight windows force a cut.
    fn window_config() -> VadConfig {
        let rate = 16000;
        let window_secs = WINDOW as f32 / rate as f32;
        VadConfig {
            window_size: WINDOW,
            threshold: 0.5,
            min_speech_secs: window_secs,
            min_silence_secs: 2.0 * window_secs,
            max_speech_secs: 8.0 * window_secs,
            sample_rate: rate,
        }
    }

    fn feed(segmenter: &mut Segmenter<ScriptedScorer>, count: usize) -> Vec<VadTransition> {
        let window = vec![0.0f32; WINDOW];
        (0..count)
            .filter_map(|_| segmenter.accept_window(&window))
            .collect()
    }

    #[test]
    fn test_all_silence_produces_nothing() {
        let scorer = ScriptedScorer::new(vec![0.0; 20]);
        let mut segmenter = Segmenter::new(window_config(), scorer);

        let transitions = feed(&mut segmenter, 20);

        assert!(transitions.is_empty());
        assert!(segmenter.drain_segments().is_empty());
        assert_eq!(segmenter.state(), VadState::Silence);
    }

    #[test]
    fn test_canonical_utterance_closes_once() {
        // silence, 4 speech windows, then silence to close.
        let mut scores = vec![0.0, 0.0];
        scores.extend(vec![0.9; 4]);
        scores.extend(vec![0.0; 4]);
        let scorer = ScriptedScorer::new(scores);
        let mut segmenter = Segmenter::new(window_config(), scorer);

        let transitions = feed(&mut segmenter, 10);

        assert_eq!(
            transitions,
            vec![VadTransition::SpeechStart, VadTransition::SpeechEnd]
        );

        let segments = segmenter.drain_segments();
        assert_eq!(segments.len(), 1);
        // 4 speech windows plus the 2 boundary silence windows.
        assert_eq!(segments[0].len(), 6 * WINDOW);
        assert_eq!(segments[0].start_sample, 2 * WINDOW as u64);
        // Drained once; queue is now empty.
        assert!(segmenter.drain_segments().is_empty());
    }

    #[test]
    fn test_threshold_tie_counts_as_speech() {
        let scorer = ScriptedScorer::new(vec![0.5, 0.5, 0.0, 0.0]);
        let mut segmenter = Segmenter::new(window_config(), scorer);

        let transitions = feed(&mut segmenter, 4);

        assert_eq!(transitions[0], VadTransition::SpeechStart);
        assert_eq!(transitions[1], VadTransition::SpeechEnd);
    }

    #[test]
    fn test_short_burst_never_opens() {
        // min_speech is one window here, so shrink the burst below it by
        // raising the minimum to two windows.
        let mut config = window_config();
        config.min_speech_secs = 2.0 * WINDOW as f32 / 16000.0;

        let scorer = ScriptedScorer::new(vec![0.9, 0.0, 0.9, 0.0, 0.0]);
        let mut segmenter = Segmenter::new(config, scorer);

        let transitions = feed(&mut segmenter, 5);

        assert!(transitions.is_empty());
        assert!(segmenter.drain_segments().is_empty());
    }

    #[test]
    fn test_forced_cut_without_silence() {
        // Continuous speech: the 8-window cap forces a close.
        let scorer = ScriptedScorer::new(vec![0.9; 12]);
        let mut segmenter = Segmenter::new(window_config(), scorer);

        let transitions = feed(&mut segmenter, 12);

        assert!(transitions.contains(&VadTransition::SpeechEnd));
        let segments = segmenter.drain_segments();
        assert!(!segments.is_empty());
        assert_eq!(segments[0].len(), 8 * WINDOW);
    }

    #[test]
    fn test_brief_pause_does_not_close() {
        // One silent window inside speech is under the 2-window close bound.
        let scores = vec![0.9, 0.9, 0.0, 0.9, 0.9, 0.0, 0.0];
        let scorer = ScriptedScorer::new(scores);
        let mut segmenter = Segmenter::new(window_config(), scorer);

        let transitions = feed(&mut segmenter, 7);

        assert_eq!(
            transitions,
            vec![VadTransition::SpeechStart, VadTransition::SpeechEnd]
        );
        assert_eq!(segmenter.drain_segments().len(), 1);
    }

    #[test]
    fn test_flush_closes_in_progress_segment() {
        let scorer = ScriptedScorer::new(vec![0.9; 3]);
        let mut segmenter = Segmenter::new(window_config(), scorer);

        feed(&mut segmenter, 3);
        assert!(segmenter.is_speech_active());

        assert_eq!(segmenter.flush(), Some(VadTransition::SpeechEnd));
        assert_eq!(segmenter.drain_segments().len(), 1);

        // A second flush has nothing to close.
        assert_eq!(segmenter.flush(), None);
        assert!(segmenter.drain_segments().is_empty());
    }

    #[test]
    fn test_flush_after_normal_close_does_not_duplicate() {
        let mut scores = vec![0.9; 3];
        scores.extend(vec![0.0; 3]);
        let scorer = ScriptedScorer::new(scores);
        let mut segmenter = Segmenter::new(window_config(), scorer);

        feed(&mut segmenter, 6);
        assert_eq!(segmenter.flush(), None);
        assert_eq!(segmenter.drain_segments().len(), 1);
    }

    #[test]
    fn test_reset_discards_without_emitting() {
        let scorer = ScriptedScorer::new(vec![0.9; 4]);
        let mut segmenter = Segmenter::new(window_config(), scorer);

        feed(&mut segmenter, 4);
        assert!(segmenter.is_speech_active());

        segmenter.reset();

        assert_eq!(segmenter.state(), VadState::Silence);
        assert!(segmenter.drain_segments().is_empty());
    }

    #[test]
    fn test_wrong_window_size_is_ignored() {
        let scorer = ScriptedScorer::new(vec![0.9; 4]);
        let mut segmenter = Segmenter::new(window_config(), scorer);

        let undersized = vec![0.0f32; WINDOW / 2];
        assert_eq!(segmenter.accept_window(&undersized), None);
        assert_eq!(segmenter.state(), VadState::Silence);
    }

    #[test]
    fn test_segments_drain_in_fifo_order() {
        let mut scores = Vec::new();
        for _ in 0..3 {
            scores.extend(vec![0.9; 2]);
            scores.extend(vec![0.0; 2]);
        }
        let scorer = ScriptedScorer::new(scores);
        let mut segmenter = Segmenter::new(window_config(), scorer);

        feed(&mut segmenter, 12);

        let segments = segmenter.drain_segments();
        assert_eq!(segments.len(), 3);
        for pair in segments.windows(2) {
            assert!(pair[0].start_sample < pair[1].start_sample);
        }
    }

    #[test]
    fn test_energy_scorer_end_to_end() {
        let mut segmenter = Segmenter::new(
            VadConfig {
                threshold: 0.02,
                ..window_config()
            },
            EnergyScorer,
        );

        let silence = vec![0.0f32; WINDOW];
        let speech = vec![0.3f32; WINDOW];

        assert_eq!(segmenter.accept_window(&silence), None);
        assert_eq!(
            segmenter.accept_window(&speech),
            Some(VadTransition::SpeechStart)
        );
        assert_eq!(segmenter.accept_window(&silence), None);
        assert_eq!(
            segmenter.accept_window(&silence),
            Some(VadTransition::SpeechEnd)
        );
        assert_eq!(segmenter.drain_segments().len(), 1);
    }
}
