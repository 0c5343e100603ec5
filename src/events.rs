//! Channel-based event delivery.
//!
//! Components publish notifications through an [`EventBus`]; subscribers hold
//! plain crossbeam receivers. A dropped receiver makes its subscription inert
//! and it is pruned on the next publish, so unsubscribing and disposing stay
//! independent operations.

use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::Mutex;

/// Multi-subscriber notification channel.
///
/// Publishing clones the event once per live subscriber. Order of delivery
/// per subscriber matches publish order.
pub struct EventBus<T> {
    subscribers: Mutex<Vec<Sender<T>>>,
}

impl<T: Clone> EventBus<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Registers a new subscriber and returns its receiving end.
    ///
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> Receiver<T> {
        let (tx, rx) = unbounded();
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }
        rx
    }

    /// Delivers `event` to every live subscriber, pruning dropped ones.
    pub fn publish(&self, event: T) {
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Drops every subscription. Outstanding receivers see a disconnect.
    pub fn clear(&self) {
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.clear();
        }
    }
}

impl<T: Clone> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}
