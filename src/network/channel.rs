//! Blocking FIFO queue connecting two VMs.
//!
//! A [`Channel`] is unbounded: [`Channel::put`] never waits and never
//! rejects a value. [`Channel::get`] suspends the calling task while the
//! queue is empty and resumes with the oldest value once one is put.

use crate::virtual_machine::program::Word;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Unbounded single-reader, single-writer queue of words.
///
/// Shared between its producer and consumer behind an [`Arc`]. In a
/// one-amplifier ring the same VM is both.
#[derive(Default)]
pub struct Channel {
    queue: Mutex<VecDeque<Word>>,
    ready: Notify,
}

impl Channel {
    /// Creates an empty channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty channel wrapped in an [`Arc`] for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Locks the queue. The queue holds plain words, so a poisoned lock is
    /// still consistent.
    fn queue(&self) -> MutexGuard<'_, VecDeque<Word>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `value`.
    pub fn put(&self, value: Word) {
        self.queue().push_back(value);
        self.ready.notify_one();
    }

    /// Removes and returns the oldest value, waiting while the channel is
    /// empty.
    ///
    /// Waits forever if nothing is ever put.
    pub async fn get(&self) -> Word {
        loop {
            let next = self.queue().pop_front();
            if let Some(value) = next {
                return value;
            }
            // A put between the check above and this await leaves a permit,
            // so the wakeup is not lost.
            self.ready.notified().await;
        }
    }

    /// Removes and returns the oldest value without waiting.
    pub fn try_get(&self) -> Option<Word> {
        self.queue().pop_front()
    }

    /// Number of values waiting to be read.
    pub fn len(&self) -> usize {
        self.queue().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue().is_empty()
    }

    /// Removes and returns every queued value, oldest first.
    pub fn drain(&self) -> Vec<Word> {
        self.queue().drain(..).collect()
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("queued", &*self.queue())
            .finish()
    }
}
