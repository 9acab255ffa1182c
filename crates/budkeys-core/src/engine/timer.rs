// Budkeys Debounce Timer
// Cancellable one-shot timer resolving a tap sequence

use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

/// One-shot timer on its own thread.
///
/// The callback receives the timer's generation id so the receiver can tell
/// a live firing from a superseded one. Dropping the timer cancels it.
pub(crate) struct DebounceTimer {
    id: u64,
    cancel: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl DebounceTimer {
    pub(crate) fn start<F>(id: u64, delay: Duration, on_fire: F) -> io::Result<Self>
    where
        F: FnOnce(u64) + Send + 'static,
    {
        let (cancel, cancelled) = crossbeam_channel::bounded(1);
        let thread = thread::Builder::new()
            .name(format!("budkeys-debounce-{}", id))
            .spawn(move || wait(id, delay, cancelled, on_fire))?;
        Ok(Self {
            id,
            cancel,
            thread: Some(thread),
        })
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Ask the timer not to fire. Does not wait for the thread.
    pub(crate) fn cancel(&self) {
        let _ = self.cancel.try_send(());
    }

    /// Cancel and wait for the thread, including a firing already under way.
    ///
    /// Must not be called while holding a lock the callback takes.
    pub(crate) fn cancel_and_join(mut self) {
        self.cancel();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Debounce timer {} panicked", self.id);
            }
        }
    }
}

fn wait<F: FnOnce(u64)>(id: u64, delay: Duration, cancelled: Receiver<()>, on_fire: F) {
    // A disconnected sender means the timer was dropped
    if let Err(RecvTimeoutError::Timeout) = cancelled.recv_timeout(delay) {
        on_fire(id);
    }
}
