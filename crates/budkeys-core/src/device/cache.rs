// Budkeys Oracle Cache
// Short-lived memo of connectivity answers

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::ConnectivityOracle;

/// Default time an answer stays valid
const DEFAULT_TTL: Duration = Duration::from_secs(2);

/// Wraps an oracle and reuses its answers for a short time.
///
/// The engine asks on every key event; a human double tap would otherwise
/// pay for two identical device queries.
pub struct CachedOracle<O> {
    inner: O,
    ttl: Duration,
    answers: Mutex<HashMap<String, (bool, Instant)>>,
}

impl<O: ConnectivityOracle> CachedOracle<O> {
    pub fn new(inner: O) -> Self {
        Self::with_ttl(inner, DEFAULT_TTL)
    }

    pub fn with_ttl(inner: O, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            answers: Mutex::new(HashMap::new()),
        }
    }

    /// Forget every cached answer
    pub fn invalidate(&self) {
        self.answers.lock().clear();
    }
}

impl<O: ConnectivityOracle> ConnectivityOracle for CachedOracle<O> {
    fn is_active(&self, device: &str) -> bool {
        if let Some((active, at)) = self.answers.lock().get(device) {
            if at.elapsed() < self.ttl {
                return *active;
            }
        }

        // Query without holding the lock; the inner oracle may be slow
        let active = self.inner.is_active(device);
        self.answers
            .lock()
            .insert(device.to_string(), (active, Instant::now()));
        active
    }
}
