// Budkeys Device Connectivity
// Whether the target device is currently active

mod bluetooth;
mod cache;

#[cfg(feature = "evdev-backend")]
mod input;

pub use bluetooth::{BluetoothDevice, BluetoothctlOracle};
pub use cache::CachedOracle;

#[cfg(feature = "evdev-backend")]
pub use input::InputDeviceOracle;

use std::time::Duration;

/// Errors raised while querying device state
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Device query timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Device query failed: {0}")]
    Failed(String),
}

/// Answers whether a named device is currently active.
///
/// Implementations must return within a short bounded time and report
/// `false` when the answer cannot be determined.
pub trait ConnectivityOracle: Send + Sync {
    fn is_active(&self, device: &str) -> bool;
}
