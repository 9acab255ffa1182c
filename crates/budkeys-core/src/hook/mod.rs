// Budkeys Input Hook
// Capability to intercept the monitored key and re-inject events

mod filter;

#[cfg(feature = "evdev-backend")]
mod evdev_backend;
#[cfg(feature = "evdev-backend")]
mod watch;

pub use filter::{is_new_hook_device, is_virtual_device, matches_device_filter};

#[cfg(feature = "evdev-backend")]
pub use evdev_backend::EvdevHook;

use std::fmt;
use std::sync::Arc;

use crate::{Key, KeyDirection};

/// Result type for hook operations
pub type HookResult<T> = Result<T, HookError>;

/// Errors raised by an input hook backend
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("Failed to install hook: {0}")]
    Install(String),

    #[error("No input device reports key {0}")]
    KeyNotSupported(Key),

    #[error("Failed to uninstall hook: {0}")]
    Uninstall(String),

    #[error("Failed to re-emit event: {0}")]
    Reemit(String),
}

/// A key event delivered by a hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub direction: KeyDirection,
}

impl KeyEvent {
    pub fn new(key: Key, direction: KeyDirection) -> Self {
        Self { key, direction }
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.key, self.direction)
    }
}

/// Callback invoked on the hook's delivery thread
pub type KeyCallback = Arc<dyn Fn(KeyEvent) + Send + Sync>;

/// Down/up callbacks registered with a hook.
///
/// Repeat events are delivered to `on_down`.
#[derive(Clone)]
pub struct HookCallbacks {
    pub on_down: KeyCallback,
    pub on_up: KeyCallback,
}

impl HookCallbacks {
    /// Route an event to the matching callback
    pub fn deliver(&self, event: KeyEvent) {
        if event.direction.is_down() {
            (self.on_down)(event)
        } else {
            (self.on_up)(event)
        }
    }
}

impl fmt::Debug for HookCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HookCallbacks { .. }")
    }
}

/// Opaque handle for an installed hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookHandle(u64);

impl HookHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// OS-specific listener on a single key.
///
/// A suppressing hook consumes the key before anything else sees it, so
/// callers that decide not to act on an event must put it back with
/// [`InputHook::reemit`]. Re-emitted events must not be captured by the
/// caller's own hooks; the engine uninstalls them around every re-emit.
pub trait InputHook: Send {
    /// Start listening for `key`, delivering events to `callbacks`
    fn install(
        &mut self,
        key: Key,
        callbacks: HookCallbacks,
        suppress: bool,
    ) -> HookResult<HookHandle>;

    /// Stop a previously installed hook
    fn uninstall(&mut self, handle: HookHandle) -> HookResult<()>;

    /// Inject a synthetic event for `key` into the system input stream
    fn reemit(&mut self, key: Key, direction: KeyDirection) -> HookResult<()>;
}
