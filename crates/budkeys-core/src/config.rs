// Budkeys Configuration Store
// Read-only view of gesture mappings and the target device

use std::time::Duration;

use crate::gesture::{LONG_PRESS_THRESHOLD, MULTI_TAP_WINDOW};
use crate::{Gesture, Key};

/// Keys tried in order when installing the hook
pub const DEFAULT_MONITORED_KEYS: &[Key] = &[Key::PLAYPAUSE, Key::PLAYCD];

/// Configuration consumed by the gesture engine.
///
/// The engine only reads through this trait, and reads on every event, so
/// implementations may change their answers at runtime (e.g. after a reload).
pub trait ConfigStore: Send + Sync {
    /// Action name mapped to `gesture`; the no-op action when unmapped
    fn mapped_action(&self, gesture: Gesture) -> String;

    /// Device whose activity gates interception; `None` disables interception
    fn target_device(&self) -> Option<String>;

    /// Debounce window between taps of one sequence
    fn multi_tap_window(&self) -> Duration {
        MULTI_TAP_WINDOW
    }

    /// Presses held strictly longer than this are long presses
    fn long_press_threshold(&self) -> Duration {
        LONG_PRESS_THRESHOLD
    }

    /// Monitored key followed by fallbacks
    fn monitored_keys(&self) -> Vec<Key> {
        DEFAULT_MONITORED_KEYS.to_vec()
    }
}
