// Budkeys Pressed Key Tracking
// Keys the virtual device has pressed and not yet released

use crate::Key;
use std::collections::HashSet;

/// Tracks keys emitted as DOWN so they can be released on shutdown.
///
/// Press order is kept so `drain` releases in reverse (LIFO), which lets
/// chords unwind with the modifier last.
#[derive(Debug, Clone, Default)]
pub struct PressedKeys {
    order: Vec<Key>,
    pressed: HashSet<Key>,
}

impl PressedKeys {
    /// Create a new empty pressed key state
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key as pressed
    pub fn add(&mut self, key: Key) {
        if self.pressed.insert(key) {
            self.order.push(key);
        }
    }

    /// Record a key as released
    pub fn remove(&mut self, key: Key) {
        if self.pressed.remove(&key) {
            self.order.retain(|k| *k != key);
        }
    }

    /// Check if a key is currently pressed
    pub fn is_pressed(&self, key: Key) -> bool {
        self.pressed.contains(&key)
    }

    /// Take every pressed key, most recent first
    pub fn drain(&mut self) -> Vec<Key> {
        self.pressed.clear();
        let mut keys = std::mem::take(&mut self.order);
        keys.reverse();
        keys
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_remove() {
        let mut state = PressedKeys::new();
        assert!(!state.is_pressed(Key::LEFT_ALT));
        state.add(Key::LEFT_ALT);
        assert!(state.is_pressed(Key::LEFT_ALT));
        state.remove(Key::LEFT_ALT);
        assert!(!state.is_pressed(Key::LEFT_ALT));
        assert!(state.is_empty());
    }

    #[test]
    fn test_duplicate_add_counts_once() {
        let mut state = PressedKeys::new();
        state.add(Key::TAB);
        state.add(Key::TAB);
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_drain_is_lifo() {
        let mut state = PressedKeys::new();
        state.add(Key::LEFT_CTRL);
        state.add(Key::LEFT_META);
        state.add(Key::RIGHT);

        let drained = state.drain();
        assert_eq!(drained, vec![Key::RIGHT, Key::LEFT_META, Key::LEFT_CTRL]);
        assert!(state.is_empty());
    }
}
