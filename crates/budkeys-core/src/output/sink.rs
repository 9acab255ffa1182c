// Budkeys Key Sink
// Destination for synthetic key events

use std::sync::Arc;

use crate::{Key, KeyDirection};

/// Error types for synthetic output
#[derive(Debug, thiserror::Error)]
pub enum UInputError {
    #[error("Failed to create virtual device: {0}")]
    DeviceCreation(String),

    #[error("Failed to write event: {0}")]
    WriteError(String),
}

/// Something that can inject key and wheel events into the system input stream.
pub trait KeySink: Send + Sync {
    /// Emit a single key event
    fn send_key(&self, key: Key, direction: KeyDirection) -> Result<(), UInputError>;

    /// Emit vertical wheel steps (positive scrolls up)
    fn scroll(&self, steps: i32) -> Result<(), UInputError>;

    /// Press and release a key
    fn tap(&self, key: Key) -> Result<(), UInputError> {
        self.send_key(key, KeyDirection::Down)?;
        self.send_key(key, KeyDirection::Up)
    }

    /// Press keys in order, then release them in reverse
    fn chord(&self, keys: &[Key]) -> Result<(), UInputError> {
        for key in keys {
            self.send_key(*key, KeyDirection::Down)?;
        }
        for key in keys.iter().rev() {
            self.send_key(*key, KeyDirection::Up)?;
        }
        Ok(())
    }
}

impl<T: KeySink + ?Sized> KeySink for Arc<T> {
    fn send_key(&self, key: Key, direction: KeyDirection) -> Result<(), UInputError> {
        (**self).send_key(key, direction)
    }

    fn scroll(&self, steps: i32) -> Result<(), UInputError> {
        (**self).scroll(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(Key, KeyDirection)>>,
    }

    impl KeySink for Recorder {
        fn send_key(&self, key: Key, direction: KeyDirection) -> Result<(), UInputError> {
            self.events.lock().push((key, direction));
            Ok(())
        }

        fn scroll(&self, _steps: i32) -> Result<(), UInputError> {
            Ok(())
        }
    }

    #[test]
    fn test_tap_presses_then_releases() {
        let sink = Recorder::default();
        sink.tap(Key::PLAYPAUSE).unwrap();
        assert_eq!(
            *sink.events.lock(),
            vec![
                (Key::PLAYPAUSE, KeyDirection::Down),
                (Key::PLAYPAUSE, KeyDirection::Up)
            ]
        );
    }

    #[test]
    fn test_chord_releases_in_reverse() {
        let sink = Arc::new(Recorder::default());
        sink.chord(&[Key::LEFT_ALT, Key::TAB]).unwrap();
        assert_eq!(
            *sink.events.lock(),
            vec![
                (Key::LEFT_ALT, KeyDirection::Down),
                (Key::TAB, KeyDirection::Down),
                (Key::TAB, KeyDirection::Up),
                (Key::LEFT_ALT, KeyDirection::Up),
            ]
        );
    }
}
