// Budkeys Gesture Vocabulary
// Classified outcomes of press/release timing on the monitored key

use std::time::Duration;

use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Presses held strictly longer than this resolve as a long press.
pub const LONG_PRESS_THRESHOLD: Duration = Duration::from_millis(500);

/// Gap after a tap during which the next tap joins the same sequence.
pub const MULTI_TAP_WINDOW: Duration = Duration::from_millis(400);

/// Action name that does nothing. Unmapped gestures resolve to it.
pub const NO_ACTION: &str = "none";

/// A gesture performed on the monitored key.
///
/// The string form is the key used in the `[gestures]` table of the
/// settings file (`single_tap`, `double_tap`, ...).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Gesture {
    SingleTap,
    DoubleTap,
    TripleTap,
    LongPress,
}

/// Whether a press held for `held` resolves as a long press.
///
/// Strictly longer than the threshold; a press of exactly the threshold is a tap.
pub fn is_long_press(held: Duration, threshold: Duration) -> bool {
    held > threshold
}

impl Gesture {
    /// Map an accumulated tap count to its gesture tier.
    ///
    /// Four or more taps still resolve as a triple tap. Zero taps is no gesture.
    pub fn from_tap_count(count: u32) -> Option<Self> {
        match count {
            0 => None,
            1 => Some(Gesture::SingleTap),
            2 => Some(Gesture::DoubleTap),
            _ => Some(Gesture::TripleTap),
        }
    }

    /// Human readable label for logs
    pub fn label(self) -> &'static str {
        match self {
            Gesture::SingleTap => "Single Tap",
            Gesture::DoubleTap => "Double Tap",
            Gesture::TripleTap => "Triple Tap",
            Gesture::LongPress => "Long Press",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_from_tap_count() {
        assert_eq!(Gesture::from_tap_count(0), None);
        assert_eq!(Gesture::from_tap_count(1), Some(Gesture::SingleTap));
        assert_eq!(Gesture::from_tap_count(2), Some(Gesture::DoubleTap));
        assert_eq!(Gesture::from_tap_count(3), Some(Gesture::TripleTap));
        assert_eq!(Gesture::from_tap_count(7), Some(Gesture::TripleTap));
    }

    #[test]
    fn test_config_names() {
        assert_eq!(Gesture::SingleTap.to_string(), "single_tap");
        assert_eq!(Gesture::LongPress.as_ref(), "long_press");
        assert_eq!("triple_tap".parse::<Gesture>(), Ok(Gesture::TripleTap));
        assert!("quadruple_tap".parse::<Gesture>().is_err());
    }

    #[test]
    fn test_all_gestures_listed() {
        let all: Vec<Gesture> = Gesture::iter().collect();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0], Gesture::SingleTap);
        assert_eq!(all[3], Gesture::LongPress);
    }

    #[test]
    fn test_labels() {
        assert_eq!(Gesture::DoubleTap.label(), "Double Tap");
        assert_eq!(Gesture::LongPress.label(), "Long Press");
    }

    #[test]
    fn test_long_press_boundary() {
        let threshold = LONG_PRESS_THRESHOLD;
        assert!(!is_long_press(threshold, threshold));
        assert!(is_long_press(threshold + Duration::from_nanos(1), threshold));
        assert!(!is_long_press(threshold - Duration::from_nanos(1), threshold));
        assert!(!is_long_press(Duration::ZERO, threshold));
    }

    #[test]
    fn test_threshold_defaults() {
        assert_eq!(LONG_PRESS_THRESHOLD, Duration::from_millis(500));
        assert_eq!(MULTI_TAP_WINDOW, Duration::from_millis(400));
    }
}
