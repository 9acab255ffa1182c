// Budkeys Key Direction
// Press, release and auto-repeat values of a key event

use std::fmt;

/// Direction of a key event, with the values the kernel puts in
/// `input_event.value` for `EV_KEY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum KeyDirection {
    Up = 0,
    Down = 1,
    Repeat = 2,
}

impl KeyDirection {
    /// Down and auto-repeat both mean the key is held
    pub fn is_down(self) -> bool {
        matches!(self, KeyDirection::Down | KeyDirection::Repeat)
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(KeyDirection::Up),
            1 => Some(KeyDirection::Down),
            2 => Some(KeyDirection::Repeat),
            _ => None,
        }
    }

    pub fn to_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for KeyDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyDirection::Up => "up",
            KeyDirection::Down => "down",
            KeyDirection::Repeat => "repeat",
        })
    }
}
