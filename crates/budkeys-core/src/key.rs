// Budkeys Key Codes
// Linux input-event key codes for the monitored media key and action output

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Represents a single key code.
///
/// This is a newtype wrapper around u16 for type safety.
/// The numeric values match Linux input-event-codes.h definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Key(pub u16);

impl Key {
    pub const TAB: Key = Key(15);
    pub const LEFT_CTRL: Key = Key(29);
    pub const LEFT_ALT: Key = Key(56);
    pub const LEFT: Key = Key(105);
    pub const RIGHT: Key = Key(106);
    pub const MUTE: Key = Key(113);
    pub const VOLUMEDOWN: Key = Key(114);
    pub const VOLUMEUP: Key = Key(115);
    pub const LEFT_META: Key = Key(125);
    pub const NEXTSONG: Key = Key(163);
    pub const PLAYPAUSE: Key = Key(164);
    pub const PREVIOUSSONG: Key = Key(165);
    pub const PLAYCD: Key = Key(200);
    pub const PAUSECD: Key = Key(201);

    /// Get the raw numeric code value
    pub fn code(self) -> u16 {
        self.0
    }

    /// Get the name of this key, or "UNKNOWN" for codes outside the table
    pub fn name(self) -> &'static str {
        names()
            .iter()
            .find(|(_, code)| *code == self.0)
            .map(|(name, _)| *name)
            .unwrap_or("UNKNOWN")
    }
}

impl From<u16> for Key {
    fn from(code: u16) -> Self {
        Key(code)
    }
}

impl From<Key> for u16 {
    fn from(key: Key) -> Self {
        key.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Key {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        key_from_name(s).ok_or_else(|| format!("Unknown key: {}", s))
    }
}

// First entry for a code is its canonical name.
fn names() -> &'static [(&'static str, u16)] {
    static NAMES: OnceLock<Vec<(&'static str, u16)>> = OnceLock::new();
    NAMES.get_or_init(|| {
        vec![
            ("ESC", 1),
            ("TAB", 15),
            ("ENTER", 28),
            ("LEFT_CTRL", 29),
            ("LEFT_SHIFT", 42),
            ("LEFT_ALT", 56),
            ("SPACE", 57),
            ("RIGHT_CTRL", 97),
            ("RIGHT_ALT", 100),
            ("UP", 103),
            ("LEFT", 105),
            ("RIGHT", 106),
            ("DOWN", 108),
            ("MUTE", 113),
            ("VOLUMEDOWN", 114),
            ("VOLUMEUP", 115),
            ("LEFT_META", 125),
            ("RIGHT_META", 126),
            ("STOPCD", 166),
            ("NEXTSONG", 163),
            ("PLAYPAUSE", 164),
            ("PREVIOUSSONG", 165),
            ("PLAYCD", 200),
            ("PAUSECD", 201),
            ("MEDIA", 226),
        ]
    })
}

/// Look up a key by name.
///
/// Accepts canonical names ("PLAYPAUSE"), the `KEY_` prefix used by
/// input-event-codes.h ("KEY_PLAYPAUSE"), any letter case, and the
/// descriptive names media keys are commonly listed under
/// ("play/pause media", "next track").
pub fn key_from_name(name: &str) -> Option<Key> {
    let trimmed = name.trim();
    let lowered = trimmed.to_lowercase();
    let alias = match lowered.as_str() {
        "play/pause media" | "play/pause" | "play_pause" => Some(Key::PLAYPAUSE),
        "next track" | "next_track" => Some(Key::NEXTSONG),
        "previous track" | "previous_track" => Some(Key::PREVIOUSSONG),
        "volume up" => Some(Key::VOLUMEUP),
        "volume down" => Some(Key::VOLUMEDOWN),
        "volume mute" => Some(Key::MUTE),
        _ => None,
    };
    if alias.is_some() {
        return alias;
    }

    let upper = trimmed.to_uppercase();
    let bare = upper.strip_prefix("KEY_").unwrap_or(&upper);
    names()
        .iter()
        .find(|(n, _)| *n == bare)
        .map(|(_, code)| Key(*code))
}
