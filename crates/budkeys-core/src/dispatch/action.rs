// Budkeys Action Names
// Vocabulary of actions a gesture can be mapped to

use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// An action a gesture can trigger.
///
/// The canonical names are snake_case (`next_track`). The display names of
/// older settings files ("Play / Pause", "Alt + Tab") parse to the same
/// actions, case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr)]
#[strum(ascii_case_insensitive)]
pub enum ActionName {
    #[strum(to_string = "none", serialize = "None")]
    None,
    #[strum(to_string = "play_pause", serialize = "Play / Pause")]
    PlayPause,
    #[strum(to_string = "next_track", serialize = "Next Track")]
    NextTrack,
    #[strum(to_string = "previous_track", serialize = "Previous Track")]
    PreviousTrack,
    #[strum(to_string = "volume_up", serialize = "Volume Up")]
    VolumeUp,
    #[strum(to_string = "volume_down", serialize = "Volume Down")]
    VolumeDown,
    #[strum(to_string = "volume_mute", serialize = "Volume Mute")]
    VolumeMute,
    #[strum(to_string = "scroll_up", serialize = "Scroll Up")]
    ScrollUp,
    #[strum(to_string = "scroll_down", serialize = "Scroll Down")]
    ScrollDown,
    #[strum(to_string = "alt_tab", serialize = "Alt + Tab")]
    AltTab,
    #[strum(
        to_string = "switch_desktop_next",
        serialize = "Switch Desktop",
        serialize = "Switch Desktop Next"
    )]
    SwitchDesktopNext,
    #[strum(to_string = "switch_desktop_prev", serialize = "Switch Desktop Prev")]
    SwitchDesktopPrev,
    #[strum(to_string = "lock_screen", serialize = "Lock Screen")]
    LockScreen,
}

impl ActionName {
    /// Every available action, in menu order
    pub fn all() -> Vec<ActionName> {
        ActionName::iter().collect()
    }
}
