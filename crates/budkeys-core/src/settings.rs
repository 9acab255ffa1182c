// Budkeys Settings Module
// TOML-backed gesture mappings, timing and target device

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use strum::IntoEnumIterator;

use crate::config::{ConfigStore, DEFAULT_MONITORED_KEYS};
use crate::dispatch::ActionName;
use crate::gesture::{LONG_PRESS_THRESHOLD, MULTI_TAP_WINDOW, NO_ACTION};
use crate::key::key_from_name;
use crate::{Gesture, Key};

/// Settings for budkeys
///
/// These settings are loaded from a TOML file
/// (default: ~/.config/budkeys/config.toml). Any section or key missing from
/// the file keeps its default, so files written by older versions load as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Device whose connection enables interception
    target_device: Option<String>,

    /// Gesture -> action name
    gestures: HashMap<Gesture, String>,

    /// Debounce window between taps (ms)
    multi_tap_window_ms: u64,

    /// Long press threshold (ms)
    long_press_threshold_ms: u64,

    /// Monitored key, then fallbacks
    hook_keys: Vec<String>,

    /// Optional evdev device filter (names or paths)
    hook_devices: Vec<String>,

    /// Toggles owned by the desktop integration (notifications,
    /// start_with_system). The daemon does not act on them; they are kept
    /// so saving the file never drops them.
    options: BTreeMap<String, bool>,

    /// Path to the settings file (for reload)
    source_path: Option<PathBuf>,
}

/// Errors that can occur when loading or saving settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(String),

    #[error("Invalid setting value: {0}")]
    InvalidValue(String),
}

/// TOML representation for (de)serializing settings
#[derive(Debug, Clone, Default, serde::Deserialize, serde::Serialize)]
struct SettingsToml {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target_device: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    gestures: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    timing: Option<TimingSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    hook: Option<HookSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<BTreeMap<String, toml::Value>>,
}

#[derive(Debug, Clone, Default, serde::Deserialize, serde::Serialize)]
struct TimingSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    multi_tap_window_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    long_press_threshold_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, serde::Deserialize, serde::Serialize)]
struct HookSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    keys: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    devices: Option<Vec<String>>,
}

/// Default action for each gesture
fn default_action(gesture: Gesture) -> ActionName {
    match gesture {
        Gesture::SingleTap => ActionName::PlayPause,
        Gesture::DoubleTap => ActionName::NextTrack,
        Gesture::TripleTap => ActionName::PreviousTrack,
        Gesture::LongPress => ActionName::None,
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    /// Create settings with every default
    pub fn new() -> Self {
        let gestures = Gesture::iter()
            .map(|g| (g, default_action(g).to_string()))
            .collect();
        let options = [("notifications", true), ("start_with_system", false)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        Self {
            target_device: None,
            gestures,
            multi_tap_window_ms: MULTI_TAP_WINDOW.as_millis() as u64,
            long_press_threshold_ms: LONG_PRESS_THRESHOLD.as_millis() as u64,
            hook_keys: DEFAULT_MONITORED_KEYS
                .iter()
                .map(|k| k.name().to_string())
                .collect(),
            hook_devices: Vec::new(),
            options,
            source_path: None,
        }
    }

    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(&path)?;
        let mut settings = Self::from_toml(&content)?;
        settings.source_path = Some(path.as_ref().to_path_buf());
        Ok(settings)
    }

    /// Load settings from TOML string
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let parsed: SettingsToml =
            toml::from_str(content).map_err(|e| SettingsError::TomlParse(e.to_string()))?;

        let mut settings = Self::new();
        settings.target_device = parsed.target_device.filter(|d| !d.trim().is_empty());

        if let Some(gestures) = parsed.gestures {
            for (name, action) in gestures {
                match name.parse::<Gesture>() {
                    Ok(gesture) => {
                        settings.gestures.insert(gesture, action);
                    }
                    Err(_) => log::warn!("Ignoring mapping for unknown gesture '{}'", name),
                }
            }
        }

        if let Some(timing) = parsed.timing {
            if let Some(ms) = timing.multi_tap_window_ms {
                settings.multi_tap_window_ms = ms;
            }
            if let Some(ms) = timing.long_press_threshold_ms {
                settings.long_press_threshold_ms = ms;
            }
        }

        if let Some(hook) = parsed.hook {
            if let Some(keys) = hook.keys {
                settings.hook_keys = keys;
            }
            if let Some(devices) = hook.devices {
                settings.hook_devices = devices;
            }
        }

        if let Some(options) = parsed.options {
            for (key, value) in options {
                let bool_value = parse_bool_value(&value)?;
                settings.options.insert(key, bool_value);
            }
        }

        Ok(settings)
    }

    /// Get the default settings path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("budkeys").join("config.toml"))
    }

    /// Load from default location (~/.config/budkeys/config.toml)
    pub fn load_default() -> Result<Self, SettingsError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::from_file(path);
            }
            log::warn!("No settings at {}, using defaults", path.display());
        }
        Ok(Self::new())
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String, SettingsError> {
        let gestures = Gesture::iter()
            .filter_map(|g| self.gestures.get(&g).map(|a| (g.to_string(), a.clone())))
            .collect();
        let options = self
            .options
            .iter()
            .map(|(k, v)| (k.clone(), toml::Value::Boolean(*v)))
            .collect();

        let doc = SettingsToml {
            target_device: self.target_device.clone(),
            gestures: Some(gestures),
            timing: Some(TimingSettings {
                multi_tap_window_ms: Some(self.multi_tap_window_ms),
                long_press_threshold_ms: Some(self.long_press_threshold_ms),
            }),
            hook: Some(HookSettings {
                keys: Some(self.hook_keys.clone()),
                devices: Some(self.hook_devices.clone()),
            }),
            options: Some(options),
        };
        toml::to_string_pretty(&doc).map_err(|e| SettingsError::TomlSerialize(e.to_string()))
    }

    /// Write settings to `path`, creating parent directories
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Write settings back to the file they were loaded from
    pub fn save(&self) -> Result<(), SettingsError> {
        match self.source_path {
            Some(ref path) => self.save_to(path),
            None => Err(SettingsError::InvalidValue("No source path set".to_string())),
        }
    }

    /// Reload settings from the original file
    pub fn reload(&mut self) -> Result<(), SettingsError> {
        if let Some(ref path) = self.source_path {
            let new_settings = Self::from_file(path)?;
            *self = new_settings;
            Ok(())
        } else {
            Err(SettingsError::InvalidValue("No source path set".to_string()))
        }
    }

    /// Check every value the engine and dispatcher will read
    pub fn validate(&self) -> Result<(), SettingsError> {
        for (gesture, action) in &self.gestures {
            if action.parse::<ActionName>().is_err() {
                return Err(SettingsError::InvalidValue(format!(
                    "{} is mapped to unknown action '{}'",
                    gesture, action
                )));
            }
        }
        if self.multi_tap_window_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "timing.multi_tap_window_ms must be positive".to_string(),
            ));
        }
        if self.long_press_threshold_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "timing.long_press_threshold_ms must be positive".to_string(),
            ));
        }
        if self.hook_keys.is_empty() {
            return Err(SettingsError::InvalidValue("hook.keys is empty".to_string()));
        }
        for name in &self.hook_keys {
            if key_from_name(name).is_none() {
                return Err(SettingsError::InvalidValue(format!(
                    "hook.keys contains unknown key '{}'",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Get the target device
    pub fn target(&self) -> Option<&str> {
        self.target_device.as_deref()
    }

    /// Set or clear the target device
    pub fn set_target_device(&mut self, device: Option<String>) {
        self.target_device = device.filter(|d| !d.trim().is_empty());
    }

    /// Get the action mapped to a gesture, if any
    pub fn gesture_action(&self, gesture: Gesture) -> Option<&str> {
        self.gestures.get(&gesture).map(String::as_str)
    }

    /// Map a gesture to an action name
    pub fn set_gesture_action(&mut self, gesture: Gesture, action: impl Into<String>) {
        self.gestures.insert(gesture, action.into());
    }

    /// Set the debounce window in milliseconds
    pub fn set_multi_tap_window_ms(&mut self, ms: u64) {
        self.multi_tap_window_ms = ms;
    }

    /// Set the long press threshold in milliseconds
    pub fn set_long_press_threshold_ms(&mut self, ms: u64) {
        self.long_press_threshold_ms = ms;
    }

    /// Device filter for the hook backend
    /// Names of the monitored key and its fallbacks, as written
    pub fn hook_keys(&self) -> &[String] {
        &self.hook_keys
    }

    /// Whether the `[hook]` section differs; those values are only read
    /// when the hook is installed.
    pub fn hook_changed(&self, other: &Settings) -> bool {
        self.hook_keys != other.hook_keys || self.hook_devices != other.hook_devices
    }

    pub fn hook_devices(&self) -> &[String] {
        &self.hook_devices
    }

    /// Get a boolean option value. Unknown options read as false.
    pub fn get_option(&self, name: &str) -> bool {
        self.options.get(name).copied().unwrap_or(false)
    }

    /// Set a boolean option value
    pub fn set_option(&mut self, name: &str, value: bool) {
        self.options.insert(name.to_string(), value);
    }

    /// Path the settings were loaded from
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }
}

impl ConfigStore for Settings {
    fn mapped_action(&self, gesture: Gesture) -> String {
        self.gesture_action(gesture)
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(NO_ACTION)
            .to_string()
    }

    fn target_device(&self) -> Option<String> {
        self.target_device.clone()
    }

    fn multi_tap_window(&self) -> Duration {
        Duration::from_millis(self.multi_tap_window_ms)
    }

    fn long_press_threshold(&self) -> Duration {
        Duration::from_millis(self.long_press_threshold_ms)
    }

    fn monitored_keys(&self) -> Vec<Key> {
        let keys: Vec<Key> = self
            .hook_keys
            .iter()
            .filter_map(|name| {
                let key = key_from_name(name);
                if key.is_none() {
                    log::warn!("Ignoring unknown hook key '{}'", name);
                }
                key
            })
            .collect();
        if keys.is_empty() {
            DEFAULT_MONITORED_KEYS.to_vec()
        } else {
            keys
        }
    }
}

/// Settings shared between the engine and a reloader.
///
/// The engine reads through [`ConfigStore`] on every event while the owner
/// may swap in freshly loaded settings at any time.
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<Settings>>,
}

impl SharedSettings {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Copy of the current settings
    pub fn snapshot(&self) -> Settings {
        self.inner.read().clone()
    }

    /// Swap in new settings
    pub fn replace(&self, settings: Settings) {
        *self.inner.write() = settings;
    }

    /// Re-read and validate the source file.
    ///
    /// On error the current settings stay in place. Returns the settings
    /// that were replaced.
    pub fn reload(&self) -> Result<Settings, SettingsError> {
        let path = self
            .inner
            .read()
            .source_path
            .clone()
            .ok_or_else(|| SettingsError::InvalidValue("No source path set".to_string()))?;
        let fresh = Settings::from_file(&path)?;
        fresh.validate()?;
        Ok(std::mem::replace(&mut *self.inner.write(), fresh))
    }

    /// Override the target device in place
    pub fn set_target_device(&self, device: Option<String>) {
        self.inner.write().set_target_device(device);
    }
}

impl ConfigStore for SharedSettings {
    fn mapped_action(&self, gesture: Gesture) -> String {
        self.inner.read().mapped_action(gesture)
    }

    fn target_device(&self) -> Option<String> {
        ConfigStore::target_device(&*self.inner.read())
    }

    fn multi_tap_window(&self) -> Duration {
        self.inner.read().multi_tap_window()
    }

    fn long_press_threshold(&self) -> Duration {
        self.inner.read().long_press_threshold()
    }

    fn monitored_keys(&self) -> Vec<Key> {
        self.inner.read().monitored_keys()
    }
}

/// Parse a TOML value as a boolean
fn parse_bool_value(value: &toml::Value) -> Result<bool, SettingsError> {
    match value {
        toml::Value::Boolean(b) => Ok(*b),
        toml::Value::Integer(1) => Ok(true),
        toml::Value::Integer(0) => Ok(false),
        toml::Value::String(s) => match s.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(SettingsError::InvalidValue(format!(
                "Cannot convert '{}' to boolean",
                s
            ))),
        },
        _ => Err(SettingsError::InvalidValue(format!(
            "Cannot convert {:?} to boolean",
            value
        ))),
    }
}

/// Create default settings content for a new installation
pub fn default_settings_content() -> &'static str {
    r#"# Budkeys Settings
# Place this file at: ~/.config/budkeys/config.toml

# Gestures are only intercepted while this device is connected.
# Without a target device every key press passes through untouched.
# target_device = "Galaxy Buds Pro"

[gestures]
# Actions: none, play_pause, next_track, previous_track, volume_up,
# volume_down, volume_mute, scroll_up, scroll_down, alt_tab,
# switch_desktop_next, switch_desktop_prev, lock_screen
single_tap = "play_pause"
double_tap = "next_track"
triple_tap = "previous_track"
long_press = "none"

[timing]
multi_tap_window_ms = 400
long_press_threshold_ms = 500

[hook]
# Monitored key first, then fallbacks for headsets that report another code
keys = ["PLAYPAUSE", "PLAYCD"]
# Restrict to specific input devices (names or /dev/input paths)
devices = []

[options]
notifications = true
start_with_system = false
"#
}
