// Budkeys Core Library
// Gesture interception for the media play/pause key

pub mod config;
pub mod device;
pub mod direction;
pub mod dispatch;
pub mod engine;
pub mod gesture;
pub mod hook;
pub mod key;
pub mod output;
pub mod settings;

pub use config::{ConfigStore, DEFAULT_MONITORED_KEYS};
pub use device::{BluetoothDevice, BluetoothctlOracle, CachedOracle, ConnectivityOracle, OracleError};
pub use direction::KeyDirection;
pub use dispatch::{ActionDispatcher, ActionExecutor, ActionName, DispatchError, DispatchResult};
pub use engine::{EngineError, EngineSnapshot, GestureEngine};
pub use gesture::{Gesture, LONG_PRESS_THRESHOLD, MULTI_TAP_WINDOW, NO_ACTION};
pub use hook::{HookCallbacks, HookError, HookHandle, HookResult, InputHook, KeyCallback, KeyEvent};
pub use key::{key_from_name, Key};
pub use output::{KeySink, PressedKeys, UInputError};
pub use settings::{default_settings_content, Settings, SettingsError, SharedSettings};

#[cfg(feature = "evdev-backend")]
pub use device::InputDeviceOracle;

#[cfg(feature = "evdev-backend")]
pub use hook::EvdevHook;

#[cfg(feature = "evdev-backend")]
pub use output::{VirtualDevice, VIRTUAL_DEVICE_NAME};
