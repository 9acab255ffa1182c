// Budkeys uinput Output Layer
// Virtual device creation and key event emission

use parking_lot::Mutex;

use evdev::uinput::VirtualDeviceBuilder;
use evdev::{AttributeSet, EventType, InputEvent, RelativeAxisType};

use super::sink::{KeySink, UInputError};
use super::state::PressedKeys;
use crate::{Key, KeyDirection};

/// Name of our own uinput device. Hook backends must never grab it.
pub const VIRTUAL_DEVICE_NAME: &str = "budkeys (virtual) Keyboard";

/// Virtual uinput device for re-emitted events and action output.
///
/// Shared between the hook backend and the action executor, so writes are
/// serialized through an internal lock.
pub struct VirtualDevice {
    inner: Mutex<Inner>,
}

struct Inner {
    device: evdev::uinput::VirtualDevice,
    pressed: PressedKeys,
}

impl VirtualDevice {
    /// Create a new virtual uinput device
    pub fn new() -> Result<Self, UInputError> {
        // All standard keyboard keys (0-255)
        let mut keys = AttributeSet::new();
        for code in 0..256u16 {
            keys.insert(evdev::Key::new(code));
        }

        let mut axes = AttributeSet::new();
        axes.insert(RelativeAxisType::REL_WHEEL);

        let device = VirtualDeviceBuilder::new()
            .map_err(|e: std::io::Error| UInputError::DeviceCreation(e.to_string()))?
            .name(VIRTUAL_DEVICE_NAME)
            .with_keys(&keys)
            .map_err(|e: std::io::Error| UInputError::DeviceCreation(e.to_string()))?
            .with_relative_axes(&axes)
            .map_err(|e: std::io::Error| UInputError::DeviceCreation(e.to_string()))?
            .build()
            .map_err(|e: std::io::Error| UInputError::DeviceCreation(e.to_string()))?;

        log::debug!("Created uinput device '{}'", VIRTUAL_DEVICE_NAME);

        Ok(Self {
            inner: Mutex::new(Inner {
                device,
                pressed: PressedKeys::new(),
            }),
        })
    }

    /// Release every key this device still holds down
    pub fn release_all(&self) -> Result<(), UInputError> {
        let mut inner = self.inner.lock();
        for key in inner.pressed.drain() {
            inner.write(key, KeyDirection::Up)?;
        }
        Ok(())
    }
}

impl Inner {
    fn write(&mut self, key: Key, direction: KeyDirection) -> Result<(), UInputError> {
        let key_event = InputEvent::new(EventType::KEY, key.code(), direction.to_i32());
        // SYN event is required for the kernel to process the key event
        let syn_event = InputEvent::new(EventType::SYNCHRONIZATION, 0, 0);

        self.device
            .emit(&[key_event, syn_event])
            .map_err(|e: std::io::Error| UInputError::WriteError(e.to_string()))?;

        match direction {
            KeyDirection::Down => self.pressed.add(key),
            KeyDirection::Up => self.pressed.remove(key),
            KeyDirection::Repeat => {}
        }
        Ok(())
    }
}

impl KeySink for VirtualDevice {
    fn send_key(&self, key: Key, direction: KeyDirection) -> Result<(), UInputError> {
        log::trace!("uinput {} {}", key, direction);
        self.inner.lock().write(key, direction)
    }

    fn scroll(&self, steps: i32) -> Result<(), UInputError> {
        let wheel = InputEvent::new(
            EventType::RELATIVE,
            RelativeAxisType::REL_WHEEL.0,
            steps,
        );
        let syn_event = InputEvent::new(EventType::SYNCHRONIZATION, 0, 0);
        self.inner
            .lock()
            .device
            .emit(&[wheel, syn_event])
            .map_err(|e: std::io::Error| UInputError::WriteError(e.to_string()))
    }
}

/// Drop implementation for VirtualDevice
///
/// A key left pressed on a destroyed uinput device stays stuck for the
/// compositor, so everything still held is released first.
impl Drop for VirtualDevice {
    fn drop(&mut self) {
        if let Err(e) = self.release_all() {
            log::warn!("Failed to release keys on virtual device drop: {}", e);
        }
    }
}
