// Budkeys Input Device Oracle
// A headset is active while its input node (AVRCP) exists

use super::ConnectivityOracle;
use crate::hook::is_virtual_device;

/// Virtual device prefix to filter out
const VIRT_DEVICE_PREFIX: &str = "budkeys (virtual)";

/// Reports a device as active while an evdev input device whose name
/// contains the target name is present.
///
/// Bluetooth headsets expose their media buttons as an input node
/// ("Galaxy Buds Pro (AVRCP)") only while connected.
#[derive(Debug, Clone, Default)]
pub struct InputDeviceOracle;

impl InputDeviceOracle {
    pub fn new() -> Self {
        Self
    }

    /// Names of all non-virtual input devices
    pub fn device_names() -> Vec<String> {
        evdev::enumerate()
            .filter_map(|(_, device)| device.name().map(str::to_string))
            .filter(|name| !is_virtual_device(name, VIRT_DEVICE_PREFIX))
            .collect()
    }
}

impl ConnectivityOracle for InputDeviceOracle {
    fn is_active(&self, device: &str) -> bool {
        let target = device.trim().to_lowercase();
        if target.is_empty() {
            return false;
        }
        Self::device_names()
            .iter()
            .any(|name| name.to_lowercase().contains(&target))
    }
}
