// Budkeys Hook - Device Filtering
// Which input devices a hook opens for the monitored key

/// Check if a device should be opened by a hook.
///
/// The filtering logic is:
///
/// 1. Virtual devices are never used (our own uinput device would loop)
/// 2. If filter names are given, only devices matching by path or name
/// 3. Otherwise any device that reports the monitored key
///
/// # Arguments
/// * `device_name` - The device name from evdev
/// * `device_path` - The device path (e.g., "/dev/input/event0")
/// * `filter_names` - Device names/paths to match (empty for autodetect)
/// * `supports_key` - Whether the device reports the monitored key
/// * `is_virtual` - Whether the device is a virtual device (from is_virtual_device())
pub fn matches_device_filter(
    device_name: &str,
    device_path: &str,
    filter_names: &[String],
    supports_key: bool,
    is_virtual: bool,
) -> bool {
    if is_virtual || !supports_key {
        return false;
    }

    if !filter_names.is_empty() {
        return filter_names
            .iter()
            .any(|match_name| device_path == match_name || device_name == match_name);
    }

    true
}

/// Check if a device found by a rescan should join a running hook.
///
/// Paths the hook already reads are skipped, so a node is opened once
/// however many times the input directory changes.
pub fn is_new_hook_device(
    device_name: &str,
    device_path: &str,
    open_paths: &[String],
    filter_names: &[String],
    supports_key: bool,
    is_virtual: bool,
) -> bool {
    !open_paths.iter().any(|open| open == device_path)
        && matches_device_filter(device_name, device_path, filter_names, supports_key, is_virtual)
}

/// Check if a device is a virtual device based on its name.
///
/// Virtual devices created by budkeys itself share a fixed prefix.
pub fn is_virtual_device(device_name: &str, virtual_prefix: &str) -> bool {
    device_name.starts_with(virtual_prefix)
}
