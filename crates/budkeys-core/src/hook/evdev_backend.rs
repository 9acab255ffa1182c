// Budkeys evdev Hook Backend
// Device grab for suppression, uinput for re-emission

use std::collections::HashMap;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use evdev::{Device, EventType};

use super::watch::{DeviceWatch, INPUT_DIR};
use super::{
    is_new_hook_device, is_virtual_device, HookCallbacks, HookError, HookHandle, HookResult,
    InputHook, KeyEvent,
};
use crate::output::{KeySink, VirtualDevice};
use crate::{Key, KeyDirection};

/// Virtual device prefix to filter out
const VIRT_DEVICE_PREFIX: &str = "budkeys (virtual)";

/// Poll tick in milliseconds; bounds how long uninstall waits for the reader
const POLL_TIMEOUT_MS: i32 = 100;

/// EINTR on Linux
const EINTR: i32 = 4;

/// Wait after a node appears before opening it; udev applies permissions late
const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Linux input hook.
///
/// Each installed hook opens every input device that reports the key and
/// reads it on a dedicated thread. A suppressing hook grabs those devices
/// (EVIOCGRAB), so nothing else receives their events; every other key read
/// from a grabbed device is forwarded unchanged through the virtual device.
///
/// The reader also watches `/dev/input`. Headsets create their AVRCP node
/// only once connected, so new nodes reporting the key join the hook while
/// it runs, and nodes that hang up are dropped.
pub struct EvdevHook {
    output: Arc<VirtualDevice>,
    device_filter: Vec<String>,
    registrations: HashMap<u64, Registration>,
    next_id: u64,
}

/// A running reader thread for one installed hook
struct Registration {
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl Registration {
    fn shutdown(&mut self) -> bool {
        self.stop.store(true, Ordering::SeqCst);
        match self.reader.take() {
            Some(reader) => reader.join().is_ok(),
            None => true,
        }
    }
}

/// Devices are ungrabbed when the reader exits, so stopping the thread
/// here also releases the grab on every exit path.
impl Drop for Registration {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl EvdevHook {
    /// Create a hook backend writing re-emitted events to `output`.
    ///
    /// `device_filter` restricts which devices are opened (names or paths);
    /// empty means every device reporting the monitored key.
    pub fn new(output: Arc<VirtualDevice>, device_filter: Vec<String>) -> Self {
        Self {
            output,
            device_filter,
            registrations: HashMap::new(),
            next_id: 1,
        }
    }
}

/// An opened device and the node it came from
struct HookedDevice {
    path: String,
    name: String,
    device: Device,
}

/// Open the devices that report `key`, honoring the device filter and
/// skipping paths in `open_paths`
fn scan_devices(key: Key, device_filter: &[String], open_paths: &[String]) -> Vec<HookedDevice> {
    let mut devices = Vec::new();

    for (path, device) in evdev::enumerate() {
        let device_name = device.name().unwrap_or("Unknown").to_string();
        let device_path = path.to_string_lossy().into_owned();
        let supports_key = device.supported_events().contains(EventType::KEY)
            && device
                .supported_keys()
                .map(|keys| keys.contains(evdev::Key::new(key.code())))
                .unwrap_or(false);
        let is_virtual = is_virtual_device(&device_name, VIRT_DEVICE_PREFIX);

        if is_new_hook_device(
            &device_name,
            &device_path,
            open_paths,
            device_filter,
            supports_key,
            is_virtual,
        ) {
            log::debug!("Hook device for {}: {} ({})", key, device_name, device_path);
            devices.push(HookedDevice {
                path: device_path,
                name: device_name,
                device,
            });
        }
    }

    devices
}

/// Take exclusive access to a device
fn grab(hooked: &mut HookedDevice) -> std::io::Result<()> {
    // A previous instance may have crashed while holding the grab
    let _ = hooked.device.ungrab();
    hooked.device.grab()
}

/// Whether poll reported the fd as hung up or invalid
fn device_gone(revents: libc::c_short) -> bool {
    revents & (libc::POLLHUP | libc::POLLERR | libc::POLLNVAL) != 0
}

impl InputHook for EvdevHook {
    fn install(
        &mut self,
        key: Key,
        callbacks: HookCallbacks,
        suppress: bool,
    ) -> HookResult<HookHandle> {
        // Watch before scanning so a node created in between is not missed
        let watch = match DeviceWatch::new(Path::new(INPUT_DIR)) {
            Ok(watch) => Some(watch),
            Err(e) => {
                log::warn!("Not watching {} for new devices: {}", INPUT_DIR, e);
                None
            }
        };

        let mut devices = scan_devices(key, &self.device_filter, &[]);
        if devices.is_empty() {
            if watch.is_none() {
                return Err(HookError::KeyNotSupported(key));
            }
            log::info!("No device reports {} yet, waiting for one", key);
        }

        if suppress {
            for hooked in &mut devices {
                if let Err(e) = grab(hooked) {
                    // Already-grabbed devices are released when `devices` drops
                    return Err(HookError::Install(format!("grab {}: {}", hooked.name, e)));
                }
            }
        }

        let stop = Arc::new(AtomicBool::new(false));
        let reader = Reader {
            key,
            devices,
            callbacks,
            suppress,
            output: Arc::clone(&self.output),
            stop: Arc::clone(&stop),
            device_filter: self.device_filter.clone(),
            watch,
            rescan_at: None,
        };
        let handle = thread::Builder::new()
            .name(format!("budkeys-hook-{}", key))
            .spawn(move || reader.run())
            .map_err(|e| HookError::Install(format!("spawn reader: {}", e)))?;

        let id = self.next_id;
        self.next_id += 1;
        self.registrations.insert(
            id,
            Registration {
                stop,
                reader: Some(handle),
            },
        );
        Ok(HookHandle::new(id))
    }

    fn uninstall(&mut self, handle: HookHandle) -> HookResult<()> {
        let mut registration = self
            .registrations
            .remove(&handle.id())
            .ok_or_else(|| HookError::Uninstall(format!("unknown hook handle {}", handle.id())))?;
        if registration.shutdown() {
            Ok(())
        } else {
            Err(HookError::Uninstall("hook reader panicked".to_string()))
        }
    }

    fn reemit(&mut self, key: Key, direction: KeyDirection) -> HookResult<()> {
        self.output
            .send_key(key, direction)
            .map_err(|e| HookError::Reemit(e.to_string()))
    }
}

/// State moved onto a hook's reader thread
struct Reader {
    key: Key,
    devices: Vec<HookedDevice>,
    callbacks: HookCallbacks,
    suppress: bool,
    output: Arc<VirtualDevice>,
    stop: Arc<AtomicBool>,
    device_filter: Vec<String>,
    watch: Option<DeviceWatch>,
    /// Pending rescan after the input directory changed
    rescan_at: Option<Instant>,
}

impl Reader {
    fn run(mut self) {
        while !self.stop.load(Ordering::SeqCst) {
            // Rebuilt every tick: the device set changes with hot-plug
            let mut poll_fds: Vec<libc::pollfd> = self
                .devices
                .iter()
                .map(|hooked| hooked.device.as_raw_fd())
                .chain(self.watch.as_ref().map(|watch| watch.as_raw_fd()))
                .map(|fd| libc::pollfd {
                    fd,
                    events: libc::POLLIN,
                    revents: 0,
                })
                .collect();

            if poll_fds.is_empty() {
                log::warn!("Hook for {} has no devices left", self.key);
                break;
            }

            let poll_result = unsafe {
                libc::poll(
                    poll_fds.as_mut_ptr(),
                    poll_fds.len() as libc::nfds_t,
                    POLL_TIMEOUT_MS,
                )
            };

            if poll_result < 0 {
                let err = std::io::Error::last_os_error();
                // A signal (e.g. Ctrl+C) interrupted the poll; the stop flag decides
                if err.raw_os_error() == Some(EINTR) {
                    continue;
                }
                log::error!("Hook poll failed for {}: {}", self.key, err);
                break;
            }

            if poll_result > 0 {
                let watch_ready = self.watch.is_some()
                    && poll_fds[self.devices.len()].revents & libc::POLLIN != 0;

                let mut gone = Vec::new();
                for i in 0..self.devices.len() {
                    let revents = poll_fds[i].revents;
                    let alive = revents & libc::POLLIN == 0 || self.read_device(i);
                    if !alive || device_gone(revents) {
                        gone.push(i);
                    }
                }
                for i in gone.into_iter().rev() {
                    let hooked = self.devices.remove(i);
                    log::info!(
                        "Input device {} ({}) removed from hook for {}",
                        hooked.name,
                        hooked.path,
                        self.key
                    );
                }

                if watch_ready && self.watch.as_ref().is_some_and(|watch| watch.drain()) {
                    self.rescan_at = Some(Instant::now() + SETTLE_DELAY);
                }
            }

            if self.rescan_at.is_some_and(|at| Instant::now() >= at) {
                self.rescan_at = None;
                self.add_new_devices();
            }
        }

        if self.suppress {
            for hooked in &mut self.devices {
                let _ = hooked.device.ungrab();
            }
        }
        log::debug!("Hook reader for {} stopped", self.key);
    }

    /// Handle the pending events of one device. Returns false once the
    /// device has gone away.
    fn read_device(&mut self, index: usize) -> bool {
        let hooked = &mut self.devices[index];
        let events: Vec<_> = match hooked.device.fetch_events() {
            Ok(events) => events.collect(),
            Err(e) if e.raw_os_error() == Some(libc::ENODEV) => return false,
            Err(e) => {
                log::warn!("Failed to read from {}: {}", hooked.name, e);
                return true;
            }
        };

        for event in events {
            if event.event_type() != EventType::KEY {
                continue;
            }
            let Some(direction) = KeyDirection::from_i32(event.value()) else {
                continue;
            };
            let key = Key::from(event.code());
            if key == self.key {
                self.callbacks.deliver(KeyEvent::new(key, direction));
            } else if self.suppress {
                // Grabbed devices reach nobody else; forward what we don't own
                if let Err(e) = self.output.send_key(key, direction) {
                    log::warn!("Failed to forward {} {}: {}", key, direction, e);
                }
            }
        }
        true
    }

    /// Open nodes that appeared since the last scan and report the key
    fn add_new_devices(&mut self) {
        let open_paths: Vec<String> = self.devices.iter().map(|h| h.path.clone()).collect();
        for mut hooked in scan_devices(self.key, &self.device_filter, &open_paths) {
            if self.suppress {
                if let Err(e) = grab(&mut hooked) {
                    log::warn!("Skipping {}: grab failed: {}", hooked.name, e);
                    continue;
                }
            }
            log::info!(
                "Input device {} ({}) added to hook for {}",
                hooked.name,
                hooked.path,
                self.key
            );
            self.devices.push(hooked);
        }
    }
}
