// Budkeys Hook - Device Watch
// inotify on the input directory so hooks pick up hot-plugged nodes

use std::ffi::CString;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

/// Directory holding the evdev nodes
pub(crate) const INPUT_DIR: &str = "/dev/input";

/// Large enough for several events with a full-length name
const EVENT_BUFFER: usize = 4096;

/// Reports entries created in a directory.
///
/// The fd is non-blocking and meant to sit in a reader's poll set next to
/// the device fds. Notifications carry no payload the caller needs; any
/// readiness means "rescan".
pub(crate) struct DeviceWatch {
    fd: OwnedFd,
}

impl DeviceWatch {
    pub(crate) fn new(dir: &Path) -> io::Result<Self> {
        let raw = unsafe { libc::inotify_init1(libc::IN_NONBLOCK | libc::IN_CLOEXEC) };
        if raw < 0 {
            return Err(io::Error::last_os_error());
        }
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        let path = CString::new(dir.as_os_str().as_bytes())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let wd = unsafe {
            libc::inotify_add_watch(
                fd.as_raw_fd(),
                path.as_ptr(),
                libc::IN_CREATE | libc::IN_MOVED_TO,
            )
        };
        if wd < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self { fd })
    }

    /// Consume every pending notification. Returns whether there were any.
    pub(crate) fn drain(&self) -> bool {
        let mut buf = [0u8; EVENT_BUFFER];
        let mut seen = false;
        loop {
            let n = unsafe {
                libc::read(
                    self.fd.as_raw_fd(),
                    buf.as_mut_ptr().cast::<libc::c_void>(),
                    buf.len(),
                )
            };
            if n <= 0 {
                // EAGAIN once the queue is empty
                return seen;
            }
            seen = true;
        }
    }
}

impl AsRawFd for DeviceWatch {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn readable(watch: &DeviceWatch, timeout_ms: i32) -> bool {
        let mut pfd = libc::pollfd {
            fd: watch.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let n = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        n > 0 && pfd.revents & libc::POLLIN != 0
    }

    #[test]
    fn test_quiet_directory_not_ready() {
        let dir = tempfile::tempdir().unwrap();
        let watch = DeviceWatch::new(dir.path()).unwrap();

        assert!(!readable(&watch, 50));
        assert!(!watch.drain());
    }

    #[test]
    fn test_created_node_wakes_watch() {
        let dir = tempfile::tempdir().unwrap();
        let watch = DeviceWatch::new(dir.path()).unwrap();

        fs::write(dir.path().join("event12"), b"").unwrap();

        assert!(readable(&watch, 1000));
        assert!(watch.drain());
        // Drained: nothing left until the next change
        assert!(!watch.drain());
        assert!(!readable(&watch, 50));
    }

    #[test]
    fn test_missing_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DeviceWatch::new(&dir.path().join("absent")).is_err());
    }
}
