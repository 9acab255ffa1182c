// Budkeys Bluetooth Oracle
// Connected-device queries through bluetoothctl

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use super::{ConnectivityOracle, OracleError};

/// Default bound on a single bluetoothctl invocation
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Interval between child status checks
const WAIT_TICK: Duration = Duration::from_millis(10);

/// A device line reported by bluetoothctl
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BluetoothDevice {
    pub address: String,
    pub name: String,
}

impl BluetoothDevice {
    /// Whether `target` names this device (by name or address, any case)
    pub fn matches(&self, target: &str) -> bool {
        let target = target.trim();
        self.name.eq_ignore_ascii_case(target) || self.address.eq_ignore_ascii_case(target)
    }
}

/// Queries BlueZ through the `bluetoothctl` command line tool.
#[derive(Debug, Clone)]
pub struct BluetoothctlOracle {
    program: String,
    timeout: Duration,
}

impl Default for BluetoothctlOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl BluetoothctlOracle {
    pub fn new() -> Self {
        Self {
            program: "bluetoothctl".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Use a different executable (mainly for tests and wrappers)
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Bound each query by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Devices currently connected
    pub fn connected_devices(&self) -> Result<Vec<BluetoothDevice>, OracleError> {
        self.query(&["devices", "Connected"])
    }

    /// Paired devices, sorted by name with duplicates removed
    pub fn paired_devices(&self) -> Result<Vec<BluetoothDevice>, OracleError> {
        let mut devices = self.query(&["devices", "Paired"])?;
        devices.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.address.cmp(&b.address)));
        devices.dedup();
        Ok(devices)
    }

    fn query(&self, args: &[&str]) -> Result<Vec<BluetoothDevice>, OracleError> {
        let output = self.run(args)?;
        Ok(output.lines().filter_map(parse_device_line).collect())
    }

    /// Run the program and collect stdout, killing it past the timeout
    fn run(&self, args: &[&str]) -> Result<String, OracleError> {
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| OracleError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(OracleError::Timeout(self.timeout));
            }
            thread::sleep(WAIT_TICK);
        };

        if !status.success() {
            return Err(OracleError::Failed(format!(
                "{} {} exited with {}",
                self.program,
                args.join(" "),
                status
            )));
        }

        let mut stdout = String::new();
        if let Some(mut pipe) = child.stdout.take() {
            pipe.read_to_string(&mut stdout)?;
        }
        Ok(stdout)
    }
}

impl ConnectivityOracle for BluetoothctlOracle {
    fn is_active(&self, device: &str) -> bool {
        match self.connected_devices() {
            Ok(devices) => devices.iter().any(|d| d.matches(device)),
            Err(e) => {
                log::warn!("Could not query Bluetooth devices: {}", e);
                false
            }
        }
    }
}

/// Parse "Device AA:BB:CC:DD:EE:FF Some Name" into a device
pub(crate) fn parse_device_line(line: &str) -> Option<BluetoothDevice> {
    let rest = line.trim().strip_prefix("Device ")?;
    let (address, name) = match rest.split_once(' ') {
        Some((address, name)) => (address, name.trim()),
        None => (rest, ""),
    };
    if address.is_empty() {
        return None;
    }
    Some(BluetoothDevice {
        address: address.to_string(),
        name: if name.is_empty() { address } else { name }.to_string(),
    })
}
