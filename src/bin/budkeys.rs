// Budkeys Daemon
// Media-key gestures while a headset is connected

#[cfg(feature = "daemon")]
use std::path::PathBuf;
#[cfg(feature = "daemon")]
use std::sync::Arc;

#[cfg(feature = "daemon")]
use clap::{Parser, ValueEnum};

#[cfg(feature = "daemon")]
use budkeys_core::{
    default_settings_content, ActionDispatcher, ActionExecutor, ActionName, BluetoothctlOracle,
    CachedOracle, ConfigStore, ConnectivityOracle, EvdevHook, Gesture, GestureEngine,
    InputDeviceOracle, Settings, SharedSettings, VirtualDevice,
};

/// How the target device's connection state is detected
#[cfg(feature = "daemon")]
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
enum OracleKind {
    /// Ask BlueZ for connected devices
    #[default]
    Bluetoothctl,
    /// Look for an input device named after the target
    Input,
}

/// Media-key gesture remapper for Bluetooth headsets
#[cfg(feature = "daemon")]
#[derive(Parser, Debug)]
#[command(name = "budkeys")]
#[command(version)]
#[command(about = "Remap play/pause taps and long presses while a headset is connected", long_about = None)]
struct Args {
    /// TOML settings file (default: ~/.config/budkeys/config.toml)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Target device name or address (overrides the settings file)
    #[arg(short, long, value_name = "DEVICE")]
    target: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate settings and exit
    #[arg(long)]
    check_config: bool,

    /// List Bluetooth and input devices
    #[arg(long)]
    list_devices: bool,

    /// List available action names
    #[arg(long)]
    list_actions: bool,

    /// Connection detection method
    #[arg(long, value_enum, default_value_t = OracleKind::Bluetoothctl)]
    oracle: OracleKind,

    /// Write a default settings file and exit
    #[arg(long)]
    write_default_config: bool,
}

/// Main application state
#[cfg(feature = "daemon")]
struct Application {
    settings: SharedSettings,
    args: Args,
}

#[cfg(feature = "daemon")]
impl Application {
    fn new(args: Args) -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = match args.config {
            Some(ref path) => Settings::from_file(path)?,
            None => Settings::load_default()?,
        };
        if let Some(ref target) = args.target {
            settings.set_target_device(Some(target.clone()));
        }

        Ok(Self {
            settings: SharedSettings::new(settings),
            args,
        })
    }

    /// Validate settings
    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        let settings = self.settings.snapshot();
        settings.validate()?;

        println!("Configuration is valid");
        match settings.target() {
            Some(target) => println!("  target_device = {}", target),
            None => println!("  target_device is not set; key presses pass through"),
        }
        for gesture in [
            Gesture::SingleTap,
            Gesture::DoubleTap,
            Gesture::TripleTap,
            Gesture::LongPress,
        ] {
            println!("  {} = {}", gesture, settings.mapped_action(gesture));
        }
        Ok(())
    }

    /// List paired Bluetooth devices and input devices
    fn list_devices() -> Result<(), Box<dyn std::error::Error>> {
        let bluetooth = BluetoothctlOracle::new();
        match bluetooth.paired_devices() {
            Ok(devices) => {
                let connected = bluetooth.connected_devices().unwrap_or_default();
                println!("Found {} paired Bluetooth device(s):", devices.len());
                for device in &devices {
                    let state = if connected.contains(device) {
                        " [connected]"
                    } else {
                        ""
                    };
                    println!("  {} ({}){}", device.name, device.address, state);
                }
            }
            Err(e) => eprintln!("Could not list Bluetooth devices: {}", e),
        }

        let inputs = InputDeviceOracle::device_names();
        println!("Found {} input device(s):", inputs.len());
        for name in &inputs {
            println!("  {}", name);
        }
        Ok(())
    }

    fn list_actions() {
        for action in ActionName::all() {
            println!("{}", action);
        }
    }

    /// Write the commented default settings file
    fn write_default_config(&self) -> Result<(), Box<dyn std::error::Error>> {
        let path = self
            .args
            .config
            .clone()
            .or_else(Settings::default_path)
            .ok_or("No configuration directory available")?;
        if path.exists() {
            return Err(format!("{} already exists", path.display()).into());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, default_settings_content())?;
        println!("Wrote {}", path.display());
        Ok(())
    }

    fn oracle(&self) -> Arc<dyn ConnectivityOracle> {
        match self.args.oracle {
            OracleKind::Bluetoothctl => Arc::new(CachedOracle::new(BluetoothctlOracle::new())),
            OracleKind::Input => Arc::new(CachedOracle::new(InputDeviceOracle::new())),
        }
    }

    /// Start the engine and wait for a stop signal
    fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        self.settings.snapshot().validate()?;
        let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;

        let output = Arc::new(VirtualDevice::new()?);
        let hook = EvdevHook::new(
            Arc::clone(&output),
            self.settings.snapshot().hook_devices().to_vec(),
        );
        let dispatcher: Arc<dyn ActionDispatcher> =
            Arc::new(ActionExecutor::new(Arc::clone(&output)));
        let config: Arc<dyn ConfigStore> = Arc::new(self.settings.clone());

        let engine = GestureEngine::new(Box::new(hook), config, self.oracle(), dispatcher);
        if let Err(e) = engine.start() {
            eprintln!("Warning: media-key gestures are unavailable: {}", e);
            eprintln!("Reading input devices usually requires membership in the 'input' group.");
            return Err(e.into());
        }

        match self.settings.target_device() {
            Some(target) => log::info!("Intercepting while '{}' is connected", target),
            None => log::warn!("No target device configured; key presses pass through"),
        }
        println!("budkeys is running. Press Ctrl+C to exit.");

        for signal in signals.forever() {
            match signal {
                SIGHUP => self.reload(&engine),
                SIGINT | SIGTERM => {
                    log::info!("Received signal, shutting down gracefully...");
                    break;
                }
                _ => {}
            }
        }

        engine.stop();
        output.release_all()?;
        Ok(())
    }

    fn reload(&self, engine: &GestureEngine) {
        match self.settings.reload() {
            Ok(previous) => {
                if let Some(ref target) = self.args.target {
                    self.settings.set_target_device(Some(target.clone()));
                }
                log::info!("Configuration reloaded");
                if previous.hook_changed(&self.settings.snapshot()) {
                    log::warn!("Changes to [hook] keys and devices take effect after a restart");
                }
            }
            Err(e) => log::error!("Keeping current configuration: {}", e),
        }
        log::debug!("Engine state: {:?}", engine.snapshot());
    }
}

#[cfg(feature = "daemon")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    // Neither flag needs settings
    if args.list_devices {
        return Application::list_devices();
    }
    if args.list_actions {
        Application::list_actions();
        return Ok(());
    }

    if args.write_default_config {
        let app = Application {
            settings: SharedSettings::default(),
            args,
        };
        return app.write_default_config();
    }

    let app = Application::new(args)?;

    if app.args.check_config {
        return app.validate();
    }

    app.run()
}

// Stub for when the daemon feature is not enabled
#[cfg(not(feature = "daemon"))]
fn main() {
    eprintln!("Error: budkeys binary requires the 'daemon' feature to be enabled.");
    eprintln!("Please build with: cargo build --release --features daemon --bin budkeys");
    std::process::exit(1);
}
