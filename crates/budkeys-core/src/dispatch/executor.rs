// Budkeys Action Executor
// Runs named actions as synthetic input or helper commands

use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use super::{ActionDispatcher, ActionName, DispatchError, DispatchResult};
use crate::output::KeySink;
use crate::Key;

/// Wheel steps per scroll action
const SCROLL_STEPS: i32 = 5;

/// Default command used to lock the session
const DEFAULT_LOCK_COMMAND: &[&str] = &["loginctl", "lock-session"];

/// How long an action waits for its helper command before moving on
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(1);

/// Interval between child status checks
const WAIT_TICK: Duration = Duration::from_millis(10);

/// Executes actions by emitting key taps, chords and wheel steps through a
/// [`KeySink`], and runs a helper command to lock the screen.
pub struct ActionExecutor<S: KeySink> {
    sink: S,
    lock_command: Vec<String>,
    command_timeout: Duration,
}

impl<S: KeySink> ActionExecutor<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            lock_command: DEFAULT_LOCK_COMMAND.iter().map(|s| s.to_string()).collect(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Bound how long a helper command may block the caller
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Replace the lock-screen command (program followed by its arguments)
    pub fn with_lock_command(mut self, command: Vec<String>) -> Self {
        self.lock_command = command;
        self
    }

    /// Execute a parsed action
    pub fn execute(&self, action: ActionName) -> DispatchResult<()> {
        let result = match action {
            ActionName::None => Ok(()),
            ActionName::PlayPause => self.sink.tap(Key::PLAYPAUSE),
            ActionName::NextTrack => self.sink.tap(Key::NEXTSONG),
            ActionName::PreviousTrack => self.sink.tap(Key::PREVIOUSSONG),
            ActionName::VolumeUp => self.sink.tap(Key::VOLUMEUP),
            ActionName::VolumeDown => self.sink.tap(Key::VOLUMEDOWN),
            ActionName::VolumeMute => self.sink.tap(Key::MUTE),
            ActionName::ScrollUp => self.sink.scroll(SCROLL_STEPS),
            ActionName::ScrollDown => self.sink.scroll(-SCROLL_STEPS),
            ActionName::AltTab => self.sink.chord(&[Key::LEFT_ALT, Key::TAB]),
            ActionName::SwitchDesktopNext => {
                self.sink
                    .chord(&[Key::LEFT_CTRL, Key::LEFT_META, Key::RIGHT])
            }
            ActionName::SwitchDesktopPrev => {
                self.sink
                    .chord(&[Key::LEFT_CTRL, Key::LEFT_META, Key::LEFT])
            }
            ActionName::LockScreen => return self.lock_screen(),
        };
        result.map_err(|e| DispatchError::execution(action, e))
    }

    fn lock_screen(&self) -> DispatchResult<()> {
        let Some((program, args)) = self.lock_command.split_first() else {
            return Err(DispatchError::execution(
                ActionName::LockScreen,
                "no lock command configured",
            ));
        };
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| DispatchError::execution(ActionName::LockScreen, e))?;

        match wait_bounded(child, self.command_timeout)
            .map_err(|e| DispatchError::execution(ActionName::LockScreen, e))?
        {
            Some(status) if !status.success() => Err(DispatchError::execution(
                ActionName::LockScreen,
                format!("{} exited with {}", program, status),
            )),
            Some(_) => Ok(()),
            None => {
                log::debug!("{} still running, not waiting for it", program);
                Ok(())
            }
        }
    }
}

/// Wait up to `timeout` for `child`. A child still running afterwards is
/// reaped on a detached thread and `None` is returned.
fn wait_bounded(mut child: Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            break;
        }
        thread::sleep(WAIT_TICK);
    }

    thread::Builder::new()
        .name("budkeys-reaper".to_string())
        .spawn(move || {
            if let Ok(status) = child.wait() {
                if !status.success() {
                    log::warn!("Helper command exited with {}", status);
                }
            }
        })?;
    Ok(None)
}

impl<S: KeySink> ActionDispatcher for ActionExecutor<S> {
    fn dispatch(&self, action: &str) -> DispatchResult<()> {
        let parsed: ActionName = action
            .parse()
            .map_err(|_| DispatchError::UnknownAction(action.to_string()))?;
        log::info!("Executing action: {}", parsed);
        self.execute(parsed)
    }
}
