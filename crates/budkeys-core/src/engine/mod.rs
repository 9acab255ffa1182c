// Budkeys Gesture Engine
// Classifies presses of the monitored key into gestures and dispatches them

mod manager;
mod timer;

use std::mem;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::Sender;
use parking_lot::Mutex;

use self::manager::{HookCommand, HookManager};
use self::timer::DebounceTimer;
use crate::config::ConfigStore;
use crate::device::ConnectivityOracle;
use crate::dispatch::ActionDispatcher;
use crate::hook::{HookCallbacks, HookError, InputHook, KeyEvent};
use crate::gesture::is_long_press;
use crate::{Gesture, KeyDirection};

/// Errors returned by [`GestureEngine::start`]
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Failed to install the input hook: {0}")]
    HookInstall(#[from] HookError),

    #[error("Failed to spawn engine thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Input hook is no longer available")]
    HookUnavailable,
}

/// Point-in-time view of the engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineSnapshot {
    pub running: bool,
    pub key_down: bool,
    pub tap_count: u32,
    pub timer_pending: bool,
}

/// Gesture state shared by the hook callbacks and the debounce timer
#[derive(Default)]
struct EngineState {
    running: bool,
    /// Set while the monitored key is held
    pressed_at: Option<Instant>,
    tap_count: u32,
    debounce: Option<DebounceTimer>,
    next_timer_id: u64,
    hook_tx: Option<Sender<HookCommand>>,
}

impl EngineState {
    /// Clear gesture progress, keeping the timer generation counter
    fn reset(&mut self) -> (Option<DebounceTimer>, Option<Sender<HookCommand>>) {
        self.running = false;
        self.pressed_at = None;
        self.tap_count = 0;
        (self.debounce.take(), self.hook_tx.take())
    }
}

pub(crate) struct Shared {
    state: Mutex<EngineState>,
    config: Arc<dyn ConfigStore>,
    oracle: Arc<dyn ConnectivityOracle>,
}

enum Lifecycle {
    Stopped {
        hook: Box<dyn InputHook>,
    },
    Running {
        commands: Sender<HookCommand>,
        manager: JoinHandle<Box<dyn InputHook>>,
    },
    /// The hook manager died and took the hook backend with it
    Failed,
}

/// Gesture interception engine.
///
/// Owns one suppressing hook on the monitored key while running. Presses
/// are consumed and classified only while the configured target device is
/// active; otherwise they are put back unchanged.
pub struct GestureEngine {
    shared: Arc<Shared>,
    dispatcher: Arc<dyn ActionDispatcher>,
    lifecycle: Mutex<Lifecycle>,
}

impl GestureEngine {
    pub fn new(
        hook: Box<dyn InputHook>,
        config: Arc<dyn ConfigStore>,
        oracle: Arc<dyn ConnectivityOracle>,
        dispatcher: Arc<dyn ActionDispatcher>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(EngineState::default()),
                config,
                oracle,
            }),
            dispatcher,
            lifecycle: Mutex::new(Lifecycle::Stopped { hook }),
        }
    }

    /// Install the hook and start intercepting. Does nothing if running.
    ///
    /// On failure the engine stays stopped; nothing is retried.
    pub fn start(&self) -> Result<(), EngineError> {
        let mut lifecycle = self.lifecycle.lock();
        let hook = match mem::replace(&mut *lifecycle, Lifecycle::Failed) {
            Lifecycle::Stopped { hook } => hook,
            running @ Lifecycle::Running { .. } => {
                *lifecycle = running;
                return Ok(());
            }
            Lifecycle::Failed => return Err(EngineError::HookUnavailable),
        };

        let (commands, queue) = crossbeam_channel::unbounded();
        {
            let mut state = self.shared.state.lock();
            state.running = true;
            state.hook_tx = Some(commands.clone());
        }

        let manager = HookManager::new(
            hook,
            callbacks(&self.shared),
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.shared),
        );
        let manager = match thread::Builder::new()
            .name("budkeys-hook-manager".to_string())
            .spawn(move || manager.run(queue))
        {
            Ok(manager) => manager,
            Err(e) => {
                let _ = self.shared.state.lock().reset();
                return Err(EngineError::Spawn(e));
            }
        };

        let (reply, installed) = crossbeam_channel::bounded(1);
        let keys = self.shared.config.monitored_keys();
        let result = commands
            .send(HookCommand::Install { keys, reply })
            .ok()
            .and_then(|_| installed.recv().ok());

        match result {
            Some(Ok(key)) => {
                log::info!("Gesture engine started on {}", key);
                *lifecycle = Lifecycle::Running { commands, manager };
                Ok(())
            }
            Some(Err(e)) => {
                let _ = self.shared.state.lock().reset();
                let _ = commands.send(HookCommand::Shutdown);
                if let Ok(hook) = manager.join() {
                    *lifecycle = Lifecycle::Stopped { hook };
                }
                Err(EngineError::HookInstall(e))
            }
            None => {
                let _ = self.shared.state.lock().reset();
                let _ = manager.join();
                Err(EngineError::HookUnavailable)
            }
        }
    }

    /// Cancel any pending tap resolution and uninstall the hook.
    ///
    /// Does nothing if already stopped. When this returns no timer or hook
    /// callback can reach the dispatcher.
    pub fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock();
        if !matches!(*lifecycle, Lifecycle::Running { .. }) {
            return;
        }

        let (timer, hook_tx) = self.shared.state.lock().reset();
        if let Some(timer) = timer {
            timer.cancel_and_join();
        }
        drop(hook_tx);

        let running = mem::replace(&mut *lifecycle, Lifecycle::Failed);
        if let Lifecycle::Running { commands, manager } = running {
            let _ = commands.send(HookCommand::Shutdown);
            match manager.join() {
                Ok(hook) => *lifecycle = Lifecycle::Stopped { hook },
                Err(_) => log::error!("Hook manager panicked; the input hook is lost"),
            }
        }
        log::info!("Gesture engine stopped");
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let state = self.shared.state.lock();
        EngineSnapshot {
            running: state.running,
            key_down: state.pressed_at.is_some(),
            tap_count: state.tap_count,
            timer_pending: state.debounce.is_some(),
        }
    }

    /// Feed a key-down (or repeat) event, as the hook does
    pub fn on_key_down(&self, event: KeyEvent) {
        self.shared.on_key_down(event);
    }

    /// Feed a key-up event, as the hook does
    pub fn on_key_up(&self, event: KeyEvent) {
        self.shared.on_key_up(event);
    }
}

impl Drop for GestureEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Hook callbacks holding the engine weakly
fn callbacks(shared: &Arc<Shared>) -> HookCallbacks {
    let down = Arc::downgrade(shared);
    let up = Arc::downgrade(shared);
    HookCallbacks {
        on_down: Arc::new(move |event: KeyEvent| {
            if let Some(shared) = down.upgrade() {
                shared.on_key_down(event);
            }
        }),
        on_up: Arc::new(move |event: KeyEvent| {
            if let Some(shared) = up.upgrade() {
                shared.on_key_up(event);
            }
        }),
    }
}

impl Shared {
    pub(crate) fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Intercept only while a configured target device is active
    fn should_intercept(&self) -> bool {
        match self.config.target_device() {
            Some(device) => self.oracle.is_active(&device),
            None => false,
        }
    }

    fn on_key_down(self: &Arc<Self>, event: KeyEvent) {
        if !self.is_running() {
            return;
        }
        // The oracle may take a while; ask before taking the state lock
        if !self.should_intercept() {
            self.pass_through(event);
            return;
        }

        let mut state = self.state.lock();
        if !state.running || state.pressed_at.is_some() {
            return;
        }
        if event.direction == KeyDirection::Repeat {
            // Auto-repeat of a press that started before interception
            return;
        }
        state.pressed_at = Some(Instant::now());
    }

    fn on_key_up(self: &Arc<Self>, event: KeyEvent) {
        if !self.is_running() {
            return;
        }
        if !self.should_intercept() {
            self.pass_through(event);
            return;
        }

        let threshold = self.config.long_press_threshold();
        let window = self.config.multi_tap_window();

        let mut state = self.state.lock();
        if !state.running {
            return;
        }
        let Some(pressed_at) = state.pressed_at.take() else {
            return;
        };

        if is_long_press(pressed_at.elapsed(), threshold) {
            if let Some(timer) = state.debounce.take() {
                timer.cancel();
            }
            state.tap_count = 0;
            let commands = state.hook_tx.clone();
            drop(state);
            self.dispatch(Gesture::LongPress, commands);
            return;
        }

        state.tap_count += 1;
        if let Some(timer) = state.debounce.take() {
            timer.cancel();
        }
        let id = state.next_timer_id;
        state.next_timer_id += 1;

        let engine: Weak<Shared> = Arc::downgrade(self);
        let started = DebounceTimer::start(id, window, move |id| {
            if let Some(engine) = engine.upgrade() {
                engine.resolve_taps(id);
            }
        });
        match started {
            Ok(timer) => state.debounce = Some(timer),
            Err(e) => {
                log::error!("Failed to start debounce timer: {}", e);
                let count = mem::take(&mut state.tap_count);
                let commands = state.hook_tx.clone();
                drop(state);
                if let Some(gesture) = Gesture::from_tap_count(count) {
                    self.dispatch(gesture, commands);
                }
            }
        }
    }

    /// Timer callback: resolve the accumulated taps if `id` is still live
    fn resolve_taps(&self, id: u64) {
        let mut state = self.state.lock();
        if !state.running || state.debounce.as_ref().map(DebounceTimer::id) != Some(id) {
            return;
        }
        state.debounce = None;
        let count = mem::take(&mut state.tap_count);
        let commands = state.hook_tx.clone();
        drop(state);

        if let Some(gesture) = Gesture::from_tap_count(count) {
            self.dispatch(gesture, commands);
        }
    }

    fn dispatch(&self, gesture: Gesture, commands: Option<Sender<HookCommand>>) {
        let action = self.config.mapped_action(gesture);
        log::info!("Detected: {}", gesture.label());
        if let Some(commands) = commands {
            let _ = commands.send(HookCommand::Dispatch { gesture, action });
        }
    }

    fn pass_through(&self, event: KeyEvent) {
        let commands = self.state.lock().hook_tx.clone();
        log::debug!("Passing through {}", event);
        if let Some(commands) = commands {
            let _ = commands.send(HookCommand::PassThrough(event));
        }
    }
}
