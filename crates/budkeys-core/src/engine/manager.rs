// Budkeys Hook Manager
// Single thread that owns the input hook and serializes every use of it

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use super::Shared;
use crate::dispatch::ActionDispatcher;
use crate::hook::{HookCallbacks, HookError, HookHandle, HookResult, InputHook, KeyEvent};
use crate::{Gesture, Key};

/// Work queued for the hook manager
pub(crate) enum HookCommand {
    /// Hook the first key the backend accepts; reply with that key
    Install {
        keys: Vec<Key>,
        reply: Sender<HookResult<Key>>,
    },
    /// Put a suppressed event back: uninstall, re-emit, reinstall
    PassThrough(KeyEvent),
    /// Run the action a gesture resolved to
    Dispatch { gesture: Gesture, action: String },
    /// Uninstall everything and hand the hook back
    Shutdown,
}

pub(crate) struct HookManager {
    hook: Box<dyn InputHook>,
    callbacks: HookCallbacks,
    dispatcher: Arc<dyn ActionDispatcher>,
    shared: Arc<Shared>,
    key: Option<Key>,
    handles: Vec<HookHandle>,
}

impl HookManager {
    pub(crate) fn new(
        hook: Box<dyn InputHook>,
        callbacks: HookCallbacks,
        dispatcher: Arc<dyn ActionDispatcher>,
        shared: Arc<Shared>,
    ) -> Self {
        Self {
            hook,
            callbacks,
            dispatcher,
            shared,
            key: None,
            handles: Vec::new(),
        }
    }

    /// Process commands until shutdown, then return the hook backend
    pub(crate) fn run(mut self, commands: Receiver<HookCommand>) -> Box<dyn InputHook> {
        for command in commands.iter() {
            match command {
                HookCommand::Install { keys, reply } => {
                    let _ = reply.send(self.install(&keys));
                }
                HookCommand::PassThrough(event) => self.pass_through(event),
                HookCommand::Dispatch { gesture, action } => self.dispatch(gesture, &action),
                HookCommand::Shutdown => break,
            }
        }

        self.uninstall_all();
        self.key = None;
        log::debug!("Hook manager stopped");
        self.hook
    }

    fn install(&mut self, keys: &[Key]) -> HookResult<Key> {
        if let Some(key) = self.key {
            return Ok(key);
        }

        let mut last_error = None;
        for &key in keys {
            match self.hook.install(key, self.callbacks.clone(), true) {
                Ok(handle) => {
                    self.handles.push(handle);
                    self.key = Some(key);
                    return Ok(key);
                }
                Err(e) => {
                    log::warn!("Could not hook {}: {}", key, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| HookError::Install("no monitored keys configured".to_string())))
    }

    fn pass_through(&mut self, event: KeyEvent) {
        let Some(key) = self.key else {
            return;
        };

        // Our own hook must not capture the synthetic event
        self.uninstall_all();

        if let Err(e) = self.hook.reemit(event.key, event.direction) {
            log::warn!("Dropped {}: {}", event, e);
        }

        match self.hook.install(key, self.callbacks.clone(), true) {
            Ok(handle) => self.handles.push(handle),
            Err(e) => log::error!("Failed to reinstall hook on {}: {}", key, e),
        }
    }

    fn dispatch(&self, gesture: Gesture, action: &str) {
        if !self.shared.is_running() {
            log::debug!("Engine stopped, dropping {}", gesture.label());
            return;
        }
        match self.dispatcher.dispatch(action) {
            Ok(()) => log::debug!("{} -> {}", gesture.label(), action),
            Err(e) => log::error!("{} action '{}' failed: {}", gesture.label(), action, e),
        }
    }

    fn uninstall_all(&mut self) {
        for handle in self.handles.drain(..) {
            if let Err(e) = self.hook.uninstall(handle) {
                log::warn!("{}", e);
            }
        }
    }
}
