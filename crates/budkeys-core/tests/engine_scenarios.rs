// Budkeys Engine Scenarios
//
// Drive the gesture engine end to end through recording fakes of the hook,
// device oracle, configuration and dispatcher, with real timers.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use budkeys_core::{
    ActionDispatcher, ConfigStore, ConnectivityOracle, DispatchError, DispatchResult,
    EngineError, Gesture, GestureEngine, HookCallbacks, HookError, HookHandle, HookResult,
    InputHook, Key, KeyDirection, KeyEvent,
};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

// =========================================================================
// Fakes
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HookCall {
    Install(Key),
    Uninstall,
    Reemit(Key, KeyDirection),
}

#[derive(Default)]
struct HookRecorder {
    calls: Mutex<Vec<HookCall>>,
    callbacks: Mutex<Option<HookCallbacks>>,
}

impl HookRecorder {
    fn calls(&self) -> Vec<HookCall> {
        self.calls.lock().clone()
    }

    fn reemitted(&self) -> Vec<(Key, KeyDirection)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HookCall::Reemit(key, direction) => Some((key, direction)),
                _ => None,
            })
            .collect()
    }

    /// Deliver an event the way the OS hook would
    fn send(&self, key: Key, direction: KeyDirection) {
        let callbacks = self.callbacks.lock().clone();
        if let Some(callbacks) = callbacks {
            callbacks.deliver(KeyEvent::new(key, direction));
        }
    }
}

struct FakeHook {
    recorder: Arc<HookRecorder>,
    rejected: Vec<Key>,
    next_id: u64,
}

impl InputHook for FakeHook {
    fn install(
        &mut self,
        key: Key,
        callbacks: HookCallbacks,
        suppress: bool,
    ) -> HookResult<HookHandle> {
        assert!(suppress, "engine hooks must suppress");
        if self.rejected.contains(&key) {
            return Err(HookError::Install("permission denied".to_string()));
        }
        self.recorder.calls.lock().push(HookCall::Install(key));
        *self.recorder.callbacks.lock() = Some(callbacks);
        self.next_id += 1;
        Ok(HookHandle::new(self.next_id))
    }

    fn uninstall(&mut self, _handle: HookHandle) -> HookResult<()> {
        self.recorder.calls.lock().push(HookCall::Uninstall);
        Ok(())
    }

    fn reemit(&mut self, key: Key, direction: KeyDirection) -> HookResult<()> {
        self.recorder.calls.lock().push(HookCall::Reemit(key, direction));
        Ok(())
    }
}

#[derive(Default)]
struct SwitchOracle {
    active: AtomicBool,
    queries: AtomicUsize,
}

impl ConnectivityOracle for SwitchOracle {
    fn is_active(&self, _device: &str) -> bool {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.active.load(Ordering::SeqCst)
    }
}

struct TestConfig {
    target: Option<String>,
    window: Duration,
    threshold: Duration,
    keys: Vec<Key>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            target: Some("Galaxy Buds Pro".to_string()),
            window: Duration::from_millis(150),
            threshold: Duration::from_millis(300),
            keys: vec![Key::PLAYPAUSE, Key::PLAYCD],
        }
    }
}

impl ConfigStore for TestConfig {
    fn mapped_action(&self, gesture: Gesture) -> String {
        match gesture {
            Gesture::SingleTap => "play_pause",
            Gesture::DoubleTap => "next_track",
            Gesture::TripleTap => "previous_track",
            Gesture::LongPress => "lock_screen",
        }
        .to_string()
    }

    fn target_device(&self) -> Option<String> {
        self.target.clone()
    }

    fn multi_tap_window(&self) -> Duration {
        self.window
    }

    fn long_press_threshold(&self) -> Duration {
        self.threshold
    }

    fn monitored_keys(&self) -> Vec<Key> {
        self.keys.clone()
    }
}

struct RecordingDispatcher {
    actions: Sender<String>,
    fail: bool,
}

impl ActionDispatcher for RecordingDispatcher {
    fn dispatch(&self, action: &str) -> DispatchResult<()> {
        let _ = self.actions.send(action.to_string());
        if self.fail {
            return Err(DispatchError::Execution {
                action: action.to_string(),
                reason: "helper crashed".to_string(),
            });
        }
        Ok(())
    }
}

// =========================================================================
// Test Helpers
// =========================================================================

const TAP_HOLD: Duration = Duration::from_millis(10);
const SETTLE: Duration = Duration::from_secs(2);

struct Harness {
    engine: GestureEngine,
    recorder: Arc<HookRecorder>,
    oracle: Arc<SwitchOracle>,
    actions: Receiver<String>,
}

struct Options {
    config: TestConfig,
    active: bool,
    rejected: Vec<Key>,
    failing_dispatcher: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            config: TestConfig::default(),
            active: true,
            rejected: Vec::new(),
            failing_dispatcher: false,
        }
    }
}

fn harness(options: Options) -> Harness {
    let recorder = Arc::new(HookRecorder::default());
    let oracle = Arc::new(SwitchOracle::default());
    oracle.active.store(options.active, Ordering::SeqCst);
    let (tx, actions) = crossbeam_channel::unbounded();

    let hook = FakeHook {
        recorder: Arc::clone(&recorder),
        rejected: options.rejected,
        next_id: 0,
    };
    let engine = GestureEngine::new(
        Box::new(hook),
        Arc::new(options.config),
        oracle.clone(),
        Arc::new(RecordingDispatcher {
            actions: tx,
            fail: options.failing_dispatcher,
        }),
    );
    Harness {
        engine,
        recorder,
        oracle,
        actions,
    }
}

fn started(options: Options) -> Harness {
    let h = harness(options);
    h.engine.start().expect("engine should start");
    h
}

impl Harness {
    fn press(&self, hold: Duration) {
        self.recorder.send(Key::PLAYPAUSE, KeyDirection::Down);
        thread::sleep(hold);
        self.recorder.send(Key::PLAYPAUSE, KeyDirection::Up);
    }

    fn tap(&self) {
        self.press(TAP_HOLD);
    }

    fn next_action(&self) -> Option<String> {
        self.actions.recv_timeout(SETTLE).ok()
    }

    fn no_action_within(&self, wait: Duration) -> bool {
        self.actions.recv_timeout(wait).is_err()
    }
}

fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + SETTLE;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

// =========================================================================
// Tap Sequences
// =========================================================================

#[test]
fn test_single_tap() {
    let h = started(Options::default());
    h.tap();
    assert_eq!(h.next_action().as_deref(), Some("play_pause"));
    assert!(h.no_action_within(Duration::from_millis(300)));
}

#[test]
fn test_double_tap() {
    let h = started(Options::default());
    h.tap();
    thread::sleep(Duration::from_millis(30));
    h.tap();
    assert_eq!(h.next_action().as_deref(), Some("next_track"));
    assert!(h.no_action_within(Duration::from_millis(300)));
}

#[test]
fn test_many_taps_cap_at_triple() {
    let h = started(Options::default());
    for _ in 0..5 {
        h.tap();
        thread::sleep(Duration::from_millis(30));
    }
    assert_eq!(h.next_action().as_deref(), Some("previous_track"));
    assert!(h.no_action_within(Duration::from_millis(300)));
}

#[test]
fn test_triple_tap_resolves_after_window() {
    let config = TestConfig {
        window: Duration::from_millis(400),
        threshold: Duration::from_millis(500),
        ..Default::default()
    };
    let h = started(Options {
        config,
        ..Default::default()
    });

    // Taps at t=0, t=100 and t=250
    let start = Instant::now();
    h.tap();
    thread::sleep(Duration::from_millis(100).saturating_sub(start.elapsed()));
    h.tap();
    thread::sleep(Duration::from_millis(250).saturating_sub(start.elapsed()));
    h.tap();

    assert_eq!(h.next_action().as_deref(), Some("previous_track"));
    assert!(start.elapsed() >= Duration::from_millis(600));
    assert!(h.no_action_within(Duration::from_millis(300)));
}

#[test]
fn test_taps_outside_window_resolve_separately() {
    let config = TestConfig {
        window: Duration::from_millis(100),
        ..Default::default()
    };
    let h = started(Options {
        config,
        ..Default::default()
    });

    h.tap();
    thread::sleep(Duration::from_millis(400));
    h.tap();

    assert_eq!(h.next_action().as_deref(), Some("play_pause"));
    assert_eq!(h.next_action().as_deref(), Some("play_pause"));
    assert!(h.no_action_within(Duration::from_millis(300)));
}

// =========================================================================
// Long Press
// =========================================================================

#[test]
fn test_long_press() {
    let config = TestConfig {
        window: Duration::from_millis(400),
        threshold: Duration::from_millis(500),
        ..Default::default()
    };
    let h = started(Options {
        config,
        ..Default::default()
    });

    h.recorder.send(Key::PLAYPAUSE, KeyDirection::Down);
    thread::sleep(Duration::from_millis(600));
    let released = Instant::now();
    h.recorder.send(Key::PLAYPAUSE, KeyDirection::Up);

    let snapshot = h.engine.snapshot();
    assert!(!snapshot.timer_pending);
    assert_eq!(snapshot.tap_count, 0);

    assert_eq!(h.next_action().as_deref(), Some("lock_screen"));
    assert!(released.elapsed() < Duration::from_millis(400));
    assert!(h.no_action_within(Duration::from_millis(500)));
}

#[test]
fn test_long_press_discards_pending_taps() {
    let config = TestConfig {
        window: Duration::from_millis(400),
        threshold: Duration::from_millis(100),
        ..Default::default()
    };
    let h = started(Options {
        config,
        ..Default::default()
    });

    h.tap();
    assert_eq!(h.engine.snapshot().tap_count, 1);
    h.press(Duration::from_millis(150));

    assert_eq!(h.next_action().as_deref(), Some("lock_screen"));
    assert!(h.no_action_within(Duration::from_millis(600)));

    // The next tap starts a fresh sequence
    h.tap();
    assert_eq!(h.next_action().as_deref(), Some("play_pause"));
}

#[test]
fn test_held_key_repeat_is_not_a_tap() {
    let h = started(Options::default());
    h.recorder.send(Key::PLAYPAUSE, KeyDirection::Down);
    h.recorder.send(Key::PLAYPAUSE, KeyDirection::Repeat);
    h.recorder.send(Key::PLAYPAUSE, KeyDirection::Repeat);
    h.recorder.send(Key::PLAYPAUSE, KeyDirection::Up);

    assert_eq!(h.next_action().as_deref(), Some("play_pause"));
    assert!(h.no_action_within(Duration::from_millis(300)));
}

// =========================================================================
// Pass-through
// =========================================================================

#[test]
fn test_inactive_device_passes_through() {
    let h = started(Options {
        active: false,
        ..Default::default()
    });

    h.tap();
    assert!(wait_for(|| h.recorder.reemitted().len() == 2));
    assert_eq!(
        h.recorder.reemitted(),
        vec![
            (Key::PLAYPAUSE, KeyDirection::Down),
            (Key::PLAYPAUSE, KeyDirection::Up),
        ]
    );
    assert!(h.no_action_within(Duration::from_millis(500)));
}

#[test]
fn test_pass_through_reinstalls_around_reemit() {
    let h = started(Options {
        active: false,
        ..Default::default()
    });

    h.recorder.send(Key::PLAYPAUSE, KeyDirection::Down);
    assert!(wait_for(|| h.recorder.calls().len() == 4));
    assert_eq!(
        h.recorder.calls(),
        vec![
            HookCall::Install(Key::PLAYPAUSE),
            HookCall::Uninstall,
            HookCall::Reemit(Key::PLAYPAUSE, KeyDirection::Down),
            HookCall::Install(Key::PLAYPAUSE),
        ]
    );
}

#[test]
fn test_no_target_device_never_intercepts() {
    let config = TestConfig {
        target: None,
        ..Default::default()
    };
    let h = started(Options {
        config,
        ..Default::default()
    });

    h.tap();
    h.press(Duration::from_millis(400));
    assert!(wait_for(|| h.recorder.reemitted().len() == 4));
    assert!(h.no_action_within(Duration::from_millis(400)));
    assert_eq!(h.oracle.queries.load(Ordering::SeqCst), 0);
}

#[test]
fn test_repeat_passes_through_as_repeat() {
    let h = started(Options {
        active: false,
        ..Default::default()
    });

    h.recorder.send(Key::PLAYPAUSE, KeyDirection::Repeat);
    assert!(wait_for(|| !h.recorder.reemitted().is_empty()));
    assert_eq!(
        h.recorder.reemitted(),
        vec![(Key::PLAYPAUSE, KeyDirection::Repeat)]
    );
}

#[test]
fn test_device_connecting_enables_interception() {
    let h = started(Options {
        active: false,
        ..Default::default()
    });

    h.tap();
    assert!(wait_for(|| h.recorder.reemitted().len() == 2));

    h.oracle.active.store(true, Ordering::SeqCst);
    h.tap();
    assert_eq!(h.next_action().as_deref(), Some("play_pause"));
    assert_eq!(h.recorder.reemitted().len(), 2);
}

// =========================================================================
// Lifecycle
// =========================================================================

#[test]
fn test_stop_twice() {
    let h = started(Options::default());
    h.tap();
    assert!(h.engine.snapshot().timer_pending);

    h.engine.stop();
    h.engine.stop();

    assert!(!h.engine.is_running());
    assert!(!h.engine.snapshot().timer_pending);
    assert_eq!(h.recorder.calls().last(), Some(&HookCall::Uninstall));
    assert!(h.no_action_within(Duration::from_millis(400)));
}

#[test]
fn test_events_after_stop_are_ignored() {
    let h = started(Options::default());
    h.engine.stop();
    let calls = h.recorder.calls();

    h.tap();
    assert!(h.no_action_within(Duration::from_millis(300)));
    assert_eq!(h.recorder.calls(), calls);
}

#[test]
fn test_install_failure_leaves_engine_stopped() {
    let h = harness(Options {
        rejected: vec![Key::PLAYPAUSE, Key::PLAYCD],
        ..Default::default()
    });

    let err = h.engine.start().unwrap_err();
    assert!(matches!(err, EngineError::HookInstall(_)));
    assert!(!h.engine.is_running());
    assert!(h.recorder.calls().is_empty());

    // The hook is handed back, so a later start reports the same failure
    assert!(matches!(
        h.engine.start(),
        Err(EngineError::HookInstall(_))
    ));
}

#[test]
fn test_no_monitored_keys_fails_start() {
    let config = TestConfig {
        keys: Vec::new(),
        ..Default::default()
    };
    let h = harness(Options {
        config,
        ..Default::default()
    });
    assert!(matches!(
        h.engine.start(),
        Err(EngineError::HookInstall(HookError::Install(_)))
    ));
}

#[test]
fn test_fallback_key_is_used() {
    let h = started(Options {
        active: false,
        rejected: vec![Key::PLAYPAUSE],
        ..Default::default()
    });
    assert_eq!(h.recorder.calls(), vec![HookCall::Install(Key::PLAYCD)]);

    h.recorder.send(Key::PLAYCD, KeyDirection::Down);
    assert!(wait_for(|| h.recorder.calls().len() == 4));
    assert_eq!(h.recorder.calls()[3], HookCall::Install(Key::PLAYCD));
}

#[test]
fn test_start_is_idempotent() {
    let h = started(Options::default());
    h.engine.start().unwrap();
    assert_eq!(h.recorder.calls(), vec![HookCall::Install(Key::PLAYPAUSE)]);
}

#[test]
fn test_restart_after_stop() {
    let h = started(Options::default());
    h.engine.stop();
    h.engine.start().unwrap();
    h.tap();
    assert_eq!(h.next_action().as_deref(), Some("play_pause"));
}

#[test]
fn test_drop_uninstalls_hook() {
    let h = started(Options::default());
    let recorder = Arc::clone(&h.recorder);
    drop(h);
    assert_eq!(recorder.calls().last(), Some(&HookCall::Uninstall));
}

// =========================================================================
// Dispatch Failures
// =========================================================================

#[test]
fn test_failing_action_does_not_stop_engine() {
    let config = TestConfig {
        window: Duration::from_millis(50),
        ..Default::default()
    };
    let h = started(Options {
        config,
        failing_dispatcher: true,
        ..Default::default()
    });

    h.tap();
    assert_eq!(h.next_action().as_deref(), Some("play_pause"));
    assert!(wait_for(|| !h.engine.snapshot().timer_pending));
    assert_eq!(h.engine.snapshot().tap_count, 0);

    h.tap();
    thread::sleep(Duration::from_millis(10));
    h.tap();
    assert_eq!(h.next_action().as_deref(), Some("next_track"));
    assert!(h.engine.is_running());
}
