//! Integration tests for the activation lifecycle against a simulated page.

use presence_sim::host::{KeyEvent, Modifiers, SimulatedElement, TargetElement};
use presence_sim::{
    Config, EngineError, Host, Orchestrator, RandomSource, SimulatedHost, TickTiming,
    WakeLockBehavior, PANIC_CHORD,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

/// Always types a single character and always waits the base interval.
struct CharsOnly;

impl RandomSource for CharsOnly {
    fn unit(&mut self) -> f64 {
        0.99
    }

    fn below(&mut self, _upper: usize) -> usize {
        0
    }
}

fn fixed_config() -> Config {
    Config {
        typing: TickTiming::from_millis(100, 0),
        capture: TickTiming::from_millis(500, 0),
        ..Config::default()
    }
}

fn engine_for(page: &SimulatedHost, config: Config) -> Orchestrator {
    Orchestrator::with_random(Host::from_shared(Arc::new(page.clone())), config, CharsOnly)
        .expect("engine inside a runtime")
}

fn setup(capacity: Option<usize>) -> (SimulatedHost, Arc<SimulatedElement>, Orchestrator) {
    let page = SimulatedHost::new(WakeLockBehavior::Grant);
    let field = page.create_text_field(capacity);
    let engine = engine_for(&page, fixed_config());
    (page, field, engine)
}

fn chord() -> KeyEvent {
    KeyEvent::new(
        PANIC_CHORD.key,
        Modifiers {
            ctrl: true,
            shift: true,
            ..Modifiers::default()
        },
    )
}

#[tokio::test(start_paused = true)]
async fn test_typing_wraps_at_capacity() {
    let (_page, field, engine) = setup(Some(10));
    engine.activate(field.clone());

    sleep(Duration::from_millis(1050)).await;
    assert_eq!(field.value(), "aaaaaaaaaa");

    // The tick that observes a full buffer only clears it
    sleep(Duration::from_millis(100)).await;
    assert_eq!(field.value(), "");

    sleep(Duration::from_millis(100)).await;
    assert_eq!(field.value().chars().count(), 1);
    assert!(field.lock_requests() >= 1);

    let stats = engine.activity_log().stats();
    assert_eq!(stats.characters_typed, 11);
    assert_eq!(stats.buffer_resets, 1);

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_caret_follows_the_tail() {
    let (_page, field, engine) = setup(None);
    engine.activate(field.clone());

    sleep(Duration::from_millis(350)).await;
    assert!(field.is_focused());
    assert_eq!(field.selection(), (3, 3));

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_activate_is_idempotent() {
    let (_page, field, engine) = setup(None);
    engine.activate(field.clone());
    let cycle = engine.current_cycle();
    engine.activate(field.clone());

    assert_eq!(engine.current_cycle(), cycle);
    assert_eq!(engine.activity_log().stats().activations, 1);
    assert_eq!(field.lock_requests(), 1);

    sleep(Duration::from_millis(1050)).await;
    assert_eq!(field.writes(), 10);

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_deactivate_tears_everything_down() {
    let (page, field, engine) = setup(None);
    engine.activate(field.clone());
    sleep(Duration::from_millis(350)).await;
    assert!(field.has_pointer_lock());
    assert_eq!(page.listener_count(), 2);

    engine.deactivate();
    engine.deactivate();
    assert!(!engine.is_active());
    assert!(engine.current_cycle().is_none());
    assert_eq!(engine.activity_log().stats().deactivations, 1);
    assert!(!field.has_pointer_lock());

    let writes = field.writes();
    let requests = field.lock_requests();
    let moves = field.pointer_moves();

    // Longer than the slowest tick
    sleep(Duration::from_secs(5)).await;
    page.move_pointer(3, 4);
    sleep(Duration::from_millis(10)).await;

    assert_eq!(field.writes(), writes);
    assert_eq!(field.lock_requests(), requests);
    assert_eq!(field.pointer_moves(), moves);
    assert_eq!(page.listener_count(), 0);

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_deactivate_exits_capture_held_elsewhere() {
    let (page, field, engine) = setup(None);
    let other = page.create_text_field(None);
    engine.activate(field.clone());
    sleep(Duration::from_millis(10)).await;

    other.request_pointer_lock();
    assert!(other.has_pointer_lock());

    engine.deactivate();
    assert_eq!(page.exit_pointer_lock_calls(), 1);
    assert!(!other.has_pointer_lock());
    assert!(!field.has_pointer_lock());

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_deactivate_while_inactive_is_a_noop() {
    let (page, _field, engine) = setup(None);
    engine.deactivate();
    assert!(!engine.is_active());
    assert_eq!(engine.activity_log().stats().deactivations, 0);
    assert_eq!(page.exit_pointer_lock_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_state_replays_to_late_subscribers() {
    let (_page, field, engine) = setup(None);
    engine.activate(field.clone());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let _sub = engine.subscribe_active(move |active| sink.lock().unwrap().push(*active));
    assert_eq!(*seen.lock().unwrap(), vec![true]);

    engine.deactivate();
    assert_eq!(*seen.lock().unwrap(), vec![true, false]);

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_panic_chord_deactivates() {
    let (page, field, engine) = setup(None);
    engine.activate(field.clone());
    sleep(Duration::from_millis(150)).await;

    page.press_key(chord()).await;
    assert!(!engine.is_active());
    assert!(!field.has_pointer_lock());

    let writes = field.writes();
    sleep(Duration::from_secs(3)).await;
    assert_eq!(field.writes(), writes);
    assert_eq!(page.listener_count(), 0);

    // Nothing to stop any more
    page.press_key(chord()).await;
    assert!(!engine.is_active());
    assert_eq!(engine.activity_log().stats().deactivations, 1);

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_chord_without_every_modifier_is_ignored() {
    let (page, field, engine) = setup(None);
    engine.activate(field.clone());

    page.press_key(KeyEvent::new(
        "X",
        Modifiers {
            ctrl: true,
            ..Modifiers::default()
        },
    ))
    .await;
    assert!(engine.is_active());

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_each_activation_gets_a_fresh_cycle() {
    let (page, field, engine) = setup(None);
    engine.activate(field.clone());
    let first = engine.current_cycle();
    page.press_key(chord()).await;
    assert!(!engine.is_active());

    engine.activate(field.clone());
    let second = engine.current_cycle();
    assert!(second.is_some());
    assert_ne!(first, second);

    // The old cycle's cancellation does not leak into the new one
    sleep(Duration::from_millis(250)).await;
    assert!(engine.is_active());
    assert_eq!(field.value(), "aa");

    page.press_key(chord()).await;
    assert!(!engine.is_active());

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_escape_is_intercepted_and_capture_restored() {
    let (page, field, engine) = setup(None);
    engine.activate(field.clone());
    sleep(Duration::from_millis(10)).await;

    let escape = KeyEvent::plain("Escape");
    page.press_key(escape.clone()).await;
    assert!(escape.default_prevented());
    assert!(field.has_pointer_lock());

    sleep(Duration::from_millis(90)).await;
    assert_eq!(field.lock_requests(), 2);

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_pointer_move_restores_lost_capture() {
    let (page, field, engine) = setup(None);
    engine.activate(field.clone());
    sleep(Duration::from_millis(10)).await;

    page.revoke_pointer_lock();
    assert!(!field.has_pointer_lock());

    page.move_pointer(1, 1);
    sleep(Duration::from_millis(1)).await;
    assert!(field.has_pointer_lock());
    assert_eq!(field.lock_requests(), 2);

    // Moving while captured does not re-request
    page.move_pointer(1, 1);
    sleep(Duration::from_millis(1)).await;
    assert_eq!(field.lock_requests(), 2);

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_timer_restores_capture_while_idle() {
    let (page, field, engine) = setup(None);
    engine.activate(field.clone());
    sleep(Duration::from_millis(10)).await;

    page.revoke_pointer_lock();
    sleep(Duration::from_millis(480)).await;
    assert!(!field.has_pointer_lock());
    assert_eq!(field.pointer_moves(), 0);

    sleep(Duration::from_millis(20)).await;
    assert!(field.has_pointer_lock());
    assert_eq!(field.pointer_moves(), 1);

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_headless_host_is_a_noop() {
    let page = SimulatedHost::without_dom();
    let field = page.create_text_field(Some(10));
    let engine = engine_for(&page, fixed_config());

    engine.activate(field.clone());
    assert!(engine.is_active());

    sleep(Duration::from_secs(3)).await;
    assert_eq!(field.writes(), 0);
    assert_eq!(field.lock_requests(), 0);
    assert_eq!(page.listener_count(), 0);
    assert!(!engine.is_wake_held());
    assert_eq!(page.media_created(), 0);

    engine.deactivate();
    assert!(!engine.is_active());
    assert_eq!(page.exit_pointer_lock_calls(), 0);

    engine.shutdown().await;
}

#[tokio::test]
async fn test_engine_rejects_invalid_config() {
    let page = SimulatedHost::new(WakeLockBehavior::Grant);
    let config = Config {
        typing: TickTiming::from_millis(0, 0),
        ..Config::default()
    };
    let result = Orchestrator::new(Host::from_shared(Arc::new(page)), config);
    assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
}

#[test]
fn test_engine_requires_a_runtime() {
    let page = SimulatedHost::new(WakeLockBehavior::Grant);
    let result = Orchestrator::new(Host::from_shared(Arc::new(page)), Config::default());
    assert!(result.is_err());
}
