//! Integration tests for wake maintenance against a simulated page.

use async_trait::async_trait;
use presence_sim::engine::PULSE_KEY;
use presence_sim::host::{
    MediaKind, ReleaseHandler, SyntheticEvent, WakeLockApi, WakeLockSentinel,
};
use presence_sim::{
    Config, Host, HostError, Orchestrator, RandomSource, SimulatedHost, TickTiming,
    WakeLockBehavior, WakeStrategy,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

struct Quiet;

impl RandomSource for Quiet {
    fn unit(&mut self) -> f64 {
        0.99
    }

    fn below(&mut self, _upper: usize) -> usize {
        0
    }
}

fn engine_for(page: &SimulatedHost, keep_awake: bool) -> Orchestrator {
    let config = Config {
        typing: TickTiming::from_millis(100, 0),
        capture: TickTiming::from_millis(500, 0),
        keep_awake,
        ..Config::default()
    };
    Orchestrator::with_random(Host::from_shared(Arc::new(page.clone())), config, Quiet)
        .expect("engine inside a runtime")
}

/// Wake lock API whose release notifications arrive only when the test says so.
#[derive(Clone, Default)]
struct DeferredLocks {
    handlers: Arc<Mutex<Vec<Option<ReleaseHandler>>>>,
}

impl DeferredLocks {
    fn fire(&self, index: usize) {
        let handler = self.handlers.lock().unwrap()[index].take();
        if let Some(handler) = handler {
            handler();
        }
    }
}

struct DeferredSentinel {
    index: usize,
    handlers: Arc<Mutex<Vec<Option<ReleaseHandler>>>>,
}

#[async_trait]
impl WakeLockSentinel for DeferredSentinel {
    fn on_release(&self, handler: ReleaseHandler) {
        self.handlers.lock().unwrap()[self.index] = Some(handler);
    }

    async fn release(&self) -> Result<(), HostError> {
        Ok(())
    }
}

#[async_trait]
impl WakeLockApi for DeferredLocks {
    fn is_supported(&self) -> bool {
        true
    }

    async fn request_screen(&self) -> Result<Box<dyn WakeLockSentinel>, HostError> {
        let mut handlers = self.handlers.lock().unwrap();
        handlers.push(None);
        Ok(Box::new(DeferredSentinel {
            index: handlers.len() - 1,
            handlers: self.handlers.clone(),
        }))
    }
}

fn pulses(page: &SimulatedHost) -> usize {
    page.dispatched()
        .iter()
        .filter(|e| matches!(e, SyntheticEvent::KeyDown { key } if key == PULSE_KEY))
        .count()
}

#[tokio::test(start_paused = true)]
async fn test_native_lock_allocates_no_decoys() {
    let page = SimulatedHost::new(WakeLockBehavior::Grant);
    let field = page.create_text_field(None);
    let engine = engine_for(&page, true);

    engine.activate(field);
    sleep(Duration::from_millis(1)).await;
    assert!(engine.is_wake_held());
    assert_eq!(page.held_wake_locks(), 1);
    assert_eq!(page.media_created(), 0);

    sleep(Duration::from_secs(61)).await;
    assert_eq!(pulses(&page), 0);

    engine.deactivate();
    sleep(Duration::from_millis(1)).await;
    assert!(!engine.is_wake_held());
    assert_eq!(page.held_wake_locks(), 0);
    assert_eq!(page.wake_releases(), 1);

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_rejected_lock_starts_fallback() {
    let page = SimulatedHost::new(WakeLockBehavior::Reject);
    let field = page.create_text_field(None);
    let engine = engine_for(&page, true);

    engine.activate(field);
    sleep(Duration::from_millis(1)).await;
    assert!(engine.is_wake_held());
    assert_eq!(page.wake_requests(), 1);
    assert_eq!(page.attached_media(), vec![MediaKind::Video, MediaKind::Audio]);
    assert_eq!(page.playing_media(), 2);

    sleep(Duration::from_secs(60)).await;
    assert_eq!(pulses(&page), 1);
    assert!(page
        .dispatched()
        .iter()
        .any(|e| matches!(e, SyntheticEvent::PointerMove { .. })));

    engine.deactivate();
    sleep(Duration::from_millis(1)).await;
    assert!(!engine.is_wake_held());
    assert!(page.attached_media().is_empty());
    assert_eq!(page.wake_releases(), 0);

    let dispatched = page.dispatched().len();
    sleep(Duration::from_secs(120)).await;
    assert_eq!(page.dispatched().len(), dispatched);

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_api_goes_straight_to_fallback() {
    let page = SimulatedHost::new(WakeLockBehavior::Unsupported);
    let engine = engine_for(&page, false);

    assert_eq!(engine.request_wake_lock().await, WakeStrategy::Fallback);
    assert_eq!(page.wake_requests(), 0);
    assert_eq!(page.attached_media().len(), 2);
    assert!(engine.is_wake_held());

    engine.release_wake_lock().await;
    assert!(page.attached_media().is_empty());
    assert!(!engine.is_wake_held());
}

#[tokio::test(start_paused = true)]
async fn test_repeated_requests_allocate_once() {
    let page = SimulatedHost::new(WakeLockBehavior::Reject);
    let engine = engine_for(&page, false);

    assert_eq!(engine.request_wake_lock().await, WakeStrategy::Fallback);
    assert_eq!(engine.request_wake_lock().await, WakeStrategy::Fallback);
    assert_eq!(page.media_created(), 2);
    assert_eq!(page.wake_requests(), 1);

    sleep(Duration::from_secs(61)).await;
    assert_eq!(pulses(&page), 1);

    engine.release_wake_lock().await;
}

#[tokio::test(start_paused = true)]
async fn test_revoked_lock_clears_state_and_can_be_reacquired() {
    let page = SimulatedHost::new(WakeLockBehavior::Grant);
    let engine = engine_for(&page, false);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let _sub = engine.subscribe_wake(move |held| sink.lock().unwrap().push(*held));

    assert_eq!(engine.request_wake_lock().await, WakeStrategy::Native);
    page.revoke_wake_locks();
    assert!(!engine.is_wake_held());
    assert_eq!(*seen.lock().unwrap(), vec![false, true, false]);

    assert_eq!(engine.request_wake_lock().await, WakeStrategy::Native);
    assert_eq!(page.wake_requests(), 2);
    assert!(engine.is_wake_held());

    engine.release_wake_lock().await;
}

#[tokio::test(start_paused = true)]
async fn test_release_failures_still_clear_state() {
    let page = SimulatedHost::new(WakeLockBehavior::Grant);
    let engine = engine_for(&page, false);
    engine.request_wake_lock().await;

    page.set_release_failure(true);
    engine.release_wake_lock().await;
    assert!(!engine.is_wake_held());

    page.set_wake_behavior(WakeLockBehavior::Reject);
    page.set_detach_failure(true);
    assert_eq!(engine.request_wake_lock().await, WakeStrategy::Fallback);

    engine.release_wake_lock().await;
    assert!(!engine.is_wake_held());
    // Both decoys are silenced even though neither could be detached
    assert_eq!(page.playing_media(), 0);
    let dispatched = page.dispatched().len();
    sleep(Duration::from_secs(120)).await;
    assert_eq!(page.dispatched().len(), dispatched);
}

#[tokio::test(start_paused = true)]
async fn test_release_when_nothing_held_is_a_noop() {
    let page = SimulatedHost::new(WakeLockBehavior::Grant);
    let engine = engine_for(&page, false);

    engine.release_wake_lock().await;
    assert!(!engine.is_wake_held());
    assert_eq!(page.wake_releases(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_headless_wake_is_unavailable() {
    let page = SimulatedHost::without_dom();
    let engine = engine_for(&page, false);

    assert_eq!(engine.request_wake_lock().await, WakeStrategy::Unavailable);
    assert!(!engine.is_wake_held());
    engine.release_wake_lock().await;
}

#[tokio::test(start_paused = true)]
async fn test_keep_awake_disabled_never_requests() {
    let page = SimulatedHost::new(WakeLockBehavior::Grant);
    let field = page.create_text_field(None);
    let engine = engine_for(&page, false);

    engine.activate(field);
    sleep(Duration::from_millis(10)).await;
    assert!(engine.is_active());
    assert!(!engine.is_wake_held());
    assert_eq!(page.wake_requests(), 0);

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_releases_everything() {
    let page = SimulatedHost::new(WakeLockBehavior::Reject);
    let field = page.create_text_field(None);
    let engine = engine_for(&page, true);

    engine.activate(field.clone());
    sleep(Duration::from_millis(250)).await;
    assert!(engine.is_wake_held());

    engine.shutdown().await;
    assert!(!engine.is_active());
    assert!(!engine.is_wake_held());
    assert!(page.attached_media().is_empty());
    assert!(!field.has_pointer_lock());

    sleep(Duration::from_millis(10)).await;
    assert_eq!(page.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_late_release_of_an_old_lock_keeps_the_new_one_held() {
    let page = SimulatedHost::new(WakeLockBehavior::Grant);
    let locks = DeferredLocks::default();
    let host = Host {
        platform: Arc::new(page.clone()),
        document: Arc::new(page.clone()),
        wake_lock: Arc::new(locks.clone()),
    };
    let config = Config {
        keep_awake: false,
        ..Config::default()
    };
    let engine = Orchestrator::with_random(host, config, Quiet).unwrap();

    assert_eq!(engine.request_wake_lock().await, WakeStrategy::Native);
    engine.release_wake_lock().await;
    assert_eq!(engine.request_wake_lock().await, WakeStrategy::Native);
    assert!(engine.is_wake_held());

    // The first lock's release event shows up only now
    locks.fire(0);
    assert!(engine.is_wake_held());
    assert_eq!(engine.request_wake_lock().await, WakeStrategy::Native);
    assert!(engine.is_wake_held());

    // Revoking the current lock still clears the state
    locks.fire(1);
    assert!(!engine.is_wake_held());
}

#[tokio::test(start_paused = true)]
async fn test_dropping_the_engine_stops_the_fallback_tier() {
    let page = SimulatedHost::new(WakeLockBehavior::Reject);
    let field = page.create_text_field(None);
    let engine = engine_for(&page, true);

    engine.activate(field);
    sleep(Duration::from_millis(1)).await;
    assert_eq!(page.attached_media().len(), 2);

    drop(engine);
    sleep(Duration::from_secs(181)).await;
    assert!(page.attached_media().is_empty());
    assert_eq!(pulses(&page), 0);
    assert_eq!(page.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_the_engine_after_a_direct_request_stops_decoys() {
    let page = SimulatedHost::new(WakeLockBehavior::Unsupported);
    let engine = engine_for(&page, false);
    assert_eq!(engine.request_wake_lock().await, WakeStrategy::Fallback);

    drop(engine);
    assert!(page.attached_media().is_empty());
    assert_eq!(page.playing_media(), 0);

    sleep(Duration::from_secs(121)).await;
    assert_eq!(pulses(&page), 0);
}
