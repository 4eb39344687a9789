//! In-memory document used by the CLI, the demo and the tests.
//!
//! It models only what the engine observes: one pointer-capture holder,
//! a broadcast stream of raw input, attached media elements, dispatched
//! synthetic events and a screen wake lock whose behavior can be chosen.

use super::types::{
    ElementId, HostError, InputEvent, KeyEvent, MediaKind, MediaSpec, SyntheticEvent,
};
use super::{
    Document, MediaElement, Platform, ReleaseHandler, TargetElement, WakeLockApi,
    WakeLockSentinel,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

/// How the simulated wake lock API answers requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeLockBehavior {
    /// Requests succeed
    Grant,
    /// The API exists but requests are rejected
    Reject,
    /// The API is absent
    Unsupported,
}

#[derive(Default)]
struct DocumentState {
    lock_holder: Option<ElementId>,
    exit_calls: usize,
    dispatched: Vec<SyntheticEvent>,
    media: Vec<Arc<MediaRecord>>,
    media_created: usize,
    sentinels: Vec<Arc<SentinelState>>,
    wake_requests: usize,
    wake_releases: usize,
}

struct Inner {
    has_dom: bool,
    viewport: (u32, u32),
    wake_behavior: Mutex<WakeLockBehavior>,
    fail_release: AtomicBool,
    fail_detach: AtomicBool,
    next_id: AtomicU64,
    input: broadcast::Sender<InputEvent>,
    doc: Mutex<DocumentState>,
}

impl Inner {
    fn doc(&self) -> MutexGuard<'_, DocumentState> {
        self.doc.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// A simulated browser document.
#[derive(Clone)]
pub struct SimulatedHost {
    inner: Arc<Inner>,
}

impl SimulatedHost {
    /// Create a document with the given wake lock behavior.
    pub fn new(wake_behavior: WakeLockBehavior) -> Self {
        Self::build(true, wake_behavior)
    }

    /// Create a document that reports no DOM, as a server-side render would.
    pub fn without_dom() -> Self {
        Self::build(false, WakeLockBehavior::Unsupported)
    }

    fn build(has_dom: bool, wake_behavior: WakeLockBehavior) -> Self {
        let (input, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(Inner {
                has_dom,
                viewport: (1280, 720),
                wake_behavior: Mutex::new(wake_behavior),
                fail_release: AtomicBool::new(false),
                fail_detach: AtomicBool::new(false),
                next_id: AtomicU64::new(1),
                input,
                doc: Mutex::new(DocumentState::default()),
            }),
        }
    }

    /// Create a text field attached to this document.
    pub fn create_text_field(&self, max_length: Option<usize>) -> Arc<SimulatedElement> {
        Arc::new(SimulatedElement {
            id: ElementId(self.inner.next_id()),
            max_length,
            value: Mutex::new(String::new()),
            selection: Mutex::new((0, 0)),
            focused: AtomicBool::new(false),
            lock_requests: AtomicUsize::new(0),
            pointer_moves: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            host: self.inner.clone(),
        })
    }

    pub fn set_wake_behavior(&self, behavior: WakeLockBehavior) {
        *self
            .inner
            .wake_behavior
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = behavior;
    }

    /// Make subsequent wake lock releases fail.
    pub fn set_release_failure(&self, fail: bool) {
        self.inner.fail_release.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent media detaches fail.
    pub fn set_detach_failure(&self, fail: bool) {
        self.inner.fail_detach.store(fail, Ordering::SeqCst);
    }

    /// Simulate the user (or OS) moving the pointer.
    pub fn move_pointer(&self, dx: i32, dy: i32) {
        let _ = self.inner.input.send(InputEvent::PointerMove { dx, dy });
    }

    /// Simulate a keydown and then apply the host's default action.
    ///
    /// Listeners get a chance to run before the default action is decided,
    /// which mirrors synchronous DOM dispatch on a current-thread runtime.
    pub async fn press_key(&self, event: KeyEvent) {
        let _ = self.inner.input.send(InputEvent::KeyDown(event.clone()));
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        if event.key == "Escape" && !event.default_prevented() {
            self.inner.doc().lock_holder = None;
        }
    }

    /// Drop pointer capture as the browser would when the window loses focus.
    pub fn revoke_pointer_lock(&self) {
        self.inner.doc().lock_holder = None;
    }

    /// Revoke every held wake lock out-of-band, as on a visibility change.
    pub fn revoke_wake_locks(&self) {
        let sentinels = std::mem::take(&mut self.inner.doc().sentinels);
        for sentinel in sentinels {
            sentinel.mark_released();
        }
    }

    /// Number of registered raw-input listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.input.receiver_count()
    }

    pub fn dispatched(&self) -> Vec<SyntheticEvent> {
        self.inner.doc().dispatched.clone()
    }

    /// Kinds of media elements still attached to the document.
    pub fn attached_media(&self) -> Vec<MediaKind> {
        self.inner.doc().media.iter().map(|m| m.kind).collect()
    }

    /// Attached media elements that are currently playing.
    pub fn playing_media(&self) -> usize {
        self.inner
            .doc()
            .media
            .iter()
            .filter(|m| m.playing.load(Ordering::SeqCst))
            .count()
    }

    pub fn media_created(&self) -> usize {
        self.inner.doc().media_created
    }

    /// Wake locks currently held and not released.
    pub fn held_wake_locks(&self) -> usize {
        self.inner.doc().sentinels.len()
    }

    pub fn wake_requests(&self) -> usize {
        self.inner.doc().wake_requests
    }

    pub fn wake_releases(&self) -> usize {
        self.inner.doc().wake_releases
    }

    pub fn exit_pointer_lock_calls(&self) -> usize {
        self.inner.doc().exit_calls
    }
}

impl Platform for SimulatedHost {
    fn has_dom(&self) -> bool {
        self.inner.has_dom
    }
}

impl Document for SimulatedHost {
    fn pointer_lock_element(&self) -> Option<ElementId> {
        self.inner.doc().lock_holder
    }

    fn exit_pointer_lock(&self) {
        let mut doc = self.inner.doc();
        doc.exit_calls += 1;
        doc.lock_holder = None;
    }

    fn subscribe_input(&self) -> broadcast::Receiver<InputEvent> {
        self.inner.input.subscribe()
    }

    fn dispatch(&self, event: SyntheticEvent) {
        self.inner.doc().dispatched.push(event);
    }

    fn viewport(&self) -> (u32, u32) {
        self.inner.viewport
    }

    fn create_media(&self, spec: &MediaSpec) -> Result<Box<dyn MediaElement>, HostError> {
        if !self.inner.has_dom {
            return Err(HostError::Unsupported("media elements".to_string()));
        }
        let record = Arc::new(MediaRecord {
            id: self.inner.next_id(),
            kind: spec.kind,
            playing: AtomicBool::new(false),
        });
        let mut doc = self.inner.doc();
        doc.media_created += 1;
        doc.media.push(record.clone());
        Ok(Box::new(SimulatedMedia {
            record,
            host: self.inner.clone(),
        }))
    }
}

#[async_trait]
impl WakeLockApi for SimulatedHost {
    fn is_supported(&self) -> bool {
        let behavior = *self
            .inner
            .wake_behavior
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        self.inner.has_dom && behavior != WakeLockBehavior::Unsupported
    }

    async fn request_screen(&self) -> Result<Box<dyn WakeLockSentinel>, HostError> {
        let behavior = *self
            .inner
            .wake_behavior
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let mut doc = self.inner.doc();
        doc.wake_requests += 1;
        match behavior {
            WakeLockBehavior::Unsupported => {
                Err(HostError::Unsupported("screen wake lock".to_string()))
            }
            WakeLockBehavior::Reject => Err(HostError::Rejected(
                "NotAllowedError: wake lock permission denied".to_string(),
            )),
            WakeLockBehavior::Grant => {
                let state = Arc::new(SentinelState {
                    released: AtomicBool::new(false),
                    handler: Mutex::new(None),
                });
                doc.sentinels.push(state.clone());
                Ok(Box::new(SimulatedSentinel {
                    state,
                    host: self.inner.clone(),
                }))
            }
        }
    }
}

/// A simulated text field.
pub struct SimulatedElement {
    id: ElementId,
    max_length: Option<usize>,
    value: Mutex<String>,
    selection: Mutex<(usize, usize)>,
    focused: AtomicBool,
    lock_requests: AtomicUsize,
    pointer_moves: AtomicUsize,
    writes: AtomicUsize,
    host: Arc<Inner>,
}

impl SimulatedElement {
    pub fn selection(&self) -> (usize, usize) {
        *self.selection.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_focused(&self) -> bool {
        self.focused.load(Ordering::SeqCst)
    }

    /// Number of pointer capture requests made on this element.
    pub fn lock_requests(&self) -> usize {
        self.lock_requests.load(Ordering::SeqCst)
    }

    /// Number of synthetic pointer movements dispatched on this element.
    pub fn pointer_moves(&self) -> usize {
        self.pointer_moves.load(Ordering::SeqCst)
    }

    /// Number of times the value was written.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Whether this element holds pointer capture.
    pub fn has_pointer_lock(&self) -> bool {
        self.host.doc().lock_holder == Some(self.id)
    }
}

impl TargetElement for SimulatedElement {
    fn id(&self) -> ElementId {
        self.id
    }

    fn value(&self) -> String {
        self.value.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn max_length(&self) -> Option<usize> {
        self.max_length
    }

    fn set_value(&self, value: String) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = value;
    }

    fn focus(&self) {
        self.focused.store(true, Ordering::SeqCst);
    }

    fn set_selection_range(&self, start: usize, end: usize) {
        *self.selection.lock().unwrap_or_else(|e| e.into_inner()) = (start, end);
    }

    fn request_pointer_lock(&self) {
        self.lock_requests.fetch_add(1, Ordering::SeqCst);
        if self.host.has_dom {
            self.host.doc().lock_holder = Some(self.id);
        }
    }

    fn dispatch_pointer_move(&self, _dx: i32, _dy: i32) {
        self.pointer_moves.fetch_add(1, Ordering::SeqCst);
    }
}

struct MediaRecord {
    id: u64,
    kind: MediaKind,
    playing: AtomicBool,
}

struct SimulatedMedia {
    record: Arc<MediaRecord>,
    host: Arc<Inner>,
}

impl MediaElement for SimulatedMedia {
    fn play(&self) -> Result<(), HostError> {
        self.record.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&self) {
        self.record.playing.store(false, Ordering::SeqCst);
    }

    fn detach(&self) -> Result<(), HostError> {
        if self.host.fail_detach.load(Ordering::SeqCst) {
            return Err(HostError::Failed("element is not a child of body".to_string()));
        }
        self.host.doc().media.retain(|m| m.id != self.record.id);
        Ok(())
    }
}

struct SentinelState {
    released: AtomicBool,
    handler: Mutex<Option<ReleaseHandler>>,
}

impl SentinelState {
    fn mark_released(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        let handler = self
            .handler
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handler) = handler {
            handler();
        }
    }
}

struct SimulatedSentinel {
    state: Arc<SentinelState>,
    host: Arc<Inner>,
}

#[async_trait]
impl WakeLockSentinel for SimulatedSentinel {
    fn on_release(&self, handler: ReleaseHandler) {
        if self.state.released.load(Ordering::SeqCst) {
            handler();
            return;
        }
        *self.state.handler.lock().unwrap_or_else(|e| e.into_inner()) = Some(handler);
    }

    async fn release(&self) -> Result<(), HostError> {
        if self.host.fail_release.load(Ordering::SeqCst) {
            return Err(HostError::Failed("InvalidStateError".to_string()));
        }
        {
            let mut doc = self.host.doc();
            doc.wake_releases += 1;
            doc.sentinels.retain(|s| !Arc::ptr_eq(s, &self.state));
        }
        self.state.mark_released();
        Ok(())
    }
}
