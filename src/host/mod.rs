//! Host collaborators for the presence engine.
//!
//! The engine never touches a real DOM directly. Everything it needs from
//! the page (the text field, the document's pointer capture, raw input,
//! media elements, the screen wake lock) is reached through the traits in
//! this module, so a browser binding, a headless no-op host and the
//! in-memory [`SimulatedHost`] are interchangeable.

pub mod noop;
pub mod simulated;
pub mod types;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;

pub use noop::NoopHost;
pub use simulated::{SimulatedElement, SimulatedHost, WakeLockBehavior};
pub use types::{
    ElementId, HostError, InputEvent, KeyChord, KeyEvent, MediaKind, MediaSource, MediaSpec,
    Modifiers, SyntheticEvent,
};

/// Reports whether DOM/browser APIs exist in the current environment.
pub trait Platform: Send + Sync {
    fn has_dom(&self) -> bool;
}

/// The element the engine types into and keeps pointer capture on.
pub trait TargetElement: Send + Sync {
    fn id(&self) -> ElementId;

    /// Current text content.
    fn value(&self) -> String;

    /// Declared maximum length, if any.
    fn max_length(&self) -> Option<usize>;

    fn set_value(&self, value: String);

    fn focus(&self);

    fn set_selection_range(&self, start: usize, end: usize);

    /// Ask the host to give this element exclusive pointer capture.
    fn request_pointer_lock(&self);

    /// Dispatch a synthetic relative pointer movement on this element.
    fn dispatch_pointer_move(&self, dx: i32, dy: i32);
}

/// A hidden media element allocated for the fallback wake tier.
pub trait MediaElement: Send + Sync {
    fn play(&self) -> Result<(), HostError>;

    fn pause(&self);

    /// Remove the element from the document.
    fn detach(&self) -> Result<(), HostError>;
}

/// Document-level services.
pub trait Document: Send + Sync {
    /// Element currently holding pointer capture.
    fn pointer_lock_element(&self) -> Option<ElementId>;

    fn exit_pointer_lock(&self);

    /// Register a listener for raw keydown and pointer-move input.
    ///
    /// Dropping the receiver unregisters the listener.
    fn subscribe_input(&self) -> broadcast::Receiver<InputEvent>;

    fn dispatch(&self, event: SyntheticEvent);

    /// Viewport size in CSS pixels.
    fn viewport(&self) -> (u32, u32);

    fn create_media(&self, spec: &MediaSpec) -> Result<Box<dyn MediaElement>, HostError>;
}

/// Handler invoked when a held wake lock is revoked by the host.
pub type ReleaseHandler = Box<dyn FnOnce() + Send>;

/// A held screen wake lock.
#[async_trait]
pub trait WakeLockSentinel: Send + Sync {
    /// Register a handler for out-of-band release (e.g. the page lost visibility).
    fn on_release(&self, handler: ReleaseHandler);

    async fn release(&self) -> Result<(), HostError>;
}

/// The system-level screen wake lock API.
#[async_trait]
pub trait WakeLockApi: Send + Sync {
    fn is_supported(&self) -> bool;

    async fn request_screen(&self) -> Result<Box<dyn WakeLockSentinel>, HostError>;
}

/// Bundle of host collaborators handed to the orchestrator.
#[derive(Clone)]
pub struct Host {
    pub platform: Arc<dyn Platform>,
    pub document: Arc<dyn Document>,
    pub wake_lock: Arc<dyn WakeLockApi>,
}

impl Host {
    /// Use one object for every collaborator.
    pub fn from_shared<H>(host: Arc<H>) -> Self
    where
        H: Platform + Document + WakeLockApi + 'static,
    {
        Self {
            platform: host.clone(),
            document: host.clone(),
            wake_lock: host,
        }
    }

    /// A host with no DOM; the engine degrades to a no-op.
    pub fn headless() -> Self {
        Self::from_shared(Arc::new(NoopHost::new()))
    }

    pub fn has_dom(&self) -> bool {
        self.platform.has_dom()
    }
}
