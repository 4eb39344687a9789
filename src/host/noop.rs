//! Headless (noop) host.
//!
//! This exists so the engine can be constructed and driven where no DOM is
//! available. It reports `has_dom() == false`, which makes the engine skip
//! every browser-only call, and answers the remaining calls trivially.

use super::types::{ElementId, HostError, InputEvent, MediaSpec, SyntheticEvent};
use super::{Document, MediaElement, Platform, WakeLockApi, WakeLockSentinel};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// A host that never observes input and never allocates anything.
pub struct NoopHost {
    input: broadcast::Sender<InputEvent>,
}

impl NoopHost {
    pub fn new() -> Self {
        let (input, _) = broadcast::channel(16);
        Self { input }
    }
}

impl Default for NoopHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for NoopHost {
    fn has_dom(&self) -> bool {
        false
    }
}

impl Document for NoopHost {
    fn pointer_lock_element(&self) -> Option<ElementId> {
        None
    }

    fn exit_pointer_lock(&self) {}

    fn subscribe_input(&self) -> broadcast::Receiver<InputEvent> {
        self.input.subscribe()
    }

    fn dispatch(&self, _event: SyntheticEvent) {}

    fn viewport(&self) -> (u32, u32) {
        (0, 0)
    }

    fn create_media(&self, _spec: &MediaSpec) -> Result<Box<dyn MediaElement>, HostError> {
        Err(HostError::Unsupported("media elements".to_string()))
    }
}

#[async_trait]
impl WakeLockApi for NoopHost {
    fn is_supported(&self) -> bool {
        false
    }

    async fn request_screen(&self) -> Result<Box<dyn WakeLockSentinel>, HostError> {
        Err(HostError::Unsupported("screen wake lock".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_host_has_no_dom() {
        let host = NoopHost::new();
        assert!(!host.has_dom());
        assert!(host.pointer_lock_element().is_none());
        assert!(!host.is_supported());
    }

    #[test]
    fn test_noop_host_refuses_media() {
        let host = NoopHost::new();
        assert!(host.create_media(&MediaSpec::hidden_video()).is_err());
    }
}
