//! Lifecycle controller.
//!
//! Owns the activation state. Activation creates a fresh [`Cycle`] and
//! spawns the interrupt listener, the typing loop and both capture guards
//! bound to it; deactivation ends that cycle, drops every task and gives
//! pointer capture back to the page.

use super::cycle::Cycle;
use super::random::SharedRandom;
use super::state::{StateCell, Subscription};
use super::{capture, interrupt, typing, EngineError, LoopContext};
use crate::config::Config;
use crate::host::{Host, TargetElement};
use crate::transparency::SharedActivityLog;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

struct Session {
    cycle: Arc<Cycle>,
    target: Arc<dyn TargetElement>,
    tasks: Vec<JoinHandle<()>>,
}

struct ControllerInner {
    host: Host,
    runtime: Handle,
    config: Arc<Config>,
    random: SharedRandom,
    log: SharedActivityLog,
    active: StateCell<bool>,
    session: Mutex<Option<Session>>,
}

impl ControllerInner {
    fn session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// End the current cycle, or only the cycle `expected` if given.
    fn end_cycle(&self, expected: Option<Uuid>) -> bool {
        let session = {
            let mut guard = self.session();
            let matches = match (guard.as_ref(), expected) {
                (Some(session), Some(id)) => session.cycle.id() == id,
                (Some(_), None) => true,
                (None, _) => false,
            };
            if !matches {
                return false;
            }
            guard.take()
        };
        let Some(session) = session else {
            return false;
        };

        session.cycle.cancel();
        for task in session.tasks {
            task.abort();
        }

        if self.host.has_dom() {
            let document = self.host.document.as_ref();
            capture::release(document, session.target.as_ref());
            // Capture may have moved to another element in the meantime
            if document.pointer_lock_element().is_some() {
                document.exit_pointer_lock();
            }
        }

        self.log.record_deactivation();
        info!(cycle = %session.cycle.id(), "presence simulation deactivated");
        self.active.set(false);
        true
    }
}

impl Drop for ControllerInner {
    fn drop(&mut self) {
        let session = self
            .session
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(session) = session {
            session.cycle.cancel();
            for task in session.tasks {
                task.abort();
            }
        }
    }
}

/// Activation surface of the engine.
#[derive(Clone)]
pub struct LifecycleController {
    inner: Arc<ControllerInner>,
}

impl LifecycleController {
    /// Create a controller bound to the current Tokio runtime.
    pub fn new(
        host: Host,
        config: Arc<Config>,
        random: SharedRandom,
        log: SharedActivityLog,
    ) -> Result<Self, EngineError> {
        let runtime = Handle::try_current()?;
        Ok(Self {
            inner: Arc::new(ControllerInner {
                host,
                runtime,
                config,
                random,
                log,
                active: StateCell::new(false),
                session: Mutex::new(None),
            }),
        })
    }

    /// Start simulating presence on `target`. No-op while already active.
    pub fn activate(&self, target: Arc<dyn TargetElement>) {
        let inner = &self.inner;
        let cycle_id = {
            let mut session = inner.session();
            if session.is_some() {
                return;
            }

            let cycle = Arc::new(Cycle::new());
            let mut tasks = Vec::new();

            if inner.host.has_dom() {
                let document = inner.host.document.clone();
                let ctx = LoopContext {
                    cycle: cycle.clone(),
                    config: inner.config.clone(),
                    random: inner.random.clone(),
                    log: inner.log.clone(),
                    document: document.clone(),
                };

                let controller = Arc::downgrade(&self.inner);
                let id = cycle.id();
                tasks.push(inner.runtime.spawn(interrupt::run(
                    cycle.clone(),
                    document.subscribe_input(),
                    move || {
                        if let Some(controller) = controller.upgrade() {
                            controller.end_cycle(Some(id));
                        }
                    },
                )));

                tasks.push(inner.runtime.spawn(typing::run(ctx.clone(), target.clone())));

                capture::engage(&ctx, target.as_ref());
                tasks.push(inner.runtime.spawn(capture::run_timer(ctx.clone(), target.clone())));
                tasks.push(inner.runtime.spawn(capture::run_listener(
                    ctx,
                    target.clone(),
                    document.subscribe_input(),
                )));
            } else {
                debug!("no DOM available, activation starts no loops");
            }

            let id = cycle.id();
            *session = Some(Session {
                cycle,
                target,
                tasks,
            });
            id
        };

        inner.log.record_activation();
        info!(cycle = %cycle_id, chord = %interrupt::PANIC_CHORD, "presence simulation activated");
        inner.active.set(true);
    }

    /// Stop everything started by [`activate`](Self::activate). No-op while inactive.
    pub fn deactivate(&self) {
        self.inner.end_cycle(None);
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// Id of the live activation cycle, if any.
    pub fn current_cycle(&self) -> Option<Uuid> {
        self.inner.session().as_ref().map(|s| s.cycle.id())
    }

    /// Observe the activation state, starting with its current value.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&bool) + Send + Sync + 'static,
    {
        self.inner.active.subscribe(observer)
    }
}
