//! Composition root: the lifecycle controller plus wake maintenance.

use super::controller::LifecycleController;
use super::random::{self, RandomSource, StdRandom};
use super::state::Subscription;
use super::wake::{WakeMaintenance, WakeStrategy};
use super::EngineError;
use crate::config::Config;
use crate::host::{Host, TargetElement};
use crate::transparency::{create_shared_log, SharedActivityLog};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

/// Forwards activation changes to wake maintenance in the order they happened.
struct WakeBridge {
    subscription: Subscription,
    driver: JoinHandle<()>,
}

/// The presence engine.
///
/// Construct one per page and pass it to whatever owns the UI lifecycle.
/// Call [`shutdown`](Self::shutdown) when done to release everything.
pub struct Orchestrator {
    controller: LifecycleController,
    wake: WakeMaintenance,
    log: SharedActivityLog,
    bridge: Mutex<Option<WakeBridge>>,
}

impl Orchestrator {
    /// Build an engine with OS-seeded randomness.
    pub fn new(host: Host, config: Config) -> Result<Self, EngineError> {
        Self::with_random(host, config, StdRandom::from_os())
    }

    /// Build an engine with a caller-provided random source.
    pub fn with_random(
        host: Host,
        config: Config,
        random: impl RandomSource + 'static,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let config = Arc::new(config);
        let random = random::shared(random);
        let log = create_shared_log();

        let controller =
            LifecycleController::new(host.clone(), config.clone(), random.clone(), log.clone())?;
        let wake = WakeMaintenance::new(host, config.clone(), random, log.clone());

        let bridge = if config.keep_awake {
            let (tx, mut rx) = mpsc::unbounded_channel::<bool>();
            let subscription = controller.subscribe(move |active| {
                let _ = tx.send(*active);
            });
            let engine = wake.clone();
            let driver = tokio::spawn(async move {
                while let Some(active) = rx.recv().await {
                    if active {
                        let strategy = engine.request().await;
                        debug!(?strategy, "wake maintenance engaged");
                    } else {
                        engine.release().await;
                    }
                }
                // The controller is gone; nothing will ask for a release any more
                engine.release().await;
            });
            Some(WakeBridge {
                subscription,
                driver,
            })
        } else {
            None
        };

        Ok(Self {
            controller,
            wake,
            log,
            bridge: Mutex::new(bridge),
        })
    }

    pub fn activate(&self, target: Arc<dyn TargetElement>) {
        self.controller.activate(target);
    }

    pub fn deactivate(&self) {
        self.controller.deactivate();
    }

    pub fn is_active(&self) -> bool {
        self.controller.is_active()
    }

    pub fn current_cycle(&self) -> Option<Uuid> {
        self.controller.current_cycle()
    }

    /// Whether something is currently preventing sleep.
    pub fn is_wake_held(&self) -> bool {
        self.wake.is_held()
    }

    /// Observe activation state; the current value is delivered immediately.
    pub fn subscribe_active<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&bool) + Send + Sync + 'static,
    {
        self.controller.subscribe(observer)
    }

    /// Observe wake lock state; the current value is delivered immediately.
    pub fn subscribe_wake<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&bool) + Send + Sync + 'static,
    {
        self.wake.subscribe(observer)
    }

    /// Request wake maintenance directly, independent of activation.
    pub async fn request_wake_lock(&self) -> WakeStrategy {
        self.wake.request().await
    }

    /// Release wake maintenance directly, independent of activation.
    pub async fn release_wake_lock(&self) {
        self.wake.release().await;
    }

    pub fn activity_log(&self) -> &SharedActivityLog {
        &self.log
    }

    pub fn controller(&self) -> &LifecycleController {
        &self.controller
    }

    /// Deactivate and release every owned resource.
    pub async fn shutdown(&self) {
        self.controller.deactivate();

        let bridge = self
            .bridge
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(bridge) = bridge {
            // Closing the channel lets the driver drain what is queued and exit
            bridge.subscription.unsubscribe();
            let _ = bridge.driver.await;
        }

        self.wake.release().await;
        debug!("orchestrator shut down");
    }
}
