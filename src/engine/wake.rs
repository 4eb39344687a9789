//! Wake maintenance engine.
//!
//! Keeps the display from sleeping with one of two mutually exclusive
//! strategies:
//!
//! - **Native**: hold a screen wake lock from the host.
//! - **Fallback**: when the lock API is missing or refuses, run decoys
//!   instead: a hidden looping video, a periodic synthetic activity pulse
//!   and a near-silent looping audio element.
//!
//! The observable state answers "is something preventing sleep", so it
//! reads `true` for either strategy. [`WakeMaintenance::release`] tears
//! down whatever is present without the caller knowing which strategy ran.

use super::random::{self, SharedRandom};
use super::state::{StateCell, Subscription};
use crate::config::Config;
use crate::host::{Host, MediaElement, MediaSpec, SyntheticEvent, WakeLockSentinel};
use crate::transparency::SharedActivityLog;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Key sent by the activity pulse; no visible effect in any input field.
pub const PULSE_KEY: &str = "F15";

/// Which strategy a request ended up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WakeStrategy {
    /// A native screen wake lock is held
    Native,
    /// Decoy resources are running
    Fallback,
    /// No DOM; nothing was attempted
    Unavailable,
}

struct NativeLock {
    sentinel: Box<dyn WakeLockSentinel>,
    revoked: Arc<AtomicBool>,
}

impl NativeLock {
    fn is_revoked(&self) -> bool {
        self.revoked.load(Ordering::SeqCst)
    }
}

/// Fallback-tier resources. Each one is optional; presence means running.
#[derive(Default)]
struct DecoyResources {
    video: Option<Box<dyn MediaElement>>,
    audio: Option<Box<dyn MediaElement>>,
    pulse: Option<JoinHandle<()>>,
}

impl DecoyResources {
    fn is_active(&self) -> bool {
        self.video.is_some() || self.audio.is_some() || self.pulse.is_some()
    }

    /// Stop and detach everything, attempting every resource even if one fails.
    fn teardown(&mut self) {
        for (name, media) in [("video", self.video.take()), ("audio", self.audio.take())] {
            if let Some(media) = media {
                media.pause();
                if let Err(e) = media.detach() {
                    warn!(error = %e, "failed to detach decoy {name}");
                }
            }
        }
        if let Some(pulse) = self.pulse.take() {
            pulse.abort();
        }
    }
}

#[derive(Default)]
struct WakeResources {
    native: Option<NativeLock>,
    decoys: DecoyResources,
}

struct WakeInner {
    host: Host,
    config: Arc<Config>,
    random: SharedRandom,
    log: SharedActivityLog,
    state: StateCell<bool>,
    /// Bumped on every native acquisition; a release handler only acts for its own
    generation: Arc<AtomicU64>,
    resources: Mutex<WakeResources>,
}

impl Drop for WakeInner {
    fn drop(&mut self) {
        let resources = self.resources.get_mut();
        if resources.decoys.is_active() {
            resources.decoys.teardown();
            debug!("fallback tier stopped on drop");
        }
        if let Some(native) = resources.native.take() {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        if let Err(e) = native.sentinel.release().await {
                            warn!(error = %e, "failed to release wake lock on drop");
                        }
                    });
                }
                Err(_) => warn!("wake lock dropped outside a runtime, leaving it to the host"),
            }
        }
    }
}

/// Owner of the wake lock state and its resources.
#[derive(Clone)]
pub struct WakeMaintenance {
    inner: Arc<WakeInner>,
}

impl WakeMaintenance {
    pub fn new(
        host: Host,
        config: Arc<Config>,
        random: SharedRandom,
        log: SharedActivityLog,
    ) -> Self {
        Self {
            inner: Arc::new(WakeInner {
                host,
                config,
                random,
                log,
                state: StateCell::new(false),
                generation: Arc::new(AtomicU64::new(0)),
                resources: Mutex::new(WakeResources::default()),
            }),
        }
    }

    /// Whether something is currently preventing sleep.
    pub fn is_held(&self) -> bool {
        self.inner.state.get()
    }

    /// Observe the wake lock state, starting with its current value.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&bool) + Send + Sync + 'static,
    {
        self.inner.state.subscribe(observer)
    }

    /// Try to keep the display awake.
    ///
    /// Calling this while a strategy is already running keeps that strategy
    /// and allocates nothing new. A native lock revoked out-of-band is
    /// re-acquired.
    pub async fn request(&self) -> WakeStrategy {
        let inner = &self.inner;
        if !inner.host.has_dom() {
            return WakeStrategy::Unavailable;
        }

        let mut resources = inner.resources.lock().await;

        match resources.native.as_ref().map(NativeLock::is_revoked) {
            Some(false) => {
                inner.state.set(true);
                return WakeStrategy::Native;
            }
            Some(true) => resources.native = None,
            None => {}
        }

        if resources.decoys.is_active() {
            self.start_fallback(&mut resources.decoys);
            return WakeStrategy::Fallback;
        }

        let api = &inner.host.wake_lock;
        if api.is_supported() {
            match api.request_screen().await {
                Ok(sentinel) => {
                    let revoked = Arc::new(AtomicBool::new(false));
                    let flag = revoked.clone();
                    let state = inner.state.clone();
                    let generation = inner.generation.clone();
                    let acquired = generation.fetch_add(1, Ordering::SeqCst) + 1;
                    sentinel.on_release(Box::new(move || {
                        flag.store(true, Ordering::SeqCst);
                        // A newer lock may already be held
                        if generation.load(Ordering::SeqCst) != acquired {
                            return;
                        }
                        if state.set(false) {
                            info!("wake lock released by host");
                        }
                    }));
                    resources.native = Some(NativeLock { sentinel, revoked });
                    inner.log.record_native_lock();
                    inner.state.set(true);
                    info!("screen wake lock acquired");
                    return WakeStrategy::Native;
                }
                Err(e) => warn!(error = %e, "wake lock request failed, starting fallback tier"),
            }
        } else {
            info!("wake lock API unavailable, starting fallback tier");
        }

        self.start_fallback(&mut resources.decoys);
        inner.log.record_fallback_tier();
        WakeStrategy::Fallback
    }

    /// Allocate whichever decoys are missing.
    fn start_fallback(&self, decoys: &mut DecoyResources) {
        let inner = &self.inner;

        if decoys.video.is_none() {
            decoys.video = self.attach_media(&MediaSpec::hidden_video(), "video");
        }

        if decoys.pulse.is_none() {
            decoys.pulse = Some(tokio::spawn(activity_pulse(
                inner.host.clone(),
                inner.config.clone(),
                inner.random.clone(),
                inner.log.clone(),
            )));
        }

        if decoys.audio.is_none() {
            decoys.audio = self.attach_media(&MediaSpec::near_silent_audio(), "audio");
        }

        inner.state.set(true);
    }

    fn attach_media(&self, spec: &MediaSpec, name: &str) -> Option<Box<dyn MediaElement>> {
        match self.inner.host.document.create_media(spec) {
            Ok(media) => {
                // A refused autoplay leaves the element in place for teardown
                if let Err(e) = media.play() {
                    warn!(error = %e, "decoy {name} did not start playing");
                }
                debug!("decoy {name} attached");
                Some(media)
            }
            Err(e) => {
                warn!(error = %e, "could not create decoy {name}");
                None
            }
        }
    }

    /// Release everything, whichever strategy was in effect.
    pub async fn release(&self) {
        let inner = &self.inner;
        if !inner.host.has_dom() {
            return;
        }

        let mut resources = inner.resources.lock().await;

        if let Some(native) = resources.native.take() {
            inner.generation.fetch_add(1, Ordering::SeqCst);
            match native.sentinel.release().await {
                Ok(()) => info!("screen wake lock released"),
                Err(e) => warn!(error = %e, "failed to release wake lock"),
            }
        }

        if resources.decoys.is_active() {
            resources.decoys.teardown();
            info!("fallback tier stopped");
        }

        inner.state.set(false);
    }
}

/// Periodic synthetic activity that resets idle timers keyed on input.
async fn activity_pulse(
    host: Host,
    config: Arc<Config>,
    random: SharedRandom,
    log: SharedActivityLog,
) {
    let period = config.activity_pulse_interval;
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    loop {
        ticker.tick().await;
        let (width, height) = host.document.viewport();
        let (x, y) = random::with(&random, |r| {
            (
                r.below(width.max(1) as usize) as u32,
                r.below(height.max(1) as usize) as u32,
            )
        });
        host.document.dispatch(SyntheticEvent::PointerMove { x, y });
        host.document.dispatch(SyntheticEvent::KeyDown {
            key: PULSE_KEY.to_string(),
        });
        log.record_decoy_pulse();
        debug!(x, y, "activity pulse");
    }
}
