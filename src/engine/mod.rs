//! The automation orchestrator.
//!
//! This module contains:
//! - Observable state cells and per-activation cancellation
//! - The synthetic input generator, pointer capture maintainer and
//!   interrupt listener, each a loop bound to one activation cycle
//! - Wake maintenance with native and fallback strategies
//! - The lifecycle controller and the orchestrator that composes them

pub mod capture;
pub mod controller;
pub mod cycle;
pub mod interrupt;
pub mod orchestrator;
pub mod random;
pub mod state;
pub mod typing;
pub mod wake;

use crate::config::{Config, ConfigError};
use crate::host::Document;
use crate::transparency::SharedActivityLog;
use std::sync::Arc;
use thiserror::Error;

// Re-export commonly used types
pub use controller::LifecycleController;
pub use cycle::Cycle;
pub use interrupt::PANIC_CHORD;
pub use orchestrator::Orchestrator;
pub use random::{RandomSource, SharedRandom, StdRandom};
pub use state::{StateCell, Subscription};
pub use typing::{Keystroke, ALPHABET, VOCABULARY};
pub use wake::{WakeMaintenance, WakeStrategy, PULSE_KEY};

/// Errors raised while constructing the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no Tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    #[error("engine not started: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Everything a loop-manager needs for one activation cycle.
#[derive(Clone)]
pub(crate) struct LoopContext {
    pub(crate) cycle: Arc<Cycle>,
    pub(crate) config: Arc<Config>,
    pub(crate) random: SharedRandom,
    pub(crate) log: SharedActivityLog,
    pub(crate) document: Arc<dyn Document>,
}
