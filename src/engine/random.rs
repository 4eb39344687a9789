//! Injectable randomness for tick timing and typing choices.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};

/// Source of the engine's random decisions.
pub trait RandomSource: Send {
    /// Uniform sample in `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// Uniform index in `[0, upper)`. `upper` is never zero.
    fn below(&mut self, upper: usize) -> usize;

    /// Uniform integer in `[-span, span)`.
    fn offset(&mut self, span: i32) -> i32 {
        let width = (span.max(1) as usize) * 2;
        self.below(width) as i32 - span.max(1)
    }
}

/// Default source backed by `rand`'s standard generator.
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    pub fn from_os() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for StdRandom {
    fn unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    fn below(&mut self, upper: usize) -> usize {
        self.rng.random_range(0..upper.max(1))
    }
}

/// Random source shared by every loop-manager of an orchestrator.
pub type SharedRandom = Arc<Mutex<Box<dyn RandomSource>>>;

pub fn shared(source: impl RandomSource + 'static) -> SharedRandom {
    Arc::new(Mutex::new(Box::new(source)))
}

/// Borrow the shared source for one decision.
pub(crate) fn with<R>(random: &SharedRandom, f: impl FnOnce(&mut dyn RandomSource) -> R) -> R {
    let mut guard = random.lock().unwrap_or_else(|e| e.into_inner());
    f(guard.as_mut())
}
