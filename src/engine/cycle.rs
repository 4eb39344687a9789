//! Per-activation cancellation.
//!
//! Every activation creates a fresh [`Cycle`]. Loop-managers await its
//! token between ticks and run each tick's side effects through
//! [`Cycle::run`], which holds the gate that [`Cycle::cancel`] closes. Once
//! `cancel` returns, no loop bound to this cycle can touch the page again,
//! even if its timer had already fired.

use std::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// One activation cycle.
#[derive(Debug)]
pub struct Cycle {
    id: Uuid,
    token: CancellationToken,
    live: Mutex<bool>,
}

impl Cycle {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            token: CancellationToken::new(),
            live: Mutex::new(true),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Token that resolves when the cycle ends.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_live(&self) -> bool {
        *self.gate()
    }

    fn gate(&self) -> MutexGuard<'_, bool> {
        self.live.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `action` only if the cycle is still live.
    ///
    /// `action` must not end the cycle itself; cancellation from inside a
    /// tick has to happen after `run` returns.
    pub fn run<R>(&self, action: impl FnOnce() -> R) -> Option<R> {
        let live = self.gate();
        if !*live {
            return None;
        }
        Some(action())
    }

    /// End the cycle. Returns `true` only for the call that actually ended it.
    pub fn cancel(&self) -> bool {
        {
            let mut live = self.gate();
            if !*live {
                return false;
            }
            *live = false;
        }
        self.token.cancel();
        true
    }
}

impl Default for Cycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_fires_once() {
        let cycle = Cycle::new();
        assert!(cycle.is_live());
        assert!(cycle.cancel());
        assert!(!cycle.cancel());
        assert!(cycle.token().is_cancelled());
    }

    #[test]
    fn test_run_is_refused_after_cancel() {
        let cycle = Cycle::new();
        assert_eq!(cycle.run(|| 1), Some(1));
        cycle.cancel();
        assert_eq!(cycle.run(|| 1), None);
    }

    #[test]
    fn test_cycles_are_independent() {
        let old = Cycle::new();
        let new = Cycle::new();
        old.cancel();
        assert!(new.is_live());
        assert!(!new.token().is_cancelled());
        assert_ne!(old.id(), new.id());
    }
}
