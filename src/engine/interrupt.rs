//! Interrupt listener: the panic-exit chord.

use super::cycle::Cycle;
use crate::host::{InputEvent, KeyChord, Modifiers};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info};

/// Ends the session from anywhere on the page. Not configurable.
pub const PANIC_CHORD: KeyChord = KeyChord {
    modifiers: Modifiers {
        ctrl: true,
        shift: true,
        alt: false,
        meta: false,
    },
    key: "X",
};

/// Wait for the panic chord once, then call `on_chord`.
///
/// The listener is dropped as soon as the cycle ends, whether the chord
/// ended it or something else did.
pub(crate) async fn run<F>(cycle: Arc<Cycle>, mut input: broadcast::Receiver<InputEvent>, on_chord: F)
where
    F: FnOnce() + Send + 'static,
{
    let token = cycle.token().clone();
    loop {
        let event = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            event = input.recv() => event,
        };
        match event {
            Ok(InputEvent::KeyDown(key)) if PANIC_CHORD.matches(&key) => {
                if cycle.is_live() {
                    info!(cycle = %cycle.id(), chord = %PANIC_CHORD, "panic chord received");
                    // Release the listener before tearing the cycle down
                    drop(input);
                    on_chord();
                }
                return;
            }
            Ok(_) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => break,
        }
    }
    debug!(cycle = %cycle.id(), "interrupt listener removed");
}
