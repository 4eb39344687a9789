//! Pointer capture maintainer.
//!
//! Keeps exclusive pointer capture on the target. Two guards cooperate:
//! a fast path that re-requests capture whenever raw pointer movement is
//! observed while capture is lost, and a slow irregular timer that catches
//! loss while the user is idle and nudges the pointer. Re-requesting
//! capture on the element that already holds it is harmless, so the two
//! paths may race freely.

use super::random;
use super::LoopContext;
use crate::host::{Document, InputEvent, TargetElement};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

/// The key browsers use to release pointer capture.
pub const RELEASE_KEY: &str = "Escape";

fn request(ctx: &LoopContext, target: &dyn TargetElement) {
    target.request_pointer_lock();
    ctx.log.record_capture_request();
}

fn holds_capture(document: &dyn Document, target: &dyn TargetElement) -> bool {
    document.pointer_lock_element() == Some(target.id())
}

/// Request capture right away, on activation.
pub(crate) fn engage(ctx: &LoopContext, target: &dyn TargetElement) {
    request(ctx, target);
}

/// Re-request capture if the target lost it. Returns whether a request was made.
pub(crate) fn recapture_if_lost(ctx: &LoopContext, target: &dyn TargetElement) -> bool {
    if holds_capture(ctx.document.as_ref(), target) {
        return false;
    }
    request(ctx, target);
    true
}

fn timer_tick(ctx: &LoopContext, target: &dyn TargetElement) -> bool {
    let recaptured = recapture_if_lost(ctx, target);

    let span = ctx.config.pointer_jitter;
    let (dx, dy) = random::with(&ctx.random, |r| (r.offset(span), r.offset(span)));
    target.dispatch_pointer_move(dx, dy);
    ctx.log.record_pointer_pulse();

    recaptured
}

/// Slow-path guard: irregular timer.
pub(crate) async fn run_timer(ctx: LoopContext, target: Arc<dyn TargetElement>) {
    let token = ctx.cycle.token().clone();
    loop {
        let delay = random::with(&ctx.random, |r| ctx.config.capture.delay(r.unit()));
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
        match ctx.cycle.run(|| timer_tick(&ctx, target.as_ref())) {
            Some(true) => debug!(cycle = %ctx.cycle.id(), "capture restored by timer"),
            Some(false) => {}
            None => break,
        }
    }
    debug!(cycle = %ctx.cycle.id(), "capture timer stopped");
}

/// Fast-path guard: raw pointer movement plus release-key interception.
///
/// `input` must be registered before activation returns so no event that
/// follows activation is missed.
pub(crate) async fn run_listener(
    ctx: LoopContext,
    target: Arc<dyn TargetElement>,
    mut input: broadcast::Receiver<InputEvent>,
) {
    let token = ctx.cycle.token().clone();
    loop {
        let event = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            event = input.recv() => event,
        };

        let handled = match event {
            Ok(InputEvent::PointerMove { .. }) => ctx
                .cycle
                .run(|| {
                    if recapture_if_lost(&ctx, target.as_ref()) {
                        debug!(cycle = %ctx.cycle.id(), "capture restored on pointer move");
                    }
                })
                .is_some(),
            Ok(InputEvent::KeyDown(key)) if key.key == RELEASE_KEY => {
                let live = ctx.cycle.run(|| key.prevent_default()).is_some();
                if live {
                    tokio::spawn(delayed_recapture(ctx.clone(), target.clone()));
                }
                live
            }
            Ok(InputEvent::KeyDown(_)) => true,
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "capture listener lagged");
                true
            }
            Err(RecvError::Closed) => false,
        };
        if !handled {
            break;
        }
    }
    debug!(cycle = %ctx.cycle.id(), "capture listener removed");
}

async fn delayed_recapture(ctx: LoopContext, target: Arc<dyn TargetElement>) {
    let token = ctx.cycle.token().clone();
    tokio::select! {
        biased;
        _ = token.cancelled() => {}
        _ = tokio::time::sleep(ctx.config.recapture_delay) => {
            ctx.cycle.run(|| request(&ctx, target.as_ref()));
        }
    }
}

/// Release capture if the target still holds it.
pub(crate) fn release(document: &dyn Document, target: &dyn TargetElement) {
    if holds_capture(document, target) {
        document.exit_pointer_lock();
    }
}
