//! Demonstration of a presence session on a simulated page.
//!
//! This example shows how to:
//! 1. Build an orchestrator over a host
//! 2. Observe activation and wake lock state
//! 3. Activate on a text field and let the loops run
//! 4. End the session with the panic chord
//!
//! Run with: cargo run --example session_demo

use std::sync::Arc;
use std::time::Duration;

use presence_sim::{
    host::{KeyEvent, Modifiers, TargetElement},
    Config, Host, Orchestrator, SimulatedHost, WakeLockBehavior, PANIC_CHORD, SESSION_NOTICE,
};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    println!("Presence Sim - Session Demo");
    println!("===========================");
    println!("{SESSION_NOTICE}");

    // The wake lock API refuses, so the fallback tier takes over
    let page = SimulatedHost::new(WakeLockBehavior::Reject);
    let field = page.create_text_field(Some(80));

    let engine = match Orchestrator::new(Host::from_shared(Arc::new(page.clone())), Config::default())
    {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Could not create engine: {e}");
            return;
        }
    };

    let _active = engine.subscribe_active(|active| println!("active: {active}"));
    let _wake = engine.subscribe_wake(|held| println!("wake lock held: {held}"));

    engine.activate(field.clone());

    for second in 1..=5 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        println!(
            "[{second}s] {:>3} chars, capture held: {}, decoys: {:?}",
            field.value().chars().count(),
            field.has_pointer_lock(),
            page.attached_media()
        );
    }

    println!();
    println!("Sending {PANIC_CHORD}...");
    page.press_key(KeyEvent::new(
        PANIC_CHORD.key,
        Modifiers {
            ctrl: true,
            shift: true,
            ..Modifiers::default()
        },
    ))
    .await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    engine.shutdown().await;
    println!("listeners left: {}", page.listener_count());
    println!("decoys left: {:?}", page.attached_media());
    println!();
    println!("{}", engine.activity_log().summary());
}
