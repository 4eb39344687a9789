//! Presence Sim - keeps a page looking attended.
//!
//! While active, the engine types synthetic text into a field, keeps
//! pointer capture on it and keeps the display from sleeping. A fixed key
//! chord ends the session from anywhere on the page.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                         Orchestrator                          │
//! ├───────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────┐  active   ┌──────────────────────┐  │
//! │  │ Lifecycle Controller │──────────▶│   Wake Maintenance   │  │
//! │  └──────────────────────┘  (state)  │  native │ fallback   │  │
//! │      │ one Cycle per activation     └──────────────────────┘  │
//! │      ├──▶ Interrupt listener (panic chord)                    │
//! │      ├──▶ Typing loop                                         │
//! │      └──▶ Capture timer + capture listener                    │
//! └───────────────────────────────────────────────────────────────┘
//!                │ host traits
//!                ▼
//!        Document / TargetElement / WakeLockApi
//! ```
//!
//! # Example
//!
//! ```no_run
//! use presence_sim::{Config, Host, Orchestrator, SimulatedHost, WakeLockBehavior};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), presence_sim::EngineError> {
//! let page = SimulatedHost::new(WakeLockBehavior::Grant);
//! let field = page.create_text_field(Some(500));
//!
//! let engine = Orchestrator::new(Host::from_shared(Arc::new(page)), Config::default())?;
//! let _watch = engine.subscribe_active(|active| println!("active: {active}"));
//!
//! engine.activate(field);
//! // ...
//! engine.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod host;
pub mod transparency;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError, TickTiming};
pub use engine::{
    EngineError, LifecycleController, Orchestrator, RandomSource, StdRandom, Subscription,
    WakeStrategy, PANIC_CHORD,
};
pub use host::{Host, HostError, NoopHost, SimulatedHost, TargetElement, WakeLockBehavior};
pub use transparency::{ActivityLog, ActivityStats, SharedActivityLog};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Notice shown before a session starts.
pub const SESSION_NOTICE: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║                 PRESENCE SIM - SESSION NOTICE                    ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  While active, this engine:                                      ║
║    • Types random text into the target field                     ║
║    • Keeps the pointer captured on that field                    ║
║    • Keeps the display awake (wake lock, or decoy media)         ║
║                                                                  ║
║  Nothing is stored and nothing leaves this page.                 ║
║                                                                  ║
║  Press Ctrl+Shift+X at any time to stop.                         ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
