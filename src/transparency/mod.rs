//! Transparency module for the presence simulator.
//!
//! Tracks how much synthetic activity the engine produced during a session.

pub mod log;

// Re-export commonly used types
pub use log::{create_shared_log, ActivityLog, ActivityStats, SharedActivityLog};
