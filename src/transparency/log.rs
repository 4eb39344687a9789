//! Activity log for a presence session.
//!
//! Counts what the engine did to the page so a user can see, after the
//! fact, how much synthetic input was produced. Nothing is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Activity counters for the current process.
#[derive(Debug)]
pub struct ActivityLog {
    /// Number of activations that started a cycle
    activations: AtomicU64,
    /// Number of deactivations that ended a cycle
    deactivations: AtomicU64,
    /// Single characters appended
    characters_typed: AtomicU64,
    /// Whole words appended
    words_typed: AtomicU64,
    /// Buffer clears at capacity
    buffer_resets: AtomicU64,
    /// Pointer capture requests issued
    capture_requests: AtomicU64,
    /// Synthetic pointer movements on the target
    pointer_pulses: AtomicU64,
    /// Fallback-tier activity pulses
    decoy_pulses: AtomicU64,
    /// Native wake locks acquired
    native_locks: AtomicU64,
    /// Fallback tiers started
    fallback_tiers: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self {
            activations: AtomicU64::new(0),
            deactivations: AtomicU64::new(0),
            characters_typed: AtomicU64::new(0),
            words_typed: AtomicU64::new(0),
            buffer_resets: AtomicU64::new(0),
            capture_requests: AtomicU64::new(0),
            pointer_pulses: AtomicU64::new(0),
            decoy_pulses: AtomicU64::new(0),
            native_locks: AtomicU64::new(0),
            fallback_tiers: AtomicU64::new(0),
            session_start: Utc::now(),
        }
    }

    pub fn record_activation(&self) {
        self.activations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deactivation(&self) {
        self.deactivations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_character(&self) {
        self.characters_typed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_word(&self) {
        self.words_typed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_buffer_reset(&self) {
        self.buffer_resets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_capture_request(&self) {
        self.capture_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pointer_pulse(&self) {
        self.pointer_pulses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decoy_pulse(&self) {
        self.decoy_pulses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_native_lock(&self) {
        self.native_locks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback_tier(&self) {
        self.fallback_tiers.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> ActivityStats {
        ActivityStats {
            activations: self.activations.load(Ordering::Relaxed),
            deactivations: self.deactivations.load(Ordering::Relaxed),
            characters_typed: self.characters_typed.load(Ordering::Relaxed),
            words_typed: self.words_typed.load(Ordering::Relaxed),
            buffer_resets: self.buffer_resets.load(Ordering::Relaxed),
            capture_requests: self.capture_requests.load(Ordering::Relaxed),
            pointer_pulses: self.pointer_pulses.load(Ordering::Relaxed),
            decoy_pulses: self.decoy_pulses.load(Ordering::Relaxed),
            native_locks: self.native_locks.load(Ordering::Relaxed),
            fallback_tiers: self.fallback_tiers.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Activity:\n\
             - Activations: {} (deactivations: {})\n\
             - Characters typed: {}\n\
             - Words typed: {}\n\
             - Buffer resets: {}\n\
             - Capture requests: {}\n\
             - Pointer pulses: {}\n\
             - Wake strategy: {} native, {} fallback ({} decoy pulses)\n\
             - Session duration: {} seconds",
            stats.activations,
            stats.deactivations,
            stats.characters_typed,
            stats.words_typed,
            stats.buffer_resets,
            stats.capture_requests,
            stats.pointer_pulses,
            stats.native_locks,
            stats.fallback_tiers,
            stats.decoy_pulses,
            stats.session_duration_secs
        )
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of activity statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityStats {
    pub activations: u64,
    pub deactivations: u64,
    pub characters_typed: u64,
    pub words_typed: u64,
    pub buffer_resets: u64,
    pub capture_requests: u64,
    pub pointer_pulses: u64,
    pub decoy_pulses: u64,
    pub native_locks: u64,
    pub fallback_tiers: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Thread-safe shared activity log.
pub type SharedActivityLog = Arc<ActivityLog>;

/// Create a new shared activity log.
pub fn create_shared_log() -> SharedActivityLog {
    Arc::new(ActivityLog::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_log_counting() {
        let log = ActivityLog::new();

        log.record_character();
        log.record_character();
        log.record_word();
        log.record_buffer_reset();

        let stats = log.stats();
        assert_eq!(stats.characters_typed, 2);
        assert_eq!(stats.words_typed, 1);
        assert_eq!(stats.buffer_resets, 1);
        assert_eq!(stats.capture_requests, 0);
    }

    #[test]
    fn test_summary_format() {
        let log = ActivityLog::new();
        log.record_native_lock();
        let summary = log.summary();

        assert!(summary.contains("Characters typed"));
        assert!(summary.contains("Capture requests"));
        assert!(summary.contains("1 native, 0 fallback"));
    }
}
