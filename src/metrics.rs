// Host metrics module
//
// Lightweight counters for what the host did during its lifetime

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Host activity counters
///
/// Uses atomic operations so a shell thread can read them while the host
/// runs. Logged on shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// Bangs that reached an action
    pub bangs_dispatched: AtomicU64,

    /// Bangs rejected by routing (unknown, bad arguments, missing target)
    pub routing_failures: AtomicU64,

    /// Instances created
    pub activations: AtomicU64,

    /// Instances destroyed
    pub deactivations: AtomicU64,

    /// Teardowns postponed to the next safe point
    pub deferred_teardowns: AtomicU64,

    /// Guarded settings writes that reached the disk
    pub settings_writes: AtomicU64,

    /// Instances whose refresh raised an error
    pub refresh_failures: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            bangs_dispatched: AtomicU64::new(0),
            routing_failures: AtomicU64::new(0),
            activations: AtomicU64::new(0),
            deactivations: AtomicU64::new(0),
            deferred_teardowns: AtomicU64::new(0),
            settings_writes: AtomicU64::new(0),
            refresh_failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_bang(&self) {
        self.bangs_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_routing_failure(&self) {
        self.routing_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_activation(&self) {
        self.activations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deactivation(&self) {
        self.deactivations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deferred_teardown(&self) {
        self.deferred_teardowns.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_settings_write(&self) {
        self.settings_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refresh_failure(&self) {
        self.refresh_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Host Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Bangs: {} dispatched, {} rejected",
            self.bangs_dispatched.load(Ordering::Relaxed),
            self.routing_failures.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Skins: {} activated, {} destroyed ({} deferred)",
            self.activations.load(Ordering::Relaxed),
            self.deactivations.load(Ordering::Relaxed),
            self.deferred_teardowns.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Settings writes: {}, refresh failures: {}",
            self.settings_writes.load(Ordering::Relaxed),
            self.refresh_failures.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
