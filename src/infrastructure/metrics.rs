//! Server counters
//!
//! Lock-free counters using atomic operations.
//! Updated by connection handlers, snapshotted for shutdown logging.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Server metrics collector
pub struct ServerMetrics {
    /// Content requests answered with an item
    content_requests: AtomicU64,
    /// Departure signals handled
    departures: AtomicU64,
    /// Admin mode toggles
    mode_toggles: AtomicU64,
    /// Runs of four that finished and were reshuffled
    completed_cycles: AtomicU64,
    /// Malformed requests answered with an error line
    protocol_errors: AtomicU64,
    /// Accept/read/write failures
    connection_errors: AtomicU64,
    start_time: Instant,
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSnapshot {
    pub content_requests: u64,
    pub departures: u64,
    pub mode_toggles: u64,
    pub completed_cycles: u64,
    pub protocol_errors: u64,
    pub connection_errors: u64,
    pub uptime_seconds: u64,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self {
            content_requests: AtomicU64::new(0),
            departures: AtomicU64::new(0),
            mode_toggles: AtomicU64::new(0),
            completed_cycles: AtomicU64::new(0),
            protocol_errors: AtomicU64::new(0),
            connection_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    #[inline]
    pub fn record_content_request(&self) {
        self.content_requests.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_departure(&self) {
        self.departures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_mode_toggle(&self) {
        self.mode_toggles.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_completed_cycle(&self) {
        self.completed_cycles.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_connection_error(&self) {
        self.connection_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current snapshot of metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            content_requests: self.content_requests.load(Ordering::Relaxed),
            departures: self.departures.load(Ordering::Relaxed),
            mode_toggles: self.mode_toggles.load(Ordering::Relaxed),
            completed_cycles: self.completed_cycles.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            connection_errors: self.connection_errors.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
