//! Pull-based progress for long-running render work.
//!
//! Workers bump atomic counters; observers call [`Progress::snapshot`]
//! whenever they want a report. Nothing here formats or transmits
//! progress, that is the caller's concern.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Shared chunk counters for one job.
#[derive(Debug)]
pub struct Progress {
    total_chunks: AtomicU64,
    processed_chunks: AtomicU64,
    started: Instant,
}

impl Progress {
    /// Tracker expecting `total_chunks` units of work. The total may
    /// grow later for open-ended jobs.
    pub fn new(total_chunks: u64) -> Self {
        Self {
            total_chunks: AtomicU64::new(total_chunks),
            processed_chunks: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    /// Add more expected work, e.g. when a background cycle queues a
    /// fresh batch.
    pub fn add_total(&self, chunks: u64) {
        self.total_chunks.fetch_add(chunks, Ordering::Relaxed);
    }

    /// Record completed work.
    pub fn add_processed(&self, chunks: u64) {
        self.processed_chunks.fetch_add(chunks, Ordering::Relaxed);
    }

    /// A point-in-time report derived from the counters.
    pub fn snapshot(&self) -> ProgressReport {
        let total = self.total_chunks.load(Ordering::Relaxed);
        let processed = self.processed_chunks.load(Ordering::Relaxed).min(total);
        let elapsed = self.started.elapsed();

        let percent = if total == 0 {
            100.0
        } else {
            processed as f64 / total as f64 * 100.0
        };
        let rate = if elapsed.as_secs_f64() > 0.0 {
            processed as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        let eta = if rate > 0.0 && processed < total {
            Some(Duration::from_secs_f64((total - processed) as f64 / rate))
        } else {
            None
        };

        ProgressReport {
            total_chunks: total,
            processed_chunks: processed,
            percent,
            chunks_per_second: rate,
            elapsed,
            eta,
        }
    }
}

/// Derived view of a [`Progress`] at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressReport {
    pub total_chunks: u64,
    pub processed_chunks: u64,
    /// 0.0 to 100.0; an empty job reports 100.
    pub percent: f64,
    pub chunks_per_second: f64,
    pub elapsed: Duration,
    /// None until there is enough throughput to extrapolate, or once
    /// the job is done.
    pub eta: Option<Duration>,
}

impl ProgressReport {
    pub fn is_complete(&self) -> bool {
        self.processed_chunks >= self.total_chunks
    }
}
