//! Per-sink counters, shared between a [`SinkHandle`](crate::SinkHandle) and its worker.
//!
//! Writes are counted per output kind so a sink that keeps up with the
//! orientation stream but chokes on images shows up in the snapshot.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use contracts::StabilizerOutput;

#[derive(Debug, Default)]
pub struct SinkMetrics {
    queued: AtomicUsize,
    frames_written: AtomicU64,
    orientations_written: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_queued(&self, len: usize) {
        self.queued.store(len, Ordering::Relaxed);
    }

    /// Count a successful write of `output`
    pub(crate) fn record_written(&self, output: &StabilizerOutput) {
        let counter = match output {
            StabilizerOutput::Frame(_) => &self.frames_written,
            StabilizerOutput::Orientation(_) => &self.orientations_written,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::Relaxed)
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written.load(Ordering::Relaxed)
    }

    pub fn orientations_written(&self) -> u64 {
        self.orientations_written.load(Ordering::Relaxed)
    }

    /// Writes that returned an error, any kind
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Outputs rejected because the sink queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queued: self.queued(),
            frames_written: self.frames_written(),
            orientations_written: self.orientations_written(),
            failed: self.failed(),
            dropped: self.dropped(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queued: usize,
    pub frames_written: u64,
    pub orientations_written: u64,
    pub failed: u64,
    pub dropped: u64,
}

impl MetricsSnapshot {
    pub fn total_written(&self) -> u64 {
        self.frames_written + self.orientations_written
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frames={} orientations={} failed={} dropped={} queued={}",
            self.frames_written, self.orientations_written, self.failed, self.dropped, self.queued
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::tests::{frame, orientation};

    #[test]
    fn test_writes_counted_per_kind() {
        let metrics = SinkMetrics::new();
        metrics.record_written(&frame(0));
        metrics.record_written(&frame(1));
        metrics.record_written(&orientation(0.1));
        metrics.record_dropped();
        metrics.set_queued(4);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.frames_written, 2);
        assert_eq!(snapshot.orientations_written, 1);
        assert_eq!(snapshot.total_written(), 3);
        assert_eq!(
            snapshot.to_string(),
            "frames=2 orientations=1 failed=0 dropped=1 queued=4"
        );
    }
}
