//! Backpressure configuration and metrics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use contracts::{SourceKind, SourcesConfig};
pub use contracts::DropPolicy;

/// Backpressure configuration
#[derive(Debug, Clone)]
pub struct BackpressureConfig {
    /// Channel capacity
    pub channel_capacity: usize,

    /// Drop policy when full
    pub drop_policy: DropPolicy,
}

impl Default for BackpressureConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            drop_policy: DropPolicy::DropOldest,
        }
    }
}

impl BackpressureConfig {
    /// Create new backpressure configuration
    pub fn new(channel_capacity: usize, drop_policy: DropPolicy) -> Self {
        Self {
            channel_capacity,
            drop_policy,
        }
    }
}

impl From<&SourcesConfig> for BackpressureConfig {
    fn from(config: &SourcesConfig) -> Self {
        Self::new(config.channel_capacity, config.drop_policy)
    }
}

/// Ingestion metrics
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Gyro samples received
    pub imu_received: AtomicU64,

    /// Camera frames received
    pub frames_received: AtomicU64,

    /// Events dropped by backpressure
    pub events_dropped: AtomicU64,

    /// Current queue length
    pub queue_len: AtomicUsize,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record event received
    pub fn record_received(&self, kind: SourceKind) {
        let counter = match kind {
            SourceKind::Imu => &self.imu_received,
            SourceKind::Camera => &self.frames_received,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record event dropped
    pub fn record_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Update queue length
    pub fn update_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            imu_received: self.imu_received.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            queue_len: self.queue_len.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub imu_received: u64,
    pub frames_received: u64,
    pub events_dropped: u64,
    pub queue_len: usize,
}

impl MetricsSnapshot {
    /// Total events received across both streams
    pub fn total_received(&self) -> u64 {
        self.imu_received + self.frames_received
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_count_per_stream() {
        let metrics = IngestionMetrics::new();
        metrics.record_received(SourceKind::Imu);
        metrics.record_received(SourceKind::Imu);
        metrics.record_received(SourceKind::Camera);
        metrics.record_dropped();
        metrics.update_queue_len(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.imu_received, 2);
        assert_eq!(snapshot.frames_received, 1);
        assert_eq!(snapshot.total_received(), 3);
        assert_eq!(snapshot.events_dropped, 1);
        assert_eq!(snapshot.queue_len, 3);
    }

    #[test]
    fn test_backpressure_from_sources_config() {
        let sources = SourcesConfig {
            channel_capacity: 16,
            drop_policy: DropPolicy::DropNewest,
            ..Default::default()
        };
        let config = BackpressureConfig::from(&sources);
        assert_eq!(config.channel_capacity, 16);
        assert_eq!(config.drop_policy, DropPolicy::DropNewest);
    }
}
