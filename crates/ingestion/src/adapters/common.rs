//! Adapter common utility functions

use std::sync::Arc;

use async_channel::{Receiver, Sender, TrySendError};
use contracts::{DropPolicy, InboundEvent};
use tracing::{trace, warn};

use crate::config::IngestionMetrics;

/// Send event, handling backpressure policy
///
/// `DropOldest` pops the head of the queue through `evict` and retries once.
/// If the retry still finds the queue full the new event is dropped.
#[inline]
pub fn send_event(
    tx: &Sender<InboundEvent>,
    evict: &Receiver<InboundEvent>,
    event: InboundEvent,
    metrics: &Arc<IngestionMetrics>,
    source_id: &str,
    drop_policy: DropPolicy,
) {
    let event = match tx.try_send(event) {
        Ok(()) => {
            trace!(source_id = %source_id, "event sent");
            metrics.update_queue_len(tx.len());
            return;
        }
        Err(TrySendError::Closed(_)) => {
            warn!(source_id = %source_id, "channel closed");
            return;
        }
        Err(TrySendError::Full(event)) => event,
    };

    metrics.record_dropped();
    metrics::counter!("vgimbal_ingest_dropped_total", "source" => source_id.to_string())
        .increment(1);

    match drop_policy {
        DropPolicy::DropNewest => {
            trace!(source_id = %source_id, "event dropped (newest)");
        }
        DropPolicy::DropOldest => {
            if let Ok(old) = evict.try_recv() {
                trace!(
                    source_id = %source_id,
                    dropped_timestamp = old.timestamp(),
                    "event dropped (oldest)"
                );
            }
            if tx.try_send(event).is_err() {
                metrics.record_dropped();
                trace!(source_id = %source_id, "event dropped after eviction");
            }
        }
    }
    metrics.update_queue_len(tx.len());
}

/// Safely convert slice implementing bytemuck::Pod to bytes::Bytes
#[inline]
pub fn pod_slice_to_bytes<T: bytemuck::Pod>(slice: &[T]) -> bytes::Bytes {
    bytes::Bytes::copy_from_slice(bytemuck::cast_slice(slice))
}
