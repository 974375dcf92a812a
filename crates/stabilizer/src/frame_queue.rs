//! Bounded FIFO of camera frames awaiting orientation data.
//!
//! The ring only holds (timestamp, slab key) pairs; image buffers stay put in
//! the slab until popped.
//!
//! Frames are never reordered. A timestamp that goes backwards means the
//! camera clock jumped, so everything queued is dropped.

use std::fmt;

use contracts::CameraFrame;
use ringbuf::{traits::*, HeapRb};
use slab::Slab;

/// Metadata stored in the ring buffer
#[derive(Debug, Clone, Copy)]
struct FrameMeta {
    timestamp: f64,
    slab_key: usize,
}

/// What happened to the queue on push
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PushOutcome {
    Queued,
    /// Queue was full, the oldest frame was dropped to make room
    DroppedOldest { timestamp: f64 },
    /// Timestamp went backwards, queued frames were cleared first
    Reset { cleared: usize, previous: f64 },
}

pub struct FrameQueue {
    index: HeapRb<FrameMeta>,
    storage: Slab<CameraFrame>,
    max_size: usize,
    dropped_count: u64,
    reset_count: u64,
    /// Timestamp of the previously accepted frame
    last_timestamp: Option<f64>,
}

impl fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameQueue")
            .field("len", &self.index.occupied_len())
            .field("max_size", &self.max_size)
            .field("dropped", &self.dropped_count)
            .field("resets", &self.reset_count)
            .finish()
    }
}

impl FrameQueue {
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            index: HeapRb::new(max_size),
            storage: Slab::with_capacity(max_size),
            max_size,
            dropped_count: 0,
            reset_count: 0,
            last_timestamp: None,
        }
    }

    /// Append a frame
    pub fn push(&mut self, frame: CameraFrame) -> PushOutcome {
        let timestamp = frame.timestamp;
        let mut outcome = PushOutcome::Queued;

        if let Some(previous) = self.last_timestamp {
            if timestamp < previous {
                let cleared = self.clear();
                self.reset_count += 1;
                outcome = PushOutcome::Reset { cleared, previous };
            }
        }
        self.last_timestamp = Some(timestamp);

        if self.index.is_full() {
            if let Some(old) = self.index.try_pop() {
                self.storage.remove(old.slab_key);
                outcome = PushOutcome::DroppedOldest {
                    timestamp: old.timestamp,
                };
            }
            self.dropped_count += 1;
        }

        // a slot was freed above, so the index has room for this frame
        let slab_key = self.storage.insert(frame);
        if self
            .index
            .try_push(FrameMeta {
                timestamp,
                slab_key,
            })
            .is_err()
        {
            self.storage.remove(slab_key);
            self.dropped_count += 1;
        }
        outcome
    }

    /// Oldest queued frame
    pub fn front(&self) -> Option<&CameraFrame> {
        self.index
            .iter()
            .next()
            .and_then(|meta| self.storage.get(meta.slab_key))
    }

    pub fn pop_front(&mut self) -> Option<CameraFrame> {
        let meta = self.index.try_pop()?;
        Some(self.storage.remove(meta.slab_key))
    }

    /// Drop every queued frame, returns how many were removed
    pub fn clear(&mut self) -> usize {
        let cleared = self.index.pop_iter().count();
        self.storage.clear();
        cleared
    }

    /// Forget the previous-frame reference along with the queued frames
    pub fn reset(&mut self) -> usize {
        self.last_timestamp = None;
        self.clear()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.occupied_len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }

    /// Frames dropped because the queue was full
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }

    /// Backwards timestamp jumps seen
    pub fn reset_count(&self) -> u64 {
        self.reset_count
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        self.last_timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::{CameraCalibration, DistortionCoeffs, ImageData, ImageFormat, Intrinsics};

    fn make_frame(timestamp: f64) -> CameraFrame {
        CameraFrame {
            timestamp,
            seq: None,
            image: ImageData {
                width: 2,
                height: 2,
                format: ImageFormat::Gray8,
                data: Bytes::from_static(&[0, 1, 2, 3]),
            },
            calibration: CameraCalibration {
                width: 2,
                height: 2,
                intrinsics: Intrinsics {
                    fx: 2.0,
                    fy: 2.0,
                    cx: 1.0,
                    cy: 1.0,
                },
                distortion: DistortionCoeffs::default(),
            },
        }
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = FrameQueue::new(4);
        for t in [1.0, 2.0, 3.0] {
            assert_eq!(queue.push(make_frame(t)), PushOutcome::Queued);
        }

        assert_eq!(queue.front().map(|f| f.timestamp), Some(1.0));
        assert_eq!(queue.pop_front().map(|f| f.timestamp), Some(1.0));
        assert_eq!(queue.pop_front().map(|f| f.timestamp), Some(2.0));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut queue = FrameQueue::new(2);
        queue.push(make_frame(1.0));
        queue.push(make_frame(2.0));
        let outcome = queue.push(make_frame(3.0));

        assert_eq!(outcome, PushOutcome::DroppedOldest { timestamp: 1.0 });
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.dropped_count(), 1);
        assert_eq!(queue.front().map(|f| f.timestamp), Some(2.0));
    }

    #[test]
    fn test_backwards_timestamp_clears_queue() {
        let mut queue = FrameQueue::new(8);
        queue.push(make_frame(5.0));
        queue.push(make_frame(6.0));

        let outcome = queue.push(make_frame(1.0));
        assert_eq!(
            outcome,
            PushOutcome::Reset {
                cleared: 2,
                previous: 6.0
            }
        );
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.reset_count(), 1);
        assert_eq!(queue.front().map(|f| f.timestamp), Some(1.0));
    }

    #[test]
    fn test_equal_timestamp_is_not_a_jump() {
        let mut queue = FrameQueue::new(8);
        queue.push(make_frame(1.0));
        assert_eq!(queue.push(make_frame(1.0)), PushOutcome::Queued);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_overflow_keeps_storage_in_step_with_index() {
        let mut queue = FrameQueue::new(3);
        for i in 0..50 {
            queue.push(make_frame(i as f64));
            assert_eq!(queue.storage.len(), queue.len());
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.dropped_count(), 47);

        while queue.pop_front().is_some() {}
        assert!(queue.storage.is_empty());
    }

    #[test]
    fn test_reset_forgets_previous_frame() {
        let mut queue = FrameQueue::new(8);
        queue.push(make_frame(5.0));
        assert_eq!(queue.reset(), 1);
        assert!(queue.is_empty());
        assert_eq!(queue.push(make_frame(1.0)), PushOutcome::Queued);
    }
}
