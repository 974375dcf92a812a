//! Time-indexed history with interpolated point lookup.
//!
//! Entries are appended at the back in non-decreasing timestamp order and
//! trimmed from the front once no pending query can need them.

use std::collections::VecDeque;
use std::fmt;

use nalgebra::{Quaternion, UnitQuaternion};

use crate::HistoryError;

/// Values that can be blended between two bracketing samples
pub trait Interpolate: Clone {
    /// Blend with `ratio` in [0, 1]; 0 yields `self`, 1 yields `other`
    fn interpolate(&self, other: &Self, ratio: f64) -> Self;
}

impl Interpolate for UnitQuaternion<f64> {
    fn interpolate(&self, other: &Self, ratio: f64) -> Self {
        // plain `slerp` panics on a degenerate pair
        self.try_slerp(other, ratio, 1.0e-9).unwrap_or_else(|| {
            let a: &Quaternion<f64> = self.quaternion();
            UnitQuaternion::from_quaternion(a.lerp(other.quaternion(), ratio))
        })
    }
}

impl Interpolate for f64 {
    fn interpolate(&self, other: &Self, ratio: f64) -> Self {
        self + (other - self) * ratio
    }
}

/// Where a lookup timestamp falls relative to the stored range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStatus {
    /// Bracketed by stored entries
    Good,
    /// Before the oldest entry, or the history is empty
    EarlierThanFront,
    /// After the newest entry
    LaterThanBack,
}

/// Lookup result
///
/// Out-of-range lookups still carry the nearest stored value as a best effort
/// (none when the history is empty).
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup<T> {
    pub status: LookupStatus,
    pub value: Option<T>,
}

impl<T> Lookup<T> {
    pub fn is_good(&self) -> bool {
        self.status == LookupStatus::Good
    }
}

/// Ordered (timestamp, value) store
pub struct TimeIndexedHistory<T> {
    entries: VecDeque<(f64, T)>,
    /// Optional bound, oldest entry is dropped on overflow
    capacity: Option<usize>,
    /// Earliest time a pending query may still ask for
    retain_from: Option<f64>,
    dropped_count: u64,
}

impl<T> fmt::Debug for TimeIndexedHistory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeIndexedHistory")
            .field("len", &self.entries.len())
            .field("front", &self.entries.front().map(|(t, _)| *t))
            .field("back", &self.entries.back().map(|(t, _)| *t))
            .field("capacity", &self.capacity)
            .field("retain_from", &self.retain_from)
            .field("dropped", &self.dropped_count)
            .finish()
    }
}

impl<T> Default for TimeIndexedHistory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimeIndexedHistory<T> {
    /// Unbounded history
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: None,
            retain_from: None,
            dropped_count: 0,
        }
    }

    /// History holding at most `capacity` entries (at least two)
    ///
    /// The bound yields to [`set_retain_from`](Self::set_retain_from): an
    /// entry still needed to bracket the retain point is kept even when that
    /// takes the history over capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: Some(capacity),
            retain_from: None,
            dropped_count: 0,
        }
    }

    /// Protect every entry a lookup at or after `timestamp` needs from
    /// capacity eviction; `None` lifts the protection
    pub fn set_retain_from(&mut self, timestamp: Option<f64>) {
        self.retain_from = timestamp;
    }

    pub fn retain_from(&self) -> Option<f64> {
        self.retain_from
    }

    /// Front may go only if the next entry still brackets the retain point
    fn front_is_expendable(&self) -> bool {
        match self.retain_from {
            None => true,
            Some(t) => self.entries.get(1).is_some_and(|(next, _)| *next <= t),
        }
    }

    /// Append an entry
    ///
    /// # Errors
    /// Rejects a timestamp older than the newest entry; the history is unchanged.
    pub fn push_back(&mut self, timestamp: f64, value: T) -> Result<(), HistoryError> {
        if !timestamp.is_finite() {
            return Err(HistoryError::NonFiniteTimestamp);
        }
        if let Some(&(back, _)) = self.entries.back() {
            if timestamp < back {
                return Err(HistoryError::OutOfOrder { timestamp, back });
            }
        }

        if let Some(capacity) = self.capacity {
            while self.entries.len() >= capacity && self.front_is_expendable() {
                self.entries.pop_front();
                self.dropped_count += 1;
            }
        }
        self.entries.push_back((timestamp, value));
        Ok(())
    }

    pub fn pop_front(&mut self) -> Option<(f64, T)> {
        self.entries.pop_front()
    }

    /// Drop entries that no lookup at or after `timestamp` can need
    ///
    /// The newest entry at or before `timestamp` is kept so that it can still
    /// bracket a later query. Returns the number of entries removed.
    pub fn discard_before(&mut self, timestamp: f64) -> usize {
        let mut removed = 0;
        while self.entries.len() >= 2 && self.entries[1].0 <= timestamp {
            self.entries.pop_front();
            removed += 1;
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn front(&self) -> Option<(f64, &T)> {
        self.entries.front().map(|(t, v)| (*t, v))
    }

    pub fn back(&self) -> Option<(f64, &T)> {
        self.entries.back().map(|(t, v)| (*t, v))
    }

    /// Entries evicted by the capacity bound
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }
}

impl<T: Interpolate> TimeIndexedHistory<T> {
    /// Value at `timestamp`, interpolated between the bracketing entries
    pub fn get(&self, timestamp: f64) -> Lookup<T> {
        let (Some((front, first)), Some((back, last))) = (self.entries.front(), self.entries.back())
        else {
            return Lookup {
                status: LookupStatus::EarlierThanFront,
                value: None,
            };
        };

        // NaN compares false everywhere and would otherwise land in `Good`
        if timestamp.is_nan() || timestamp < *front {
            return Lookup {
                status: LookupStatus::EarlierThanFront,
                value: Some(first.clone()),
            };
        }
        if timestamp > *back {
            return Lookup {
                status: LookupStatus::LaterThanBack,
                value: Some(last.clone()),
            };
        }

        // first entry strictly after `timestamp`; front <= timestamp guarantees idx >= 1
        let idx = self.entries.partition_point(|(t, _)| *t <= timestamp);
        let (t0, v0) = &self.entries[idx - 1];
        let value = match self.entries.get(idx) {
            Some((t1, v1)) if t1 > t0 => v0.interpolate(v1, (timestamp - t0) / (t1 - t0)),
            _ => v0.clone(),
        };

        Lookup {
            status: LookupStatus::Good,
            value: Some(value),
        }
    }
}
