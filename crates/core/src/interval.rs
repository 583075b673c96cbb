//! Validity interval model
//!
//! A stored version is valid over `[start, end)`; `end = None` means the
//! version is still in effect (open). This module holds the pure overlap
//! classification the insertion planner relies on.
//!
//! ## Classification of a different-hash version
//!
//! Point write at `at`:
//!
//! | existing                         | outcome                  |
//! |----------------------------------|--------------------------|
//! | `start >= at`                    | removed                  |
//! | `start < at < end` (or open)     | end truncated to `at`    |
//! | `end <= at`                      | untouched                |
//!
//! Range write over `[from, to)`:
//!
//! | existing                              | outcome                     |
//! |---------------------------------------|-----------------------------|
//! | `start >= from` and `end <= to`       | removed                     |
//! | `start < from < end` (or open)        | end truncated to `from`     |
//! | `from <= start < to < end` (or open)  | start pushed to `to`        |
//! | otherwise                             | untouched                   |
//!
//! A version straddling the whole range only receives the left truncation:
//! its fragment after `to` is dropped. Comparisons against bounds are strict
//! so that no truncation ever yields an empty interval.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::timestamp::Timestamp;

/// Half-open validity interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Validity {
    /// Inclusive lower bound
    pub start: Timestamp,
    /// Exclusive upper bound; `None` when open
    pub end: Option<Timestamp>,
}

/// How a write window affects an existing different-hash version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlap {
    /// Not affected
    Disjoint,
    /// Entirely superseded, must be removed
    Full,
    /// Keep the head: end moves back to the given instant
    TruncateEnd(Timestamp),
    /// Keep the tail: start moves forward to the given instant
    TruncateStart(Timestamp),
}

impl Overlap {
    /// Apply the outcome to an interval
    ///
    /// Returns `None` when the version must be removed.
    pub fn apply(self, validity: Validity) -> Option<Validity> {
        match self {
            Overlap::Disjoint => Some(validity),
            Overlap::Full => None,
            Overlap::TruncateEnd(end) => Some(Validity::new(validity.start, Some(end))),
            Overlap::TruncateStart(start) => Some(Validity::new(start, validity.end)),
        }
    }
}

impl Validity {
    /// Build an interval from raw bounds
    pub const fn new(start: Timestamp, end: Option<Timestamp>) -> Self {
        Validity { start, end }
    }

    /// `[start, ∞)`
    pub const fn open(start: Timestamp) -> Self {
        Validity { start, end: None }
    }

    /// `[start, end)`
    pub const fn closed(start: Timestamp, end: Timestamp) -> Self {
        Validity {
            start,
            end: Some(end),
        }
    }

    /// True when the interval has no upper bound
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// True when `start >= end`
    pub fn is_empty(&self) -> bool {
        self.end.is_some_and(|end| end <= self.start)
    }

    /// Does the interval contain the instant
    pub fn contains(&self, at: Timestamp) -> bool {
        self.start <= at && self.ends_after(at)
    }

    /// Is `end` strictly after the instant (open counts as after everything)
    pub fn ends_after(&self, at: Timestamp) -> bool {
        self.end.map_or(true, |end| end > at)
    }

    /// Do two intervals share at least one instant
    pub fn overlaps(&self, other: &Validity) -> bool {
        self.ends_after(other.start) && other.ends_after(self.start)
    }

    /// Smallest interval containing both; open if either is open
    pub fn hull(&self, other: &Validity) -> Validity {
        let end = match (self.end, other.end) {
            (Some(a), Some(b)) => Some(a.max(b)),
            _ => None,
        };
        Validity::new(self.start.min(other.start), end)
    }

    // =========================================================================
    // Point write classification
    // =========================================================================

    /// Starts at or after a point write, so the write supersedes it entirely
    pub fn fully_overlapped_by_point(&self, at: Timestamp) -> bool {
        self.start >= at
    }

    /// Started before a point write and is still valid after it
    pub fn partially_overlaps_point(&self, at: Timestamp) -> bool {
        self.start < at && self.ends_after(at)
    }

    /// Classify a different-hash version against a point write
    pub fn classify_point(&self, at: Timestamp) -> Overlap {
        if self.fully_overlapped_by_point(at) {
            Overlap::Full
        } else if self.partially_overlaps_point(at) {
            Overlap::TruncateEnd(at)
        } else {
            Overlap::Disjoint
        }
    }

    /// A same-hash version that can be widened to absorb a point write
    pub fn touches_point(&self, at: Timestamp) -> bool {
        self.end.map_or(true, |end| end >= at)
    }

    // =========================================================================
    // Range write classification
    // =========================================================================

    /// Lies entirely inside `[from, to]`; an open version never does
    pub fn fully_within(&self, from: Timestamp, to: Timestamp) -> bool {
        self.start >= from && self.end.is_some_and(|end| end <= to)
    }

    /// Starts before `from` and is still valid after it
    pub fn straddles_left(&self, from: Timestamp) -> bool {
        self.start < from && self.ends_after(from)
    }

    /// Starts before `to` and is still valid after it
    pub fn straddles_right(&self, to: Timestamp) -> bool {
        self.start < to && self.ends_after(to)
    }

    /// Classify a different-hash version against a range write
    pub fn classify_range(&self, from: Timestamp, to: Timestamp) -> Overlap {
        if self.fully_within(from, to) {
            Overlap::Full
        } else if self.straddles_left(from) {
            Overlap::TruncateEnd(from)
        } else if self.straddles_right(to) {
            Overlap::TruncateStart(to)
        } else {
            Overlap::Disjoint
        }
    }

    /// A same-hash version that can be merged with a range write
    ///
    /// Adjacent intervals count: `[a, from)` touches `[from, to]`.
    pub fn touches_range(&self, from: Timestamp, to: Timestamp) -> bool {
        self.start <= to && self.end.map_or(true, |end| end >= from)
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "[{}, {})", self.start, end),
            None => write!(f, "[{}, ∞)", self.start),
        }
    }
}
