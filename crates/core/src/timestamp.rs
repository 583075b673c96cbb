//! Microsecond-precision instant type
//!
//! Validity bounds and referential instants are all [`Timestamp`]s.
//!
//! ## Precision
//!
//! Timestamps are stored as signed microseconds since Unix epoch
//! (1970-01-01 00:00:00 UTC). Signed storage lets callers record history
//! that predates the epoch (birth dates, archival records).
//!
//! ## Usage
//!
//! ```
//! use tempora_core::Timestamp;
//!
//! let now = Timestamp::now();
//! let from_secs = Timestamp::from_secs(1000);
//! let parsed = Timestamp::parse_rfc3339("2001-01-01T00:00:00Z").unwrap();
//! assert!(parsed < now);
//! assert!(from_secs < parsed);
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{TemporaError, TemporaResult};

/// Microsecond-precision instant
///
/// ## Invariants
///
/// - Timestamps are always in microseconds
/// - Timestamps are totally ordered
/// - The zero timestamp represents Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Unix epoch (1970-01-01 00:00:00 UTC)
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Earliest representable instant
    pub const MIN: Timestamp = Timestamp(i64::MIN);

    /// Latest representable instant
    pub const MAX: Timestamp = Timestamp(i64::MAX);

    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a timestamp for the current moment
    pub fn now() -> Self {
        Timestamp(Utc::now().timestamp_micros())
    }

    /// Create a timestamp from microseconds since epoch
    #[inline]
    pub const fn from_micros(micros: i64) -> Self {
        Timestamp(micros)
    }

    /// Create a timestamp from milliseconds since epoch
    #[inline]
    pub const fn from_millis(millis: i64) -> Self {
        Timestamp(millis.saturating_mul(1_000))
    }

    /// Create a timestamp from seconds since epoch
    #[inline]
    pub const fn from_secs(secs: i64) -> Self {
        Timestamp(secs.saturating_mul(1_000_000))
    }

    /// Parse an RFC 3339 instant such as `2001-01-01T00:00:00Z`
    ///
    /// Sub-microsecond precision is truncated.
    pub fn parse_rfc3339(input: &str) -> TemporaResult<Self> {
        DateTime::parse_from_rfc3339(input.trim())
            .map(|dt| Timestamp::from(dt.with_timezone(&Utc)))
            .map_err(|e| {
                TemporaError::invalid_argument(format!("invalid RFC 3339 instant '{}': {}", input, e))
            })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get microseconds since Unix epoch
    #[inline]
    pub const fn as_micros(&self) -> i64 {
        self.0
    }

    /// Get milliseconds since Unix epoch (floored)
    #[inline]
    pub const fn as_millis(&self) -> i64 {
        self.0.div_euclid(1_000)
    }

    /// Get seconds since Unix epoch (floored)
    #[inline]
    pub const fn as_secs(&self) -> i64 {
        self.0.div_euclid(1_000_000)
    }

    /// Convert to a chrono UTC datetime
    ///
    /// Returns `None` outside chrono's representable range.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let secs = self.0.div_euclid(1_000_000);
        let nanos = (self.0.rem_euclid(1_000_000) * 1_000) as u32;
        DateTime::from_timestamp(secs, nanos)
    }

    /// Render as RFC 3339 with microsecond precision when needed
    ///
    /// Falls back to raw microseconds outside chrono's range.
    pub fn to_rfc3339(&self) -> String {
        match self.to_datetime() {
            Some(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            None => format!("{}us", self.0),
        }
    }

    // =========================================================================
    // Duration Operations
    // =========================================================================

    /// Add a duration, returning `None` on overflow
    pub fn checked_add(&self, duration: Duration) -> Option<Self> {
        let micros = i64::try_from(duration.as_micros()).ok()?;
        self.0.checked_add(micros).map(Timestamp)
    }

    /// Subtract a duration, returning `None` on overflow
    pub fn checked_sub(&self, duration: Duration) -> Option<Self> {
        let micros = i64::try_from(duration.as_micros()).ok()?;
        self.0.checked_sub(micros).map(Timestamp)
    }

    /// Add a duration, saturating at `Timestamp::MAX`
    pub fn saturating_add(&self, duration: Duration) -> Self {
        self.checked_add(duration).unwrap_or(Timestamp::MAX)
    }

    /// Subtract a duration, saturating at `Timestamp::MIN`
    pub fn saturating_sub(&self, duration: Duration) -> Self {
        self.checked_sub(duration).unwrap_or(Timestamp::MIN)
    }

    /// Compute duration since an earlier timestamp
    ///
    /// Returns `None` if `earlier` is actually later than `self`.
    pub fn duration_since(&self, earlier: Timestamp) -> Option<Duration> {
        let delta = self.0.checked_sub(earlier.0)?;
        u64::try_from(delta).ok().map(Duration::from_micros)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::EPOCH
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

// ============================================================================
// From Implementations
// ============================================================================

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Timestamp(dt.timestamp_micros())
    }
}

impl From<i64> for Timestamp {
    /// Create from raw microseconds
    fn from(micros: i64) -> Self {
        Timestamp::from_micros(micros)
    }
}

impl From<Timestamp> for i64 {
    /// Extract raw microseconds
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}
