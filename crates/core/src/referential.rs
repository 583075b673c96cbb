//! Temporal modes for reads and writes
//!
//! A [`Referential`] parametrizes one operation:
//!
//! - `Any`: no temporal filter (read only)
//! - `Now`: the current instant, resolved once per value
//! - `At(t)`: a specific instant
//! - `Between { from, to }`: a closed window, `from <= to`
//!
//! `Now` memoizes its instant on first use. Every comparison made while
//! planning one batch sees the same "now", and clones of a value share it.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::{TemporaError, TemporaResult};
use crate::filter::ValidityFilter;
use crate::timestamp::Timestamp;

/// Lazily resolved "current instant"
#[derive(Debug, Clone, Default)]
pub struct NowPoint {
    resolved: Arc<OnceCell<Timestamp>>,
}

impl NowPoint {
    /// Unresolved; the clock is read on first access
    pub fn new() -> Self {
        Self::default()
    }

    /// Already resolved to a fixed instant
    pub fn pinned(at: Timestamp) -> Self {
        NowPoint {
            resolved: Arc::new(OnceCell::with_value(at)),
        }
    }

    /// The instant, reading the clock only the first time
    pub fn instant(&self) -> Timestamp {
        *self.resolved.get_or_init(Timestamp::now)
    }

    /// Has the instant been fixed yet
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }
}

/// Variant classification of a [`Referential`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferentialKind {
    /// No temporal filter
    Any,
    /// Current instant
    Now,
    /// Specific instant
    At,
    /// Closed window
    Between,
}

impl fmt::Display for ReferentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReferentialKind::Any => "ANY",
            ReferentialKind::Now => "NOW",
            ReferentialKind::At => "AT",
            ReferentialKind::Between => "BETWEEN",
        };
        f.write_str(name)
    }
}

/// Window a write applies to, after resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteWindow {
    /// Valid from this instant onwards
    Point(Timestamp),
    /// Valid over `[from, to)`
    Range {
        /// Inclusive start
        from: Timestamp,
        /// Exclusive end
        to: Timestamp,
    },
}

/// Temporal mode of one read or write
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ReferentialRepr", into = "ReferentialRepr")]
pub enum Referential {
    /// No temporal filter
    Any,
    /// Current instant, memoized
    Now(NowPoint),
    /// Specific instant
    At(Timestamp),
    /// Closed window
    Between {
        /// Lower bound
        from: Timestamp,
        /// Upper bound
        to: Timestamp,
    },
}

impl Referential {
    // =========================================================================
    // Factories
    // =========================================================================

    /// No temporal filter
    pub fn any() -> Self {
        Referential::Any
    }

    /// The current instant, resolved on first use
    pub fn now() -> Self {
        Referential::Now(NowPoint::new())
    }

    /// A `Now` already resolved to `at`
    pub fn now_pinned(at: Timestamp) -> Self {
        Referential::Now(NowPoint::pinned(at))
    }

    /// A specific instant
    pub fn at(at: Timestamp) -> Self {
        Referential::At(at)
    }

    /// A specific instant that may be absent
    pub fn try_at(at: Option<Timestamp>) -> TemporaResult<Self> {
        at.map(Referential::At)
            .ok_or_else(|| TemporaError::invalid_argument("Referential.at requires an instant"))
    }

    /// A closed window
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `from > to`.
    pub fn between(from: Timestamp, to: Timestamp) -> TemporaResult<Self> {
        if from > to {
            return Err(TemporaError::invalid_argument(format!(
                "Referential.between requires from <= to, got {} -> {}",
                from, to
            )));
        }
        Ok(Referential::Between { from, to })
    }

    /// A closed window whose bounds may be absent
    pub fn try_between(from: Option<Timestamp>, to: Option<Timestamp>) -> TemporaResult<Self> {
        match (from, to) {
            (Some(from), Some(to)) => Referential::between(from, to),
            _ => Err(TemporaError::invalid_argument(
                "Referential.between requires both a from and a to instant",
            )),
        }
    }

    // =========================================================================
    // Classification
    // =========================================================================

    /// Which variant this is
    pub fn kind(&self) -> ReferentialKind {
        match self {
            Referential::Any => ReferentialKind::Any,
            Referential::Now(_) => ReferentialKind::Now,
            Referential::At(_) => ReferentialKind::At,
            Referential::Between { .. } => ReferentialKind::Between,
        }
    }

    /// True for `Any`
    pub fn is_any(&self) -> bool {
        matches!(self, Referential::Any)
    }

    /// True for `Now`
    pub fn is_now(&self) -> bool {
        matches!(self, Referential::Now(_))
    }

    /// True for `At`
    pub fn is_at(&self) -> bool {
        matches!(self, Referential::At(_))
    }

    /// True for `Between`
    pub fn is_between(&self) -> bool {
        matches!(self, Referential::Between { .. })
    }

    /// The instant of a `Now` or `At`; resolves `Now` if needed
    pub fn point(&self) -> Option<Timestamp> {
        match self {
            Referential::Now(now) => Some(now.instant()),
            Referential::At(at) => Some(*at),
            _ => None,
        }
    }

    /// The bounds of a `Between`
    pub fn range(&self) -> Option<(Timestamp, Timestamp)> {
        match self {
            Referential::Between { from, to } => Some((*from, *to)),
            _ => None,
        }
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// The window a write with this referential applies to
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for `Any` (read only) and for an empty or
    /// inverted `Between`.
    pub fn resolve_write_window(&self) -> TemporaResult<WriteWindow> {
        match self {
            Referential::Any => Err(TemporaError::invalid_argument(
                "Referential.any cannot be used for insertions",
            )),
            Referential::Now(now) => Ok(WriteWindow::Point(now.instant())),
            Referential::At(at) => Ok(WriteWindow::Point(*at)),
            Referential::Between { from, to } if from < to => Ok(WriteWindow::Range {
                from: *from,
                to: *to,
            }),
            Referential::Between { from, to } => Err(TemporaError::invalid_argument(format!(
                "insertion window {} -> {} is empty",
                from, to
            ))),
        }
    }

    /// The read-side predicate for this referential
    pub fn validity_filter(&self) -> ValidityFilter {
        match self {
            Referential::Any => ValidityFilter::All,
            Referential::Now(now) => ValidityFilter::At(now.instant()),
            Referential::At(at) => ValidityFilter::At(*at),
            Referential::Between { from, to } => ValidityFilter::Covering {
                from: *from,
                to: *to,
            },
        }
    }
}

impl Default for Referential {
    fn default() -> Self {
        Referential::now()
    }
}

impl PartialEq for Referential {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Referential::Any, Referential::Any) => true,
            (Referential::Now(a), Referential::Now(b)) => a.instant() == b.instant(),
            (Referential::At(a), Referential::At(b)) => a == b,
            (
                Referential::Between { from: fa, to: ta },
                Referential::Between { from: fb, to: tb },
            ) => fa == fb && ta == tb,
            _ => false,
        }
    }
}

impl fmt::Display for Referential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Referential::Any => write!(f, "any"),
            Referential::Now(_) => write!(f, "now"),
            Referential::At(at) => write!(f, "at({})", at),
            Referential::Between { from, to } => write!(f, "between({} -> {})", from, to),
        }
    }
}

/// Wire form: `{"type": "AT", "at": ...}` and friends
#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
enum ReferentialRepr {
    Any,
    Now,
    At { at: Timestamp },
    Between { from: Timestamp, to: Timestamp },
}

impl From<Referential> for ReferentialRepr {
    fn from(r: Referential) -> Self {
        match r {
            Referential::Any => ReferentialRepr::Any,
            Referential::Now(_) => ReferentialRepr::Now,
            Referential::At(at) => ReferentialRepr::At { at },
            Referential::Between { from, to } => ReferentialRepr::Between { from, to },
        }
    }
}

impl TryFrom<ReferentialRepr> for Referential {
    type Error = TemporaError;

    fn try_from(repr: ReferentialRepr) -> TemporaResult<Self> {
        match repr {
            ReferentialRepr::Any => Ok(Referential::any()),
            ReferentialRepr::Now => Ok(Referential::now()),
            ReferentialRepr::At { at } => Ok(Referential::at(at)),
            ReferentialRepr::Between { from, to } => Referential::between(from, to),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_secs(secs)
    }

    #[test]
    fn test_now_is_memoized() {
        let now = Referential::now();
        let first = now.point().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert_eq!(now.point(), Some(first));
        assert_eq!(now.validity_filter(), ValidityFilter::At(first));
    }

    #[test]
    fn test_now_clones_share_resolution() {
        let now = Referential::now();
        let copy = now.clone();
        let resolved = copy.point().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert_eq!(now.point(), Some(resolved));
    }

    #[test]
    fn test_now_pinned() {
        let now = Referential::now_pinned(ts(42));
        match &now {
            Referential::Now(point) => assert!(point.is_resolved()),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(now.point(), Some(ts(42)));
    }

    #[test]
    fn test_try_factories_reject_absent_instants() {
        assert!(Referential::try_at(None).unwrap_err().is_invalid_argument());
        assert!(Referential::try_between(Some(ts(1)), None)
            .unwrap_err()
            .is_invalid_argument());
        assert!(Referential::try_between(None, Some(ts(1)))
            .unwrap_err()
            .is_invalid_argument());
        assert_eq!(Referential::try_at(Some(ts(3))).unwrap(), Referential::at(ts(3)));
    }

    #[test]
    fn test_between_rejects_inverted_bounds() {
        assert!(Referential::between(ts(2), ts(1)).unwrap_err().is_invalid_argument());
        assert!(Referential::between(ts(1), ts(1)).is_ok());
    }

    #[test]
    fn test_kind_and_accessors() {
        let between = Referential::between(ts(1), ts(2)).unwrap();
        assert_eq!(between.kind(), ReferentialKind::Between);
        assert!(between.is_between());
        assert_eq!(between.range(), Some((ts(1), ts(2))));
        assert_eq!(between.point(), None);

        let at = Referential::at(ts(5));
        assert_eq!(at.kind(), ReferentialKind::At);
        assert_eq!(at.range(), None);
        assert_eq!(at.point(), Some(ts(5)));

        assert_eq!(Referential::any().kind(), ReferentialKind::Any);
        assert!(Referential::now().is_now());
    }

    #[test]
    fn test_write_window() {
        assert_eq!(
            Referential::at(ts(5)).resolve_write_window().unwrap(),
            WriteWindow::Point(ts(5))
        );
        assert_eq!(
            Referential::between(ts(1), ts(2)).unwrap().resolve_write_window().unwrap(),
            WriteWindow::Range { from: ts(1), to: ts(2) }
        );
        assert!(Referential::any().resolve_write_window().unwrap_err().is_invalid_argument());
        assert!(Referential::between(ts(1), ts(1))
            .unwrap()
            .resolve_write_window()
            .unwrap_err()
            .is_invalid_argument());
    }

    #[test]
    fn test_display() {
        assert_eq!(Referential::any().to_string(), "any");
        assert_eq!(Referential::now().to_string(), "now");
        assert_eq!(Referential::at(ts(0)).to_string(), "at(1970-01-01T00:00:00Z)");
        assert_eq!(
            Referential::between(ts(0), ts(60)).unwrap().to_string(),
            "between(1970-01-01T00:00:00Z -> 1970-01-01T00:01:00Z)"
        );
    }

    #[test]
    fn test_serde_tagged_form() {
        let at = Referential::at(ts(1));
        let json = serde_json::to_value(&at).unwrap();
        assert_eq!(json, serde_json::json!({"type": "AT", "at": 1_000_000}));

        let any: Referential = serde_json::from_str(r#"{"type":"ANY"}"#).unwrap();
        assert!(any.is_any());

        let now: Referential = serde_json::from_str(r#"{"type":"NOW"}"#).unwrap();
        assert!(now.is_now());

        let between: Referential =
            serde_json::from_str(r#"{"type":"BETWEEN","from":1,"to":2}"#).unwrap();
        assert_eq!(between.range(), Some((Timestamp::from_micros(1), Timestamp::from_micros(2))));
    }

    #[test]
    fn test_serde_rejects_inverted_between() {
        let result: Result<Referential, _> =
            serde_json::from_str(r#"{"type":"BETWEEN","from":5,"to":2}"#);
        assert!(result.is_err());
    }
}
