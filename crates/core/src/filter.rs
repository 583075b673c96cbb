//! Read-side validity predicate
//!
//! `Between` reads select versions valid *throughout* the window, not
//! versions merely overlapping it.

use crate::interval::Validity;
use crate::timestamp::Timestamp;

/// Predicate over stored validity intervals, derived from a `Referential`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidityFilter {
    /// Every version
    All,
    /// `start <= t` and (`end` open or `end > t`)
    At(Timestamp),
    /// `start <= from` and (`end` open or `end > to`)
    Covering {
        /// Window start
        from: Timestamp,
        /// Window end
        to: Timestamp,
    },
}

impl ValidityFilter {
    /// Does a version with this validity pass the filter
    pub fn matches(&self, validity: &Validity) -> bool {
        match *self {
            ValidityFilter::All => true,
            ValidityFilter::At(at) => validity.contains(at),
            ValidityFilter::Covering { from, to } => {
                validity.start <= from && validity.ends_after(to)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(micros: i64) -> Timestamp {
        Timestamp::from_micros(micros)
    }

    #[test]
    fn test_all_matches_everything() {
        assert!(ValidityFilter::All.matches(&Validity::closed(ts(0), ts(1))));
        assert!(ValidityFilter::All.matches(&Validity::open(ts(0))));
    }

    #[test]
    fn test_at_is_half_open() {
        let v = Validity::closed(ts(10), ts(20));
        assert!(ValidityFilter::At(ts(10)).matches(&v));
        assert!(!ValidityFilter::At(ts(20)).matches(&v));
        assert!(!ValidityFilter::At(ts(9)).matches(&v));
        assert!(ValidityFilter::At(ts(1_000)).matches(&Validity::open(ts(10))));
    }

    #[test]
    fn test_covering_requires_whole_window() {
        let v = Validity::closed(ts(10), ts(20));
        assert!(ValidityFilter::Covering { from: ts(10), to: ts(19) }.matches(&v));
        // Overlapping is not enough
        assert!(!ValidityFilter::Covering { from: ts(5), to: ts(15) }.matches(&v));
        assert!(!ValidityFilter::Covering { from: ts(15), to: ts(25) }.matches(&v));
        // The exclusive end cannot cover `to`
        assert!(!ValidityFilter::Covering { from: ts(10), to: ts(20) }.matches(&v));
        assert!(ValidityFilter::Covering { from: ts(15), to: ts(1_000) }.matches(&Validity::open(ts(10))));
    }
}
