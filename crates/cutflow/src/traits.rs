//! Core traits for the cut-flow framework.
//!
//! Selections are the pluggable predicates a stage evaluates. The
//! framework never inspects events or objects itself: it only sequences
//! selections, short-circuits, counts and merges.

use crate::filter::FilterState;
use std::collections::BTreeMap;

/// Filter-specific extra statistics, keyed by label.
pub type Details = BTreeMap<String, f64>;

/// Outcome of evaluating an event selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// The event passes the stage
    Accept,
    /// The event fails the stage and is counted as a rejection
    Reject,
    /// The event is excluded from the accounting entirely
    Abstain,
}

impl Verdict {
    /// True for `Accept` only.
    pub fn is_accept(self) -> bool {
        matches!(self, Verdict::Accept)
    }
}

impl From<bool> for Verdict {
    fn from(passes: bool) -> Self {
        if passes { Verdict::Accept } else { Verdict::Reject }
    }
}

/// `None` abstains.
impl From<Option<bool>> for Verdict {
    fn from(passes: Option<bool>) -> Self {
        passes.map_or(Verdict::Abstain, Verdict::from)
    }
}

/// Per-event predicate evaluated by an `EventFilter`.
///
/// ## Design Note
/// - `&mut self` lets selections keep deferred state that `finalize` flushes
/// - `details` is the owning filter's open statistics mapping
pub trait EventSelection<E>: Send {
    /// Seed `details` when the owning filter is built.
    fn prepare(&mut self, _details: &mut Details) {}

    /// Decide whether `event` passes.
    fn passes(&mut self, event: &E, details: &mut Details) -> Verdict;

    /// Flush any deferred state once processing is complete.
    fn finalize(&mut self, _details: &mut Details) {}
}

/// Per-event collection predicate evaluated by an `ObjectFilter`.
///
/// Takes ownership of the collection and returns the retained subset,
/// so that narrowing never requires cloning objects. The result must not
/// hold more objects than the input; in objects mode the owning filter
/// counts at most the input size as passing.
pub trait ObjectSelection<E, O>: Send {
    fn filtered(&mut self, event: &E, collection: Vec<O>, details: &mut Details) -> Vec<O>;
}

/// Read-only view of the counters of one cut-flow stage.
///
/// Implemented by live filters and by plain state records alike, which is
/// what lets `Filter::add` and `FilterList::merge` mix the two.
pub trait Accounting {
    fn name(&self) -> &str;

    /// Number of events (or objects) examined.
    fn total(&self) -> u64;

    /// Number of events (or objects) that passed.
    fn passing(&self) -> u64;

    fn details(&self) -> &Details;

    fn count_funcs_total(&self) -> &BTreeMap<String, f64>;

    fn count_funcs_passing(&self) -> &BTreeMap<String, f64>;

    /// Snapshot the counters as a serializable record.
    fn state(&self) -> FilterState {
        FilterState {
            name: self.name().to_string(),
            total: self.total(),
            passing: self.passing(),
            details: self.details().clone(),
            count_funcs_total: self.count_funcs_total().clone(),
            count_funcs_passing: self.count_funcs_passing().clone(),
        }
    }

    /// Fraction of examined entries that passed, `None` before anything was examined.
    fn efficiency(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(self.passing() as f64 / total as f64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_conversions() {
        assert_eq!(Verdict::from(true), Verdict::Accept);
        assert_eq!(Verdict::from(false), Verdict::Reject);
        assert_eq!(Verdict::from(None), Verdict::Abstain);
        assert_eq!(Verdict::from(Some(false)), Verdict::Reject);
        assert!(Verdict::Accept.is_accept());
        assert!(!Verdict::Abstain.is_accept());
    }

    #[test]
    fn test_efficiency() {
        let mut state = FilterState::new("cut");
        assert_eq!(state.efficiency(), None);

        state.total = 4;
        state.passing = 1;
        assert_eq!(state.efficiency(), Some(0.25));
    }
}
