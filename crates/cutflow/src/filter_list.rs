//! Ordered sequences of filters forming one cut-flow pipeline.
//!
//! `FilterList` is generic over its element, so the typed variants are
//! plain aliases and putting the wrong kind of stage into a list is a
//! compile error rather than a runtime check.

use crate::error::{FilterError, Result};
use crate::event_filter::EventFilter;
use crate::filter::{Filter, FilterState, value_kind};
use crate::object_filter::ObjectFilter;
use crate::report::cutflow_table;
use crate::traits::Accounting;
use rayon::prelude::*;
use serde_json::Value;
use std::fmt;
use std::ops::Index;

/// Chains filters together into a cut-flow.
///
/// ## Usage
/// ```ignore
/// let mut cuts = EventFilterList::new()
///     .with_filter(EventFilter::accept_all("entry"))
///     .with_filter(EventFilter::new("met", FnSelection::new(|e: &Event| (e.met > 20.0).into())));
///
/// for event in &events {
///     if cuts.apply(event) { /* selected */ }
/// }
/// println!("{cuts}");
/// ```
#[derive(Debug, Clone)]
pub struct FilterList<F> {
    filters: Vec<F>,
}

/// A pipeline of per-event stages.
pub type EventFilterList<E> = FilterList<EventFilter<E>>;

/// A pipeline of per-event collection stages.
pub type ObjectFilterList<E, O> = FilterList<ObjectFilter<E, O>>;

impl<F> FilterList<F> {
    /// Create a new empty FilterList.
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Add a filter to the end of the list (builder pattern).
    pub fn with_filter(mut self, filter: F) -> Self {
        self.filters.push(filter);
        self
    }

    /// Append a filter.
    pub fn push(&mut self, filter: F) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&F> {
        self.filters.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut F> {
        self.filters.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, F> {
        self.filters.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, F> {
        self.filters.iter_mut()
    }

    pub fn into_inner(self) -> Vec<F> {
        self.filters
    }
}

impl<F: Accounting> FilterList<F> {
    /// Entry count of the pipeline: the first stage's total, 0 when empty.
    pub fn total(&self) -> u64 {
        self.filters.first().map_or(0, Accounting::total)
    }

    /// Survivors of the whole pipeline: the last stage's passing count, 0 when empty.
    pub fn passing(&self) -> u64 {
        self.filters.last().map_or(0, Accounting::passing)
    }

    /// Plain state records of every stage, in order.
    pub fn states(&self) -> Vec<FilterState> {
        self.filters.iter().map(Accounting::state).collect()
    }

    /// Render the cut-flow table.
    pub fn report(&self) -> String {
        cutflow_table(&self.filters)
    }
}

impl<E> FilterList<Filter<E>> {
    /// Rebuild a list of filters from state records.
    pub fn from_states<I>(states: I) -> Result<Self>
    where
        I: IntoIterator<Item = FilterState>,
    {
        states
            .into_iter()
            .map(Filter::from_state)
            .collect::<Result<Vec<_>>>()
            .map(Self::from)
    }

    /// Combine two lists position by position.
    ///
    /// Elements may be live filters or state records. Both lists must have
    /// the same length and matching names at every position.
    pub fn merge<A, B>(list1: &FilterList<A>, list2: &FilterList<B>) -> Result<Self>
    where
        A: Accounting,
        B: Accounting,
    {
        if list1.len() != list2.len() {
            return Err(FilterError::LengthMismatch {
                left: list1.len(),
                right: list2.len(),
            });
        }

        let merged = list1
            .iter()
            .zip(list2.iter())
            .map(|(left, right)| Filter::add(left, right))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(filters = merged.len(), "merged filter lists");
        Ok(Self::from(merged))
    }

    /// Reduce the lists of independent runs into one.
    ///
    /// The reduction runs on the rayon pool; since `merge` is associative
    /// and commutative on counters, the grouping does not matter. An empty
    /// input yields an empty list.
    pub fn merge_all<A>(lists: Vec<FilterList<A>>) -> Result<Self>
    where
        A: Accounting + Send,
    {
        let count = lists.len();
        let merged = lists
            .into_par_iter()
            .map(|list| Self::from_states(list.states()))
            .try_reduce_with(|left, right| Self::merge(&left, &right))
            .unwrap_or_else(|| Ok(Self::new()))?;

        tracing::debug!(lists = count, filters = merged.len(), "reduced filter lists");
        Ok(merged)
    }
}

impl FilterList<FilterState> {
    /// Decode a list of state records from an untyped JSON value.
    ///
    /// Fails with `TypeMismatch` if `value` is not an array, or if any
    /// element is not a state record.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(FilterState::from_value)
                .collect::<Result<Vec<_>>>()
                .map(Self::from),
            other => Err(FilterError::TypeMismatch {
                expected: "list of filter state records (array)",
                found: value_kind(&other).to_string(),
            }),
        }
    }
}

impl<E> FilterList<EventFilter<E>> {
    /// Run one event through every stage in order.
    ///
    /// Stops at the first stage that rejects or abstains; later stages are
    /// not evaluated and their counters are untouched.
    pub fn apply(&mut self, event: &E) -> bool {
        for filter in &mut self.filters {
            if !filter.apply(event) {
                tracing::trace!(filter = filter.name(), "event stopped");
                return false;
            }
        }
        true
    }

    /// Finalize every stage, in order.
    pub fn finalize(&mut self) {
        for filter in &mut self.filters {
            filter.finalize();
        }
    }
}

impl<E, O> FilterList<ObjectFilter<E, O>> {
    /// Thread a collection through every stage in order.
    ///
    /// An empty intermediate result is a veto: it is returned immediately
    /// and later stages are not evaluated.
    pub fn apply(&mut self, event: &E, collection: Vec<O>) -> Vec<O> {
        let mut current = collection;
        for filter in &mut self.filters {
            current = filter.apply(event, current);
            if current.is_empty() {
                tracing::trace!(filter = filter.name(), "collection emptied");
                return current;
            }
        }
        current
    }
}

impl<F> Default for FilterList<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> From<Vec<F>> for FilterList<F> {
    fn from(filters: Vec<F>) -> Self {
        Self { filters }
    }
}

impl<F> FromIterator<F> for FilterList<F> {
    fn from_iter<I: IntoIterator<Item = F>>(iter: I) -> Self {
        Self {
            filters: iter.into_iter().collect(),
        }
    }
}

impl<F> IntoIterator for FilterList<F> {
    type Item = F;
    type IntoIter = std::vec::IntoIter<F>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.into_iter()
    }
}

impl<'a, F> IntoIterator for &'a FilterList<F> {
    type Item = &'a F;
    type IntoIter = std::slice::Iter<'a, F>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.iter()
    }
}

impl<F> Index<usize> for FilterList<F> {
    type Output = F;

    fn index(&self, index: usize) -> &F {
        &self.filters[index]
    }
}

impl<F: Accounting> fmt::Display for FilterList<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.report())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{FnSelection, Retain};
    use crate::traits::{Details, EventSelection, Verdict};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn state(name: &str, total: u64, passing: u64) -> FilterState {
        FilterState {
            name: name.to_string(),
            total,
            passing,
            ..Default::default()
        }
    }

    fn threshold(name: &str, min: i32) -> EventFilter<i32> {
        EventFilter::new(name, FnSelection::new(move |x: &i32| Verdict::from(*x >= min)))
    }

    #[test]
    fn test_empty_list_totals() {
        let list: FilterList<FilterState> = FilterList::new();
        assert_eq!(list.total(), 0);
        assert_eq!(list.passing(), 0);
        assert_eq!(list.to_string(), "Empty FilterList");
    }

    #[test]
    fn test_event_list_short_circuits() {
        let mut list = EventFilterList::new()
            .with_filter(threshold("a", 0))
            .with_filter(threshold("b", 10))
            .with_filter(threshold("c", 0));

        assert!(!list.apply(&5));
        assert_eq!(list[0].total(), 1);
        assert_eq!(list[1].total(), 1);
        assert_eq!(list[2].total(), 0);

        assert!(list.apply(&20));
        assert_eq!(list.total(), 2);
        assert_eq!(list.passing(), 1);
    }

    #[test]
    fn test_object_list_threads_collection() {
        let mut list: ObjectFilterList<(), u32> = FilterList::new()
            .with_filter(ObjectFilter::new("even", Retain::new(|_: &(), x: &u32| x % 2 == 0)))
            .with_filter(ObjectFilter::new("small", Retain::new(|_: &(), x: &u32| *x < 5)));

        assert_eq!(list.apply(&(), vec![1, 2, 3, 4, 6, 8]), vec![2, 4]);

        assert!(list.apply(&(), vec![1, 3]).is_empty());
        // the second stage never saw the vetoed event
        assert_eq!(list[1].total(), 4);
    }

    /// Rejects negative values and logs its name when finalized.
    struct Logged {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl EventSelection<i32> for Logged {
        fn passes(&mut self, event: &i32, _details: &mut Details) -> Verdict {
            Verdict::from(*event >= 0)
        }

        fn finalize(&mut self, details: &mut Details) {
            let mut log = self.log.lock().unwrap();
            log.push(self.name);
            details.insert("finalized".to_string(), log.len() as f64);
        }
    }

    #[test]
    fn test_finalize_reaches_every_stage_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stage = |name: &'static str| -> EventFilter<i32> {
            EventFilter::new(name, Logged { name, log: log.clone() })
        };
        let mut list = EventFilterList::new()
            .with_filter(stage("first"))
            .with_filter(EventFilter::new("veto", FnSelection::new(|_: &i32| Verdict::Reject)))
            .with_filter(stage("second"))
            .with_filter(stage("third"));

        list.apply(&1);
        list.apply(&-1);
        list.finalize();

        assert_eq!(list[2].total(), 0, "later stages never saw an event");
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
        assert_eq!(list[0].details()["finalized"], 1.0);
        assert_eq!(list[3].details()["finalized"], 3.0);
    }

    #[test]
    fn test_merge_pairwise() {
        let left = FilterList::from(vec![state("a", 10, 8), state("b", 8, 5), state("c", 5, 2)]);
        let right = FilterList::from(vec![state("a", 4, 3), state("b", 3, 3), state("c", 3, 1)]);

        let merged: FilterList<Filter> = FilterList::merge(&left, &right).unwrap();
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.total(), 14);
        assert_eq!(merged.passing(), 3);
        assert_eq!(merged[1].passing(), 8);
    }

    #[test]
    fn test_merge_mixes_live_filters_and_states() {
        let mut live = EventFilterList::new().with_filter(threshold("a", 0));
        live.apply(&1);
        live.apply(&-1);
        let saved = FilterList::from(vec![state("a", 3, 1)]);

        let merged: FilterList<Filter> = FilterList::merge(&live, &saved).unwrap();
        assert_eq!(merged.total(), 5);
        assert_eq!(merged.passing(), 2);
    }

    #[test]
    fn test_merge_rejects_length_mismatch() {
        let left = FilterList::from(vec![state("a", 1, 1), state("b", 1, 1)]);
        let right = FilterList::from(vec![state("a", 1, 1)]);

        let err = FilterList::<Filter>::merge(&left, &right).unwrap_err();
        assert_eq!(err, FilterError::LengthMismatch { left: 2, right: 1 });
    }

    #[test]
    fn test_merge_all() {
        let lists: Vec<FilterList<FilterState>> = (1..=4)
            .map(|i| FilterList::from(vec![state("a", i, i), state("b", i, 0)]))
            .collect();

        let merged: FilterList<Filter> = FilterList::merge_all(lists).unwrap();
        assert_eq!(merged.total(), 10);
        assert_eq!(merged[0].passing(), 10);
        assert_eq!(merged.passing(), 0);

        let none: FilterList<Filter> = FilterList::merge_all(Vec::<FilterList<FilterState>>::new()).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_from_value() {
        let list = FilterList::from_value(json!([
            {"name": "a", "total": 2, "passing": 1, "details": {},
             "count_funcs_total": {}, "count_funcs_passing": {}}
        ]))
        .unwrap();
        assert_eq!(list.passing(), 1);

        let err = FilterList::from_value(json!({"name": "a"})).unwrap_err();
        assert!(matches!(err, FilterError::TypeMismatch { found, .. } if found == "object"));
    }
}
