//! The base accounting unit of a cut-flow.
//!
//! A `Filter` records how many events it examined and how many passed,
//! plus weighted tallies from named count functions and an open
//! `details` mapping. Its plain-data twin, `FilterState`, is the only
//! persisted form: the live count-function callables are never serialized.

use crate::error::{FilterError, Result};
use crate::traits::{Accounting, Details};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A count function: produces a numeric weight for one event.
pub type CountFunc<E> = Box<dyn Fn(&E) -> f64 + Send + Sync>;

/// Serialized state of a filter.
///
/// Carries exactly the statistics of a `Filter` and none of its callables,
/// so it round-trips through JSON unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterState {
    pub name: String,
    pub total: u64,
    pub passing: u64,
    pub details: Details,
    pub count_funcs_total: BTreeMap<String, f64>,
    pub count_funcs_passing: BTreeMap<String, f64>,
}

impl FilterState {
    /// Create an empty state record.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Decode a state record from an untyped JSON value.
    ///
    /// Fails with `TypeMismatch` if `value` is not an object with the
    /// expected fields.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(FilterError::TypeMismatch {
                expected: "filter state record (object)",
                found: value_kind(&value).to_string(),
            });
        }
        serde_json::from_value(value).map_err(|err| FilterError::TypeMismatch {
            expected: "filter state record (object)",
            found: err.to_string(),
        })
    }
}

/// JSON kind of `value`, for error messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Accounting for FilterState {
    fn name(&self) -> &str {
        &self.name
    }

    fn total(&self) -> u64 {
        self.total
    }

    fn passing(&self) -> u64 {
        self.passing
    }

    fn details(&self) -> &Details {
        &self.details
    }

    fn count_funcs_total(&self) -> &BTreeMap<String, f64> {
        &self.count_funcs_total
    }

    fn count_funcs_passing(&self) -> &BTreeMap<String, f64> {
        &self.count_funcs_passing
    }

    fn state(&self) -> FilterState {
        self.clone()
    }
}

/// One named test stage of a cut-flow.
///
/// `E` is the event type count functions are evaluated against. Filters
/// that only carry statistics (merged or rehydrated ones) can leave it as
/// the default `()`.
pub struct Filter<E = ()> {
    name: String,
    total: u64,
    passing: u64,
    count_funcs: BTreeMap<String, CountFunc<E>>,
    count_funcs_total: BTreeMap<String, f64>,
    count_funcs_passing: BTreeMap<String, f64>,
    details: Details,
    was_passed: bool,
}

impl<E> Filter<E> {
    /// Create a fresh filter with zeroed counters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            total: 0,
            passing: 0,
            count_funcs: BTreeMap::new(),
            count_funcs_total: BTreeMap::new(),
            count_funcs_passing: BTreeMap::new(),
            details: Details::new(),
            was_passed: false,
        }
    }

    /// Register a count function (builder pattern).
    pub fn with_count_func<F>(mut self, label: impl Into<String>, func: F) -> Self
    where
        F: Fn(&E) -> f64 + Send + Sync + 'static,
    {
        self.attach_count_func(label, func);
        self
    }

    /// Attach a count function, keeping any tallies already recorded under `label`.
    ///
    /// This is how a rehydrated filter regains the ability to evaluate new events.
    pub fn attach_count_func<F>(&mut self, label: impl Into<String>, func: F)
    where
        F: Fn(&E) -> f64 + Send + Sync + 'static,
    {
        let label = label.into();
        self.count_funcs_total.entry(label.clone()).or_insert(0.0);
        self.count_funcs_passing.entry(label.clone()).or_insert(0.0);
        self.count_funcs.insert(label, Box::new(func));
    }

    /// Labels of the live count functions.
    pub fn count_func_labels(&self) -> impl Iterator<Item = &str> {
        self.count_funcs.keys().map(String::as_str)
    }

    /// Outcome of the most recent evaluation.
    pub fn was_passed(&self) -> bool {
        self.was_passed
    }

    /// Mutable access to the open statistics mapping.
    pub fn details_mut(&mut self) -> &mut Details {
        &mut self.details
    }

    /// Record `event` as passing.
    pub fn passed(&mut self, event: &E) {
        self.record(event, 1, 1);
    }

    /// Record `event` as failing.
    pub fn failed(&mut self, event: &E) {
        self.record(event, 1, 0);
    }

    /// Add `examined` to the total and `survived` to the passing count.
    ///
    /// Count functions are evaluated once; their weight goes to the passing
    /// tally only when something survived.
    pub(crate) fn record(&mut self, event: &E, examined: u64, survived: u64) {
        let passed = survived > 0;
        self.total += examined;
        self.passing += survived;

        for (label, func) in &self.count_funcs {
            let weight = func(event);
            bump(&mut self.count_funcs_total, label, weight);
            if passed {
                bump(&mut self.count_funcs_passing, label, weight);
            }
        }

        self.was_passed = passed;
    }

    /// Rebuild a filter from a state record.
    ///
    /// The result reports statistics but has no count functions attached.
    pub fn from_state(state: FilterState) -> Result<Self> {
        if state.passing > state.total {
            return Err(FilterError::InvalidState {
                name: state.name,
                reason: format!(
                    "passing ({}) exceeds total ({})",
                    state.passing, state.total
                ),
            });
        }
        if let Some((left_only, right_only)) =
            key_diff(&state.count_funcs_total, &state.count_funcs_passing)
        {
            return Err(FilterError::InvalidState {
                name: state.name,
                reason: format!(
                    "count function labels differ between totals {left_only:?} and passing {right_only:?}"
                ),
            });
        }
        if let Some((label, passing, total)) = state
            .count_funcs_total
            .iter()
            .map(|(label, total)| (label, state.count_funcs_passing[label], *total))
            .find(|(_, passing, total)| exceeds(*passing, *total))
        {
            return Err(FilterError::InvalidState {
                name: state.name.clone(),
                reason: format!(
                    "count function {label:?} passing tally ({passing}) exceeds its total ({total})"
                ),
            });
        }

        Ok(Self {
            name: state.name,
            total: state.total,
            passing: state.passing,
            count_funcs: BTreeMap::new(),
            count_funcs_total: state.count_funcs_total,
            count_funcs_passing: state.count_funcs_passing,
            details: state.details,
            was_passed: false,
        })
    }

    /// Combine the statistics of two same-named filters.
    ///
    /// Either operand may be a live filter or a plain state record. Counters,
    /// details and count-function tallies are summed key by key; the key sets
    /// must match exactly.
    pub fn add(left: &impl Accounting, right: &impl Accounting) -> Result<Self> {
        if left.name() != right.name() {
            return Err(FilterError::NameMismatch {
                left: left.name().to_string(),
                right: right.name().to_string(),
            });
        }

        let details = sum_maps(left.details(), right.details()).map_err(
            |(left_only, right_only)| FilterError::DetailKeyMismatch {
                name: left.name().to_string(),
                left_only,
                right_only,
            },
        )?;

        let count_mismatch = |(left_only, right_only): (Vec<String>, Vec<String>)| {
            FilterError::CountFuncKeyMismatch {
                name: left.name().to_string(),
                left_only,
                right_only,
            }
        };
        let count_funcs_total = sum_maps(left.count_funcs_total(), right.count_funcs_total())
            .map_err(count_mismatch)?;
        let count_funcs_passing =
            sum_maps(left.count_funcs_passing(), right.count_funcs_passing())
                .map_err(count_mismatch)?;

        Ok(Self {
            name: left.name().to_string(),
            total: left.total() + right.total(),
            passing: left.passing() + right.passing(),
            count_funcs: BTreeMap::new(),
            count_funcs_total,
            count_funcs_passing,
            details,
            was_passed: false,
        })
    }
}

fn bump(map: &mut BTreeMap<String, f64>, label: &str, weight: f64) {
    match map.get_mut(label) {
        Some(value) => *value += weight,
        None => {
            map.insert(label.to_string(), weight);
        }
    }
}

/// True when a weighted passing tally is larger than its total beyond rounding.
///
/// Tallies are summed in different orders, so a small relative slack is allowed.
fn exceeds(passing: f64, total: f64) -> bool {
    passing - total > 1e-9 * total.abs().max(1.0)
}

/// Keys present on only one side, or `None` when both maps share the same keys.
fn key_diff(
    left: &BTreeMap<String, f64>,
    right: &BTreeMap<String, f64>,
) -> Option<(Vec<String>, Vec<String>)> {
    let left_only: Vec<String> = left
        .keys()
        .filter(|key| !right.contains_key(*key))
        .cloned()
        .collect();
    let right_only: Vec<String> = right
        .keys()
        .filter(|key| !left.contains_key(*key))
        .cloned()
        .collect();

    if left_only.is_empty() && right_only.is_empty() {
        None
    } else {
        Some((left_only, right_only))
    }
}

fn sum_maps(
    left: &BTreeMap<String, f64>,
    right: &BTreeMap<String, f64>,
) -> std::result::Result<BTreeMap<String, f64>, (Vec<String>, Vec<String>)> {
    if let Some(diff) = key_diff(left, right) {
        return Err(diff);
    }
    Ok(left
        .iter()
        .map(|(key, value)| (key.clone(), value + right[key]))
        .collect())
}

impl<E> Accounting for Filter<E> {
    fn name(&self) -> &str {
        &self.name
    }

    fn total(&self) -> u64 {
        self.total
    }

    fn passing(&self) -> u64 {
        self.passing
    }

    fn details(&self) -> &Details {
        &self.details
    }

    fn count_funcs_total(&self) -> &BTreeMap<String, f64> {
        &self.count_funcs_total
    }

    fn count_funcs_passing(&self) -> &BTreeMap<String, f64> {
        &self.count_funcs_passing
    }
}

impl<E> TryFrom<FilterState> for Filter<E> {
    type Error = FilterError;

    fn try_from(state: FilterState) -> Result<Self> {
        Self::from_state(state)
    }
}

impl<E> fmt::Display for Filter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Filter {}\nTotal: {}\nPass:  {}",
            self.name, self.total, self.passing
        )
    }
}

impl<E> fmt::Debug for Filter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("name", &self.name)
            .field("total", &self.total)
            .field("passing", &self.passing)
            .field("count_funcs", &self.count_funcs.keys().collect::<Vec<_>>())
            .field("count_funcs_total", &self.count_funcs_total)
            .field("count_funcs_passing", &self.count_funcs_passing)
            .field("details", &self.details)
            .field("was_passed", &self.was_passed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn counted(name: &str, total: u64, passing: u64) -> Filter {
        let mut filter = Filter::new(name);
        for i in 0..total {
            if i < passing {
                filter.passed(&());
            } else {
                filter.failed(&());
            }
        }
        filter
    }

    #[test]
    fn test_passed_and_failed_counts() {
        let mut filter: Filter<f64> = Filter::new("cut").with_count_func("weight", |w| *w);

        filter.passed(&2.0);
        assert!(filter.was_passed());
        filter.failed(&0.5);
        assert!(!filter.was_passed());
        filter.passed(&1.0);

        assert_eq!(filter.total(), 3);
        assert_eq!(filter.passing(), 2);
        assert_eq!(filter.count_funcs_total()["weight"], 3.5);
        assert_eq!(filter.count_funcs_passing()["weight"], 3.0);
    }

    #[test]
    fn test_add_sums_counters() {
        let left = counted("A", 10, 7);
        let right = counted("A", 5, 3);

        let sum: Filter = Filter::add(&left, &right).unwrap();
        assert_eq!(sum.name(), "A");
        assert_eq!(sum.total(), 15);
        assert_eq!(sum.passing(), 10);
    }

    #[test]
    fn test_add_rejects_different_names() {
        let err = Filter::<()>::add(&counted("cut1", 1, 1), &counted("cut2", 1, 1)).unwrap_err();
        assert!(matches!(err, FilterError::NameMismatch { .. }));
    }

    #[test]
    fn test_add_sums_details() {
        let mut left = counted("A", 2, 2);
        left.details_mut().insert("electrons".to_string(), 3.0);
        let mut right = FilterState::new("A");
        right.details.insert("electrons".to_string(), 4.0);

        let sum: Filter = Filter::add(&left, &right).unwrap();
        assert_eq!(sum.details()["electrons"], 7.0);
    }

    #[test]
    fn test_add_rejects_divergent_details() {
        let mut left = counted("A", 1, 1);
        left.details_mut().insert("electrons".to_string(), 1.0);
        let mut right = counted("A", 1, 1);
        right.details_mut().insert("muons".to_string(), 1.0);

        let err = Filter::<()>::add(&left, &right).unwrap_err();
        assert_eq!(
            err,
            FilterError::DetailKeyMismatch {
                name: "A".to_string(),
                left_only: vec!["electrons".to_string()],
                right_only: vec!["muons".to_string()],
            }
        );
    }

    #[test]
    fn test_add_rejects_divergent_count_funcs() {
        let left: Filter<f64> = Filter::new("A").with_count_func("weight", |w| *w);
        let right: Filter<f64> = Filter::new("A");

        let err = Filter::<f64>::add(&left, &right).unwrap_err();
        assert!(matches!(err, FilterError::CountFuncKeyMismatch { .. }));
    }

    #[test]
    fn test_state_round_trip() {
        let mut filter: Filter<f64> = Filter::new("met").with_count_func("weight", |w| *w);
        filter.passed(&1.5);
        filter.failed(&0.25);
        filter.details_mut().insert("overflow".to_string(), 2.0);

        let state = filter.state();
        let json = serde_json::to_string(&state).unwrap();
        let restored: Filter<f64> =
            Filter::from_state(serde_json::from_str(&json).unwrap()).unwrap();

        assert_eq!(restored.state(), state);
        assert_eq!(restored.count_func_labels().count(), 0);
        assert!(!restored.was_passed());
    }

    #[test]
    fn test_reattached_count_func_keeps_tallies() {
        let mut state = FilterState::new("met");
        state.total = 1;
        state.passing = 1;
        state.count_funcs_total.insert("weight".to_string(), 2.0);
        state.count_funcs_passing.insert("weight".to_string(), 2.0);

        let mut filter: Filter<f64> = Filter::from_state(state).unwrap();
        filter.attach_count_func("weight", |w| *w);
        filter.passed(&0.5);

        assert_eq!(filter.count_funcs_total()["weight"], 2.5);
        assert_eq!(filter.count_funcs_passing()["weight"], 2.5);
    }

    #[test]
    fn test_from_state_rejects_passing_above_total() {
        let mut state = FilterState::new("bad");
        state.total = 1;
        state.passing = 2;

        let err = Filter::<()>::from_state(state).unwrap_err();
        assert!(matches!(err, FilterError::InvalidState { .. }));
    }

    #[test]
    fn test_from_state_rejects_weighted_passing_above_total() {
        let mut state = FilterState::new("weighted");
        state.total = 2;
        state.passing = 1;
        state.count_funcs_total.insert("weight".to_string(), 1.0);
        state.count_funcs_passing.insert("weight".to_string(), 5.0);

        let err = Filter::<()>::from_state(state.clone()).unwrap_err();
        assert!(matches!(err, FilterError::InvalidState { ref name, .. } if name == "weighted"));

        // summation order may leave the tallies a rounding error apart
        state.count_funcs_total.insert("weight".to_string(), 0.3);
        state.count_funcs_passing.insert("weight".to_string(), 0.1 + 0.2);
        assert!(Filter::<()>::from_state(state).is_ok());
    }

    #[test]
    fn test_state_from_value() {
        let state = FilterState::from_value(json!({
            "name": "trigger",
            "total": 4,
            "passing": 2,
            "details": {},
            "count_funcs_total": {},
            "count_funcs_passing": {}
        }))
        .unwrap();
        assert_eq!(state.passing, 2);

        let err = FilterState::from_value(json!([1, 2])).unwrap_err();
        assert_eq!(
            err,
            FilterError::TypeMismatch {
                expected: "filter state record (object)",
                found: "array".to_string(),
            }
        );
    }

    #[test]
    fn test_display() {
        let filter = counted("jets", 3, 1);
        assert_eq!(filter.to_string(), "Filter jets\nTotal: 3\nPass:  1");
    }
}
