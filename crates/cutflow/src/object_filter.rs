//! Per-event collection predicate stage.

use crate::filter::{Filter, FilterState};
use crate::filters::KeepAll;
use crate::hook::FilterHook;
use crate::traits::{Accounting, Details, ObjectSelection};
use std::collections::BTreeMap;
use std::fmt;

/// A filter stage narrowing the collection of objects of one event.
///
/// The counting mode is fixed at construction:
/// - events mode: every invocation adds 1 to the total, and 1 to passing
///   if anything survived
/// - objects mode: the total grows by the input size and passing by the
///   number of retained objects
pub struct ObjectFilter<E, O> {
    filter: Filter<E>,
    selection: Box<dyn ObjectSelection<E, O>>,
    hooks: Vec<FilterHook>,
    passthrough: bool,
    count_events: bool,
}

impl<E, O> ObjectFilter<E, O> {
    /// Create a new ObjectFilter counting objects.
    pub fn new(name: impl Into<String>, selection: impl ObjectSelection<E, O> + 'static) -> Self {
        Self {
            filter: Filter::new(name),
            selection: Box::new(selection),
            hooks: Vec::new(),
            passthrough: false,
            count_events: false,
        }
    }

    /// A stage keeping every object.
    pub fn keep_all(name: impl Into<String>) -> Self {
        Self::new(name, KeepAll)
    }

    /// Count one entry per invocation instead of one per object (builder pattern).
    pub fn count_events(mut self, count_events: bool) -> Self {
        self.count_events = count_events;
        self
    }

    /// Enable or disable passthrough mode (builder pattern).
    pub fn passthrough(mut self, passthrough: bool) -> Self {
        self.passthrough = passthrough;
        self
    }

    /// Add a hook run once for every non-empty result (builder pattern).
    pub fn with_hook(mut self, hook: FilterHook) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Register a count function (builder pattern).
    pub fn with_count_func<F>(mut self, label: impl Into<String>, func: F) -> Self
    where
        F: Fn(&E) -> f64 + Send + Sync + 'static,
    {
        self.filter.attach_count_func(label, func);
        self
    }

    pub fn counts_events(&self) -> bool {
        self.count_events
    }

    pub fn is_passthrough(&self) -> bool {
        self.passthrough
    }

    pub fn filter(&self) -> &Filter<E> {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut Filter<E> {
        &mut self.filter
    }

    pub fn was_passed(&self) -> bool {
        self.filter.was_passed()
    }

    /// Filter the collection of one event and return the retained subset.
    ///
    /// The subset is returned even when empty.
    pub fn apply(&mut self, event: &E, collection: Vec<O>) -> Vec<O> {
        let examined = if self.count_events {
            1
        } else {
            collection.len() as u64
        };

        let retained = if self.passthrough {
            collection
        } else {
            self.selection
                .filtered(event, collection, self.filter.details_mut())
        };

        let survived = match (retained.is_empty(), self.count_events) {
            (true, _) => 0,
            (false, true) => 1,
            // a selection may not grow the collection
            (false, false) => (retained.len() as u64).min(examined),
        };

        tracing::trace!(
            filter = self.filter.name(),
            examined,
            survived,
            "filtered collection"
        );

        if survived > 0 {
            for hook in &mut self.hooks {
                hook.call();
            }
        }
        self.filter.record(event, examined, survived);
        retained
    }
}

impl<E, O> Accounting for ObjectFilter<E, O> {
    fn name(&self) -> &str {
        self.filter.name()
    }

    fn total(&self) -> u64 {
        self.filter.total()
    }

    fn passing(&self) -> u64 {
        self.filter.passing()
    }

    fn details(&self) -> &Details {
        self.filter.details()
    }

    fn count_funcs_total(&self) -> &BTreeMap<String, f64> {
        self.filter.count_funcs_total()
    }

    fn count_funcs_passing(&self) -> &BTreeMap<String, f64> {
        self.filter.count_funcs_passing()
    }

    fn state(&self) -> FilterState {
        self.filter.state()
    }
}

impl<E, O> fmt::Debug for ObjectFilter<E, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectFilter")
            .field("filter", &self.filter)
            .field("hooks", &self.hooks.len())
            .field("passthrough", &self.passthrough)
            .field("count_events", &self.count_events)
            .finish()
    }
}
