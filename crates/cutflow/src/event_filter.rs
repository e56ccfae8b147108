//! Per-event predicate stage.

use crate::filter::{Filter, FilterState};
use crate::filters::AcceptAll;
use crate::hook::FilterHook;
use crate::traits::{Accounting, Details, EventSelection, Verdict};
use std::collections::BTreeMap;
use std::fmt;

/// A filter stage deciding on whole events.
///
/// ## Algorithm
/// For each event:
/// 1. In passthrough mode, run hooks and record a pass without evaluating
/// 2. Otherwise evaluate the selection:
///    - `Accept`: run hooks, record a pass, continue
///    - `Reject`: record a failure, stop
///    - `Abstain`: record nothing, stop
pub struct EventFilter<E> {
    filter: Filter<E>,
    selection: Box<dyn EventSelection<E>>,
    hooks: Vec<FilterHook>,
    passthrough: bool,
}

impl<E> EventFilter<E> {
    /// Create a new EventFilter.
    ///
    /// # Arguments
    /// * `name` - Label of the stage in the cut-flow
    /// * `selection` - Predicate deciding on each event
    pub fn new(name: impl Into<String>, selection: impl EventSelection<E> + 'static) -> Self {
        let mut filter = Filter::new(name);
        let mut selection: Box<dyn EventSelection<E>> = Box::new(selection);
        selection.prepare(filter.details_mut());
        Self {
            filter,
            selection,
            hooks: Vec::new(),
            passthrough: false,
        }
    }

    /// A stage accepting every event.
    pub fn accept_all(name: impl Into<String>) -> Self {
        Self::new(name, AcceptAll)
    }

    /// Add a hook run on every accepted event (builder pattern).
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

    /// Enable or disable passthrough mode (builder pattern).
    pub fn passthrough(mut self, passthrough: bool) -> Self {
        self.passthrough = passthrough;
        self
    }

    pub fn is_passthrough(&self) -> bool {
        self.passthrough
    }

    /// The accounting unit of this stage.
    pub fn filter(&self) -> &Filter<E> {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut Filter<E> {
        &mut self.filter
    }

    /// Outcome of the most recent evaluation.
    pub fn was_passed(&self) -> bool {
        self.filter.was_passed()
    }

    /// Evaluate one event, returning whether processing should continue.
    pub fn apply(&mut self, event: &E) -> bool {
        let verdict = if self.passthrough {
            Verdict::Accept
        } else {
            self.selection.passes(event, self.filter.details_mut())
        };

        tracing::trace!(filter = self.filter.name(), ?verdict, "evaluated event");

        match verdict {
            Verdict::Accept => {
                for hook in &mut self.hooks {
                    hook.call();
                }
                self.filter.passed(event);
                true
            }
            Verdict::Reject => {
                self.filter.failed(event);
                false
            }
            // excluded from the total
            Verdict::Abstain => false,
        }
    }

    /// Let the selection flush deferred state.
    pub fn finalize(&mut self) {
        self.selection.finalize(self.filter.details_mut());
    }
}

impl<E> Accounting for EventFilter<E> {
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

impl<E> fmt::Debug for EventFilter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventFilter")
            .field("filter", &self.filter)
            .field("hooks", &self.hooks.len())
            .field("passthrough", &self.passthrough)
            .finish()
    }
}
