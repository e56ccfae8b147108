//! Closure-backed selections.

use crate::traits::{Details, EventSelection, ObjectSelection, Verdict};

/// Event selection backed by a closure.
///
/// ```ignore
/// let met = EventFilter::new("met", FnSelection::new(|e: &Event| (e.met > 20.0).into()));
/// ```
pub struct FnSelection<F> {
    predicate: F,
}

impl<F> FnSelection<F> {
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<E, F> EventSelection<E> for FnSelection<F>
where
    F: FnMut(&E) -> Verdict + Send,
{
    fn passes(&mut self, event: &E, _details: &mut Details) -> Verdict {
        (self.predicate)(event)
    }
}

/// Object selection backed by a closure over the whole collection.
pub struct FnObjectSelection<F> {
    filter: F,
}

impl<F> FnObjectSelection<F> {
    pub fn new(filter: F) -> Self {
        Self { filter }
    }
}

impl<E, O, F> ObjectSelection<E, O> for FnObjectSelection<F>
where
    F: FnMut(&E, Vec<O>) -> Vec<O> + Send,
{
    fn filtered(&mut self, event: &E, collection: Vec<O>, _details: &mut Details) -> Vec<O> {
        (self.filter)(event, collection)
    }
}

/// Object selection keeping the objects a per-object predicate accepts.
pub struct Retain<F> {
    predicate: F,
}

impl<F> Retain<F> {
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<E, O, F> ObjectSelection<E, O> for Retain<F>
where
    F: FnMut(&E, &O) -> bool + Send,
{
    fn filtered(&mut self, event: &E, mut collection: Vec<O>, _details: &mut Details) -> Vec<O> {
        collection.retain(|object| (self.predicate)(event, object));
        collection
    }
}
