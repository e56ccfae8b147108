//! Ready-made selections for event and object filters.
//!
//! Analyses usually supply their own predicates as closures; the types
//! here cover the defaults and the common shapes.

pub mod accept_all;
pub mod category_tally;
pub mod closure;

// Re-export for convenience
pub use accept_all::{AcceptAll, KeepAll};
pub use category_tally::CategoryTally;
pub use closure::{FnObjectSelection, FnSelection, Retain};
