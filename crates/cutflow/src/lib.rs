//! Cut-flow accounting for event selections.
//!
//! This crate provides:
//! - `Filter`, the accounting unit of one selection stage
//! - `EventFilter` and `ObjectFilter` stages wrapping pluggable selections
//! - `FilterList` and its typed variants for chaining stages
//! - Merging of statistics from independent runs, and cut-flow tables
//!
//! ## Architecture
//! A driving loop feeds every event (and, for object stages, its collection
//! of candidate objects) through a list of stages:
//! 1. Each stage evaluates its selection and updates its counters
//! 2. The list stops at the first stage that rejects or empties the collection
//! 3. After processing, the list renders its cut-flow or is saved as state records
//! 4. Lists from parallel jobs over the same stages are merged
//!
//! ## Example Usage
//! ```ignore
//! use cutflow::{EventFilter, EventFilterList, Verdict};
//! use cutflow::filters::FnSelection;
//!
//! let mut cuts = EventFilterList::new()
//!     .with_filter(EventFilter::accept_all("entry"))
//!     .with_filter(EventFilter::new("met", FnSelection::new(|e: &Event| Verdict::from(e.met > 20.0))));
//!
//! for event in &events {
//!     cuts.apply(event);
//! }
//! cuts.finalize();
//! println!("{cuts}");
//! ```

pub mod error;
pub mod event_filter;
pub mod filter;
pub mod filter_list;
pub mod filters;
pub mod hook;
pub mod object_filter;
pub mod report;
pub mod traits;

// Re-export main types
pub use error::{FilterError, Result};
pub use event_filter::EventFilter;
pub use filter::{CountFunc, Filter, FilterState};
pub use filter_list::{EventFilterList, FilterList, ObjectFilterList};
pub use hook::FilterHook;
pub use object_filter::ObjectFilter;
pub use report::Table;
pub use traits::{Accounting, Details, EventSelection, ObjectSelection, Verdict};
