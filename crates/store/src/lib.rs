//! # Store Crate
//!
//! Durable form of cut-flow statistics: lists of `FilterState` records
//! written as JSON, so that the results of independent jobs can be merged
//! after the fact.
//!
//! ## Example Usage
//!
//! ```ignore
//! use store::{load_many, save};
//!
//! // Each job saves its statistics
//! save(&out_dir.join("job-0.json"), &cuts.states())?;
//!
//! // Later, all jobs are combined
//! let lists = load_many(&paths)?;
//! let merged: FilterList<Filter> = FilterList::merge_all(lists)?;
//! ```

// Public modules
pub mod error;
pub mod json;

// Re-export commonly used items for convenience
pub use error::{Result, StoreError};
pub use json::{load, load_and_merge, load_many, save};
