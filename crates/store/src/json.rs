//! Reading and writing state files.
//!
//! A state file holds a JSON array of state records, one per stage, in
//! pipeline order.

use crate::error::{Result, StoreError};
use cutflow::{Filter, FilterList, FilterState};
use rayon::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Write the state records of one list as pretty-printed JSON.
pub fn save(path: &Path, states: &[FilterState]) -> Result<()> {
    let json = serde_json::to_string_pretty(states).map_err(|source| StoreError::JsonError {
        path: path.display().to_string(),
        source,
    })?;
    fs::write(path, json)?;
    tracing::debug!(path = %path.display(), filters = states.len(), "saved cut-flow state");
    Ok(())
}

/// Read one state file.
///
/// Every record is checked against the counter invariants, so a file that
/// loads successfully can always be merged by length and name alone.
pub fn load(path: &Path) -> Result<FilterList<FilterState>> {
    if !path.exists() {
        return Err(StoreError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let content = fs::read_to_string(path)?;
    let invalid = |source| StoreError::InvalidState {
        path: path.display().to_string(),
        source,
    };

    let value: Value = serde_json::from_str(&content).map_err(|source| StoreError::JsonError {
        path: path.display().to_string(),
        source,
    })?;
    let list = FilterList::from_value(value).map_err(invalid)?;
    for state in &list {
        Filter::<()>::from_state(state.clone()).map_err(invalid)?;
    }

    tracing::debug!(path = %path.display(), filters = list.len(), "loaded cut-flow state");
    Ok(list)
}

/// Read many state files in parallel, preserving the order of `paths`.
pub fn load_many<P>(paths: &[P]) -> Result<Vec<FilterList<FilterState>>>
where
    P: AsRef<Path> + Sync,
{
    paths.par_iter().map(|path| load(path.as_ref())).collect()
}

/// Read many state files and merge them into one list.
pub fn load_and_merge(paths: &[PathBuf]) -> Result<FilterList<Filter>> {
    let lists = load_many(paths)?;
    Ok(FilterList::merge_all(lists)?)
}
