//! Process-wide, append-only parameter store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::observability::metrics;
use crate::params::query::Params;

/// Every parameter value ever submitted, grouped by name.
///
/// Names keep the order in which they were first seen; values keep
/// submission order. Nothing is ever removed or replaced. One `append` is
/// applied atomically with respect to other appends and to `snapshot`.
#[derive(Debug, Default)]
pub struct ParameterStore {
    inner: Mutex<Entries>,
}

#[derive(Debug, Default)]
struct Entries {
    names: Vec<(String, Vec<String>)>,
    index: HashMap<String, usize>,
    total: usize,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every pair of `params`. Returns the number of values added.
    pub fn append(&self, params: &Params) -> usize {
        if params.is_empty() {
            return 0;
        }

        let mut entries = self.lock();
        for (name, value) in params.iter() {
            let slot = match entries.index.get(name) {
                Some(&slot) => slot,
                None => {
                    let slot = entries.names.len();
                    entries.names.push((name.to_string(), Vec::new()));
                    entries.index.insert(name.to_string(), slot);
                    slot
                }
            };
            entries.names[slot].1.push(value.to_string());
        }
        entries.total += params.len();
        drop(entries);

        metrics::record_params_stored(params.len());
        tracing::debug!(added = params.len(), "Parameters stored");
        params.len()
    }

    /// Consistent copy of all names and their values.
    pub fn snapshot(&self) -> Vec<(String, Vec<String>)> {
        self.lock().names.clone()
    }

    /// Values stored under `name`, oldest first.
    pub fn values(&self, name: &str) -> Vec<String> {
        let entries = self.lock();
        entries
            .index
            .get(name)
            .map(|&slot| entries.names[slot].1.clone())
            .unwrap_or_default()
    }

    /// Total number of stored values across all names.
    pub fn len(&self) -> usize {
        self.lock().total
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        // Entries are only ever appended, so a poisoned lock still holds valid data
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
