//! Per-identity action index shared by all pipeline workers.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct IndexState {
    /// Identities in the order they were first merged
    order: Vec<String>,
    actions: HashMap<String, HashSet<String>>,
}

impl IndexState {
    fn insert(&mut self, identity: &str, label: &str) -> bool {
        if let Some(set) = self.actions.get_mut(identity) {
            if set.contains(label) {
                return false;
            }
            return set.insert(label.to_string());
        }

        self.order.push(identity.to_string());
        self.actions
            .insert(identity.to_string(), HashSet::from([label.to_string()]));
        true
    }
}

/// Concurrent identity → action-set map.
///
/// The only mutation is a union-insert, so sets only ever grow and the final
/// contents do not depend on how merges from different workers interleave.
/// Nothing can be read back until the index is turned into an
/// [`IndexSnapshot`].
#[derive(Debug, Default)]
pub struct AggregationIndex {
    state: Mutex<IndexState>,
}

impl AggregationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `label` to the action set of `identity`.
    ///
    /// Returns `true` if the label was not yet recorded for that identity.
    pub fn merge(&self, identity: &str, label: &str) -> bool {
        self.lock().insert(identity, label)
    }

    /// Merge many pairs under a single lock acquisition.
    ///
    /// Returns how many pairs were new.
    pub fn merge_batch<I, S, L>(&self, pairs: I) -> usize
    where
        I: IntoIterator<Item = (S, L)>,
        S: AsRef<str>,
        L: AsRef<str>,
    {
        let mut state = self.lock();
        pairs
            .into_iter()
            .filter(|(identity, label)| state.insert(identity.as_ref(), label.as_ref()))
            .count()
    }

    /// Number of distinct identities merged so far
    pub fn len(&self) -> usize {
        self.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume the index once every worker is done with it.
    pub fn into_snapshot(self) -> IndexSnapshot {
        // a worker that panicked mid-merge cannot leave a half-inserted entry behind
        let state = self
            .state
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let IndexState { order, mut actions } = state;
        let entries = order
            .into_iter()
            .map(|identity| {
                let set = actions.remove(&identity).unwrap_or_default();
                (identity, set.into_iter().collect())
            })
            .collect();

        IndexSnapshot { entries }
    }

    fn lock(&self) -> MutexGuard<'_, IndexState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Immutable view of a finished index.
///
/// Identities keep first-seen order; action sets are sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSnapshot {
    entries: Vec<(String, BTreeSet<String>)>,
}

impl IndexSnapshot {
    /// Identities with their actions, in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.entries.iter().map(|(id, actions)| (id.as_str(), actions))
    }

    pub fn get(&self, identity: &str) -> Option<&BTreeSet<String>> {
        self.entries
            .iter()
            .find(|(id, _)| id == identity)
            .map(|(_, actions)| actions)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of distinct (identity, action) pairs
    pub fn action_count(&self) -> usize {
        self.entries.iter().map(|(_, actions)| actions.len()).sum()
    }
}

impl<I, A> FromIterator<(I, A)> for IndexSnapshot
where
    I: Into<String>,
    A: IntoIterator,
    A::Item: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (I, A)>>(iter: T) -> Self {
        let index = AggregationIndex::new();
        for (identity, actions) in iter {
            let identity = identity.into();
            for action in actions {
                let action: String = action.into();
                index.merge(&identity, &action);
            }
        }
        index.into_snapshot()
    }
}
