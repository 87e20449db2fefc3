//! Filtered, ordered view over a finished index.

use super::index::IndexSnapshot;
use serde::Serialize;

/// One identity and every distinct action it performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityActions {
    pub identity: String,
    pub actions: Vec<String>,
}

/// Select identities containing `filter` (case-sensitive substring).
///
/// Rows are ordered by identity and actions are sorted, so the same set of
/// logs always renders the same report regardless of worker interleaving.
/// `None` or an empty filter selects every identity. The snapshot is left
/// untouched.
pub fn filter_report(snapshot: &IndexSnapshot, filter: Option<&str>) -> Vec<IdentityActions> {
    let filter = filter.filter(|needle| !needle.is_empty());
    let mut rows: Vec<IdentityActions> = snapshot
        .iter()
        .filter(|(identity, _)| filter.map_or(true, |needle| identity.contains(needle)))
        .map(|(identity, actions)| IdentityActions {
            identity: identity.to_string(),
            actions: actions.iter().cloned().collect(),
        })
        .collect();

    rows.sort_by(|a, b| a.identity.cmp(&b.identity));
    rows
}
