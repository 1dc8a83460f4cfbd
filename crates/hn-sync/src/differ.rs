//! Ranked list differencing.

use std::collections::HashSet;

/// Ids in `current` that are not in `previous`, in `current` order,
/// each at most once.
///
/// With no previous list, or an empty one, every id of `current` is new.
pub fn diff(current: &[u64], previous: Option<&[u64]>) -> Vec<u64> {
    let seen: HashSet<u64> = previous.unwrap_or_default().iter().copied().collect();
    let mut emitted = HashSet::with_capacity(current.len());

    current
        .iter()
        .copied()
        .filter(|id| !seen.contains(id) && emitted.insert(*id))
        .collect()
}
