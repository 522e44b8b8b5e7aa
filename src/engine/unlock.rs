//! Unlock evaluator: sequential group gating

use crate::domain::{GroupIndex, MissionIndex, group_of, group_range, required_points};

use super::progress::ProgressStore;

/// Lock state derived from a progress store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnlockState {
    /// Highest group complete with every lower group complete too
    pub highest_complete: Option<GroupIndex>,
    /// Highest group whose missions can be played
    pub active_group: GroupIndex,
}

impl UnlockState {
    pub fn is_locked(&self, index: MissionIndex) -> bool {
        group_of(index) > self.active_group
    }

    pub fn is_group_unlocked(&self, group: GroupIndex) -> bool {
        group <= self.active_group
    }
}

/// Whether every mission of the group has its required points
pub fn group_complete(store: &ProgressStore, group: GroupIndex) -> bool {
    group_range(group).all(|n| store.get(n) >= required_points(n))
}

/// Scan groups in order; the scan stops at the first incomplete group
pub fn evaluate(store: &ProgressStore, group_count: usize) -> UnlockState {
    let last_group = group_count.saturating_sub(1);
    let highest_complete = (0..group_count)
        .take_while(|&group| group_complete(store, group))
        .last();
    let active_group = match highest_complete {
        Some(group) => (group + 1).min(last_group),
        None => 0,
    };
    UnlockState {
        highest_complete,
        active_group,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_group(store: &mut ProgressStore, group: GroupIndex) {
        for n in group_range(group) {
            store.set(n, required_points(n));
        }
    }

    #[test]
    fn test_only_first_group_unlocked_initially() {
        let store = ProgressStore::with_missions(1..=50);
        let state = evaluate(&store, 5);
        assert_eq!(state.highest_complete, None);
        assert_eq!(state.active_group, 0);
        assert!(!state.is_locked(10));
        assert!(state.is_locked(11));
    }

    #[test]
    fn test_complete_group_unlocks_next() {
        let mut store = ProgressStore::with_missions(1..=50);
        complete_group(&mut store, 0);
        let state = evaluate(&store, 5);
        assert_eq!(state.highest_complete, Some(0));
        assert_eq!(state.active_group, 1);
        assert!(!state.is_locked(15));
        assert!(state.is_locked(21));
    }

    #[test]
    fn test_gap_stops_scan() {
        let mut store = ProgressStore::with_missions(1..=50);
        complete_group(&mut store, 1);
        complete_group(&mut store, 2);
        let state = evaluate(&store, 5);
        assert_eq!(state.active_group, 0);
        assert!(state.is_locked(25));
    }

    #[test]
    fn test_active_group_capped_at_last() {
        let mut store = ProgressStore::with_missions(1..=50);
        for group in 0..5 {
            complete_group(&mut store, group);
        }
        let state = evaluate(&store, 5);
        assert_eq!(state.highest_complete, Some(4));
        assert_eq!(state.active_group, 4);
        assert!(state.is_locked(51));
    }

    #[test]
    fn test_unlock_monotonic_for_partial_groups() {
        // Group 0 missing its last point; later groups fully done stay locked
        let mut store = ProgressStore::with_missions(1..=50);
        for group in 0..5 {
            complete_group(&mut store, group);
        }
        store.set(10, 2);
        let state = evaluate(&store, 5);
        for n in 11..=50 {
            assert!(state.is_locked(n), "mission {} should be locked", n);
        }
    }
}
