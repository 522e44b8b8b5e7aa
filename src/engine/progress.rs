//! Progress store: points per mission and the visible-complete set
//!
//! `set` is the optimistic-write entry point. It never touches the visible
//! set; only the reveal scheduler promotes missions to visible.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::{MissionIndex, required_points};

/// A `{missionIndex, points}` row as read from the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRow {
    pub index: MissionIndex,
    pub points: u32,
}

/// Result of a points mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointsChange {
    pub index: MissionIndex,
    pub previous: u32,
    pub current: u32,
    pub required: u32,
}

impl PointsChange {
    /// The mission just reached its required points
    pub fn completed(&self) -> bool {
        self.previous < self.required && self.current >= self.required
    }

    /// The mission just dropped below its required points
    pub fn regressed(&self) -> bool {
        self.previous >= self.required && self.current < self.required
    }

    pub fn is_complete(&self) -> bool {
        self.current >= self.required
    }

    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Copy of the store contents handed to readers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub points: BTreeMap<MissionIndex, u32>,
    pub visible: BTreeSet<MissionIndex>,
}

#[derive(Debug, Clone, Default)]
pub struct ProgressStore {
    points: BTreeMap<MissionIndex, u32>,
    visible: BTreeSet<MissionIndex>,
}

impl ProgressStore {
    /// Store with a zeroed record for every given mission
    pub fn with_missions(indices: impl IntoIterator<Item = MissionIndex>) -> Self {
        Self {
            points: indices.into_iter().map(|n| (n, 0)).collect(),
            visible: BTreeSet::new(),
        }
    }

    pub fn contains(&self, index: MissionIndex) -> bool {
        self.points.contains_key(&index)
    }

    /// Insert a zeroed record if the mission is unknown. Returns true if inserted.
    pub fn ensure(&mut self, index: MissionIndex) -> bool {
        if self.points.contains_key(&index) {
            return false;
        }
        self.points.insert(index, 0);
        true
    }

    pub fn get(&self, index: MissionIndex) -> u32 {
        self.points.get(&index).copied().unwrap_or(0)
    }

    pub fn is_complete(&self, index: MissionIndex) -> bool {
        self.get(index) >= required_points(index)
    }

    /// Set points, clamped to `0..=required_points(index)`
    pub fn set(&mut self, index: MissionIndex, points: u32) -> PointsChange {
        let required = required_points(index);
        let current = points.min(required);
        let previous = self.points.insert(index, current).unwrap_or(0);
        PointsChange {
            index,
            previous,
            current,
            required,
        }
    }

    /// Drop the mission's points and visibility, keeping the record itself
    pub fn reset(&mut self, index: MissionIndex) -> PointsChange {
        self.visible.remove(&index);
        self.set(index, 0)
    }

    /// Load initial rows; complete missions become visible immediately
    pub fn hydrate(&mut self, rows: &[ProgressRow]) -> usize {
        let mut applied = 0;
        for row in rows {
            if row.index == 0 {
                continue;
            }
            let change = self.set(row.index, row.points);
            if change.is_complete() {
                self.visible.insert(row.index);
            } else {
                self.visible.remove(&row.index);
            }
            applied += 1;
        }
        applied
    }

    pub fn is_visible(&self, index: MissionIndex) -> bool {
        self.visible.contains(&index)
    }

    pub fn visible_complete(&self) -> &BTreeSet<MissionIndex> {
        &self.visible
    }

    /// Missions in ascending order with their points
    pub fn iter(&self) -> impl Iterator<Item = (MissionIndex, u32)> + '_ {
        self.points.iter().map(|(k, v)| (*k, *v))
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            points: self.points.clone(),
            visible: self.visible.clone(),
        }
    }

    pub(crate) fn mark_visible(&mut self, index: MissionIndex) -> bool {
        self.visible.insert(index)
    }

    pub(crate) fn hide(&mut self, index: MissionIndex) -> bool {
        self.visible.remove(&index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_clamps_to_required() {
        let mut store = ProgressStore::with_missions(1..=10);
        let change = store.set(1, 5);
        assert_eq!(change.current, 1);
        assert_eq!(store.get(1), 1);

        let change = store.set(9, 7);
        assert_eq!(change.current, 3);
        assert!(change.completed());
    }

    #[test]
    fn test_set_reports_transitions() {
        let mut store = ProgressStore::with_missions(1..=10);
        assert!(!store.set(5, 1).completed());
        assert!(store.set(5, 2).completed());
        let change = store.set(5, 0);
        assert!(change.regressed());
        assert_eq!(change.previous, 2);
    }

    #[test]
    fn test_set_does_not_touch_visibility() {
        let mut store = ProgressStore::with_missions(1..=10);
        store.set(1, 1);
        assert!(store.is_complete(1));
        assert!(!store.is_visible(1));
        assert!(store.visible_complete().is_empty());
    }

    #[test]
    fn test_hydrate_marks_complete_visible() {
        let mut store = ProgressStore::with_missions(1..=10);
        let rows = [
            ProgressRow { index: 1, points: 1 },
            ProgressRow { index: 4, points: 1 },
            ProgressRow { index: 0, points: 3 },
            ProgressRow { index: 60, points: 3 },
        ];
        assert_eq!(store.hydrate(&rows), 3);
        assert!(store.is_visible(1));
        assert!(!store.is_visible(4));
        assert!(store.contains(60));
        assert!(store.is_visible(60));
    }

    #[test]
    fn test_reset_keeps_record() {
        let mut store = ProgressStore::with_missions(1..=3);
        store.set(2, 1);
        store.mark_visible(2);
        let change = store.reset(2);
        assert!(change.regressed());
        assert!(store.contains(2));
        assert!(!store.is_visible(2));
    }
}
