//! Reward threshold tracker
//!
//! Scores are cumulative across the whole sequence: reward `g` counts every
//! visible-complete mission from 1 up to the end of group `g`.

use crate::domain::{GroupIndex, RewardLadder, group_end, required_points};

use super::progress::ProgressStore;
use super::unlock::UnlockState;

/// Live progress of one reward, re-derived on every recompute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardProgress {
    pub group: GroupIndex,
    /// Cumulative visible points up to the end of the group (0 while locked)
    pub cumulative: u32,
    /// What the counter should show: `cumulative` capped at the threshold
    pub target: u32,
    pub threshold: u32,
    pub unlocked: bool,
    /// Group unlocked and threshold reached
    pub complete: bool,
}

/// Sum of required points over visible-complete missions in `1..=group_end(group)`
pub fn cumulative_points(store: &ProgressStore, group: GroupIndex) -> u32 {
    let end = group_end(group);
    store
        .visible_complete()
        .range(1..=end)
        .map(|&n| required_points(n))
        .sum()
}

/// Total visible score across every mission
pub fn total_score(store: &ProgressStore) -> u32 {
    store
        .visible_complete()
        .iter()
        .map(|&n| required_points(n))
        .sum()
}

pub fn progress(
    store: &ProgressStore,
    unlock: &UnlockState,
    ladder: &RewardLadder,
    group: GroupIndex,
) -> RewardProgress {
    let threshold = ladder.threshold(group).unwrap_or(u32::MAX);
    let unlocked = unlock.is_group_unlocked(group);
    let cumulative = if unlocked {
        cumulative_points(store, group)
    } else {
        0
    };
    RewardProgress {
        group,
        cumulative,
        target: cumulative.min(threshold),
        threshold,
        unlocked,
        complete: unlocked && cumulative >= threshold,
    }
}
