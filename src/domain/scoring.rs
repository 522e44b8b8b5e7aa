//! Scoring rule: how many points each mission needs
//!
//! Missions come in groups of ten. Within a group, positions 1-3 need one
//! point, 4-7 need two and 8-10 need three, so a full group is worth 20.

use std::ops::RangeInclusive;

/// 1-based mission number
pub type MissionIndex = u32;

/// 0-based group number
pub type GroupIndex = usize;

/// Missions per group
pub const GROUP_SIZE: u32 = 10;

/// Points a fully completed group is worth
pub const GROUP_POINTS: u32 = 20;

/// Position of a mission within its group (1..=10)
pub fn position_in_group(index: MissionIndex) -> u32 {
    (index.saturating_sub(1) % GROUP_SIZE) + 1
}

/// Points required to complete the given mission
pub fn required_points(index: MissionIndex) -> u32 {
    match position_in_group(index) {
        1..=3 => 1,
        4..=7 => 2,
        _ => 3,
    }
}

/// Group a mission belongs to
pub fn group_of(index: MissionIndex) -> GroupIndex {
    (index.saturating_sub(1) / GROUP_SIZE) as GroupIndex
}

/// First mission of a group
pub fn group_start(group: GroupIndex) -> MissionIndex {
    group as MissionIndex * GROUP_SIZE + 1
}

/// Last mission of a group (inclusive)
pub fn group_end(group: GroupIndex) -> MissionIndex {
    group as MissionIndex * GROUP_SIZE + GROUP_SIZE
}

/// All missions of a group
pub fn group_range(group: GroupIndex) -> RangeInclusive<MissionIndex> {
    group_start(group)..=group_end(group)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_points_tiers() {
        let expected = [1, 1, 1, 2, 2, 2, 2, 3, 3, 3];
        for group in 0..7 {
            for (offset, want) in expected.iter().enumerate() {
                let index = group_start(group) + offset as u32;
                assert_eq!(required_points(index), *want, "mission {}", index);
            }
        }
    }

    #[test]
    fn test_required_points_always_in_range() {
        for index in 1..=500 {
            let points = required_points(index);
            assert!((1..=3).contains(&points));
            assert_eq!(points, required_points(position_in_group(index)));
        }
    }

    #[test]
    fn test_group_sums_to_twenty() {
        for group in 0..5 {
            let sum: u32 = group_range(group).map(required_points).sum();
            assert_eq!(sum, GROUP_POINTS);
        }
    }

    #[test]
    fn test_group_boundaries() {
        assert_eq!(group_of(1), 0);
        assert_eq!(group_of(10), 0);
        assert_eq!(group_of(11), 1);
        assert_eq!(group_of(50), 4);
        assert_eq!(group_of(51), 5);
        assert_eq!(group_range(1), 11..=20);
    }
}
