//! Core domain types for Mission Board

mod catalog;
mod reward;
mod scoring;

pub use catalog::{Catalog, CatalogData, placeholder_title};
pub use reward::{DEFAULT_THRESHOLDS, RewardInfo, RewardLadder, image_key};
pub use scoring::{
    GROUP_POINTS, GROUP_SIZE, GroupIndex, MissionIndex, group_end, group_of, group_range,
    group_start, position_in_group, required_points,
};
