//! Read-only board view handed to the presentation layer

use serde::{Deserialize, Serialize};

use crate::domain::{GroupIndex, MissionIndex};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionView {
    pub index: MissionIndex,
    pub title: String,
    pub points: u32,
    pub required_points: u32,
    pub locked: bool,
    pub visible: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardView {
    pub group_index: GroupIndex,
    pub title: String,
    pub condition: String,
    pub image_key: String,
    pub displayed_count: u32,
    pub threshold: u32,
    pub unlocked_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardView {
    pub alumno: String,
    pub missions: Vec<MissionView>,
    pub rewards: Vec<RewardView>,
    pub active_group: GroupIndex,
    pub selected: Option<MissionIndex>,
    /// Sum of required points over visible-complete missions, capped at the last threshold
    pub total_score: u32,
    /// `total_score` relative to the last threshold, 0.0..=100.0
    pub progress_pct: f32,
}

impl BoardView {
    pub fn mission(&self, index: MissionIndex) -> Option<&MissionView> {
        self.missions.iter().find(|m| m.index == index)
    }

    pub fn reward(&self, group: GroupIndex) -> Option<&RewardView> {
        self.rewards.get(group)
    }
}
