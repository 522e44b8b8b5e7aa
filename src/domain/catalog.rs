//! Mission and reward catalog (display metadata owned by an external loader)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::reward::RewardInfo;
use super::scoring::{GROUP_SIZE, GroupIndex, MissionIndex};

/// Raw catalog data as delivered by a [`crate::remote::CatalogLoader`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogData {
    #[serde(default)]
    pub missions: BTreeMap<MissionIndex, String>,
    #[serde(default)]
    pub rewards: Vec<RewardInfo>,
}

/// Titles for every known mission plus the reward entries
#[derive(Debug, Clone)]
pub struct Catalog {
    titles: BTreeMap<MissionIndex, String>,
    rewards: Vec<RewardInfo>,
}

/// Placeholder title for a mission without catalog entry
pub fn placeholder_title(index: MissionIndex) -> String {
    format!("Mission {}", index)
}

impl Catalog {
    /// Build a catalog covering `group_count` groups.
    ///
    /// Missing titles and rewards are filled with placeholders; mission
    /// titles outside the board range are kept so the missions still exist.
    pub fn from_data(data: CatalogData, group_count: usize, owner: &str) -> Self {
        let mut titles: BTreeMap<MissionIndex, String> = (1..=group_count as u32 * GROUP_SIZE)
            .map(|n| (n, placeholder_title(n)))
            .collect();
        for (index, title) in data.missions {
            if index == 0 || title.trim().is_empty() {
                continue;
            }
            titles.insert(index, title);
        }

        let mut rewards = data.rewards;
        rewards.truncate(group_count);
        while rewards.len() < group_count {
            let group = rewards.len();
            rewards.push(RewardInfo::placeholder(owner, group));
        }

        Self { titles, rewards }
    }

    /// Catalog made only of placeholders
    pub fn placeholder(group_count: usize, owner: &str) -> Self {
        Self::from_data(CatalogData::default(), group_count, owner)
    }

    pub fn title(&self, index: MissionIndex) -> String {
        self.titles
            .get(&index)
            .cloned()
            .unwrap_or_else(|| placeholder_title(index))
    }

    /// Insert or replace a title. Empty titles fall back to the placeholder.
    pub fn set_title(&mut self, index: MissionIndex, title: Option<&str>) {
        let title = match title {
            Some(t) if !t.trim().is_empty() => t.to_string(),
            _ => placeholder_title(index),
        };
        self.titles.insert(index, title);
    }

    pub fn contains(&self, index: MissionIndex) -> bool {
        self.titles.contains_key(&index)
    }

    /// Mission numbers in ascending order
    pub fn mission_indices(&self) -> impl Iterator<Item = MissionIndex> + '_ {
        self.titles.keys().copied()
    }

    pub fn reward(&self, group: GroupIndex) -> Option<&RewardInfo> {
        self.rewards.get(group)
    }
}
