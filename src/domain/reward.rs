//! Reward ladder and reward catalog entries
//!
//! Each group has one reward, unlocked once the cumulative points of all
//! visible missions up to the end of that group reach its threshold.

use serde::{Deserialize, Serialize};

use super::scoring::GroupIndex;
use crate::error::BoardError;

/// Default cumulative thresholds, one per group
pub const DEFAULT_THRESHOLDS: &[u32] = &[20, 40, 60, 80, 100];

/// Strictly increasing cumulative thresholds, indexed by group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardLadder {
    thresholds: Vec<u32>,
}

impl RewardLadder {
    /// Build a ladder, rejecting empty, zero or non-increasing thresholds
    pub fn new(thresholds: Vec<u32>) -> Result<Self, BoardError> {
        if thresholds.is_empty() {
            return Err(BoardError::Config("reward ladder is empty".to_string()));
        }
        if thresholds[0] == 0 {
            return Err(BoardError::Config(
                "reward thresholds must be positive".to_string(),
            ));
        }
        if let Some(pair) = thresholds.windows(2).find(|w| w[1] <= w[0]) {
            return Err(BoardError::Config(format!(
                "reward thresholds must be strictly increasing ({} then {})",
                pair[0], pair[1]
            )));
        }
        Ok(Self { thresholds })
    }

    /// Threshold for a group (None if the group has no reward)
    pub fn threshold(&self, group: GroupIndex) -> Option<u32> {
        self.thresholds.get(group).copied()
    }

    /// Number of rewards (and therefore groups)
    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }

    /// Highest threshold, used as the 100% mark of the overall progress bar
    pub fn max(&self) -> u32 {
        self.thresholds.last().copied().unwrap_or(0)
    }
}

impl Default for RewardLadder {
    fn default() -> Self {
        Self {
            thresholds: DEFAULT_THRESHOLDS.to_vec(),
        }
    }
}

/// Catalog entry describing a reward
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardInfo {
    pub title: String,
    #[serde(default)]
    pub condition: String,
    /// Image lookup key, `<owner>/<n>.jpeg`
    pub image_key: String,
}

impl RewardInfo {
    /// Placeholder used when the reward catalog is missing an entry
    pub fn placeholder(owner: &str, group: GroupIndex) -> Self {
        let n = group + 1;
        Self {
            title: format!("Reward {}", n),
            condition: String::new(),
            image_key: image_key(owner, n),
        }
    }
}

/// Image key for the n-th (1-based) reward of an owner
pub fn image_key(owner: &str, n: usize) -> String {
    let owner = if owner.trim().is_empty() {
        "default"
    } else {
        owner.trim()
    };
    let safe: String = owner
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{}/{}.jpeg", safe, n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ladder() {
        let ladder = RewardLadder::default();
        assert_eq!(ladder.len(), 5);
        assert_eq!(ladder.threshold(0), Some(20));
        assert_eq!(ladder.threshold(4), Some(100));
        assert_eq!(ladder.threshold(5), None);
        assert_eq!(ladder.max(), 100);
    }

    #[test]
    fn test_ladder_rejects_non_increasing() {
        assert!(RewardLadder::new(vec![20, 20, 60]).is_err());
        assert!(RewardLadder::new(vec![40, 20]).is_err());
        assert!(RewardLadder::new(vec![0, 20]).is_err());
        assert!(RewardLadder::new(vec![]).is_err());
        assert!(RewardLadder::new(vec![5, 10, 15]).is_ok());
    }

    #[test]
    fn test_image_key_sanitizes_owner() {
        assert_eq!(image_key("Mateo", 3), "Mateo/3.jpeg");
        assert_eq!(image_key("../etc", 1), "___etc/1.jpeg");
        assert_eq!(image_key("  ", 2), "default/2.jpeg");
    }
}
