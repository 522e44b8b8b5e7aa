//! Settings configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::DEFAULT_THRESHOLDS;

/// Board shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSettings {
    /// Number of mission groups (ten missions each)
    #[serde(default = "default_group_count")]
    pub group_count: usize,

    /// Identity used when the identity provider cannot resolve one
    #[serde(default)]
    pub alumno: Option<String>,
}

fn default_group_count() -> usize {
    5
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            group_count: default_group_count(),
            alumno: None,
        }
    }
}

/// Reveal and animation timings, in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingSettings {
    /// Debounce between a mission reaching completion and it being shown as complete
    #[serde(default = "default_mission_reveal_ms")]
    pub mission_reveal_ms: u64,

    /// Interval between reward counter steps
    #[serde(default = "default_reward_tick_ms")]
    pub reward_tick_ms: u64,

    /// Delay between a reward counter reaching its threshold and the reward unlocking
    #[serde(default = "default_reward_reveal_ms")]
    pub reward_reveal_ms: u64,
}

fn default_mission_reveal_ms() -> u64 {
    1500
}

fn default_reward_tick_ms() -> u64 {
    300
}

fn default_reward_reveal_ms() -> u64 {
    1000
}

impl TimingSettings {
    pub fn mission_reveal(&self) -> Duration {
        Duration::from_millis(self.mission_reveal_ms)
    }

    pub fn reward_tick(&self) -> Duration {
        Duration::from_millis(self.reward_tick_ms)
    }

    pub fn reward_reveal(&self) -> Duration {
        Duration::from_millis(self.reward_reveal_ms)
    }
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            mission_reveal_ms: default_mission_reveal_ms(),
            reward_tick_ms: default_reward_tick_ms(),
            reward_reveal_ms: default_reward_reveal_ms(),
        }
    }
}

/// Reward thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardSettings {
    /// Cumulative points needed per reward, one entry per group
    #[serde(default = "default_thresholds")]
    pub thresholds: Vec<u32>,
}

fn default_thresholds() -> Vec<u32> {
    DEFAULT_THRESHOLDS.to_vec()
}

impl Default for RewardSettings {
    fn default() -> Self {
        Self {
            thresholds: default_thresholds(),
        }
    }
}

/// Retry policy for failed remote progress writes
///
/// `max_attempts` counts the first attempt, so 1 means "log and drop".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    500
}

impl RetryPolicy {
    /// Whether another attempt is allowed after `attempt` failed
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}
