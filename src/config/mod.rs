//! Configuration loading and management

mod io;
mod settings;

pub use settings::{BoardSettings, RetryPolicy, RewardSettings, TimingSettings};

use serde::{Deserialize, Serialize};

use crate::domain::RewardLadder;
use crate::error::BoardError;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Board shape and identity override
    #[serde(default)]
    pub board: BoardSettings,

    /// Reveal and animation timings
    #[serde(default)]
    pub timing: TimingSettings,

    /// Reward threshold ladder
    #[serde(default)]
    pub rewards: RewardSettings,

    /// Remote write retry policy
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Config {
    /// Check that the configuration describes a usable board
    pub fn validate(&self) -> Result<(), BoardError> {
        if self.board.group_count == 0 {
            return Err(BoardError::Config("group_count must be at least 1".to_string()));
        }
        let ladder = self.ladder()?;
        if ladder.len() != self.board.group_count {
            return Err(BoardError::Config(format!(
                "expected {} reward thresholds (one per group), found {}",
                self.board.group_count,
                ladder.len()
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(BoardError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.timing.reward_tick_ms == 0 {
            return Err(BoardError::Config(
                "timing.reward_tick_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Validated reward ladder
    pub fn ladder(&self) -> Result<RewardLadder, BoardError> {
        RewardLadder::new(self.rewards.thresholds.clone())
    }
}
