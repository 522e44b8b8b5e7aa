//! CLI command implementations

pub mod demo;
pub mod init;
pub mod rules;

use anyhow::Result;
use std::path::{Path, PathBuf};

use mission_board::Config;

/// Load the explicit config file if given, otherwise search from `work_dir`
pub fn load_config(work_dir: &Path, config_path: Option<&PathBuf>) -> Result<Config> {
    match config_path {
        Some(path) => Config::from_file(path),
        None => Config::from_dir(work_dir),
    }
}
