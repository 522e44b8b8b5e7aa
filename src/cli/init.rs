//! Init command implementation

use anyhow::{Result, bail};
use std::path::PathBuf;

use mission_board::Config;

/// Default configuration content for mission-board init
pub const DEFAULT_CONFIG: &str = r#"# Mission Board Configuration
# ===========================

# Board shape. Each group holds ten missions worth 20 points in total.
# `alumno` is only used when no identity can be resolved.
[board]
group_count = 5
# alumno = "ana"

# Reveal and animation timings (milliseconds)
[timing]
# Delay between a mission reaching completion and it showing as complete
mission_reveal_ms = 1500
# One reward counter step
reward_tick_ms = 300
# Delay between a counter reaching its threshold and the reward showing
reward_reveal_ms = 1000

# Cumulative points needed for each reward, one entry per group
[rewards]
thresholds = [20, 40, 60, 80, 100]

# Remote write retries. max_attempts counts the first attempt;
# set it to 1 to log and drop failed writes.
[retry]
max_attempts = 3
backoff_ms = 500
"#;

/// Write the default config (global path unless one is given)
pub async fn init_command(config_path: Option<PathBuf>, force: bool) -> Result<()> {
    let config_path = config_path.unwrap_or_else(Config::global_config_path);

    if config_path.exists() && !force {
        bail!(
            "Configuration already exists: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(&config_path, DEFAULT_CONFIG)?;
    println!("Created: {}", config_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_defaults() {
        let parsed: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");
        init_command(Some(path.clone()), false).await.unwrap();
        assert!(path.exists());
        assert!(init_command(Some(path.clone()), false).await.is_err());
        assert!(init_command(Some(path), true).await.is_ok());
    }
}
