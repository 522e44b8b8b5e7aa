//! Demo command implementation
//!
//! Runs a real session against the in-memory remote, replays a tap sequence
//! and prints the settled board as JSON.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use mission_board::domain::{CatalogData, MissionIndex};
use mission_board::engine::ProgressRow;
use mission_board::remote::memory::{FixedIdentity, MemoryRemote, StaticCatalog};
use mission_board::session::FALLBACK_ALUMNO;
use mission_board::{Config, Interaction, Session};

pub struct DemoOptions<'a> {
    pub taps: &'a [MissionIndex],
    pub interval: Duration,
    pub progress: Option<&'a Path>,
    pub catalog: Option<&'a Path>,
}

/// Replay taps against an in-memory board and print the final view
pub async fn demo_command(config: Config, options: DemoOptions<'_>) -> Result<()> {
    let alumno = config
        .board
        .alumno
        .clone()
        .unwrap_or_else(|| FALLBACK_ALUMNO.to_string());

    let rows: Vec<ProgressRow> = match options.progress {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };
    let catalog = match options.catalog {
        Some(path) => StaticCatalog::new(read_json::<CatalogData>(path)?),
        None => StaticCatalog::unavailable(),
    };

    let settle = settle_time(&config)?;
    let remote = Arc::new(MemoryRemote::with_rows(&alumno, &rows));
    let session = Session::start(
        config,
        remote.clone(),
        &catalog,
        &FixedIdentity::new(alumno.clone()),
    )
    .await?;

    for &index in options.taps {
        match session.advance_or_reset(index).await? {
            Interaction::Selected(i) => println!("tap {:>3}: selected", i),
            Interaction::Advanced(change) => println!(
                "tap {:>3}: {} -> {} / {}",
                change.index, change.previous, change.current, change.required
            ),
            Interaction::Ignored(reason) => println!("tap {:>3}: ignored ({:?})", index, reason),
        }
        if !options.interval.is_zero() {
            tokio::time::sleep(options.interval).await;
        }
    }

    info!(settle_ms = settle.as_millis() as u64, "Waiting for animations to settle");
    tokio::time::sleep(settle).await;

    let view = session.view().await?;
    println!("{}", serde_json::to_string_pretty(&view)?);
    println!("Remote writes: {}", remote.writes().len());

    session.shutdown().await?;
    Ok(())
}

/// Long enough for a full reveal, every counter step and the reward reveal
fn settle_time(config: &Config) -> Result<Duration> {
    let ladder = config.ladder()?;
    let timing = &config.timing;
    Ok(timing.mission_reveal()
        + timing.reward_tick() * ladder.max()
        + timing.reward_reveal()
        + Duration::from_millis(50))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}
