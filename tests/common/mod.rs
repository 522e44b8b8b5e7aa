//! Shared helpers for session integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use mission_board::domain::{CatalogData, MissionIndex, group_range, required_points};
use mission_board::engine::ProgressRow;
use mission_board::remote::memory::{FixedIdentity, MemoryRemote, StaticCatalog};
use mission_board::{Config, Interaction, Session};

pub const ALUMNO: &str = "lucia";

/// Start a session for [`ALUMNO`] against a fresh in-memory remote
pub async fn start_session(rows: &[ProgressRow]) -> (Session, Arc<MemoryRemote>) {
    start_with(Config::default(), MemoryRemote::with_rows(ALUMNO, rows)).await
}

pub async fn start_with(config: Config, remote: MemoryRemote) -> (Session, Arc<MemoryRemote>) {
    let remote = Arc::new(remote);
    let session = Session::start(
        config,
        remote.clone(),
        &StaticCatalog::new(CatalogData::default()),
        &FixedIdentity::new(ALUMNO),
    )
    .await
    .expect("session should start");
    (session, remote)
}

/// Rows that complete every mission of the given groups
pub fn completed_rows(groups: impl IntoIterator<Item = usize>) -> Vec<ProgressRow> {
    groups
        .into_iter()
        .flat_map(group_range)
        .map(|index| ProgressRow {
            index,
            points: required_points(index),
        })
        .collect()
}

/// Select the mission then tap until it is complete
pub async fn tap_to_complete(session: &Session, index: MissionIndex) {
    let mut points = 0;
    if !matches!(
        session.advance_or_reset(index).await.unwrap(),
        Interaction::Selected(_)
    ) {
        panic!("mission {index} should start unselected");
    }
    while points < required_points(index) {
        match session.advance_or_reset(index).await.unwrap() {
            Interaction::Advanced(change) => points = change.current,
            other => panic!("unexpected interaction {other:?}"),
        }
    }
}

/// Let spawned write tasks and their results run
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}
