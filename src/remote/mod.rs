//! Collaborator interfaces consumed by a session
//!
//! Transport (HTTP, realtime channels, files) lives behind these traits. The
//! [`memory`] module provides in-process implementations for tests and demos.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde_json::Value;

use crate::domain::{CatalogData, MissionIndex};
use crate::engine::ProgressRow;
use crate::error::BoardError;

/// Authoritative progress storage, partitioned by alumno
#[async_trait]
pub trait RemoteProgressStore: Send + Sync {
    /// Read every progress row for the alumno
    async fn read_all(&self, alumno: &str) -> Result<Vec<ProgressRow>, BoardError>;

    /// Persist one mission. Failures are reported, never retried here.
    async fn write(
        &self,
        alumno: &str,
        index: MissionIndex,
        points: u32,
        completed: bool,
    ) -> Result<(), BoardError>;

    /// Best-effort record of the selected mission
    async fn write_selection(
        &self,
        alumno: &str,
        mission: Option<MissionIndex>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), BoardError>;

    /// Raw push payloads (upserts, deletes, selection changes)
    fn subscribe(&self) -> BoxStream<'static, Value>;
}

/// Source of mission titles and reward entries
#[async_trait]
pub trait CatalogLoader: Send + Sync {
    async fn load(&self) -> Result<CatalogData, BoardError>;
}

/// Resolves the alumno identifier used as partition key
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self) -> Result<String, BoardError>;
}
