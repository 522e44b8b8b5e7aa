//! In-process collaborators: a remote store with failure injection, a static
//! catalog and a fixed identity

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream::BoxStream;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tracing::warn;

use super::{CatalogLoader, IdentityProvider, RemoteProgressStore};
use crate::domain::{CatalogData, MissionIndex, required_points};
use crate::engine::ProgressRow;
use crate::error::BoardError;

const PUSH_CAPACITY: usize = 256;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A write observed by the in-memory store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub alumno: String,
    pub index: MissionIndex,
    pub points: u32,
    pub completed: bool,
    pub accepted: bool,
}

/// Progress store kept in memory. Admin-side edits are broadcast as push
/// payloads in the same loose schema a realtime backend would use.
pub struct MemoryRemote {
    rows: Mutex<BTreeMap<String, BTreeMap<MissionIndex, u32>>>,
    selections: Mutex<HashMap<String, Option<MissionIndex>>>,
    writes: Mutex<Vec<WriteRecord>>,
    fail_writes: AtomicU32,
    fail_reads: AtomicBool,
    fail_selections: AtomicBool,
    pushes: broadcast::Sender<Value>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        let (pushes, _) = broadcast::channel(PUSH_CAPACITY);
        Self {
            rows: Mutex::new(BTreeMap::new()),
            selections: Mutex::new(HashMap::new()),
            writes: Mutex::new(Vec::new()),
            fail_writes: AtomicU32::new(0),
            fail_reads: AtomicBool::new(false),
            fail_selections: AtomicBool::new(false),
            pushes,
        }
    }

    /// Pre-populate rows without emitting pushes
    pub fn with_rows(alumno: &str, rows: &[ProgressRow]) -> Self {
        let remote = Self::new();
        {
            let mut all = lock(&remote.rows);
            let entry = all.entry(alumno.to_string()).or_default();
            for row in rows {
                entry.insert(row.index, row.points);
            }
        }
        remote
    }

    /// Make the next `n` writes fail
    pub fn fail_next_writes(&self, n: u32) {
        self.fail_writes.store(n, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_selection_writes(&self, fail: bool) {
        self.fail_selections.store(fail, Ordering::SeqCst);
    }

    /// Every write attempt seen so far, failed ones included
    pub fn writes(&self) -> Vec<WriteRecord> {
        lock(&self.writes).clone()
    }

    pub fn points(&self, alumno: &str, index: MissionIndex) -> Option<u32> {
        lock(&self.rows).get(alumno)?.get(&index).copied()
    }

    pub fn selection(&self, alumno: &str) -> Option<MissionIndex> {
        lock(&self.selections).get(alumno).copied().flatten()
    }

    /// Broadcast a raw payload to every subscriber
    pub fn push(&self, payload: Value) -> usize {
        self.pushes.send(payload).unwrap_or(0)
    }

    /// Edit made from another device: store it and push an update
    pub fn admin_set(&self, alumno: &str, index: MissionIndex, points: u32) -> usize {
        lock(&self.rows)
            .entry(alumno.to_string())
            .or_default()
            .insert(index, points);
        self.push(json!({
            "eventType": "UPDATE",
            "table": "missions",
            "new": {
                "number": index,
                "estrellas": points,
                "estado": points >= required_points(index),
                "alumno": alumno,
            }
        }))
    }

    /// Row deleted from another device
    pub fn admin_delete(&self, alumno: &str, index: MissionIndex) -> usize {
        if let Some(rows) = lock(&self.rows).get_mut(alumno) {
            rows.remove(&index);
        }
        self.push(json!({
            "eventType": "DELETE",
            "table": "missions",
            "new": {},
            "old": { "numero": index, "alumno": alumno }
        }))
    }

    /// Selection changed from another device
    pub fn admin_select(&self, alumno: &str, mission: Option<MissionIndex>) -> usize {
        lock(&self.selections).insert(alumno.to_string(), mission);
        self.push(json!({
            "eventType": "UPDATE",
            "table": "user_meta",
            "new": { "alumno": alumno, "selected_mission": mission }
        }))
    }

    fn take_failure(&self) -> bool {
        self.fail_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteProgressStore for MemoryRemote {
    async fn read_all(&self, alumno: &str) -> Result<Vec<ProgressRow>, BoardError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(BoardError::RemoteRead("injected read failure".to_string()));
        }
        Ok(lock(&self.rows)
            .get(alumno)
            .map(|rows| {
                rows.iter()
                    .map(|(&index, &points)| ProgressRow { index, points })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn write(
        &self,
        alumno: &str,
        index: MissionIndex,
        points: u32,
        completed: bool,
    ) -> Result<(), BoardError> {
        let accepted = !self.take_failure();
        lock(&self.writes).push(WriteRecord {
            alumno: alumno.to_string(),
            index,
            points,
            completed,
            accepted,
        });
        if !accepted {
            return Err(BoardError::RemoteWrite {
                index,
                reason: "injected write failure".to_string(),
            });
        }
        lock(&self.rows)
            .entry(alumno.to_string())
            .or_default()
            .insert(index, points);
        Ok(())
    }

    async fn write_selection(
        &self,
        alumno: &str,
        mission: Option<MissionIndex>,
        _updated_at: DateTime<Utc>,
    ) -> Result<(), BoardError> {
        if self.fail_selections.load(Ordering::SeqCst) {
            return Err(BoardError::SelectionWrite("injected selection failure".to_string()));
        }
        lock(&self.selections).insert(alumno.to_string(), mission);
        Ok(())
    }

    fn subscribe(&self) -> BoxStream<'static, Value> {
        let rx = self.pushes.subscribe();
        futures::stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(payload) => return Some((payload, rx)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Push subscriber lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}

/// Catalog served from memory; `None` simulates an unavailable catalog
pub struct StaticCatalog {
    data: Option<CatalogData>,
}

impl StaticCatalog {
    pub fn new(data: CatalogData) -> Self {
        Self { data: Some(data) }
    }

    pub fn unavailable() -> Self {
        Self { data: None }
    }
}

#[async_trait]
impl CatalogLoader for StaticCatalog {
    async fn load(&self) -> Result<CatalogData, BoardError> {
        self.data
            .clone()
            .ok_or_else(|| BoardError::CatalogUnavailable("no catalog configured".to_string()))
    }
}

/// Identity known up front; `None` simulates a failed lookup
pub struct FixedIdentity(pub Option<String>);

impl FixedIdentity {
    pub fn new(alumno: impl Into<String>) -> Self {
        Self(Some(alumno.into()))
    }
}

#[async_trait]
impl IdentityProvider for FixedIdentity {
    async fn resolve(&self) -> Result<String, BoardError> {
        self.0
            .clone()
            .ok_or_else(|| BoardError::IdentityUnavailable("no identity configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PushEvent;

    #[tokio::test]
    async fn test_write_failure_injection() {
        let remote = MemoryRemote::new();
        remote.fail_next_writes(1);
        assert!(remote.write("a", 1, 1, true).await.is_err());
        assert!(remote.write("a", 1, 1, true).await.is_ok());
        let writes = remote.writes();
        assert_eq!(writes.len(), 2);
        assert!(!writes[0].accepted);
        assert!(writes[1].accepted);
        assert_eq!(remote.points("a", 1), Some(1));
    }

    #[tokio::test]
    async fn test_read_partitioned_by_alumno() {
        let remote = MemoryRemote::with_rows("a", &[ProgressRow { index: 2, points: 1 }]);
        assert_eq!(remote.read_all("a").await.unwrap().len(), 1);
        assert!(remote.read_all("b").await.unwrap().is_empty());
        remote.set_fail_reads(true);
        assert!(matches!(remote.read_all("a").await, Err(BoardError::RemoteRead(_))));
    }

    #[tokio::test]
    async fn test_admin_edits_are_pushed_in_wire_schema() {
        let remote = MemoryRemote::new();
        let mut pushes = remote.subscribe();
        remote.admin_set("a", 4, 2);
        remote.admin_delete("a", 4);

        let first = PushEvent::from_value(pushes.next().await.unwrap()).unwrap();
        assert!(matches!(first, PushEvent::Upsert(ref r) if r.index == 4 && r.points == Some(2)));
        let second = PushEvent::from_value(pushes.next().await.unwrap()).unwrap();
        assert_eq!(
            second,
            PushEvent::Delete {
                index: 4,
                alumno: Some("a".to_string())
            }
        );
    }

    #[tokio::test]
    async fn test_static_catalog_unavailable() {
        assert!(StaticCatalog::unavailable().load().await.is_err());
        assert!(FixedIdentity(None).resolve().await.is_err());
        assert_eq!(FixedIdentity::new("x").resolve().await.unwrap(), "x");
    }
}
