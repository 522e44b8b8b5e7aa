//! Reconciliation layer: remote pushes and optimistic local writes
//!
//! Push payloads arrive in more than one schema (`number`/`numero`,
//! `title`/`titulo`). They are normalized here into [`PushEvent`] so the rest
//! of the engine only ever sees one field per concept.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::domain::{Catalog, MissionIndex, required_points};
use crate::error::BoardError;

use super::progress::{PointsChange, ProgressStore};
use super::timers::{TimerKey, TimerSlots};

/// Canonical, possibly partial, mission record from a push
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionRecord {
    pub index: MissionIndex,
    pub points: Option<u32>,
    /// Completion flag, only consulted when `points` is absent
    pub completed: Option<bool>,
    pub title: Option<String>,
    /// Owner of the row, when the payload names one
    pub alumno: Option<String>,
}

impl MissionRecord {
    pub fn points(index: MissionIndex, points: u32) -> Self {
        Self {
            index,
            points: Some(points),
            completed: None,
            title: None,
            alumno: None,
        }
    }
}

/// A normalized push notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    Upsert(MissionRecord),
    Delete {
        index: MissionIndex,
        alumno: Option<String>,
    },
    /// Selection changed on another device for the given identity
    Selection {
        alumno: String,
        mission: Option<MissionIndex>,
    },
}

#[derive(Debug, Default, Deserialize)]
struct RawRow {
    number: Option<Value>,
    numero: Option<Value>,
    title: Option<Value>,
    titulo: Option<Value>,
    estrellas: Option<Value>,
    estado: Option<Value>,
    alumno: Option<Value>,
    selected_mission: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawPush {
    #[serde(rename = "eventType", alias = "event_type", default)]
    event_type: Option<String>,
    #[serde(default)]
    table: Option<String>,
    #[serde(default, rename = "new")]
    new_row: Option<RawRow>,
    #[serde(default, rename = "old")]
    old_row: Option<RawRow>,
}

impl RawRow {
    fn index(&self) -> Option<MissionIndex> {
        let value = self.number.as_ref().or(self.numero.as_ref())?;
        value
            .as_u64()
            .and_then(|n| MissionIndex::try_from(n).ok())
            .filter(|&n| n > 0)
    }

    fn title(&self) -> Option<String> {
        self.title
            .as_ref()
            .or(self.titulo.as_ref())
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    fn alumno(&self) -> Option<String> {
        self.alumno
            .as_ref()
            .and_then(Value::as_str)
            .filter(|a| !a.trim().is_empty())
            .map(str::to_string)
    }

    fn points(&self) -> Option<u32> {
        let value = self.estrellas.as_ref()?;
        if let Some(n) = value.as_u64() {
            return Some(u32::try_from(n).unwrap_or(u32::MAX));
        }
        value.as_i64().map(|_| 0)
    }

    fn is_empty(&self) -> bool {
        self.number.is_none()
            && self.numero.is_none()
            && self.alumno.is_none()
            && self.selected_mission.is_none()
    }
}

impl PushEvent {
    /// Normalize a raw push payload
    pub fn from_value(value: Value) -> Result<Self, BoardError> {
        let raw: RawPush = serde_json::from_value(value)
            .map_err(|e| BoardError::MalformedPush(e.to_string()))?;

        let is_delete = raw
            .event_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("DELETE"));

        let row = match (raw.new_row, raw.old_row) {
            (Some(new_row), _) if !new_row.is_empty() => new_row,
            (_, Some(old_row)) => old_row,
            _ => return Err(BoardError::MalformedPush("payload has no row".to_string())),
        };

        if raw.table.as_deref() == Some("user_meta") {
            let alumno = row
                .alumno
                .as_ref()
                .and_then(Value::as_str)
                .ok_or_else(|| BoardError::MalformedPush("selection without alumno".to_string()))?
                .to_string();
            let mission = if is_delete {
                None
            } else {
                row.selected_mission
                    .as_ref()
                    .and_then(Value::as_u64)
                    .and_then(|n| MissionIndex::try_from(n).ok())
                    .filter(|&n| n > 0)
            };
            return Ok(Self::Selection { alumno, mission });
        }

        let index = row.index().ok_or_else(|| {
            BoardError::MalformedPush("row has neither number nor numero".to_string())
        })?;

        let alumno = row.alumno();
        if is_delete {
            return Ok(Self::Delete { index, alumno });
        }

        Ok(Self::Upsert(MissionRecord {
            index,
            points: row.points(),
            completed: row.estado.as_ref().and_then(Value::as_bool),
            title: row.title(),
            alumno,
        }))
    }

    pub fn delete(index: MissionIndex) -> Self {
        Self::Delete {
            index,
            alumno: None,
        }
    }

    /// Owner named by the payload, if any
    pub fn alumno(&self) -> Option<&str> {
        match self {
            Self::Upsert(record) => record.alumno.as_deref(),
            Self::Delete { alumno, .. } => alumno.as_deref(),
            Self::Selection { alumno, .. } => Some(alumno),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, BoardError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| BoardError::MalformedPush(e.to_string()))?;
        Self::from_value(value)
    }
}

/// What a remote upsert did to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub inserted: bool,
    pub change: Option<PointsChange>,
}

/// Apply a remote record. The remote value always wins.
pub fn merge_remote(
    store: &mut ProgressStore,
    catalog: &mut Catalog,
    record: &MissionRecord,
) -> MergeOutcome {
    let index = record.index;
    let inserted = store.ensure(index);

    if record.title.is_some() || !catalog.contains(index) {
        catalog.set_title(index, record.title.as_deref());
    }

    let required = required_points(index);
    let target = match (record.points, record.completed) {
        (Some(points), _) => Some(points),
        (None, Some(true)) => Some(required),
        (None, Some(false)) => Some(store.get(index).min(required - 1)),
        (None, None) => None,
    };

    MergeOutcome {
        inserted,
        change: target.map(|points| store.set(index, points)),
    }
}

/// A progress write to send to the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRequest {
    pub index: MissionIndex,
    pub points: u32,
    pub required: u32,
    /// 1-based attempt number
    pub attempt: u32,
}

impl WriteRequest {
    pub fn completed(&self) -> bool {
        self.points >= self.required
    }
}

/// Tracks the latest unacknowledged local write per mission
#[derive(Debug)]
pub struct Reconciler {
    policy: RetryPolicy,
    pending: HashMap<MissionIndex, WriteRequest>,
}

impl Reconciler {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            pending: HashMap::new(),
        }
    }

    /// Register an optimistic local write, superseding any earlier one
    pub fn record_local(
        &mut self,
        change: &PointsChange,
        timers: &mut TimerSlots<TimerKey>,
    ) -> WriteRequest {
        timers.cancel(&TimerKey::WriteRetry(change.index));
        let request = WriteRequest {
            index: change.index,
            points: change.current,
            required: change.required,
            attempt: 1,
        };
        self.pending.insert(change.index, request);
        request
    }

    /// A remote push for the mission arrived: it is the new truth
    pub fn on_remote(&mut self, index: MissionIndex, timers: &mut TimerSlots<TimerKey>) {
        if self.pending.remove(&index).is_some() {
            debug!(mission = index, "Remote push supersedes pending local write");
        }
        timers.cancel(&TimerKey::WriteRetry(index));
    }

    /// Handle the outcome of a write. Failures are logged and retried per policy.
    pub fn on_write_result(
        &mut self,
        request: WriteRequest,
        result: Result<(), BoardError>,
        timers: &mut TimerSlots<TimerKey>,
        now: Instant,
    ) {
        let is_current = self.pending.get(&request.index) == Some(&request);
        match result {
            Ok(()) => {
                if is_current {
                    self.pending.remove(&request.index);
                }
            }
            Err(err) => {
                warn!(
                    mission = request.index,
                    points = request.points,
                    attempt = request.attempt,
                    error = %err,
                    "Remote progress write failed"
                );
                if !is_current {
                    return;
                }
                if self.policy.allows_retry(request.attempt) {
                    timers.schedule(TimerKey::WriteRetry(request.index), now + self.policy.backoff());
                } else {
                    warn!(
                        mission = request.index,
                        attempts = request.attempt,
                        "Giving up on remote write, keeping local value"
                    );
                    self.pending.remove(&request.index);
                }
            }
        }
    }

    /// Retry timer fired: re-issue the write if the local value still matches
    pub fn fire_retry(&mut self, index: MissionIndex, store: &ProgressStore) -> Option<WriteRequest> {
        let request = self.pending.get_mut(&index)?;
        if store.get(index) != request.points {
            self.pending.remove(&index);
            return None;
        }
        request.attempt += 1;
        Some(*request)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
