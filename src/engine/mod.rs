//! Progression and unlock engine
//!
//! The engine is a synchronous state machine driven by three kinds of input:
//! user interaction ([`Engine::advance_or_reset`]), remote pushes
//! ([`Engine::apply_push`]) and the clock ([`Engine::advance_time`]). Work that
//! must leave the engine (remote writes) is queued as [`Effect`]s for the
//! caller to execute; their outcome comes back through
//! [`Engine::on_write_result`].
//!
//! All timers live in one [`TimerSlots`] keyed by entity, and every timer
//! re-validates the live state when it fires.

mod progress;
mod reconcile;
mod reveal;
mod rewards;
mod timers;
mod unlock;
mod view;

pub use progress::{PointsChange, ProgressRow, ProgressSnapshot, ProgressStore};
pub use reconcile::{MergeOutcome, MissionRecord, PushEvent, Reconciler, WriteRequest, merge_remote};
pub use reveal::{MissionReveal, RevealScheduler, RewardCounter};
pub use rewards::{RewardProgress, cumulative_points, total_score};
pub use timers::{TimerKey, TimerSlots};
pub use unlock::{UnlockState, evaluate, group_complete};
pub use view::{BoardView, MissionView, RewardView};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::Config;
use crate::domain::{Catalog, GroupIndex, MissionIndex, RewardLadder, required_points};
use crate::error::BoardError;

/// Work the engine asks its driver to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Persist a mission's points to the remote store
    PersistProgress(WriteRequest),
    /// Best-effort record of the current selection
    PersistSelection {
        mission: Option<MissionIndex>,
        updated_at: DateTime<Utc>,
    },
}

/// Why an interaction had no effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Unknown,
    Locked,
    Disposed,
}

/// Result of [`Engine::advance_or_reset`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    /// First interaction: the mission is now selected, progress untouched
    Selected(MissionIndex),
    /// Second interaction on the selected mission: points advanced (or wrapped)
    Advanced(PointsChange),
    Ignored(IgnoreReason),
}

pub struct Engine {
    alumno: String,
    group_count: usize,
    ladder: RewardLadder,
    catalog: Catalog,
    store: ProgressStore,
    reveal: RevealScheduler,
    reconciler: Reconciler,
    timers: TimerSlots<TimerKey>,
    selection: Option<MissionIndex>,
    outbox: Vec<Effect>,
    disposed: bool,
}

impl Engine {
    pub fn new(
        config: &Config,
        alumno: impl Into<String>,
        catalog: Catalog,
    ) -> Result<Self, BoardError> {
        config.validate()?;
        let group_count = config.board.group_count;
        Ok(Self {
            alumno: alumno.into(),
            group_count,
            ladder: config.ladder()?,
            store: ProgressStore::with_missions(catalog.mission_indices()),
            catalog,
            reveal: RevealScheduler::new(config.timing.clone(), group_count),
            reconciler: Reconciler::new(config.retry.clone()),
            timers: TimerSlots::new(),
            selection: None,
            outbox: Vec::new(),
            disposed: false,
        })
    }

    pub fn alumno(&self) -> &str {
        &self.alumno
    }

    /// Load the initial remote progress. Complete missions show immediately
    /// and reward counters start at their targets; only reward reveals wait.
    pub fn hydrate(&mut self, rows: &[ProgressRow], now: Instant) {
        if self.disposed {
            return;
        }
        for row in rows {
            self.timers.cancel(&TimerKey::MissionReveal(row.index));
            if row.index > 0 && !self.catalog.contains(row.index) {
                self.catalog.set_title(row.index, None);
            }
        }
        let applied = self.store.hydrate(rows);
        debug!(rows = applied, "Hydrated progress");
        let unlock = self.unlock_state();
        for group in 0..self.group_count {
            let progress = rewards::progress(&self.store, &unlock, &self.ladder, group);
            self.reveal.seed_counter(&progress, &mut self.timers);
        }
        self.recompute_rewards(now);
    }

    /// The single mutating entry point for user interaction
    pub fn advance_or_reset(&mut self, index: MissionIndex, now: Instant) -> Interaction {
        if self.disposed {
            return Interaction::Ignored(IgnoreReason::Disposed);
        }
        if !self.store.contains(index) {
            return Interaction::Ignored(IgnoreReason::Unknown);
        }
        if self.unlock_state().is_locked(index) {
            return Interaction::Ignored(IgnoreReason::Locked);
        }

        if self.selection != Some(index) {
            self.selection = Some(index);
            self.outbox.push(Effect::PersistSelection {
                mission: Some(index),
                updated_at: Utc::now(),
            });
            return Interaction::Selected(index);
        }

        let previous = self.store.get(index);
        let next = if previous >= required_points(index) {
            0
        } else {
            previous + 1
        };
        let change = self.store.set(index, next);
        let request = self.reconciler.record_local(&change, &mut self.timers);
        self.outbox.push(Effect::PersistProgress(request));
        self.after_points_changed(&change, now);
        Interaction::Advanced(change)
    }

    /// Normalize and apply a raw push payload. Malformed payloads are ignored.
    pub fn apply_push_value(&mut self, value: Value, now: Instant) -> bool {
        match PushEvent::from_value(value) {
            Ok(event) => {
                self.apply_push(event, now);
                true
            }
            Err(err) => {
                warn!(error = %err, "Ignoring push event");
                false
            }
        }
    }

    /// Apply a remote push. Remote state always wins on arrival.
    pub fn apply_push(&mut self, event: PushEvent, now: Instant) {
        if self.disposed {
            return;
        }
        if let Some(owner) = event.alumno() {
            if owner != self.alumno {
                debug!(owner, "Ignoring push for another alumno");
                return;
            }
        }
        match event {
            PushEvent::Upsert(record) => {
                self.reconciler.on_remote(record.index, &mut self.timers);
                let outcome = merge_remote(&mut self.store, &mut self.catalog, &record);
                if outcome.inserted {
                    debug!(mission = record.index, "Push inserted unknown mission");
                }
                if let Some(change) = outcome.change {
                    self.after_points_changed(&change, now);
                }
            }
            PushEvent::Delete { index, .. } => {
                if !self.store.contains(index) {
                    debug!(mission = index, "Delete for unknown mission ignored");
                    return;
                }
                self.reconciler.on_remote(index, &mut self.timers);
                let change = self.store.reset(index);
                self.after_points_changed(&change, now);
            }
            PushEvent::Selection { mission, .. } => {
                self.selection = mission;
            }
        }
    }

    /// Outcome of a previously emitted [`Effect::PersistProgress`]
    pub fn on_write_result(
        &mut self,
        request: WriteRequest,
        result: Result<(), BoardError>,
        now: Instant,
    ) {
        if self.disposed {
            return;
        }
        self.reconciler
            .on_write_result(request, result, &mut self.timers, now);
    }

    pub fn next_deadline(&mut self) -> Option<Instant> {
        if self.disposed {
            return None;
        }
        self.timers.next_deadline()
    }

    /// Fire every timer due at or before `now`, in deadline order
    pub fn advance_time(&mut self, now: Instant) -> usize {
        let mut fired = 0;
        while !self.disposed {
            let Some((key, at)) = self.timers.pop_due(now) else {
                break;
            };
            self.fire(key, at);
            fired += 1;
        }
        fired
    }

    /// Drain queued effects
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.outbox)
    }

    /// Cancel every outstanding timer and stop reacting to input
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        debug!(timers = self.timers.len(), "Disposing engine");
        self.timers.clear();
        self.reconciler.clear();
        self.outbox.clear();
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn selection(&self) -> Option<MissionIndex> {
        self.selection
    }

    pub fn unlock_state(&self) -> UnlockState {
        evaluate(&self.store, self.group_count)
    }

    pub fn mission_state(&self, index: MissionIndex) -> MissionReveal {
        self.reveal.mission_state(index, &self.store, &self.timers)
    }

    pub fn reward_counter(&self, group: GroupIndex) -> RewardCounter {
        self.reveal.counter(group)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.store.snapshot()
    }

    pub fn view(&self) -> BoardView {
        let unlock = self.unlock_state();
        let missions = self
            .store
            .iter()
            .map(|(index, points)| {
                let locked = unlock.is_locked(index);
                MissionView {
                    index,
                    title: self.catalog.title(index),
                    points,
                    required_points: required_points(index),
                    locked,
                    visible: self.store.is_visible(index),
                    selected: self.selection == Some(index) && !locked,
                }
            })
            .collect();

        let rewards = (0..self.group_count)
            .map(|group| {
                let counter = self.reveal.counter(group);
                let info = self.catalog.reward(group);
                RewardView {
                    group_index: group,
                    title: info.map(|r| r.title.clone()).unwrap_or_default(),
                    condition: info.map(|r| r.condition.clone()).unwrap_or_default(),
                    image_key: info.map(|r| r.image_key.clone()).unwrap_or_default(),
                    displayed_count: counter.displayed,
                    threshold: self.ladder.threshold(group).unwrap_or(0),
                    unlocked_visible: counter.unlocked_visible,
                }
            })
            .collect();

        let max = self.ladder.max().max(1);
        let total = total_score(&self.store).min(max);
        BoardView {
            alumno: self.alumno.clone(),
            missions,
            rewards,
            active_group: unlock.active_group,
            selected: self.selection.filter(|&index| !unlock.is_locked(index)),
            total_score: total,
            progress_pct: (total as f32 / max as f32 * 100.0).clamp(0.0, 100.0),
        }
    }

    fn after_points_changed(&mut self, change: &PointsChange, now: Instant) {
        self.reveal
            .on_points_changed(change, &mut self.store, &mut self.timers, now);
        self.recompute_rewards(now);
    }

    fn reward_progress(&self, group: GroupIndex) -> RewardProgress {
        let unlock = self.unlock_state();
        rewards::progress(&self.store, &unlock, &self.ladder, group)
    }

    fn recompute_rewards(&mut self, now: Instant) {
        let unlock = self.unlock_state();
        let progress: Vec<RewardProgress> = (0..self.group_count)
            .map(|group| rewards::progress(&self.store, &unlock, &self.ladder, group))
            .collect();
        self.reveal.recompute(&progress, &mut self.timers, now);
    }

    fn fire(&mut self, key: TimerKey, at: Instant) {
        match key {
            TimerKey::MissionReveal(index) => {
                if self.reveal.fire_mission_reveal(index, &mut self.store) {
                    self.recompute_rewards(at);
                }
            }
            TimerKey::RewardTick(group) => {
                let progress = self.reward_progress(group);
                self.reveal.fire_tick(&progress, &mut self.timers, at);
            }
            TimerKey::RewardReveal(group) => {
                let progress = self.reward_progress(group);
                self.reveal.fire_reward_reveal(&progress);
            }
            TimerKey::WriteRetry(index) => {
                if let Some(request) = self.reconciler.fire_retry(index, &self.store) {
                    debug!(mission = index, attempt = request.attempt, "Retrying remote write");
                    self.outbox.push(Effect::PersistProgress(request));
                }
            }
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.dispose();
    }
}
