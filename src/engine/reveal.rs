//! Reveal scheduler: delayed visibility for missions and rewards
//!
//! Completion is debounced, regression never is. Every timer callback
//! re-validates the live state before committing anything.

use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::TimingSettings;
use crate::domain::{GroupIndex, MissionIndex};

use super::progress::{PointsChange, ProgressStore};
use super::rewards::RewardProgress;
use super::timers::{TimerKey, TimerSlots};

/// Visibility state of a single mission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionReveal {
    Hidden,
    PendingReveal(Instant),
    Visible,
}

/// Displayed state of a reward counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewardCounter {
    pub displayed: u32,
    pub unlocked_visible: bool,
}

#[derive(Debug)]
pub struct RevealScheduler {
    timing: TimingSettings,
    counters: Vec<RewardCounter>,
}

impl RevealScheduler {
    pub fn new(timing: TimingSettings, group_count: usize) -> Self {
        Self {
            timing,
            counters: vec![RewardCounter::default(); group_count],
        }
    }

    pub fn mission_state(
        &self,
        index: MissionIndex,
        store: &ProgressStore,
        timers: &TimerSlots<TimerKey>,
    ) -> MissionReveal {
        if store.is_visible(index) {
            MissionReveal::Visible
        } else if let Some(deadline) = timers.deadline(&TimerKey::MissionReveal(index)) {
            MissionReveal::PendingReveal(deadline)
        } else {
            MissionReveal::Hidden
        }
    }

    /// React to a points mutation. Returns true if visibility dropped right away.
    pub fn on_points_changed(
        &self,
        change: &PointsChange,
        store: &mut ProgressStore,
        timers: &mut TimerSlots<TimerKey>,
        now: Instant,
    ) -> bool {
        let key = TimerKey::MissionReveal(change.index);
        if change.completed() {
            timers.schedule(key, now + self.timing.mission_reveal());
            debug!(mission = change.index, "Mission complete, reveal pending");
            false
        } else if !change.is_complete() {
            let cancelled = timers.cancel(&key);
            let hidden = store.hide(change.index);
            if cancelled || hidden {
                debug!(mission = change.index, cancelled, hidden, "Mission no longer complete");
            }
            hidden
        } else {
            false
        }
    }

    /// Debounce expired: commit visibility only if the mission is still complete
    pub fn fire_mission_reveal(&self, index: MissionIndex, store: &mut ProgressStore) -> bool {
        if !store.is_complete(index) {
            debug!(mission = index, "Reveal expired but mission regressed, skipping");
            return false;
        }
        let revealed = store.mark_visible(index);
        if revealed {
            debug!(mission = index, "Mission revealed");
        }
        revealed
    }

    pub fn counter(&self, group: GroupIndex) -> RewardCounter {
        self.counters.get(group).copied().unwrap_or_default()
    }

    /// Jump a counter straight to its target, dropping any running animation
    pub fn seed_counter(&mut self, p: &RewardProgress, timers: &mut TimerSlots<TimerKey>) {
        let Some(counter) = self.counters.get_mut(p.group) else {
            return;
        };
        timers.cancel(&TimerKey::RewardTick(p.group));
        counter.displayed = p.target;
    }

    /// Bring every reward counter in line with the live progress
    pub fn recompute(
        &mut self,
        progress: &[RewardProgress],
        timers: &mut TimerSlots<TimerKey>,
        now: Instant,
    ) {
        for p in progress {
            let Some(counter) = self.counters.get_mut(p.group) else {
                continue;
            };
            if counter.displayed > p.target {
                counter.displayed = p.target;
            }
            let tick = TimerKey::RewardTick(p.group);
            if !timers.is_pending(&tick) {
                if p.target - counter.displayed > 1 {
                    timers.schedule(tick, now + self.timing.reward_tick());
                } else {
                    counter.displayed = p.target;
                }
            }
            self.sync_reward_reveal(p, timers, now);
        }
    }

    /// One animation step: +1 toward the target sampled now
    pub fn fire_tick(
        &mut self,
        p: &RewardProgress,
        timers: &mut TimerSlots<TimerKey>,
        at: Instant,
    ) {
        let Some(counter) = self.counters.get_mut(p.group) else {
            return;
        };
        if counter.displayed < p.target {
            counter.displayed += 1;
            if counter.displayed < p.target {
                timers.schedule(TimerKey::RewardTick(p.group), at + self.timing.reward_tick());
            }
        } else {
            counter.displayed = p.target;
        }
        self.sync_reward_reveal(p, timers, at);
    }

    /// Reveal delay expired: unlock only if still complete and fully counted
    pub fn fire_reward_reveal(&mut self, p: &RewardProgress) -> bool {
        let Some(counter) = self.counters.get_mut(p.group) else {
            return false;
        };
        if p.complete && counter.displayed >= p.threshold && !counter.unlocked_visible {
            counter.unlocked_visible = true;
            info!(reward = p.group, threshold = p.threshold, "Reward unlocked");
            return true;
        }
        false
    }

    /// Arm, keep or cancel the reward reveal for the current state
    fn sync_reward_reveal(
        &mut self,
        p: &RewardProgress,
        timers: &mut TimerSlots<TimerKey>,
        now: Instant,
    ) {
        let Some(counter) = self.counters.get_mut(p.group) else {
            return;
        };
        let key = TimerKey::RewardReveal(p.group);
        if !p.complete {
            timers.cancel(&key);
            if counter.unlocked_visible {
                info!(reward = p.group, "Reward locked again");
            }
            counter.unlocked_visible = false;
        } else if counter.displayed >= p.threshold {
            if !counter.unlocked_visible && !timers.is_pending(&key) {
                timers.schedule(key, now + self.timing.reward_reveal());
            }
        } else {
            timers.cancel(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn progress(group: GroupIndex, cumulative: u32, threshold: u32) -> RewardProgress {
        RewardProgress {
            group,
            cumulative,
            target: cumulative.min(threshold),
            threshold,
            unlocked: true,
            complete: cumulative >= threshold,
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_completion_schedules_reveal() {
        let scheduler = RevealScheduler::new(TimingSettings::default(), 5);
        let mut store = ProgressStore::with_missions(1..=10);
        let mut timers = TimerSlots::new();
        let t0 = Instant::now();

        let change = store.set(1, 1);
        scheduler.on_points_changed(&change, &mut store, &mut timers, t0);
        assert_eq!(
            scheduler.mission_state(1, &store, &timers),
            MissionReveal::PendingReveal(t0 + ms(1500))
        );
        assert!(scheduler.fire_mission_reveal(1, &mut store));
        assert!(store.is_visible(1));
    }

    #[test]
    fn test_regression_cancels_pending_reveal() {
        let scheduler = RevealScheduler::new(TimingSettings::default(), 5);
        let mut store = ProgressStore::with_missions(1..=10);
        let mut timers = TimerSlots::new();
        let t0 = Instant::now();

        let change = store.set(5, 2);
        scheduler.on_points_changed(&change, &mut store, &mut timers, t0);
        let change = store.set(5, 0);
        scheduler.on_points_changed(&change, &mut store, &mut timers, t0 + ms(100));

        assert_eq!(scheduler.mission_state(5, &store, &timers), MissionReveal::Hidden);
        assert!(timers.pop_due(t0 + ms(5000)).is_none());
    }

    #[test]
    fn test_stale_reveal_does_not_commit() {
        let scheduler = RevealScheduler::new(TimingSettings::default(), 5);
        let mut store = ProgressStore::with_missions(1..=10);
        store.set(8, 2);
        assert!(!scheduler.fire_mission_reveal(8, &mut store));
        assert!(!store.is_visible(8));
    }

    #[test]
    fn test_counter_single_step_assigns_directly() {
        let mut scheduler = RevealScheduler::new(TimingSettings::default(), 5);
        let mut timers = TimerSlots::new();
        scheduler.recompute(&[progress(0, 1, 20)], &mut timers, Instant::now());
        assert_eq!(scheduler.counter(0).displayed, 1);
        assert!(timers.is_empty());
    }

    #[test]
    fn test_counter_animates_and_resamples_target() {
        let mut scheduler = RevealScheduler::new(TimingSettings::default(), 5);
        let mut timers = TimerSlots::new();
        let t0 = Instant::now();

        scheduler.recompute(&[progress(0, 3, 20)], &mut timers, t0);
        assert_eq!(scheduler.counter(0).displayed, 0);

        let (key, at) = timers.pop_due(t0 + ms(300)).unwrap();
        assert_eq!(key, TimerKey::RewardTick(0));
        scheduler.fire_tick(&progress(0, 3, 20), &mut timers, at);
        assert_eq!(scheduler.counter(0).displayed, 1);

        // Target grew mid-animation; the next ticks absorb it
        let (_, at) = timers.pop_due(t0 + ms(600)).unwrap();
        scheduler.fire_tick(&progress(0, 5, 20), &mut timers, at);
        let mut at = at;
        while let Some((_, next)) = timers.pop_due(at + ms(300)) {
            scheduler.fire_tick(&progress(0, 5, 20), &mut timers, next);
            at = next;
        }
        assert_eq!(scheduler.counter(0).displayed, 5);
        assert_eq!(at, t0 + ms(1500));
    }

    #[test]
    fn test_counter_snaps_down_mid_animation() {
        let mut scheduler = RevealScheduler::new(TimingSettings::default(), 5);
        let mut timers = TimerSlots::new();
        let t0 = Instant::now();

        scheduler.recompute(&[progress(0, 6, 20)], &mut timers, t0);
        for i in 1..=4u64 {
            let (_, at) = timers.pop_due(t0 + ms(300 * i)).unwrap();
            scheduler.fire_tick(&progress(0, 6, 20), &mut timers, at);
        }
        assert_eq!(scheduler.counter(0).displayed, 4);

        scheduler.recompute(&[progress(0, 2, 20)], &mut timers, t0 + ms(1250));
        assert_eq!(scheduler.counter(0).displayed, 2);
    }

    #[test]
    fn test_reward_reveal_after_threshold() {
        let mut scheduler = RevealScheduler::new(TimingSettings::default(), 5);
        let mut timers = TimerSlots::new();
        let t0 = Instant::now();

        scheduler.counters[0].displayed = 19;
        scheduler.recompute(&[progress(0, 20, 20)], &mut timers, t0);
        assert_eq!(scheduler.counter(0).displayed, 20);
        assert_eq!(timers.deadline(&TimerKey::RewardReveal(0)), Some(t0 + ms(1000)));

        assert!(scheduler.fire_reward_reveal(&progress(0, 20, 20)));
        assert!(scheduler.counter(0).unlocked_visible);
    }

    #[test]
    fn test_lost_completion_cancels_reward_reveal() {
        let mut scheduler = RevealScheduler::new(TimingSettings::default(), 5);
        let mut timers = TimerSlots::new();
        let t0 = Instant::now();

        scheduler.counters[0].displayed = 20;
        scheduler.recompute(&[progress(0, 20, 20)], &mut timers, t0);
        assert!(timers.is_pending(&TimerKey::RewardReveal(0)));

        scheduler.recompute(&[progress(0, 18, 20)], &mut timers, t0 + ms(500));
        assert!(!timers.is_pending(&TimerKey::RewardReveal(0)));
        assert!(!scheduler.counter(0).unlocked_visible);
        assert!(!scheduler.fire_reward_reveal(&progress(0, 18, 20)));
    }
}
