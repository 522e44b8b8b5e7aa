//! Keyed timer slots on a virtual clock
//!
//! One slot per key: scheduling a key that is already pending replaces its
//! deadline, cancelling removes it. Heap entries whose generation no longer
//! matches the slot are stale and skipped.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::hash::Hash;

use tokio::time::Instant;

use crate::domain::{GroupIndex, MissionIndex};

/// Every timer the engine can arm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKey {
    /// Debounced reveal of a completed mission
    MissionReveal(MissionIndex),
    /// Next +1 step of a reward counter
    RewardTick(GroupIndex),
    /// Delayed unlock of a reward whose counter reached its threshold
    RewardReveal(GroupIndex),
    /// Retry of a failed remote progress write
    WriteRetry(MissionIndex),
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    deadline: Instant,
    generation: u64,
}

#[derive(Debug)]
pub struct TimerSlots<K> {
    slots: HashMap<K, Slot>,
    heap: BinaryHeap<Reverse<(Instant, u64, K)>>,
    next_generation: u64,
}

impl<K> TimerSlots<K>
where
    K: Copy + Eq + Hash + Ord,
{
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
            heap: BinaryHeap::new(),
            next_generation: 0,
        }
    }

    /// Arm (or re-arm) the slot for `key`
    pub fn schedule(&mut self, key: K, deadline: Instant) {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.slots.insert(key, Slot { deadline, generation });
        self.heap.push(Reverse((deadline, generation, key)));
    }

    /// Disarm the slot for `key`. Returns whether it was pending.
    pub fn cancel(&mut self, key: &K) -> bool {
        self.slots.remove(key).is_some()
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.slots.contains_key(key)
    }

    pub fn deadline(&self, key: &K) -> Option<Instant> {
        self.slots.get(key).map(|slot| slot.deadline)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Earliest live deadline
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.pop_stale();
        self.heap.peek().map(|Reverse((deadline, _, _))| *deadline)
    }

    /// Remove and return the earliest slot due at or before `now`
    pub fn pop_due(&mut self, now: Instant) -> Option<(K, Instant)> {
        self.pop_stale();
        let Reverse((deadline, _, key)) = *self.heap.peek()?;
        if deadline > now {
            return None;
        }
        self.heap.pop();
        self.slots.remove(&key);
        Some((key, deadline))
    }

    /// Disarm everything
    pub fn clear(&mut self) {
        self.slots.clear();
        self.heap.clear();
    }

    fn pop_stale(&mut self) {
        while let Some(Reverse((_, generation, key))) = self.heap.peek() {
            let live = self
                .slots
                .get(key)
                .is_some_and(|slot| slot.generation == *generation);
            if live {
                break;
            }
            self.heap.pop();
        }
    }
}

impl<K> Default for TimerSlots<K>
where
    K: Copy + Eq + Hash + Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_pop_in_deadline_order() {
        let t0 = Instant::now();
        let mut timers = TimerSlots::new();
        timers.schedule(TimerKey::RewardTick(0), t0 + ms(300));
        timers.schedule(TimerKey::MissionReveal(4), t0 + ms(100));

        assert_eq!(timers.next_deadline(), Some(t0 + ms(100)));
        assert!(timers.pop_due(t0 + ms(50)).is_none());
        assert_eq!(
            timers.pop_due(t0 + ms(400)),
            Some((TimerKey::MissionReveal(4), t0 + ms(100)))
        );
        assert_eq!(
            timers.pop_due(t0 + ms(400)),
            Some((TimerKey::RewardTick(0), t0 + ms(300)))
        );
        assert!(timers.is_empty());
    }

    #[test]
    fn test_reschedule_replaces_slot() {
        let t0 = Instant::now();
        let mut timers = TimerSlots::new();
        timers.schedule(TimerKey::MissionReveal(1), t0 + ms(100));
        timers.schedule(TimerKey::MissionReveal(1), t0 + ms(500));

        assert_eq!(timers.len(), 1);
        assert!(timers.pop_due(t0 + ms(200)).is_none());
        assert_eq!(
            timers.pop_due(t0 + ms(500)),
            Some((TimerKey::MissionReveal(1), t0 + ms(500)))
        );
        assert!(timers.pop_due(t0 + ms(1000)).is_none());
    }

    #[test]
    fn test_cancelled_slot_never_fires() {
        let t0 = Instant::now();
        let mut timers = TimerSlots::new();
        timers.schedule(TimerKey::RewardReveal(2), t0 + ms(10));
        assert!(timers.cancel(&TimerKey::RewardReveal(2)));
        assert!(!timers.cancel(&TimerKey::RewardReveal(2)));
        assert_eq!(timers.next_deadline(), None);
        assert!(timers.pop_due(t0 + ms(100)).is_none());
    }
}
