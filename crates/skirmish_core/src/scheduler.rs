//! Tick-driven delayed tasks.
//!
//! Delayed work (respawns, buff expiry, cast release) is queued here as
//! `(fire_at, action)` pairs and drained by the authority once per tick.
//! Cancelling a task removes its entry; nothing runs off the tick loop.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

#[derive(Debug, Clone, Copy)]
struct HeapKey {
    fire_at: f64,
    seq: u64,
}

impl PartialEq for HeapKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapKey {}

impl PartialOrd for HeapKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapKey {
    // Reversed so the max-heap pops the earliest (fire_at, seq) first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .fire_at
            .total_cmp(&self.fire_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Min-heap of pending actions keyed by fire time, FIFO among equal times.
///
/// Cancelled entries are removed from the action table immediately and their
/// heap keys are skipped lazily when they surface.
#[derive(Debug)]
pub struct Scheduler<A> {
    heap: BinaryHeap<HeapKey>,
    actions: HashMap<u64, (f64, A)>,
    next_seq: u64,
}

impl<A> Default for Scheduler<A> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            actions: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<A> Scheduler<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, fire_at: f64, action: A) {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.heap.push(HeapKey { fire_at, seq });
        self.actions.insert(seq, (fire_at, action));
    }

    /// Cancels every pending action matching `predicate`; returns how many.
    pub fn cancel_where<P>(&mut self, mut predicate: P) -> usize
    where
        P: FnMut(&A) -> bool,
    {
        let before = self.actions.len();
        self.actions.retain(|_, (_, action)| !predicate(action));
        before - self.actions.len()
    }

    /// Removes and returns every action due at or before `now`, earliest
    /// first.
    pub fn pop_due(&mut self, now: f64) -> Vec<A> {
        let mut due = Vec::new();
        while let Some(key) = self.heap.peek().copied() {
            if key.fire_at > now {
                break;
            }
            self.heap.pop();
            if let Some((_, action)) = self.actions.remove(&key.seq) {
                due.push(action);
            }
        }
        due
    }

    /// Fire time of the earliest live action.
    pub fn next_due(&self) -> Option<f64> {
        self.actions
            .values()
            .map(|(fire_at, _)| *fire_at)
            .min_by(|a, b| a.total_cmp(b))
    }

    pub fn iter(&self) -> impl Iterator<Item = &A> {
        self.actions.values().map(|(_, action)| action)
    }

    /// Pending actions, for amending them in place. Fire times are fixed.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut A> {
        self.actions.values_mut().map(|(_, action)| action)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pops_in_fire_order_then_fifo() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(2.0, "late");
        scheduler.schedule(1.0, "first");
        scheduler.schedule(1.0, "second");

        assert!(scheduler.pop_due(0.5).is_empty());
        assert_eq!(scheduler.pop_due(1.0), vec!["first", "second"]);
        assert_eq!(scheduler.next_due(), Some(2.0));
        assert_eq!(scheduler.pop_due(10.0), vec!["late"]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_cancelled_tasks_never_fire() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(1.0, 1);
        scheduler.schedule(1.0, 2);
        scheduler.schedule(1.5, 3);

        assert_eq!(scheduler.cancel_where(|n| *n >= 2), 2);
        assert_eq!(scheduler.cancel_where(|n| *n >= 2), 0);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.pop_due(5.0), vec![1]);
        assert_eq!(scheduler.next_due(), None);
    }

    #[test]
    fn test_amended_tasks_keep_their_fire_time() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(1.0, 10);
        scheduler.schedule(2.0, 20);

        for n in scheduler.iter_mut().filter(|n| **n == 20) {
            *n += 1;
        }
        assert_eq!(scheduler.pop_due(1.0), vec![10]);
        assert_eq!(scheduler.pop_due(2.0), vec![21]);
    }
}
