//! Scheduled work keyed by simulation time.
//!
//! [`TaskQueue`] is a min-heap of pending tasks ordered by wake time, with
//! an insertion sequence number breaking ties so tasks scheduled for the
//! same instant fire in the order they were scheduled.
//!
//! Cancellation is lazy: cancelled handles are remembered and skipped when
//! they reach the front of the heap.
//!
//! # Example
//!
//! ```
//! use driftfire_core::entity::EntityId;
//! use driftfire_core::scheduler::{TaskKind, TaskQueue};
//!
//! let mut tasks = TaskQueue::new();
//! let shot = EntityId::new(4);
//! tasks.schedule(2.0, Some(shot), TaskKind::Expire(shot));
//! tasks.schedule(1.0, None, TaskKind::SpawnWave { spawner: 0 });
//!
//! let due = tasks.drain_due(1.5);
//! assert_eq!(due.len(), 1);
//! assert_eq!(due[0].kind, TaskKind::SpawnWave { spawner: 0 });
//!
//! tasks.cancel_owner(shot);
//! assert!(tasks.drain_due(10.0).is_empty());
//! ```

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeSet, BinaryHeap};

use crate::entity::EntityId;

/// Identifies a scheduled task for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskHandle(u64);

impl TaskHandle {
    /// Raw sequence number.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

/// What to do when a task wakes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Remove an entity whose lifetime ran out.
    Expire(EntityId),
    /// Run the next wave of spawner `spawner`.
    SpawnWave {
        /// Index of the spawner.
        spawner: usize,
    },
}

/// A task that has come due.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Task {
    /// Handle returned by [`TaskQueue::schedule`].
    pub handle: TaskHandle,
    /// Scheduled wake time.
    pub wake: f32,
    /// Entity whose destruction cancels the task.
    pub owner: Option<EntityId>,
    /// Work to perform.
    pub kind: TaskKind,
}

#[derive(Debug, Clone, Copy)]
struct Entry(Task);

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .wake
            .total_cmp(&other.0.wake)
            .then(self.0.handle.cmp(&other.0.handle))
    }
}

/// Min-heap of pending tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskQueue {
    heap: BinaryHeap<Reverse<Entry>>,
    cancelled: BTreeSet<TaskHandle>,
    next_seq: u64,
}

impl TaskQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `kind` to run once simulation time reaches `wake`.
    pub fn schedule(&mut self, wake: f32, owner: Option<EntityId>, kind: TaskKind) -> TaskHandle {
        let handle = TaskHandle(self.next_seq);
        self.next_seq += 1;
        self.heap.push(Reverse(Entry(Task {
            handle,
            wake,
            owner,
            kind,
        })));
        handle
    }

    /// Cancels a pending task. Unknown or already-run handles are ignored.
    pub fn cancel(&mut self, handle: TaskHandle) {
        if self.heap.iter().any(|Reverse(e)| e.0.handle == handle) {
            self.cancelled.insert(handle);
        }
    }

    /// Cancels every pending task owned by `owner`. Returns how many were
    /// cancelled.
    pub fn cancel_owner(&mut self, owner: EntityId) -> usize {
        let before = self.cancelled.len();
        for Reverse(entry) in &self.heap {
            if entry.0.owner == Some(owner) {
                self.cancelled.insert(entry.0.handle);
            }
        }
        self.cancelled.len() - before
    }

    /// Removes and returns every live task with `wake <= now`, earliest first.
    pub fn drain_due(&mut self, now: f32) -> Vec<Task> {
        let mut due = Vec::new();
        while let Some(Reverse(entry)) = self.heap.peek() {
            if entry.0.wake > now {
                break;
            }
            let Some(Reverse(Entry(task))) = self.heap.pop() else {
                break;
            };
            if !self.cancelled.remove(&task.handle) {
                due.push(task);
            }
        }
        due
    }

    /// Number of live pending tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len() - self.cancelled.len()
    }

    /// Returns `true` if no live task is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wake time of the earliest pending task, cancelled or not.
    #[must_use]
    pub fn next_wake(&self) -> Option<f32> {
        self.heap.peek().map(|Reverse(e)| e.0.wake)
    }
}
