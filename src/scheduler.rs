//! One-shot deferred tasks driven by the frame clock.
//!
//! The scheduler has no thread or timer of its own. Its clock is the
//! elapsed time handed to [`Scheduler::advance`] each frame, and a task
//! scheduled with [`Scheduler::delay`] becomes due `duration` seconds after
//! the clock value current at scheduling time.

/// Handle for a scheduled task, usable for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

#[derive(Debug)]
struct Scheduled<T> {
    id: TaskId,
    due: f32,
    task: T,
}

/// Queue of pending one-shot tasks, kept sorted by due time.
#[derive(Debug)]
pub struct Scheduler<T> {
    /// Ascending by `due`; ties keep scheduling order.
    pending: Vec<Scheduled<T>>,
    now: f32,
    next_id: u64,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            now: 0.0,
            next_id: 1,
        }
    }

    /// Current clock value (the last elapsed time seen).
    pub fn now(&self) -> f32 {
        self.now
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Schedule `task` to fire once, `duration` seconds from now.
    pub fn delay(&mut self, duration: f32, task: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;

        let due = self.now + duration;
        let at = self.pending.partition_point(|s| s.due <= due);
        self.pending.insert(at, Scheduled { id, due, task });
        id
    }

    /// Due time of a pending task.
    pub fn due_time(&self, id: TaskId) -> Option<f32> {
        self.pending.iter().find(|s| s.id == id).map(|s| s.due)
    }

    /// Cancel a pending task, returning it if it had not fired yet.
    pub fn cancel(&mut self, id: TaskId) -> Option<T> {
        let pos = self.pending.iter().position(|s| s.id == id)?;
        Some(self.pending.remove(pos).task)
    }

    /// Cancel every pending task. Returns how many were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }

    /// Move the clock to `now` and hand every due task to `fire`, in due order.
    ///
    /// Each task is removed before it is fired, so it fires at most once.
    pub fn advance(&mut self, now: f32, mut fire: impl FnMut(TaskId, T)) -> usize {
        self.now = now;
        let due = self.pending.partition_point(|s| s.due <= now);
        for scheduled in self.pending.drain(..due) {
            fire(scheduled.id, scheduled.task);
        }
        due
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}
