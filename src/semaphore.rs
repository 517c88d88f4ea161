//! # Counting semaphore
//!
//! A classic counting semaphore with a FIFO wait queue, implemented as
//! a fixed-size ring buffer sized to the thread table — no allocation,
//! no more waiters possible than there are tasks to block. `wait` and
//! `post` never touch the queue without the caller holding the
//! runtime's critical section, since both read and mutate task state
//! shared with the scheduler.

use crate::config::MAX_TASKS;
use crate::task::{Task, TaskState};

/// A counting semaphore. `value` tracks available resource units when
/// its wait queue is empty; once a task blocks, later `post` calls
/// hand the unit directly to the oldest waiter instead of touching
/// `value`.
pub struct Semaphore {
    value: i32,
    queue: [usize; MAX_TASKS],
    head: usize,
    count: usize,
}

impl Semaphore {
    /// A semaphore initialized with `value` available units.
    pub const fn new(value: i32) -> Self {
        Semaphore {
            value,
            queue: [0; MAX_TASKS],
            head: 0,
            count: 0,
        }
    }

    fn push(&mut self, task_id: usize) {
        debug_assert!(self.count < MAX_TASKS, "semaphore wait queue overflow");
        let tail = (self.head + self.count) % MAX_TASKS;
        self.queue[tail] = task_id;
        self.count += 1;
    }

    fn pop(&mut self) -> Option<usize> {
        if self.count == 0 {
            return None;
        }
        let id = self.queue[self.head];
        self.head = (self.head + 1) % MAX_TASKS;
        self.count -= 1;
        Some(id)
    }

    /// Acquire one unit. If none is available, blocks `tasks[current]`
    /// and returns `false` — the caller must then invoke the scheduler
    /// to switch away, since a `Blocked` task is never selected by any
    /// policy. Returns `true` if the unit was available immediately
    /// and execution may continue without switching.
    pub fn wait(&mut self, tasks: &mut [Task], current: usize) -> bool {
        if self.value > 0 {
            self.value -= 1;
            return true;
        }
        tasks[current].state = TaskState::Blocked;
        self.push(current);
        false
    }

    /// Release one unit. If a task is waiting, it is handed the unit
    /// directly and moved back to `Ready`; otherwise `value` is
    /// incremented for the next `wait` to consume.
    pub fn post(&mut self, tasks: &mut [Task]) {
        match self.pop() {
            Some(task_id) => tasks[task_id].state = TaskState::Ready,
            None => self.value += 1,
        }
    }

    /// Number of tasks currently parked on this semaphore.
    pub fn waiting(&self) -> usize {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn make_tasks(len: usize) -> Vec<Task> {
        let now = Instant::now();
        (0..len).map(|i| Task::unused(i, now)).collect()
    }

    #[test]
    fn wait_succeeds_immediately_when_units_available() {
        let mut sem = Semaphore::new(1);
        let mut tasks = make_tasks(2);
        assert!(sem.wait(&mut tasks, 0));
        assert_eq!(tasks[0].state, TaskState::Unused);
    }

    #[test]
    fn wait_blocks_and_post_wakes_fifo() {
        let mut sem = Semaphore::new(0);
        let mut tasks = make_tasks(3);

        assert!(!sem.wait(&mut tasks, 1));
        assert_eq!(tasks[1].state, TaskState::Blocked);
        assert!(!sem.wait(&mut tasks, 2));
        assert_eq!(tasks[2].state, TaskState::Blocked);
        assert_eq!(sem.waiting(), 2);

        sem.post(&mut tasks);
        assert_eq!(tasks[1].state, TaskState::Ready);
        assert_eq!(tasks[2].state, TaskState::Blocked);

        sem.post(&mut tasks);
        assert_eq!(tasks[2].state, TaskState::Ready);
        assert_eq!(sem.waiting(), 0);
    }

    #[test]
    fn post_with_no_waiters_increments_value() {
        let mut sem = Semaphore::new(0);
        let mut tasks = make_tasks(1);
        sem.post(&mut tasks);
        assert!(sem.wait(&mut tasks, 0));
    }
}
