//! # Task descriptor
//!
//! A [`Task`] is one slot in the thread table: its saved register
//! context, its own `mmap`-ed stack (the initial task instead runs on
//! the process's own stack and carries no stack of its own), and the
//! bookkeeping the three scheduling policies and the metrics subsystem
//! need.

use std::ffi::c_void;
use std::ptr;

use crate::config::STACK_BYTES;
use crate::context::{self, Context};
use crate::error::RuntimeError;
use crate::metrics::Metrics;

/// Where a task currently sits in its lifecycle. `Blocked` covers a
/// task parked on a semaphore wait queue; it is not runnable and is
/// skipped by every scheduling policy until something posts to the
/// semaphore and moves it back to `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Unused,
    Ready,
    Running,
    Blocked,
}

/// An owned, page-mapped stack. Freed exactly once, on `Drop`.
#[derive(Debug)]
struct Stack {
    base: *mut u8,
    len: usize,
}

impl Stack {
    fn new(len: usize) -> Result<Self, RuntimeError> {
        let base = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if base == libc::MAP_FAILED {
            return Err(RuntimeError::StackAllocationFailed {
                size: len,
                errno: unsafe { *libc::__errno_location() },
            });
        }
        Ok(Stack {
            base: base as *mut u8,
            len,
        })
    }

    /// Address one past the highest byte of the stack, where it grows
    /// down from.
    fn top(&self) -> *mut u8 {
        unsafe { self.base.add(self.len) }
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.base as *mut c_void, self.len);
        }
    }
}

/// One slot in the thread table.
pub struct Task {
    pub id: usize,
    pub label: &'static str,
    pub state: TaskState,
    pub(crate) context: Context,
    stack: Option<Stack>,

    /// Current scheduling priority. `0` is most urgent, `10` least.
    pub priority: i32,
    /// Priority the task was created with; aging always restores to
    /// this value once the task has had its turn.
    pub original_priority: i32,
    /// Scheduling decisions this task has been passed over for while
    /// `Ready`, reset to `0` every time it runs.
    pub starvation_count: u32,
    /// Lottery tickets held, `[1, MAX_TICKETS]`.
    pub tickets: u32,

    pub metrics: Metrics,
}

impl Task {
    /// Build the permanently-resident initial task (slot 0), which
    /// runs on the thread's own stack and is `Running` from the start.
    pub fn initial(now: std::time::Instant) -> Self {
        Task {
            id: 0,
            label: "main",
            state: TaskState::Running,
            context: Context::zeroed(),
            stack: None,
            priority: crate::config::MIN_PRIORITY,
            original_priority: crate::config::MIN_PRIORITY,
            starvation_count: 0,
            tickets: 1,
            metrics: Metrics::new(now),
        }
    }

    /// An empty, `Unused` slot ready to be filled by `spawn`.
    pub fn unused(id: usize, now: std::time::Instant) -> Self {
        Task {
            id,
            label: "",
            state: TaskState::Unused,
            context: Context::zeroed(),
            stack: None,
            priority: crate::config::MIN_PRIORITY,
            original_priority: crate::config::MIN_PRIORITY,
            starvation_count: 0,
            tickets: 1,
            metrics: Metrics::new(now),
        }
    }

    /// Turn an `Unused` slot into a `Ready` task running `entry`, with
    /// its own freshly mapped stack.
    pub fn spawn_into(
        &mut self,
        entry: extern "C" fn(),
        label: &'static str,
        priority: i32,
        tickets: u32,
        now: std::time::Instant,
    ) -> Result<(), RuntimeError> {
        let stack = Stack::new(STACK_BYTES)?;
        self.context = context::init_stack(stack.top(), entry, self.id);
        self.stack = Some(stack);
        self.label = label;
        self.state = TaskState::Ready;
        self.priority = priority.clamp(crate::config::MIN_PRIORITY, crate::config::MAX_PRIORITY);
        self.original_priority = self.priority;
        self.starvation_count = 0;
        self.tickets = tickets.clamp(1, crate::config::MAX_TICKETS);
        self.metrics = Metrics::new(now);
        Ok(())
    }

    /// Mark the slot `Unused` again. The stack is deliberately left
    /// mapped: a task always calls this while still executing on that
    /// very stack, so freeing it here would unmap memory out from
    /// under the current call frame. `spawn_into` drops the old
    /// mapping (replacing it with a fresh one) only once the runtime
    /// has switched away from this slot for good.
    pub fn retire(&mut self) {
        self.state = TaskState::Unused;
        self.label = "";
    }

    pub fn is_runnable(&self) -> bool {
        matches!(self.state, TaskState::Ready | TaskState::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_into_clamps_priority_and_tickets() {
        let mut t = Task::unused(1, std::time::Instant::now());
        extern "C" fn noop() {}
        t.spawn_into(noop, "t1", 99, 0, std::time::Instant::now())
            .unwrap();
        assert_eq!(t.priority, crate::config::MAX_PRIORITY);
        assert_eq!(t.tickets, 1);
        assert_eq!(t.state, TaskState::Ready);
        t.retire();
        assert_eq!(t.state, TaskState::Unused);
    }

    #[test]
    fn initial_task_has_no_stack_and_runs_immediately() {
        let t = Task::initial(std::time::Instant::now());
        assert_eq!(t.id, 0);
        assert_eq!(t.state, TaskState::Running);
        assert!(t.stack.is_none());
    }
}
