//! # Thread table and scheduling loop
//!
//! [`Scheduler`] owns the fixed-size thread table and runs the single
//! algorithm every preemption and every voluntary yield funnels
//! through: close out the outgoing task's metrics window, ask the
//! active [`Policy`] for the next `Ready` task, re-arm the timer, and
//! context-switch. It has no notion of *how* it's invoked — that's
//! `kernel`'s job, which owns the process-wide instance and the raw
//! pointer the signal handlers use to reach it.

use std::time::Instant;

use crate::config::{MAX_TASKS, TICK_US};
use crate::context;
use crate::error::RuntimeError;
use crate::policy::Policy;
use crate::task::{Task, TaskState};
use crate::timer;

pub struct Scheduler {
    tasks: [Task; MAX_TASKS],
    current: usize,
    policy: Policy,
    tick_count: u64,
}

impl Scheduler {
    /// Build a fresh thread table: slot 0 is the permanently-resident
    /// initial task, already `Running`; every other slot starts
    /// `Unused`.
    pub fn new(policy: Policy) -> Self {
        let now = Instant::now();
        let tasks = std::array::from_fn(|i| {
            if i == 0 {
                Task::initial(now)
            } else {
                Task::unused(i, now)
            }
        });
        Scheduler {
            tasks,
            current: 0,
            policy,
            tick_count: 0,
        }
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: Policy) {
        self.policy = policy;
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn task(&self, id: usize) -> &Task {
        &self.tasks[id]
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut [Task] {
        &mut self.tasks
    }

    /// Find an `Unused` slot and turn it into a `Ready` task running
    /// `entry`.
    pub fn spawn(
        &mut self,
        entry: extern "C" fn(),
        label: &'static str,
        priority: i32,
        tickets: u32,
    ) -> Result<usize, RuntimeError> {
        let slot = self
            .tasks
            .iter()
            .position(|t| t.state == TaskState::Unused)
            .ok_or(RuntimeError::TableFull {
                max_tasks: MAX_TASKS,
            })?;
        self.tasks[slot].spawn_into(entry, label, priority, tickets, Instant::now())?;
        Ok(slot)
    }

    /// Mark `task_id` as exited and immediately reschedule — never
    /// returns, since the exiting task's own stack must not be
    /// touched again after this point.
    pub fn exit_current(&mut self, task_id: usize) -> ! {
        self.tasks[task_id].retire();
        self.schedule();
        unreachable!("schedule() switched away from an exited task and must never resume it");
    }

    /// Voluntary yield: identical to a preemption tick from the
    /// scheduler's point of view. Returns whether control actually
    /// passed to a different task.
    pub fn yield_now(&mut self) -> bool {
        self.schedule()
    }

    /// The core scheduling algorithm. Closes out the outgoing task's
    /// metrics window, selects the next `Ready` task via the active
    /// policy, re-arms the preemption timer, and performs the context
    /// switch. Returns normally once this same task is switched back
    /// in on some later call.
    ///
    /// Returns `true` if control was handed to a different task, or
    /// `false` if the calling task kept running because no other task
    /// is `Ready` (including the degenerate case where the calling
    /// task itself is no longer runnable and nothing else is either —
    /// see `kernel::task_exit`, the only caller that can observe that
    /// case without it indicating stack corruption).
    pub fn schedule(&mut self) -> bool {
        // Every task's saved context resumes *inside* this function —
        // either because it just yielded, or because it was preempted
        // mid-tick and is only now being switched back in, possibly
        // still formally "inside" the SIGALRM handler that preempted
        // it the last time around. Unconditionally disarming,
        // unblocking, and re-arming here before touching any state
        // means resumption is correct either way, without needing to
        // know which case applies.
        timer::reset(TICK_US);

        let now = Instant::now();
        self.tick_count += 1;
        let outgoing = self.current;

        match self.tasks[outgoing].state {
            TaskState::Running => {
                self.tasks[outgoing].metrics.record_exec(now);
                self.tasks[outgoing].state = TaskState::Ready;
                self.tasks[outgoing].metrics.last_ready_start = now;
            }
            TaskState::Blocked => {
                self.tasks[outgoing].metrics.record_exec(now);
            }
            TaskState::Unused | TaskState::Ready => {}
        }

        // `select_next` only ever considers `Ready` slots. The outgoing
        // task is still `Ready` here unless it was `Blocked` or
        // `Unused` above, so the common case always finds at least
        // itself; `None` means no task in the whole table is runnable
        // right now.
        let next = match self.policy.select_next(&mut self.tasks, outgoing) {
            Some(next) => next,
            None => {
                timer::arm(TICK_US);
                return false;
            }
        };

        if next == outgoing {
            self.tasks[next].state = TaskState::Running;
            self.tasks[next].metrics.last_run_start = now;
            timer::arm(TICK_US);
            return false;
        }

        self.tasks[next].metrics.record_wait(now);
        self.tasks[next].state = TaskState::Running;
        self.tasks[next].metrics.last_run_start = now;
        self.current = next;

        timer::arm(TICK_US);

        unsafe {
            let base = self.tasks.as_mut_ptr();
            let from = base.add(outgoing);
            let to = base.add(next);
            context::switch(&mut (*from).context, &(*to).context);
        }

        // Execution resumes here, possibly much later, on whichever
        // task this slot's context last pointed at when it was last
        // switched out. If that was a preemption, this stack is still
        // formally nested inside the SIGALRM handler that caused it —
        // the kernel's signal mask bookkeeping is per-thread, not
        // per-stack, so resuming a different call chain underneath it
        // leaves SIGALRM blocked until this reset forces it open again.
        timer::reset(TICK_US);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn noop() {}

    #[test]
    fn spawn_fills_first_unused_slot() {
        let mut sched = Scheduler::new(Policy::RoundRobin);
        let id = sched.spawn(noop, "a", 5, 1).unwrap();
        assert_eq!(id, 1);
        assert_eq!(sched.task(1).state, TaskState::Ready);
    }

    #[test]
    fn spawn_fails_once_table_is_full() {
        let mut sched = Scheduler::new(Policy::RoundRobin);
        for _ in 1..MAX_TASKS {
            sched.spawn(noop, "t", 5, 1).unwrap();
        }
        let err = sched.spawn(noop, "overflow", 5, 1);
        assert!(matches!(err, Err(RuntimeError::TableFull { .. })));
    }

    #[test]
    fn schedule_returns_false_when_only_the_caller_is_ready() {
        // A lone task (the initial one) selecting itself again is not
        // a switch — this is the case `kernel::exit_task` relies on to
        // know the thread table has been fully drained.
        let mut sched = Scheduler::new(Policy::RoundRobin);
        assert!(!sched.schedule());
        assert_eq!(sched.current(), 0);
        assert_eq!(sched.task(0).state, TaskState::Running);
    }

    #[test]
    fn schedule_returns_false_when_no_task_is_runnable() {
        // Simulates the moment a task's own exit has just retired (or
        // blocked) the only runnable slot: `select_next` finds nothing
        // and `schedule` must report that rather than panic.
        let mut sched = Scheduler::new(Policy::RoundRobin);
        sched.tasks_mut()[0].state = TaskState::Blocked;
        assert!(!sched.schedule());
    }
}
