//! # Scheduling policies
//!
//! The three ways [`scheduler::schedule`](crate::scheduler::schedule)
//! can choose the next `Ready` task once the outgoing task has been
//! parked. Each policy only ever looks at slots in [`TaskState::Ready`]
//! — the caller has already moved the outgoing task out of `Running`
//! before calling [`Policy::select_next`].

use rand::Rng;

use crate::config::STARVATION_FORCE_THRESHOLD;
use crate::task::{Task, TaskState};

/// Which of the three classical policies is currently choosing tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    RoundRobin,
    Priority,
    Lottery,
}

impl Policy {
    /// Parse a command-line flag (`-r`/`--rr`, `-p`/`--prio`,
    /// `-l`/`--lottery`) the way the original's `main.c` did.
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "-r" | "--rr" => Some(Policy::RoundRobin),
            "-p" | "--prio" => Some(Policy::Priority),
            "-l" | "--lottery" => Some(Policy::Lottery),
            _ => None,
        }
    }

    /// Choose the next task to run out of `tasks`, given the index of
    /// the task that just stopped running. Returns `None` if no task
    /// is `Ready` (the caller falls back to the idle/initial task).
    pub fn select_next(self, tasks: &mut [Task], current: usize) -> Option<usize> {
        match self {
            Policy::RoundRobin => round_robin(tasks, current),
            Policy::Priority => priority_with_aging(tasks, current),
            Policy::Lottery => lottery(tasks, current),
        }
    }
}

fn ready_scan_order(len: usize, current: usize) -> impl Iterator<Item = usize> {
    (1..=len).map(move |offset| (current + offset) % len)
}

fn round_robin(tasks: &[Task], current: usize) -> Option<usize> {
    ready_scan_order(tasks.len(), current).find(|&i| tasks[i].state == TaskState::Ready)
}

/// Priority scheduling with anti-starvation aging. Every `Ready` task
/// has its starvation counter bumped and its working `priority`
/// depressed toward `0` by that same counter — `max(0, original -
/// starvation_count)` — so a task that keeps losing gradually becomes
/// more urgent on its own. A counter that reaches
/// [`STARVATION_FORCE_THRESHOLD`] is a hard override on top of that:
/// among any tasks past the threshold, the one with the highest count
/// wins outright (ties broken by table order), regardless of
/// depressed priority. Otherwise the lowest depressed `priority` value
/// wins, ties broken by round-robin scan order.
fn priority_with_aging(tasks: &mut [Task], current: usize) -> Option<usize> {
    let order: Vec<usize> = ready_scan_order(tasks.len(), current).collect();

    // Age every Ready task first, regardless of who ends up chosen —
    // a task crossing the threshold must not stop its neighbors from
    // also being aged this same tick.
    for &i in &order {
        if tasks[i].state != TaskState::Ready {
            continue;
        }
        tasks[i].starvation_count += 1;
        tasks[i].priority = (tasks[i].original_priority - tasks[i].starvation_count as i32).max(0);
    }

    // Hard override: the most-starved Ready task past the threshold,
    // ties broken by ascending table order.
    let mut forced: Option<usize> = None;
    for i in 0..tasks.len() {
        if tasks[i].state != TaskState::Ready || tasks[i].starvation_count < STARVATION_FORCE_THRESHOLD {
            continue;
        }
        match forced {
            None => forced = Some(i),
            Some(f) if tasks[i].starvation_count > tasks[f].starvation_count => forced = Some(i),
            _ => {}
        }
    }
    if let Some(chosen) = forced {
        tasks[chosen].starvation_count = 0;
        tasks[chosen].priority = tasks[chosen].original_priority;
        return Some(chosen);
    }

    let mut best: Option<usize> = None;
    for &i in &order {
        if tasks[i].state != TaskState::Ready {
            continue;
        }
        match best {
            None => best = Some(i),
            Some(b) if tasks[i].priority < tasks[b].priority => best = Some(i),
            _ => {}
        }
    }
    if let Some(chosen) = best {
        tasks[chosen].starvation_count = 0;
        tasks[chosen].priority = tasks[chosen].original_priority;
    }
    best
}

/// Ticket-weighted random draw over every `Ready` task.
fn lottery(tasks: &[Task], current: usize) -> Option<usize> {
    let order: Vec<usize> = ready_scan_order(tasks.len(), current).collect();
    let total: u32 = order
        .iter()
        .filter(|&&i| tasks[i].state == TaskState::Ready)
        .map(|&i| tasks[i].tickets)
        .sum();
    if total == 0 {
        return None;
    }

    let draw = rand::thread_rng().gen_range(0..total);
    let mut acc = 0u32;
    for &i in &order {
        if tasks[i].state != TaskState::Ready {
            continue;
        }
        acc += tasks[i].tickets;
        if draw < acc {
            return Some(i);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn make(len: usize) -> Vec<Task> {
        let now = Instant::now();
        let mut tasks: Vec<Task> = (0..len).map(|i| Task::unused(i, now)).collect();
        tasks[0] = Task::initial(now);
        tasks[0].state = TaskState::Ready;
        tasks
    }

    extern "C" fn noop() {}

    #[test]
    fn round_robin_scans_forward_and_wraps() {
        let mut tasks = make(4);
        tasks[2].spawn_into(noop, "b", 5, 1, Instant::now()).unwrap();
        tasks[3].spawn_into(noop, "c", 5, 1, Instant::now()).unwrap();
        assert_eq!(round_robin(&tasks, 0), Some(2));
        assert_eq!(round_robin(&tasks, 2), Some(3));
        assert_eq!(round_robin(&tasks, 3), Some(0));
    }

    #[test]
    fn priority_picks_lowest_value_first() {
        let mut tasks = make(3);
        tasks[0].priority = crate::config::MAX_PRIORITY;
        tasks[0].original_priority = crate::config::MAX_PRIORITY;
        tasks[1].spawn_into(noop, "low-urgency", 8, 1, Instant::now()).unwrap();
        tasks[2].spawn_into(noop, "high-urgency", 1, 1, Instant::now()).unwrap();
        let chosen = Policy::Priority.select_next(&mut tasks, 0);
        assert_eq!(chosen, Some(2));
    }

    #[test]
    fn priority_aging_forces_starved_task_eventually() {
        let mut tasks = make(3);
        // Slot 0 sits out of contention here (e.g. blocked elsewhere)
        // so this test isolates the two-task aging race the spec
        // describes, rather than also starving slot 0 in lockstep.
        tasks[0].state = TaskState::Blocked;
        tasks[1].spawn_into(noop, "urgent", 0, 1, Instant::now()).unwrap();
        tasks[2].spawn_into(noop, "starved", 9, 1, Instant::now()).unwrap();

        // The urgent task (priority 0) wins every round until the
        // starved task's aging counter reaches the force threshold,
        // which happens on the STARVATION_FORCE_THRESHOLD-th call.
        for _ in 0..STARVATION_FORCE_THRESHOLD - 1 {
            let chosen = Policy::Priority.select_next(&mut tasks, 0);
            assert_eq!(chosen, Some(1));
        }
        let forced = Policy::Priority.select_next(&mut tasks, 0);
        assert_eq!(forced, Some(2));
    }

    #[test]
    fn priority_aging_increments_every_ready_task_and_ties_broken_by_table_order() {
        let mut tasks = make(4);
        tasks[0].state = TaskState::Blocked;
        tasks[1].spawn_into(noop, "a", 5, 1, Instant::now()).unwrap();
        tasks[2].spawn_into(noop, "b", 5, 1, Instant::now()).unwrap();
        tasks[3].spawn_into(noop, "c", 5, 1, Instant::now()).unwrap();
        // Tasks 1 and 3 are one tick away from the force threshold;
        // task 2 isn't close at all.
        tasks[1].starvation_count = STARVATION_FORCE_THRESHOLD - 1;
        tasks[3].starvation_count = STARVATION_FORCE_THRESHOLD - 1;

        let chosen = Policy::Priority.select_next(&mut tasks, 0);

        // Both 1 and 3 cross the threshold on this same tick; table
        // order (ascending index) breaks the tie in favor of 1, not
        // whichever the scan order starting at `current` meets first.
        assert_eq!(chosen, Some(1));
        // Task 2 never neared the threshold but must still have been
        // aged this tick — a threshold crossing elsewhere must not
        // skip incrementing anyone else's counter.
        assert_eq!(tasks[2].starvation_count, 1);
    }

    #[test]
    fn priority_aging_depresses_priority_before_the_hard_override() {
        let mut tasks = make(3);
        tasks[0].state = TaskState::Blocked;
        tasks[1].spawn_into(noop, "urgent", 0, 1, Instant::now()).unwrap();
        tasks[2].spawn_into(noop, "starved", 5, 1, Instant::now()).unwrap();

        Policy::Priority.select_next(&mut tasks, 0);

        // task 2 lost this round (priority 0 beats its depressed
        // value), but its working priority must already have moved
        // down from its original 5, per the aging-pass recompute.
        assert_eq!(tasks[2].starvation_count, 1);
        assert_eq!(tasks[2].priority, 4);
        assert_eq!(tasks[2].original_priority, 5);
    }

    #[test]
    fn lottery_returns_none_with_no_ready_tasks() {
        let mut tasks = make(2);
        tasks[0].state = TaskState::Running;
        assert_eq!(lottery(&tasks, 0), None);
    }
}
