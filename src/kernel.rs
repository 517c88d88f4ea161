//! # Kernel
//!
//! Top-level initialization and the public API surface of the
//! runtime. The kernel owns the single process-wide [`Scheduler`]
//! instance and the raw pointer the `SIGALRM`/`SIGINT` handlers use to
//! reach it — they run in signal context, outside the borrow checker,
//! so a raw pointer is the only way in.
//!
//! ## Startup sequence
//!
//! ```text
//! main()
//!   ├─► kernel::runtime_init(policy) ← installs signal handlers, arms the timer
//!   ├─► kernel::spawn(entry, ...)    ← register tasks (×N)
//!   └─► kernel::run()                ← hands control to the scheduler
//! ```

use log::{debug, info};

use crate::config::TICK_US;
use crate::error::RuntimeError;
use crate::policy::Policy;
use crate::scheduler::Scheduler;
use crate::semaphore::Semaphore;
use crate::sync;
use crate::timer;

/// Global scheduler instance. `None` until `runtime_init` runs.
///
/// # Safety
/// Accessed only through [`scheduler_ptr`], itself only called from
/// within `sync::critical_section` or from the signal handlers
/// installed by `timer::init` (which themselves only run with the
/// rest of `SIGALRM`/`SIGINT` delivery serialized by the kernel).
static mut SCHEDULER: Option<Scheduler> = None;

fn scheduler_ptr() -> *mut Scheduler {
    unsafe {
        SCHEDULER
            .as_mut()
            .expect("kernel::runtime_init must run before any other kernel call")
            as *mut Scheduler
    }
}

/// Initialize the runtime: build the thread table under `policy` and
/// install the `SIGALRM`/`SIGINT` handlers. Must be called exactly
/// once, before `spawn` or `run`.
pub fn runtime_init(policy: Policy) -> Result<(), RuntimeError> {
    unsafe {
        SCHEDULER = Some(Scheduler::new(policy));
    }
    timer::init(TICK_US)?;
    info!("runtime initialized with {:?} scheduling", policy);
    Ok(())
}

/// Register a new task. `entry` must itself never return in ordinary
/// operation; if it does, the task is torn down as though it had
/// called `task_exit(0)`.
pub fn spawn(
    entry: extern "C" fn(),
    label: &'static str,
    priority: i32,
    tickets: u32,
) -> Result<usize, RuntimeError> {
    sync::critical_section(|| unsafe { (*scheduler_ptr()).spawn(entry, label, priority, tickets) })
}

/// Voluntarily give up the CPU. Returns once this task is scheduled
/// to run again. The return value reports whether a switch actually
/// happened — `false` means no other task was `Ready` and this one
/// kept running uninterrupted.
pub fn yield_now() -> bool {
    sync::critical_section(|| unsafe { (*scheduler_ptr()).yield_now() })
}

/// Switch the active scheduling policy. Takes effect on the very next
/// scheduling decision.
pub fn set_policy(policy: Policy) {
    sync::critical_section(|| unsafe {
        (*scheduler_ptr()).set_policy(policy);
    });
}

/// Terminate the calling task. Never returns.
pub fn task_exit(code: i32) -> ! {
    let current = sync::critical_section(|| unsafe { (*scheduler_ptr()).current() });
    exit_task(current, code)
}

/// Entry point used by the context-switch trampoline when a task's
/// own entry function returns instead of calling `task_exit`
/// explicitly.
pub fn task_exit_from_trampoline(task_id: usize, code: i32) -> ! {
    exit_task(task_id, code)
}

fn exit_task(task_id: usize, code: i32) -> ! {
    debug!("task {task_id} exiting with code {code}");

    if task_id == 0 {
        // The initial task's descriptor is never freed (§3). Rather
        // than retiring it, keep handing the CPU to whatever is left
        // Ready or Blocked until `schedule` reports nothing else is
        // runnable, then tear the process down from here.
        while sync::critical_section(|| unsafe { (*scheduler_ptr()).schedule() }) {}
        timer::disarm();
        info!("initial task drained the thread table, exiting with code {code}");
        std::process::exit(code);
    }

    sync::critical_section(|| unsafe { (*scheduler_ptr()).exit_current(task_id) })
}

/// Block on `sem` until a unit is available.
pub fn sem_wait(sem: &mut Semaphore) {
    sync::critical_section(|| unsafe {
        let scheduler = &mut *scheduler_ptr();
        let current = scheduler.current();
        if !sem.wait(scheduler.tasks_mut(), current) {
            scheduler.schedule();
        }
    });
}

/// Release one unit of `sem`, waking the oldest waiter if any.
pub fn sem_post(sem: &mut Semaphore) {
    sync::critical_section(|| unsafe {
        let scheduler = &mut *scheduler_ptr();
        sem.post(scheduler.tasks_mut());
    });
}

/// Sleep the calling task (and, since there is only one OS thread,
/// the entire runtime) for `micros` microseconds without yielding to
/// other tasks.
pub fn sleep(micros: u64) {
    timer::sleep_us(micros);
}

/// Log a line of per-task statistics for every live task. Installed
/// as the `SIGINT` handler so a run can be inspected without killing
/// it.
pub fn print_stats() {
    let ptr = scheduler_ptr();
    unsafe {
        for task in (*ptr).tasks() {
            if task.state == crate::task::TaskState::Unused {
                continue;
            }
            info!(
                "task {:>2} [{:<12}] state={:?} prio={:<2}/{:<2} starv={:<2} tickets={:<3} sp=0x{:016x} \
                 exec(n={}, min={}us, max={}us, var={:.1}) wait(n={}, min={}us, max={}us, var={:.1})",
                task.id,
                task.label,
                task.state,
                task.priority,
                task.original_priority,
                task.starvation_count,
                task.tickets,
                task.context.stack_pointer(),
                task.metrics.exec().samples(),
                task.metrics.exec().min_us(),
                task.metrics.exec().max_us(),
                task.metrics.exec().variance(),
                task.metrics.wait().samples(),
                task.metrics.wait().min_us(),
                task.metrics.wait().max_us(),
                task.metrics.wait().variance(),
            );
        }
    }
}

/// Called directly from the `SIGALRM` handler installed by
/// `timer::init`. Runs the scheduler's core algorithm in signal
/// context — the defining trait of a preemptive (rather than purely
/// cooperative) user-space scheduler.
pub(crate) fn on_alarm_tick() {
    unsafe {
        (*scheduler_ptr()).schedule();
    }
}

/// Called directly from the `SIGINT` handler.
pub(crate) fn on_sigint_stats() {
    print_stats();
}
