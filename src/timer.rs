//! # Preemption timer and signal plumbing
//!
//! `SIGALRM` is the runtime's only preemption mechanism: a periodic
//! interval timer delivers it every [`TICK_US`](crate::config::TICK_US)
//! microseconds, and the handler installed here does nothing but ask
//! the scheduler to run — all the real work happens back in
//! [`scheduler::schedule`](crate::scheduler::schedule), called with
//! the signal already masked by `sync::critical_section`.
//!
//! `SIGINT` is wired to a stats dump instead of the default
//! terminate-the-process action, so a runtime under test can be
//! interrupted to inspect per-task metrics without losing state.

use std::io;
use std::mem::MaybeUninit;
use std::ptr;

use crate::error::RuntimeError;

extern "C" fn on_alarm(_sig: libc::c_int) {
    crate::kernel::on_alarm_tick();
}

extern "C" fn on_sigint(_sig: libc::c_int) {
    crate::kernel::on_sigint_stats();
}

fn install(signum: libc::c_int, handler: extern "C" fn(libc::c_int)) -> Result<(), RuntimeError> {
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handler as usize;
        libc::sigemptyset(&mut action.sa_mask);
        action.sa_flags = 0;
        if libc::sigaction(signum, &action, ptr::null_mut()) != 0 {
            return Err(RuntimeError::SignalSetupFailed(io::Error::last_os_error()));
        }
    }
    Ok(())
}

/// Install the `SIGALRM` and `SIGINT` handlers and arm the first tick.
/// Called once from `kernel::runtime_init`.
pub fn init(tick_us: u32) -> Result<(), RuntimeError> {
    install(libc::SIGALRM, on_alarm)?;
    install(libc::SIGINT, on_sigint)?;
    arm(tick_us);
    Ok(())
}

/// Arm (or re-arm) the interval timer for `interval_us` microseconds,
/// one-shot — `schedule` calls this again at the end of every tick, so
/// a task that never yields still gets preempted on schedule.
pub fn arm(interval_us: u32) {
    unsafe {
        libc::ualarm(interval_us, 0);
    }
}

/// Disarm, unblock, and re-arm `SIGALRM` around a critical section
/// that must not itself be interrupted by the very signal it is
/// responding to — mirrors the original runtime's three-step reset
/// used when recovering from a delivery that arrived while the
/// handler's own mask was briefly widened.
pub fn reset(interval_us: u32) {
    unsafe {
        libc::ualarm(0, 0);
        let mut set = MaybeUninit::<libc::sigset_t>::uninit();
        libc::sigemptyset(set.as_mut_ptr());
        libc::sigaddset(set.as_mut_ptr(), libc::SIGALRM);
        libc::sigprocmask(libc::SIG_UNBLOCK, set.as_ptr(), ptr::null_mut());
        libc::ualarm(interval_us, 0);
    }
}

/// Disarm the interval timer for good. Called once, from the initial
/// task's `task_exit`, right before the process terminates — the
/// redesign decision recorded in `DESIGN.md` for the spec's open
/// question about the original never doing this.
pub fn disarm() {
    unsafe {
        libc::ualarm(0, 0);
    }
}

/// Sleep for `micros` microseconds, restarting with the remaining
/// time if a signal (such as the very `SIGALRM` this runtime relies
/// on) interrupts the call partway through.
pub fn sleep_us(micros: u64) {
    let mut remaining = libc::timespec {
        tv_sec: (micros / 1_000_000) as libc::time_t,
        tv_nsec: ((micros % 1_000_000) * 1_000) as libc::c_long,
    };
    loop {
        let mut rem = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        let rc = unsafe { libc::nanosleep(&remaining, &mut rem) };
        if rc == 0 {
            return;
        }
        if io::Error::last_os_error().kind() == io::ErrorKind::Interrupted {
            remaining = rem;
            continue;
        }
        return;
    }
}
