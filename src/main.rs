//! # Demo harness
//!
//! Spawns a handful of tasks under whichever scheduling policy is
//! named on the command line and lets them run for a few seconds
//! before printing final per-task statistics. Not a producer/consumer
//! demo — just enough activity to see round-robin, priority-aging,
//! and lottery scheduling behave differently against the same task
//! mix.
//!
//! ```text
//! gthreads-demo [-r|--rr | -p|--prio | -l|--lottery]
//! ```
//! Defaults to priority scheduling if no flag is given.

use std::sync::atomic::{AtomicBool, Ordering};

use gthreads_rt::policy::Policy;
use gthreads_rt::{kernel, Semaphore};

static KEEP_RUNNING: AtomicBool = AtomicBool::new(true);

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Debug
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

static RESOURCE_SLOTS: Semaphore = Semaphore::new(2);

extern "C" fn cpu_bound_worker() {
    let mut counter: u64 = 0;
    while KEEP_RUNNING.load(Ordering::Relaxed) {
        counter = counter.wrapping_add(1);
    }
    let _ = counter;
}

extern "C" fn cooperative_worker() {
    while KEEP_RUNNING.load(Ordering::Relaxed) {
        let mut work: u32 = 0;
        for _ in 0..1_000 {
            work = work.wrapping_add(1);
        }
        let _ = work;
        kernel::yield_now();
    }
}

extern "C" fn resource_bound_worker() {
    while KEEP_RUNNING.load(Ordering::Relaxed) {
        kernel::sem_wait(resource_slots());
        kernel::sleep(200);
        kernel::sem_post(resource_slots());
        kernel::yield_now();
    }
}

fn resource_slots() -> &'static mut Semaphore {
    // `RESOURCE_SLOTS` is only ever touched from task code running
    // under the runtime's own critical sections, which already
    // serialize access for us; see `sync::critical_section`.
    unsafe { &mut *(&RESOURCE_SLOTS as *const Semaphore as *mut Semaphore) }
}

fn parse_policy() -> Policy {
    std::env::args()
        .nth(1)
        .and_then(|flag| Policy::from_flag(&flag))
        .unwrap_or(Policy::Priority)
}

fn main() {
    log::set_logger(&LOGGER)
        .map(|()| log::set_max_level(log::LevelFilter::Debug))
        .expect("logger installed exactly once");

    let policy = parse_policy();
    kernel::runtime_init(policy).expect("failed to initialize runtime");

    kernel::spawn(cpu_bound_worker, "cpu-bound", 8, 10).expect("spawn cpu_bound_worker");
    kernel::spawn(cooperative_worker, "cooperative", 3, 30).expect("spawn cooperative_worker");
    kernel::spawn(resource_bound_worker, "resource-a", 2, 20).expect("spawn resource_bound_worker a");
    kernel::spawn(resource_bound_worker, "resource-b", 2, 20).expect("spawn resource_bound_worker b");

    for _ in 0..50 {
        kernel::sleep(100_000);
        kernel::yield_now();
    }

    KEEP_RUNNING.store(false, Ordering::Relaxed);
    kernel::print_stats();
}
