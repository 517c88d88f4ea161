//! # gthreads-rt — cooperative-preemptive user-space green threads
//!
//! A single-OS-thread runtime that multiplexes many logical tasks
//! onto one real thread, preempting them with a periodic `SIGALRM`
//! and switching stacks by hand.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                      Application Tasks                  │
//! ├────────────────────────────────────────────────────────┤
//! │                 Kernel API (kernel.rs)                   │
//! │   runtime_init() · spawn() · yield_now() · task_exit()  │
//! │   sem_wait() · sem_post() · sleep() · print_stats()     │
//! ├──────────────┬────────────────────┬────────────────────┤
//! │  Scheduler   │     Policy         │  Sync Primitives   │
//! │  scheduler.rs│     policy.rs      │  sync.rs           │
//! │  ─ schedule()│  ─ RoundRobin      │  ─ critical_section│
//! │  ─ spawn()   │  ─ Priority+aging  │                    │
//! │  ─ exit()    │  ─ Lottery         │                    │
//! ├──────────────┴────────────────────┴────────────────────┤
//! │     Task Model (task.rs)     │   Semaphore (semaphore.rs)│
//! │   Task · TaskState · Stack   │   FIFO wait queue          │
//! ├────────────────────────────────────────────────────────┤
//! │        Context Switch (context.rs)    Timer (timer.rs)  │
//! │   x86_64 / aarch64 `#[naked]` asm     SIGALRM / SIGINT  │
//! ├────────────────────────────────────────────────────────┤
//! │                    POSIX (libc, single thread)           │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Scheduling policies
//!
//! Three classical policies are selectable at runtime:
//!
//! - **Round-robin** — each `Ready` task gets one tick in turn.
//! - **Priority**, with anti-starvation aging — the lowest-numbered
//!   priority wins, but a task passed over
//!   [`STARVATION_FORCE_THRESHOLD`](config::STARVATION_FORCE_THRESHOLD)
//!   times in a row is forced to run regardless of priority.
//! - **Lottery** — each task holds a number of tickets; the next task
//!   is drawn at random, weighted by ticket count.
//!
//! ## Memory model
//!
//! - No heap allocation of tasks: a fixed-size thread table,
//!   `[Task; MAX_TASKS]`.
//! - Each task's stack is its own `mmap`-ed region, freed exactly once
//!   when the slot is reused.
//! - The only synchronization primitive shared state needs is
//!   `SIGALRM` masking — there is exactly one real OS thread.

pub mod config;
pub mod context;
pub mod error;
pub mod kernel;
pub mod metrics;
pub mod policy;
pub mod scheduler;
pub mod semaphore;
pub mod sync;
pub mod task;
pub mod timer;

pub use error::RuntimeError;
pub use policy::Policy;
pub use semaphore::Semaphore;
