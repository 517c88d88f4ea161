//! # Runtime configuration
//!
//! Compile-time constants governing the scheduler and system behavior.
//! All limits are fixed at compile time — no dynamic resizing of the
//! thread table or stacks.

/// Maximum number of tasks the runtime can manage simultaneously,
/// including the initial (slot 0) task. Bounds the static thread table.
pub const MAX_TASKS: usize = 5;

/// Stack size for every spawned task, in bytes.
pub const STACK_BYTES: usize = 4 * 1024 * 1024;

/// Scheduler tick interval in microseconds. The periodic `SIGALRM` is
/// re-armed with this interval at the end of every `schedule()` call.
pub const TICK_US: u32 = 500;

/// Number of distinct priority levels, `[0, PRIORITY_LEVELS - 1]`.
pub const PRIORITY_LEVELS: i32 = 11;

/// Highest-numbered (least urgent) priority a task may be created with.
pub const MAX_PRIORITY: i32 = PRIORITY_LEVELS - 1;

/// Lowest-numbered (most urgent) priority a task may be created with.
pub const MIN_PRIORITY: i32 = 0;

/// Maximum number of lottery tickets a task may hold.
pub const MAX_TICKETS: u32 = 100;

/// Number of scheduling decisions a Ready task may be passed over
/// before the priority-aging policy forces it to run next.
pub const STARVATION_FORCE_THRESHOLD: u32 = 10;
