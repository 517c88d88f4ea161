//! # Runtime errors
//!
//! Recoverable failures are returned as `Result<_, RuntimeError>`.
//! Invariant violations and signal-delivery loss are *not* represented
//! here — they abort the process directly (see `scheduler::task_exit`
//! and `timer::rearm`), since the spec classifies them as unrecoverable.

use thiserror::Error;

/// Failures that `spawn`, `runtime_init`, and `sem_init` can report.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The thread table has no `Unused` slot left.
    #[error("thread table is full ({max_tasks} slots in use)")]
    TableFull {
        /// Configured size of the thread table.
        max_tasks: usize,
    },

    /// The task's stack could not be mapped.
    #[error("failed to allocate a {size}-byte stack: {errno}")]
    StackAllocationFailed {
        /// Requested stack size in bytes.
        size: usize,
        /// `errno` reported by the failing `mmap` call.
        errno: i32,
    },

    /// Installing a signal handler or mask failed.
    #[error("signal setup failed: {0}")]
    SignalSetupFailed(std::io::Error),
}
