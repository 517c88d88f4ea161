//! # Context switcher
//!
//! The one primitive in this crate that requires hand-written assembly.
//! [`switch`] saves the callee-saved registers and stack pointer of the
//! outgoing task into one [`Context`] record and loads them from
//! another, then returns — which, because the stack pointer now points
//! somewhere else, actually resumes whatever code the incoming task's
//! stack says it should resume. It never fails and is invoked only
//! with `SIGALRM` masked (see `sync::critical_section`).
//!
//! `spawn` arranges a brand-new task's stack so that the first
//! `switch` into it lands on [`task_entry_trampoline`], which calls the
//! task's entry function and then falls through to `task_exit` if that
//! function ever returns — matching the spec's "two machine words"
//! description on x86_64 and the register-based equivalent required by
//! AArch64's link-register return convention.

/// A task's saved callee-saved registers and stack pointer. The field
/// layout is architecture-specific and must match the hand-written
/// assembly in [`switch`] exactly.
#[cfg(target_arch = "x86_64")]
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Context {
    rsp: u64,
    r15: u64,
    r14: u64,
    r13: u64,
    r12: u64,
    rbx: u64,
    rbp: u64,
}

#[cfg(target_arch = "x86_64")]
impl Context {
    pub const fn zeroed() -> Self {
        Context {
            rsp: 0,
            r15: 0,
            r14: 0,
            r13: 0,
            r12: 0,
            rbx: 0,
            rbp: 0,
        }
    }

    /// Current saved stack pointer, reported by `print_stats`.
    pub fn stack_pointer(&self) -> u64 {
        self.rsp
    }
}

#[cfg(target_arch = "aarch64")]
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Context {
    sp: u64,
    x19: u64,
    x20: u64,
    x21: u64,
    x22: u64,
    x23: u64,
    x24: u64,
    x25: u64,
    x26: u64,
    x27: u64,
    x28: u64,
    fp: u64, // x29
    lr: u64, // x30
}

#[cfg(target_arch = "aarch64")]
impl Context {
    pub const fn zeroed() -> Self {
        Context {
            sp: 0,
            x19: 0,
            x20: 0,
            x21: 0,
            x22: 0,
            x23: 0,
            x24: 0,
            x25: 0,
            x26: 0,
            x27: 0,
            x28: 0,
            fp: 0,
            lr: 0,
        }
    }

    pub fn stack_pointer(&self) -> u64 {
        self.sp
    }
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
compile_error!("this runtime's context switcher is implemented for x86_64 and aarch64 only");

/// Save `*save_into`, load `*load_from`, and transfer control to
/// whatever that task's stack says comes next. Must be called with
/// `SIGALRM` masked.
///
/// # Safety
/// Both pointers must reference live, correctly initialized
/// [`Context`] records belonging to distinct task slots.
#[cfg(target_arch = "x86_64")]
#[unsafe(naked)]
pub unsafe extern "C" fn switch(save_into: *mut Context, load_from: *const Context) {
    core::arch::naked_asm!(
        // `rdi` = save_into, `rsi` = load_from (System V AMD64).
        // `rsp` at this point still includes the return address pushed
        // by the `call` that invoked us — saving it verbatim is what
        // lets the symmetric `ret` below resume this exact call site
        // next time this task is switched back in.
        "mov [rdi], rsp",
        "mov [rdi + 8], r15",
        "mov [rdi + 16], r14",
        "mov [rdi + 24], r13",
        "mov [rdi + 32], r12",
        "mov [rdi + 40], rbx",
        "mov [rdi + 48], rbp",
        "mov rsp, [rsi]",
        "mov r15, [rsi + 8]",
        "mov r14, [rsi + 16]",
        "mov r13, [rsi + 24]",
        "mov r12, [rsi + 32]",
        "mov rbx, [rsi + 40]",
        "mov rbp, [rsi + 48]",
        "ret",
    );
}

#[cfg(target_arch = "aarch64")]
#[unsafe(naked)]
pub unsafe extern "C" fn switch(save_into: *mut Context, load_from: *const Context) {
    core::arch::naked_asm!(
        "mov x8, sp",
        "str x8, [x0]",
        "stp x19, x20, [x0, #8]",
        "stp x21, x22, [x0, #24]",
        "stp x23, x24, [x0, #40]",
        "stp x25, x26, [x0, #56]",
        "stp x27, x28, [x0, #72]",
        "stp x29, x30, [x0, #88]",
        "ldr x8, [x1]",
        "mov sp, x8",
        "ldp x19, x20, [x1, #8]",
        "ldp x21, x22, [x1, #24]",
        "ldp x23, x24, [x1, #40]",
        "ldp x25, x26, [x1, #56]",
        "ldp x27, x28, [x1, #72]",
        "ldp x29, x30, [x1, #88]",
        "ret",
    );
}

/// Entry point every freshly spawned task's saved context points at.
/// Reads the real entry function out of a per-task slot set by
/// `spawn`, calls it, and falls through to `task_exit` if it returns —
/// the fallback the spec requires for a `fn()` entry point that
/// finishes normally instead of looping forever.
extern "C" fn task_entry_trampoline(entry: extern "C" fn(), task_id: usize) -> ! {
    entry();
    crate::kernel::task_exit_from_trampoline(task_id, 0)
}

/// Build the saved context for a brand-new task whose stack runs from
/// `stack_top` downward. `entry` and `task_id` are threaded through to
/// [`task_entry_trampoline`] via callee-saved registers rather than
/// the stack, so only the trampoline's own address needs to be staged
/// as the word [`switch`]'s final `ret` will land on.
#[cfg(target_arch = "x86_64")]
pub fn init_stack(
    stack_top: *mut u8,
    entry: extern "C" fn(),
    task_id: usize,
) -> Context {
    unsafe {
        let top = stack_top as *mut u64;
        let slot = top.sub(1);
        *slot = trampoline_thunk as u64;
        let mut ctx = Context::zeroed();
        ctx.rsp = slot as u64;
        // Communicate (entry, task_id) to the thunk through callee-saved
        // registers r12/r13, which the switcher restores verbatim before
        // `ret` lands on the thunk.
        ctx.r12 = entry as usize as u64;
        ctx.r13 = task_id as u64;
        ctx
    }
}

/// Lands here on a task's first `ret`; moves `(entry, task_id)` out of
/// the callee-saved registers `init_stack` stashed them in and into
/// argument registers before calling into ordinary Rust code.
#[cfg(target_arch = "x86_64")]
#[unsafe(naked)]
unsafe extern "C" fn trampoline_thunk() {
    core::arch::naked_asm!(
        "mov rdi, r12",
        "mov rsi, r13",
        "call {trampoline}",
        trampoline = sym task_entry_trampoline,
    );
}

/// AArch64 equivalent of the x86_64 `init_stack` above: since `ret`
/// here branches through the link register instead of popping the
/// stack, `entry`/`task_id` are staged in `x19`/`x20` and picked up by
/// [`trampoline_thunk`] once `switch` restores them.
#[cfg(target_arch = "aarch64")]
pub fn init_stack(
    stack_top: *mut u8,
    entry: extern "C" fn(),
    task_id: usize,
) -> Context {
    let aligned_top = (stack_top as usize) & !0xF;
    let mut ctx = Context::zeroed();
    ctx.sp = aligned_top as u64;
    ctx.lr = trampoline_thunk as usize as u64;
    ctx.x19 = entry as usize as u64;
    ctx.x20 = task_id as u64;
    ctx
}

/// Lands here via `lr` on a task's first resumption.
#[cfg(target_arch = "aarch64")]
#[unsafe(naked)]
unsafe extern "C" fn trampoline_thunk() {
    core::arch::naked_asm!(
        "mov x0, x19",
        "mov x1, x20",
        "b {trampoline}",
        trampoline = sym task_entry_trampoline,
    );
}
