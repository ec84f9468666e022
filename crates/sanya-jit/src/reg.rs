//! Register roles for the Scheme-to-Scheme (S2S) calling convention
//! (§4.E "Calling convention").
//!
//! These constants are the single source of truth shared between every
//! function this crate compiles and
//! `sanya_runtime::trampoline::call_main`'s inline asm, which is what
//! actually enters the first generated function -- the two must agree
//! bit-for-bit on which hardware register plays which role, or the
//! first call into generated code corrupts the world.

use crate::asm::Reg;

/// The closure being called. Always loaded before a call/tail-call and
/// always live on entry to a function body.
pub const C: Reg = Reg::Rdi;

/// Up to five argument registers, consumed left to right. A sixth or
/// later argument has no encoding in this convention -- §4.E caps arity
/// at five for exactly this reason.
pub const ARG_REGS: [Reg; 5] = [Reg::Rsi, Reg::Rdx, Reg::Rcx, Reg::R8, Reg::R9];

/// The frame descriptor register, loaded with the caller's packed
/// frame-size/pointer-bitmap word immediately before every call and
/// tail-call so the collector's stack walk can find it (§4.F).
pub const F: Reg = Reg::R10;

/// Bump-allocation pointer, pinned for the lifetime of the whole
/// program by the trampoline. Inline allocation sequences compare this
/// against [`HEAP_LIMIT`] and bump it directly rather than calling out
/// to the allocator on the fast path.
pub const HEAP_PTR: Reg = Reg::R12;

/// End of the current semispace. Compared against [`HEAP_PTR`] on every
/// inline allocation; a fast-path miss falls through to a call into
/// [`sanya_runtime::gc::ThreadState::alloc`], which collects and
/// retries.
pub const HEAP_LIMIT: Reg = Reg::R13;

/// Pointer to the process's [`sanya_runtime::gc::ThreadState`], pinned
/// so every generated function can reach the slow-path allocator and
/// globals without needing it passed as an explicit argument.
pub const THREAD_STATE: Reg = Reg::R14;

/// Scratch registers free for the code generator's own use within a
/// single expression's evaluation. `Rax` in particular doubles as the
/// return-value register by convention (matching the SysV ABI, which
/// the trampoline's entry/exit sequence also follows).
pub const SCRATCH: [Reg; 3] = [Reg::Rax, Reg::Rbx, Reg::R11];

/// Registers callee-saved by the trampoline's own prologue and
/// therefore safe for generated code to clobber freely: everything
/// pinned above, plus the scratch set, are the only registers generated
/// code may touch; `rbp`/`rsp` remain under normal frame-pointer
/// discipline.
pub fn is_pinned(r: Reg) -> bool {
    r == C || r == F || r == HEAP_PTR || r == HEAP_LIMIT || r == THREAD_STATE
}
