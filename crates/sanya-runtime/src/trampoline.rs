//! The host-to-generated-code entry trampoline (§4.F).
//!
//! Grounded on `main.cpp`'s `Scheme_asmEntry(Object *, void *, intptr_t,
//! intptr_t, ThreadState *)` / `callScheme_0`. The original implements
//! this crossing as a small hand-written assembly stub; here it's a
//! thin `asm!` block in `call_main` that pins the same registers
//! `sanya_jit::reg` reserves for heap/thread-state bookkeeping
//! (`r12`/`r13`/`r14`) and records the crossing rsp as `firstStackPtr`
//! before handing control to the generated code.
//!
//! This is the one place in the workspace that crosses from Rust's own
//! calling convention into the S2S convention §4.E's code generator
//! targets, so it is unavoidably `unsafe` and ABI-literal in a way the
//! rest of the crate is not -- the same trade `wasmtime-runtime` makes
//! in its own host/Wasm trampolines.

use std::arch::asm;

use sanya_value::Value;

use crate::frame::FrameDescr;
use crate::gc::ThreadState;

/// Invoke `main`'s zero-argument closure, whose compiled entry point
/// is `code_ptr`. Returns the accumulator value the generated code
/// left on exit.
///
/// # Safety
/// `code_ptr` must be a valid entry point into code emitted by
/// `sanya_jit` for a zero-argument function, `closure` must be the
/// matching closure value, and no other code may be concurrently
/// executing against `ts` (§5 is single-threaded by design).
pub unsafe fn call_main(ts: &ThreadState, closure: Value, code_ptr: *const u8) -> Value {
    let rsp_before: usize;
    asm!("mov {0}, rsp", out(reg) rsp_before, options(nomem, nostack, preserves_flags));

    ts.set_first_stack_ptr(rsp_before);
    ts.set_last_stack_ptr(rsp_before);
    ts.set_last_frame_descr(FrameDescr::EMPTY);

    let raw_closure = closure.to_raw() as u64;
    let raw_heap_ptr = ts.heap_ptr() as u64;
    let raw_heap_limit = ts.heap_limit() as u64;
    let raw_ts = ts as *const ThreadState as u64;
    let raw_descr = FrameDescr::EMPTY.to_raw();
    let result: u64;

    asm!(
        "push rbx",
        "call {entry}",
        "pop rbx",
        entry = in(reg) code_ptr,
        in("rdi") raw_closure,
        in("r12") raw_heap_ptr,
        in("r13") raw_heap_limit,
        in("r14") raw_ts,
        in("r10") raw_descr,
        lateout("rax") result,
        clobber_abi("sysv64"),
    );

    Value::from_raw(result as usize)
}
