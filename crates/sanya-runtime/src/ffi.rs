//! The generated-code-to-Rust half of the runtime boundary (§4.F),
//! mirroring `trampoline.rs`'s Rust-to-generated-code half. Every
//! function here is `extern "C"` and takes only register-sized
//! integers/pointers so `sanya-jit` can `call` it directly from raw
//! machine code with a plain System V argument sequence -- the same
//! shape as the original's `call reinterpret_cast<void*>(&Runtime::…)`
//! sequences in `codegen.cpp`.
//!
//! `r12`/`r13`/`r14` (heap pointer, heap limit, thread state) are all
//! SysV callee-saved, so a generated call into any function below
//! leaves them intact without either side needing to spill them --
//! only `r10` (the frame descriptor) needs explicit handling, which is
//! why every slow path below takes it as an explicit parameter instead
//! of relying on the register surviving the call.

use sanya_value::Value;

use crate::error::{
    handle_arg_count_mismatch, handle_not_a_closure, handle_stack_overflow, handle_user_error,
};
use crate::frame::FrameDescr;
use crate::gc::ThreadState;

/// The inline bump-allocation slow path (§4.E "Inline pair allocation").
/// Generated code calls this once its fast-path `heapPtr + size >
/// heapLimit` check fails. Syncs the heap pointer generated code was
/// caching in r12 (the only one of the two cached heap registers that
/// can drift out of sync with the thread state -- `heap_limit` only
/// ever changes on a collection, which this function itself drives),
/// plus the current rsp and live frame descriptor, then runs a
/// collection and returns the address of a fresh `size`-byte block.
///
/// `out_regs[0]`/`out_regs[1]` are written with the post-collection
/// `heap_ptr`/`heap_limit` generated code must reload into r12/r13
/// before resuming -- a collection invalidates whatever the fast path
/// had cached. Folded into one pointer rather than two so the whole
/// call fits in the six SysV integer argument registers.
///
/// # Safety
/// `ts` must point at a live [`ThreadState`]; `out_regs` must point at
/// two writable, contiguous 8-byte stack scratch slots.
#[no_mangle]
pub unsafe extern "C" fn sanya_alloc_slow(
    ts: *const ThreadState,
    size: u64,
    stack_ptr: u64,
    frame_descr: u64,
    heap_ptr: u64,
    out_regs: *mut u64,
) -> u64 {
    let ts = &*ts;
    ts.sync_heap_registers(heap_ptr as usize, ts.heap_limit());
    ts.set_last_stack_ptr(stack_ptr as usize);
    ts.set_last_frame_descr(FrameDescr::from_raw(frame_descr));

    let addr = ts.alloc(size as usize);

    *out_regs = ts.heap_ptr() as u64;
    *out_regs.add(1) = ts.heap_limit() as u64;
    addr as u64
}

/// A call site's tag check on the callee failed. Never returns.
///
/// # Safety
/// `ts` must point at a live [`ThreadState`]; `stack_ptr`/`frame_descr`
/// are synced first so the printed stack trace reflects the call site.
#[no_mangle]
pub unsafe extern "C" fn sanya_handle_not_a_closure(
    ts: *const ThreadState,
    callee: u64,
    stack_ptr: u64,
    frame_descr: u64,
) -> ! {
    let ts = &*ts;
    ts.set_last_stack_ptr(stack_ptr as usize);
    ts.set_last_frame_descr(FrameDescr::from_raw(frame_descr));
    handle_not_a_closure(ts, Value::from_raw(callee as usize))
}

/// A call site's static argument count didn't match the callee's
/// declared arity. Never returns.
///
/// # Safety
/// `ts` must point at a live [`ThreadState`]; `stack_ptr`/`frame_descr`
/// are synced first so the printed stack trace reflects the call site.
#[no_mangle]
pub unsafe extern "C" fn sanya_handle_arg_count_mismatch(
    ts: *const ThreadState,
    callee: u64,
    argc: u64,
    stack_ptr: u64,
    frame_descr: u64,
) -> ! {
    let ts = &*ts;
    ts.set_last_stack_ptr(stack_ptr as usize);
    ts.set_last_frame_descr(FrameDescr::from_raw(frame_descr));
    handle_arg_count_mismatch(ts, Value::from_raw(callee as usize), argc as i64)
}

/// `(error# x)` was evaluated. Never returns.
///
/// # Safety
/// `ts` must point at a live [`ThreadState`]; `stack_ptr`/`frame_descr`
/// are synced first so the printed stack trace reflects the call site.
#[no_mangle]
pub unsafe extern "C" fn sanya_handle_user_error(
    ts: *const ThreadState,
    payload: u64,
    stack_ptr: u64,
    frame_descr: u64,
) -> ! {
    let ts = &*ts;
    ts.set_last_stack_ptr(stack_ptr as usize);
    ts.set_last_frame_descr(FrameDescr::from_raw(frame_descr));
    handle_user_error(ts, Value::from_raw(payload as usize))
}

/// The prologue's stack-overflow probe tripped. Never returns.
///
/// # Safety
/// `ts` must point at a live [`ThreadState`].
#[no_mangle]
pub unsafe extern "C" fn sanya_handle_stack_overflow(ts: *const ThreadState) -> ! {
    handle_stack_overflow(&*ts)
}

/// `(trace# x rest)`'s side effect: print `x` to stderr and return,
/// letting generated code fall through into compiling `rest`.
///
/// # Safety
/// `ts` must point at a live [`ThreadState`].
#[no_mangle]
pub unsafe extern "C" fn sanya_trace_value(ts: *const ThreadState, value: u64) {
    let _ = &*ts;
    let mut stderr = std::io::stderr();
    let _ = crate::printer::display_line(&mut stderr, Value::from_raw(value as usize));
}

/// Budget for the explicit stack-overflow probe (§9 "stack-overflow
/// probing protocol"): how far below the trampoline's entry rsp a
/// frame is allowed to reach before we treat it as overflow. Chosen
/// well under the default 8 MiB thread stack so the probe trips with
/// headroom to still print a stack trace.
const STACK_BUDGET: usize = 4 * 1024 * 1024;

/// Called from every function prologue when `SANYA_STACKCHECK` is
/// enabled. Compares the current rsp against the budget measured from
/// the trampoline's recorded entry point and traps (never returning)
/// if it has been exceeded; otherwise returns normally so generated
/// code falls through into the rest of the prologue.
///
/// # Safety
/// `ts` must point at a live [`ThreadState`] that has already had
/// [`ThreadState::set_first_stack_ptr`] called by the entry trampoline.
#[no_mangle]
pub unsafe extern "C" fn sanya_check_stack_overflow(
    ts: *const ThreadState,
    stack_ptr: u64,
    frame_descr: u64,
) {
    let ts = &*ts;
    let used = ts.first_stack_ptr().saturating_sub(stack_ptr as usize);
    if used > STACK_BUDGET {
        ts.set_last_stack_ptr(stack_ptr as usize);
        ts.set_last_frame_descr(FrameDescr::from_raw(frame_descr));
        handle_stack_overflow(ts);
    }
}
