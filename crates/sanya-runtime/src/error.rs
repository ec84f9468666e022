//! Runtime error surface (§7 "Error handling design").
//!
//! There is no recoverable error surface at the machine-code level --
//! every kind the generated code can trap into terminates the process
//! after printing a diagnostic and a stack trace (grounded on
//! `runtime.cpp`'s `handleNotAClosure`/`handleArgCountMismatch`). The
//! still-fallible host-side steps (global-table lookups and the
//! missing-`main` check during compilation) are `sanya_jit::CodegenError`'s
//! business instead, since they are failures of the compiler, not of a
//! running program; nothing here needs its own `Result` type.

use sanya_value::Value;

use crate::gc::ThreadState;
use crate::object::closure_info;
use crate::printer::{display, print_stack_trace};

fn fatal(message: &str, ts: &ThreadState) -> ! {
    eprintln!("{message}");
    let mut stderr = std::io::stderr();
    let _ = print_stack_trace(&mut stderr, ts);
    std::process::exit(1)
}

/// A call site's callee tag check failed (§4.E "emit a tag check on
/// the callee"). Corresponds to `Runtime::handleNotAClosure`.
pub fn handle_not_a_closure(ts: &ThreadState, callee: Value) -> ! {
    let mut buf = Vec::new();
    let _ = display(&mut buf, callee);
    fatal(
        &format!("Not a closure: {}", String::from_utf8_lossy(&buf)),
        ts,
    )
}

/// A call site's static argument count didn't match the callee's
/// declared arity. Corresponds to `Runtime::handleArgCountMismatch`.
pub fn handle_arg_count_mismatch(ts: &ThreadState, callee: Value, argc: i64) -> ! {
    let mut buf = Vec::new();
    let _ = display(&mut buf, callee);
    let declared = closure_info(callee).map_or(-1, |info| info.arity());
    fatal(
        &format!(
            "Argument count mismatch: {} need {}, but got {}",
            String::from_utf8_lossy(&buf),
            declared,
            argc
        ),
        ts,
    )
}

/// `(error# x)` was evaluated. Corresponds to `Runtime::handleUserError`.
pub fn handle_user_error(ts: &ThreadState, payload: Value) -> ! {
    let mut buf = Vec::new();
    let _ = display(&mut buf, payload);
    fatal(&format!("User error: {}", String::from_utf8_lossy(&buf)), ts)
}

/// The prologue's stack-overflow probe tripped. Corresponds to
/// `Runtime::handleStackOvf`. The stack trace here is necessarily
/// best-effort: overflow may have corrupted frames below the probe.
pub fn handle_stack_overflow(ts: &ThreadState) -> ! {
    fatal("Stack overflow", ts)
}
