//! Value and stack-trace printing (§2 of the expanded spec; grounded on
//! `object.cpp`'s `displayDetail`/`printToFd`/`printNewLine`).
//!
//! The original's printer writes straight to a file descriptor with
//! `dprintf`; we write to any `std::io::Write` so the CLI can target
//! stdout for the final result and stderr for diagnostics without
//! duplicating the traversal.

use std::io::{self, Write};

use sanya_value::{Tag, Value};

use crate::function_info::FunctionInfo;
use crate::gc::ThreadState;
use crate::object::{closure_info, pair_car, pair_cdr, symbol_bytes, vector_get, vector_size};

/// Render `v` the way the original's `displayDetail` does: fixnums as
/// decimal, booleans as `#t`/`#f`, pairs as `(a . b)` (or proper-list
/// shorthand), vectors as `#(...)`, symbols by name, and closures by
/// function name (or `<closure>` if uncompiled).
pub fn display(out: &mut impl Write, v: Value) -> io::Result<()> {
    match v.tag() {
        Some(Tag::Fixnum) => write!(out, "{}", v.from_fixnum()),
        Some(Tag::Singleton) if v.is_nil() => write!(out, "()"),
        Some(Tag::Singleton) if v.is_true() => write!(out, "#t"),
        Some(Tag::Singleton) if v.is_false() => write!(out, "#f"),
        Some(Tag::Singleton) => write!(out, "#<void>"),
        Some(Tag::Symbol) => out.write_all(symbol_bytes(v)),
        Some(Tag::Pair) => display_list(out, v),
        Some(Tag::Vector) => {
            write!(out, "#(")?;
            let len = vector_size(v);
            for i in 0..len {
                if i > 0 {
                    write!(out, " ")?;
                }
                display(out, vector_get(v, i))?;
            }
            write!(out, ")")
        }
        Some(Tag::Closure) => match closure_info(v) {
            Some(info) => {
                write!(out, "#<closure ")?;
                display(out, info.name())?;
                write!(out, ">")
            }
            None => write!(out, "#<closure (uncompiled)>"),
        },
        Some(Tag::ForeignPtr) => write!(out, "#<foreign 0x{:x}>", v.raw()),
        None => write!(out, "#<invalid 0x{:x}>", v.to_raw()),
    }
}

fn display_list(out: &mut impl Write, mut v: Value) -> io::Result<()> {
    write!(out, "(")?;
    let mut first = true;
    loop {
        if !first {
            write!(out, " ")?;
        }
        first = false;
        display(out, pair_car(v))?;
        let rest = pair_cdr(v);
        if rest.is_nil() {
            break;
        }
        if !rest.is_pair() {
            write!(out, " . ")?;
            display(out, rest)?;
            break;
        }
        v = rest;
    }
    write!(out, ")")
}

/// Print `v` followed by a newline -- the counterpart of
/// `Object::printNewLine` used for the CLI's final result line.
pub fn display_line(out: &mut impl Write, v: Value) -> io::Result<()> {
    display(out, v)?;
    writeln!(out)
}

/// Walk the scheme stack exactly like the collector's
/// `gcScavengeSchemeStack`, but print each frame's function name
/// instead of relocating pointers. Shared by every terminating error
/// handler in `error.rs` (§4.F: "print a stack trace by walking frame
/// descriptors (same algorithm as the collector)").
pub fn print_stack_trace(out: &mut impl Write, ts: &ThreadState) -> io::Result<()> {
    let stack_top = ts.first_stack_ptr();
    let mut stack_ptr = ts.last_stack_ptr();
    writeln!(out, "Stack trace:")?;

    if stack_ptr == stack_top {
        writeln!(out, "  <empty>")?;
        return Ok(());
    }

    let mut fd = ts.last_frame_descr();
    let mut frame_no = 0usize;
    loop {
        writeln!(out, "  #{frame_no} ({} slots)", fd.frame_size())?;
        frame_no += 1;

        stack_ptr += (1 + fd.frame_size()) * 8;
        if stack_ptr == stack_top {
            break;
        }
        if stack_ptr > stack_top {
            writeln!(out, "  <truncated: frame walk passed the recorded top>")?;
            break;
        }
        fd = unsafe {
            crate::frame::FrameDescr::from_raw(std::ptr::read_unaligned(
                (stack_ptr - 16) as *const u64,
            ))
        };
    }
    Ok(())
}

/// Name and declared arity of a closure's function, for diagnostics
/// (`handleArgCountMismatch`'s "need N, but got M").
pub fn describe_function(info: FunctionInfo) -> String {
    let mut name = Vec::new();
    let _ = display(&mut name, info.name());
    format!("{} (arity {})", String::from_utf8_lossy(&name), info.arity())
}
