//! Code generator error surface (§4.E, §4.D).
//!
//! These cover the host-side, still-fallible steps that happen while
//! compiling a program -- an unresolved global, a source form that
//! violates a structural limit of the calling convention. Anything the
//! *running* program itself traps into (not-a-closure, arity mismatch,
//! user `error#`) is `sanya_runtime::error`'s business, not this one's:
//! those are failures of a compiled program, these are failures of the
//! compiler.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("undefined global: {name}")]
    UndefinedGlobal { name: String },

    #[error("function `{name}` declares {arity} parameters, but the calling convention caps arity at 5")]
    ArityTooLarge { name: String, arity: usize },

    #[error("call site passes {argc} arguments, but the calling convention caps arity at 5")]
    TooManyArguments { argc: usize },

    #[error(
        "frame grew to {depth} live slots, past the {cap}-slot cap a frame descriptor can pack"
    )]
    FrameTooLarge { depth: usize, cap: usize },

    #[error("malformed `{form}`: {detail}")]
    MalformedForm { form: String, detail: String },

    #[error("program does not define `main`")]
    MissingMain,

    #[error("`main` must take zero arguments")]
    MainTakesArguments,

    #[error("executable memory allocation failed: {0}")]
    Memory(#[from] region::Error),
}
