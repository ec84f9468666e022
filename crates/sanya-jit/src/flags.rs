//! Code generation switches (§6 `SANYA_TCO` / `SANYA_STACKCHECK`).
//!
//! `sanya-cli` centralizes the environment variables themselves into
//! its own `Config`; this crate only ever sees the resolved booleans,
//! keeping `sanya-jit` usable as a library independent of how an
//! embedder chooses to configure it -- the same split the teacher
//! draws between `wasmtime::Config` and the raw `cranelift_codegen`
//! `Flags` its settings eventually get turned into.

/// Resolved code generation behavior for one compilation.
#[derive(Debug, Clone, Copy)]
pub struct CodegenFlags {
    /// If false, every tail call in source position is compiled as an
    /// ordinary call instead (`SANYA_TCO=NO`).
    pub tco: bool,
    /// If false, function prologues omit the stack-overflow probe
    /// (`SANYA_STACKCHECK=NO`).
    pub stack_check: bool,
}

impl Default for CodegenFlags {
    fn default() -> CodegenFlags {
        CodegenFlags { tco: true, stack_check: true }
    }
}
