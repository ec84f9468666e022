//! The function info block (§3 "Function info block").
//!
//! `{arity, name, constOffsets, numPayload, size, code...}`, laid out
//! in the JIT's own executable allocation (see `sanya_jit::codegen`),
//! immediately followed by the function's machine code. This block is
//! *not* a managed heap cell: it carries no [`crate::layout::GcHeader`]
//! and the collector never relocates it, only patches through it (the
//! closure that points at it, and the `constOffsets`-addressed
//! immediates inside its code region, are what move).
use sanya_value::Value;

use crate::layout::FunctionInfoLayout as L;

/// A read-only view over a function info block living at `base`.
#[derive(Clone, Copy)]
pub struct FunctionInfo {
    base: usize,
}

impl FunctionInfo {
    /// # Safety
    /// `base` must point at a fully initialized function info block.
    #[must_use]
    pub unsafe fn at(base: usize) -> FunctionInfo {
        FunctionInfo { base }
    }

    #[must_use]
    pub fn base(self) -> usize {
        self.base
    }

    #[must_use]
    pub fn arity(self) -> i64 {
        unsafe { std::ptr::read_unaligned((self.base + L::ARITY_OFFSET) as *const i64) }
    }

    #[must_use]
    pub fn name(self) -> Value {
        unsafe {
            Value::from_raw(std::ptr::read_unaligned((self.base + L::NAME_OFFSET) as *const usize))
        }
    }

    pub fn set_name(self, v: Value) {
        unsafe {
            std::ptr::write_unaligned((self.base + L::NAME_OFFSET) as *mut usize, v.to_raw());
        }
    }

    #[must_use]
    pub fn const_offsets(self) -> Value {
        unsafe {
            Value::from_raw(std::ptr::read_unaligned(
                (self.base + L::CONST_OFFSETS_OFFSET) as *const usize,
            ))
        }
    }

    pub fn set_const_offsets(self, v: Value) {
        unsafe {
            std::ptr::write_unaligned(
                (self.base + L::CONST_OFFSETS_OFFSET) as *mut usize,
                v.to_raw(),
            );
        }
    }

    #[must_use]
    pub fn num_payload(self) -> i64 {
        unsafe { std::ptr::read_unaligned((self.base + L::NUM_PAYLOAD_OFFSET) as *const i64) }
    }

    /// Total byte size of the code region following this header.
    #[must_use]
    pub fn code_size(self) -> i64 {
        unsafe { std::ptr::read_unaligned((self.base + L::SIZE_OFFSET) as *const i64) }
    }

    #[must_use]
    pub fn code_ptr(self) -> *const u8 {
        (self.base + L::CODE_OFFSET) as *const u8
    }

    /// Write an 8-byte immediate embedded at `code_ptr() + offset`.
    /// Used by the collector to patch `constOffsets`-addressed pointer
    /// immediates after relocating the objects they name.
    ///
    /// # Safety
    /// `offset` must be a byte offset the code generator actually
    /// recorded in `constOffsets` for an 8-byte pointer immediate.
    pub unsafe fn patch_const_at(self, offset: i64, value: Value) {
        let addr = self.code_ptr() as usize + offset as usize;
        std::ptr::write_unaligned(addr as *mut usize, value.to_raw());
    }

    /// # Safety
    /// Same requirement as [`Self::patch_const_at`].
    #[must_use]
    pub unsafe fn read_const_at(self, offset: i64) -> Value {
        let addr = self.code_ptr() as usize + offset as usize;
        Value::from_raw(std::ptr::read_unaligned(addr as *const usize))
    }
}
