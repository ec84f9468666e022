//! Executable memory allocation for compiled functions (§3 "Function
//! info block" storage, §4.F boundary).
//!
//! Grounded on `region`, the same crate the teacher's simplejit-style
//! backends use to manage a JIT code heap: allocate, write the header
//! and code bytes, then `region::protect` the page.
//!
//! Unlike a typical JIT, this one cannot drop to read-execute-only: the
//! collector patches `constOffsets`-addressed pointer immediates
//! directly inside a function's code region on every collection it
//! survives (§4.C), for as long as the function's closure stays
//! reachable -- not just while it is being compiled. The code region
//! therefore stays `READ_WRITE_EXECUTE` for the life of the process,
//! the same trade the original AsmJit-backed runtime makes implicitly
//! by never protecting its code pages down in the first place.

use sanya_value::Value;

use crate::error::CodegenError;

/// One function's info block plus the machine code immediately
/// following it, both living in a single `region`-backed allocation
/// that outlives the whole program (never freed, never moved).
pub struct CodeBuffer {
    alloc: region::Allocation,
    code_len: usize,
}

/// Byte offset of the code region within a function's allocation,
/// matching [`sanya_runtime::layout::FunctionInfoLayout::CODE_OFFSET`].
const CODE_OFFSET: usize = sanya_runtime::layout::FunctionInfoLayout::CODE_OFFSET;

impl CodeBuffer {
    /// Lay out and finalize one function's info block + code into
    /// fresh executable memory.
    ///
    /// `name`/`const_offsets`/`num_payload` are the header fields the
    /// code generator already knows at the point a function's body
    /// finishes compiling (§3); `code` is the fully-assembled,
    /// fixup-resolved instruction stream from [`crate::asm::Assembler::finalize`].
    pub fn finalize(
        arity: i64,
        name: Value,
        const_offsets: Value,
        num_payload: i64,
        code: &[u8],
    ) -> Result<CodeBuffer, CodegenError> {
        use sanya_runtime::layout::FunctionInfoLayout as L;

        let total_len = CODE_OFFSET + code.len();
        let mut alloc = region::alloc(total_len, region::Protection::READ_WRITE)?;

        // Safety: `alloc` is a fresh RW mapping at least `total_len`
        // bytes long, so every write below lands inside it.
        unsafe {
            let base = alloc.as_mut_ptr::<u8>();
            write_i64(base, L::ARITY_OFFSET, arity);
            write_usize(base, L::NAME_OFFSET, name.to_raw());
            write_usize(base, L::CONST_OFFSETS_OFFSET, const_offsets.to_raw());
            write_i64(base, L::NUM_PAYLOAD_OFFSET, num_payload);
            write_i64(base, L::SIZE_OFFSET, code.len() as i64);
            std::ptr::copy_nonoverlapping(code.as_ptr(), base.add(CODE_OFFSET), code.len());
        }

        region::protect(
            alloc.as_ptr::<u8>(),
            alloc.len(),
            region::Protection::READ_WRITE_EXECUTE,
        )?;

        Ok(CodeBuffer { alloc, code_len: code.len() })
    }

    /// Base address of the function info block -- the address a
    /// closure's info pointer and a [`sanya_runtime::FunctionInfo::at`]
    /// both expect.
    #[must_use]
    pub fn base(&self) -> usize {
        self.alloc.as_ptr::<u8>() as usize
    }

    #[must_use]
    pub fn code_len(&self) -> usize {
        self.code_len
    }
}

// `region::Allocation` is neither `Send` nor `Sync` by default derive
// inference (raw pointer field); every allocation this module hands out
// is executable, immutable after `finalize`, and lives for the process
// lifetime, so sharing a `&CodeBuffer` across threads is sound. Nothing
// in this compiler is currently multi-threaded, but `sanya_runtime::gc`
// stashes the module's function table behind a process-global `OnceCell`
// that code run from any thread could in principle read.
unsafe impl Send for CodeBuffer {}
unsafe impl Sync for CodeBuffer {}

unsafe fn write_i64(base: *mut u8, offset: usize, value: i64) {
    std::ptr::write_unaligned(base.add(offset) as *mut i64, value);
}

unsafe fn write_usize(base: *mut u8, offset: usize, value: usize) {
    std::ptr::write_unaligned(base.add(offset) as *mut usize, value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use sanya_value::Value;

    #[test]
    fn finalize_lays_out_header_and_code() {
        // `ret` -- a single valid instruction, just to exercise the
        // allocate/write/protect path end to end.
        let code = [0xC3u8];
        let buf = CodeBuffer::finalize(2, Value::new_nil(), Value::new_nil(), 0, &code).unwrap();
        unsafe {
            let info = sanya_runtime::FunctionInfo::at(buf.base());
            assert_eq!(info.arity(), 2);
            assert_eq!(info.code_size(), 1);
            assert_eq!(*info.code_ptr(), 0xC3);
        }
    }
}
