//! Virtual stack and local-variable accounting (§4.E "Local-variable
//! accounting", "Frame descriptor construction").
//!
//! The code generator never maintains a separate evaluation stack: the
//! virtual stack this module tracks mirrors the real `rsp` exactly, one
//! entry per currently-pushed word, so a local's "address" is simply
//! its tracked offset from the current `rsp` (§4.E). Every temporary
//! push/pop shifts every tracked local's offset by one, matching
//! `shiftLocal(±1)` in `codegen.cpp`.
//!
//! Arguments are the only named locals this language has (no `let`, no
//! `set!`); `thisClosure` and the inherited frame descriptor also
//! occupy a slot each but are never named -- they only need counting.

use sanya_runtime::{FrameDescr, MAX_FRAME_SLOTS};
use sanya_value::Value;

use crate::error::CodegenError;

/// One function's virtual stack, from the moment its prologue starts
/// pushing state to the moment its body finishes.
pub struct Frame {
    /// Total live words currently pushed, including the two unnamed
    /// base slots (inherited frame descriptor, `thisClosure`) and every
    /// named argument and temporary above them.
    depth: usize,
    /// Named locals (arguments), each paired with its current offset
    /// from `rsp`. Offset 0 is the most recently pushed word.
    locals: Vec<(Value, usize)>,
}

impl Frame {
    #[must_use]
    pub fn new() -> Frame {
        Frame { depth: 0, locals: Vec::new() }
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    fn shift(&mut self, delta: isize) {
        for (_, offset) in &mut self.locals {
            *offset = (*offset as isize + delta) as usize;
        }
    }

    /// Account for a push of an unnamed temporary (an intermediate
    /// expression result, `thisClosure`, or the inherited frame
    /// descriptor slot).
    pub fn push_unnamed(&mut self) -> Result<(), CodegenError> {
        self.shift(1);
        self.depth += 1;
        if self.depth > MAX_FRAME_SLOTS {
            return Err(CodegenError::FrameTooLarge { depth: self.depth, cap: MAX_FRAME_SLOTS });
        }
        Ok(())
    }

    /// Account for a pop of an unnamed temporary.
    pub fn pop_unnamed(&mut self) {
        debug_assert!(self.depth > 0, "popped an empty virtual stack");
        self.depth -= 1;
        self.shift(-1);
    }

    /// Account for a push that introduces a new named local (a
    /// function argument), which becomes looked-up-able at offset 0.
    pub fn push_named(&mut self, name: Value) -> Result<(), CodegenError> {
        self.push_unnamed()?;
        self.locals.push((name, 0));
        Ok(())
    }

    /// Current stack offset (in words, from `rsp`) of a named local, if
    /// one by that name is live. Symbols compare by interned pointer
    /// identity (§4.A).
    #[must_use]
    pub fn lookup(&self, name: Value) -> Option<usize> {
        self.locals.iter().rev().find(|(n, _)| n.to_raw() == name.to_raw()).map(|&(_, off)| off)
    }

    /// Pack the current depth into a [`FrameDescr`] (§4.E "Frame
    /// descriptor construction"). The single oldest slot (the inherited
    /// frame descriptor this function's prologue pushed) is the only
    /// one that never holds a [`Value`]; every other live slot is
    /// scavenged unconditionally -- harmless for non-pointer values,
    /// since scavenging one is a no-op.
    #[must_use]
    pub fn descriptor(&self) -> FrameDescr {
        if self.depth == 0 {
            return FrameDescr::EMPTY;
        }
        let mut flags = vec![true; self.depth];
        flags[self.depth - 1] = false;
        FrameDescr::new(&flags)
    }
}

impl Default for Frame {
    fn default() -> Frame {
        Frame::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(n: usize) -> Value {
        Value::tag_pointer(0x1000 + n * 16, sanya_value::Tag::Symbol)
    }

    #[test]
    fn args_land_at_the_expected_offsets() {
        let mut f = Frame::new();
        f.push_unnamed().unwrap(); // inherited frame descr
        f.push_unnamed().unwrap(); // thisClosure
        f.push_named(sym(1)).unwrap();
        f.push_named(sym(2)).unwrap();

        assert_eq!(f.lookup(sym(2)), Some(0));
        assert_eq!(f.lookup(sym(1)), Some(1));
        assert_eq!(f.depth(), 4);
    }

    #[test]
    fn temporaries_shift_existing_locals() {
        let mut f = Frame::new();
        f.push_unnamed().unwrap();
        f.push_unnamed().unwrap();
        f.push_named(sym(1)).unwrap();
        assert_eq!(f.lookup(sym(1)), Some(0));

        f.push_unnamed().unwrap();
        assert_eq!(f.lookup(sym(1)), Some(1));
        f.pop_unnamed();
        assert_eq!(f.lookup(sym(1)), Some(0));
    }

    #[test]
    fn descriptor_marks_only_the_base_slot_as_non_pointer() {
        let mut f = Frame::new();
        f.push_unnamed().unwrap();
        f.push_unnamed().unwrap();
        f.push_named(sym(1)).unwrap();
        let fd = f.descriptor();
        assert_eq!(fd.frame_size(), 3);
        assert!(fd.is_ptr(0));
        assert!(fd.is_ptr(1));
        assert!(!fd.is_ptr(2));
    }
}
