//! A minimal x86-64 assembler emitting directly into a growable byte
//! buffer, in the spirit of AsmJit's `XAsm` that the original codegen
//! targets (`codegen.cpp`/`codegen2.cpp`'s `__ push(...)`, `__ mov(...)`,
//! `__ newLabel()`/`__ bind(...)` calls). This only implements the
//! handful of instruction forms §4.E's code generator actually emits --
//! it is not a general-purpose encoder.
//!
//! Every multi-byte operand (disp32, imm32, imm64, rel32) is written
//! little-endian, matching the x86-64 instruction format. All memory
//! operands this assembler supports are `[base + disp32]` -- the code
//! generator never needs scaled-index addressing because every index
//! (local slot number, global vector slot, vector element) is a
//! compile-time constant folded into the displacement.

use sanya_value::Value;

/// One of the sixteen 64-bit general-purpose registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Reg {
    Rax = 0,
    Rcx = 1,
    Rdx = 2,
    Rbx = 3,
    Rsp = 4,
    Rbp = 5,
    Rsi = 6,
    Rdi = 7,
    R8 = 8,
    R9 = 9,
    R10 = 10,
    R11 = 11,
    R12 = 12,
    R13 = 13,
    R14 = 14,
    R15 = 15,
}

impl Reg {
    fn low3(self) -> u8 {
        (self as u8) & 0x7
    }

    fn needs_rex_bit(self) -> bool {
        (self as u8) >= 8
    }
}

/// An as-yet-unresolved jump/call target. Bound exactly once via
/// [`Assembler::bind`]; may be referenced by any number of jumps before
/// that, mirroring AsmJit's forward-reference labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

/// Size and starting offset, within the code buffer, of the most
/// recently emitted immediate operand -- the counterpart of AsmJit's
/// `lastImmOffset()`, which `recordLastPtrOffset` in `codegen2.cpp`
/// reads right after emitting a `quote`d heap constant.
#[derive(Debug, Clone, Copy)]
pub struct ImmOffset {
    pub offset: usize,
    pub size: usize,
}

struct Fixup {
    /// Byte offset of the rel32 field to patch.
    at: usize,
    label: Label,
}

enum LabelState {
    Unbound,
    Bound(usize),
}

/// Growable code buffer plus label bookkeeping. `finalize` resolves
/// every jump fixup and hands back the raw bytes; turning those bytes
/// into executable memory is [`crate::buffer`]'s job, not this one's --
/// mirroring the split between AsmJit's `Assembler` (encoding) and its
/// `JitRuntime` (memory).
pub struct Assembler {
    buf: Vec<u8>,
    labels: Vec<LabelState>,
    fixups: Vec<Fixup>,
    last_imm: Option<ImmOffset>,
}

impl Assembler {
    #[must_use]
    pub fn new() -> Assembler {
        Assembler { buf: Vec::new(), labels: Vec::new(), fixups: Vec::new(), last_imm: None }
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn last_imm_offset(&self) -> ImmOffset {
        self.last_imm.expect("no immediate has been emitted yet")
    }

    pub fn new_label(&mut self) -> Label {
        self.labels.push(LabelState::Unbound);
        Label(self.labels.len() - 1)
    }

    /// Bind `label` to the current offset. A label may be bound only once.
    pub fn bind(&mut self, label: Label) {
        match self.labels[label.0] {
            LabelState::Unbound => self.labels[label.0] = LabelState::Bound(self.offset()),
            LabelState::Bound(_) => panic!("label bound twice"),
        }
    }

    fn byte(&mut self, b: u8) {
        self.buf.push(b);
    }

    fn bytes(&mut self, bs: &[u8]) {
        self.buf.extend_from_slice(bs);
    }

    fn rex(&mut self, w: bool, r: bool, x: bool, b: bool) {
        if w || r || x || b {
            self.byte(0x40 | (w as u8) << 3 | (r as u8) << 2 | (x as u8) << 1 | (b as u8));
        }
    }

    fn modrm(&mut self, md: u8, reg: u8, rm: u8) {
        self.byte((md << 6) | ((reg & 7) << 3) | (rm & 7));
    }

    /// Emit `mod=10 (disp32)` ModRM addressing `[base + disp]`, reg field
    /// `reg`, inserting a SIB byte when `base` is `rsp`/`r12` as x86-64
    /// requires (rm field `100` always signals SIB, never a plain base).
    fn mem_operand(&mut self, reg_field: u8, base: Reg, disp: i32) {
        self.modrm(0b10, reg_field, base.low3());
        if base.low3() == 0b100 {
            self.byte(0x24); // SIB: scale=0, index=none, base=rsp/r12 group
        }
        self.bytes(&disp.to_le_bytes());
    }

    // ---- stack ------------------------------------------------------

    pub fn push(&mut self, r: Reg) {
        self.rex(false, false, false, r.needs_rex_bit());
        self.byte(0x50 + r.low3());
    }

    pub fn pop(&mut self, r: Reg) {
        self.rex(false, false, false, r.needs_rex_bit());
        self.byte(0x58 + r.low3());
    }

    pub fn ret(&mut self) {
        self.byte(0xC3);
    }

    // ---- data movement ------------------------------------------------

    /// `mov dst, imm64` (REX.W + B8+r io). Records the 8-byte immediate's
    /// position so the caller can register it in a function's
    /// `constOffsets` table when it encodes a managed pointer.
    pub fn mov_reg_imm64(&mut self, dst: Reg, imm: u64) {
        self.rex(true, false, false, dst.needs_rex_bit());
        self.byte(0xB8 + dst.low3());
        let offset = self.offset();
        self.bytes(&imm.to_le_bytes());
        self.last_imm = Some(ImmOffset { offset, size: 8 });
    }

    /// Convenience wrapper: bake a tagged [`Value`] as a 64-bit immediate.
    pub fn mov_reg_value(&mut self, dst: Reg, v: Value) {
        self.mov_reg_imm64(dst, v.to_raw() as u64);
    }

    pub fn mov_reg_reg(&mut self, dst: Reg, src: Reg) {
        self.rex(true, src.needs_rex_bit(), false, dst.needs_rex_bit());
        self.byte(0x89);
        self.modrm(0b11, src.low3(), dst.low3());
    }

    /// `mov dst, [base + disp]`.
    pub fn mov_reg_mem(&mut self, dst: Reg, base: Reg, disp: i32) {
        self.rex(true, dst.needs_rex_bit(), false, base.needs_rex_bit());
        self.byte(0x8B);
        self.mem_operand(dst.low3(), base, disp);
    }

    /// `mov [base + disp], src`.
    pub fn mov_mem_reg(&mut self, base: Reg, disp: i32, src: Reg) {
        self.rex(true, src.needs_rex_bit(), false, base.needs_rex_bit());
        self.byte(0x89);
        self.mem_operand(src.low3(), base, disp);
    }

    /// `lea dst, [base + disp]`.
    pub fn lea(&mut self, dst: Reg, base: Reg, disp: i32) {
        self.rex(true, dst.needs_rex_bit(), false, base.needs_rex_bit());
        self.byte(0x8D);
        self.mem_operand(dst.low3(), base, disp);
    }

    // ---- arithmetic -----------------------------------------------------

    pub fn add_reg_reg(&mut self, dst: Reg, src: Reg) {
        self.rex(true, src.needs_rex_bit(), false, dst.needs_rex_bit());
        self.byte(0x01);
        self.modrm(0b11, src.low3(), dst.low3());
    }

    pub fn add_reg_mem(&mut self, dst: Reg, base: Reg, disp: i32) {
        self.rex(true, dst.needs_rex_bit(), false, base.needs_rex_bit());
        self.byte(0x03);
        self.mem_operand(dst.low3(), base, disp);
    }

    pub fn add_reg_imm32(&mut self, dst: Reg, imm: i32) {
        self.rex(true, false, false, dst.needs_rex_bit());
        self.byte(0x81);
        self.modrm(0b11, 0, dst.low3());
        self.bytes(&imm.to_le_bytes());
    }

    pub fn sub_reg_reg(&mut self, dst: Reg, src: Reg) {
        self.rex(true, src.needs_rex_bit(), false, dst.needs_rex_bit());
        self.byte(0x29);
        self.modrm(0b11, src.low3(), dst.low3());
    }

    pub fn sub_reg_mem(&mut self, dst: Reg, base: Reg, disp: i32) {
        self.rex(true, dst.needs_rex_bit(), false, base.needs_rex_bit());
        self.byte(0x2B);
        self.mem_operand(dst.low3(), base, disp);
    }

    pub fn sub_reg_imm32(&mut self, dst: Reg, imm: i32) {
        self.rex(true, false, false, dst.needs_rex_bit());
        self.byte(0x81);
        self.modrm(0b11, 5, dst.low3());
        self.bytes(&imm.to_le_bytes());
    }

    pub fn and_reg_imm32(&mut self, dst: Reg, imm: i32) {
        self.rex(true, false, false, dst.needs_rex_bit());
        self.byte(0x81);
        self.modrm(0b11, 4, dst.low3());
        self.bytes(&imm.to_le_bytes());
    }

    // ---- comparison / conditional move ------------------------------

    pub fn cmp_reg_reg(&mut self, lhs: Reg, rhs: Reg) {
        self.rex(true, rhs.needs_rex_bit(), false, lhs.needs_rex_bit());
        self.byte(0x39);
        self.modrm(0b11, rhs.low3(), lhs.low3());
    }

    /// `cmp lhs, [base + disp]`.
    pub fn cmp_reg_mem(&mut self, lhs: Reg, base: Reg, disp: i32) {
        self.rex(true, lhs.needs_rex_bit(), false, base.needs_rex_bit());
        self.byte(0x3B);
        self.mem_operand(lhs.low3(), base, disp);
    }

    pub fn cmp_reg_imm32(&mut self, lhs: Reg, imm: i32) {
        self.rex(true, false, false, lhs.needs_rex_bit());
        self.byte(0x81);
        self.modrm(0b11, 7, lhs.low3());
        self.bytes(&imm.to_le_bytes());
    }

    pub fn test_reg_reg(&mut self, a: Reg, b: Reg) {
        self.rex(true, b.needs_rex_bit(), false, a.needs_rex_bit());
        self.byte(0x85);
        self.modrm(0b11, b.low3(), a.low3());
    }

    /// `cmovg dst, src` -- move if greater (signed).
    pub fn cmovg(&mut self, dst: Reg, src: Reg) {
        self.rex(true, dst.needs_rex_bit(), false, src.needs_rex_bit());
        self.byte(0x0F);
        self.byte(0x4F);
        self.modrm(0b11, dst.low3(), src.low3());
    }

    /// `cmove dst, src` -- move if equal (`ZF=1`), used by the tag and
    /// singleton predicates (`pair?#`, `null?#`, ...) to turn a compare
    /// into a boolean value without a branch.
    pub fn cmove(&mut self, dst: Reg, src: Reg) {
        self.rex(true, dst.needs_rex_bit(), false, src.needs_rex_bit());
        self.byte(0x0F);
        self.byte(0x44);
        self.modrm(0b11, dst.low3(), src.low3());
    }

    // ---- control flow -------------------------------------------------

    fn rel32_fixup(&mut self, label: Label) {
        let at = self.offset();
        self.bytes(&0i32.to_le_bytes());
        self.fixups.push(Fixup { at, label });
    }

    pub fn jmp(&mut self, label: Label) {
        self.byte(0xE9);
        self.rel32_fixup(label);
    }

    pub fn je(&mut self, label: Label) {
        self.byte(0x0F);
        self.byte(0x84);
        self.rel32_fixup(label);
    }

    pub fn jne(&mut self, label: Label) {
        self.byte(0x0F);
        self.byte(0x85);
        self.rel32_fixup(label);
    }

    /// `ja` -- jump if above (unsigned `>`). The heap-limit check ahead of
    /// an inline pair allocation compares two raw addresses, so this needs
    /// the unsigned condition rather than `jg`'s signed one.
    pub fn ja(&mut self, label: Label) {
        self.byte(0x0F);
        self.byte(0x87);
        self.rel32_fixup(label);
    }

    /// Indirect call through a register (`FF /2`) -- every call in the
    /// S2S convention is to a dynamically loaded code pointer, never a
    /// statically known address, so this is the only call form needed.
    pub fn call_reg(&mut self, r: Reg) {
        self.rex(false, false, false, r.needs_rex_bit());
        self.byte(0xFF);
        self.modrm(0b11, 2, r.low3());
    }

    /// Indirect jump through a register (`FF /4`), used for the tail-call
    /// transfer once the current frame has been discarded.
    pub fn jmp_reg(&mut self, r: Reg) {
        self.rex(false, false, false, r.needs_rex_bit());
        self.byte(0xFF);
        self.modrm(0b11, 4, r.low3());
    }

    /// Resolve every jump fixup and return the finished code bytes. Every
    /// label created via [`Self::new_label`] must have been bound.
    #[must_use]
    pub fn finalize(mut self) -> Vec<u8> {
        for fixup in &self.fixups {
            let target = match self.labels[fixup.label.0] {
                LabelState::Bound(off) => off,
                LabelState::Unbound => panic!("unbound label referenced by a jump"),
            };
            let rel = target as i64 - (fixup.at as i64 + 4);
            let rel = i32::try_from(rel).expect("jump target out of rel32 range");
            self.buf[fixup.at..fixup.at + 4].copy_from_slice(&rel.to_le_bytes());
        }
        self.buf
    }
}

impl Default for Assembler {
    fn default() -> Assembler {
        Assembler::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_round_trip_bytes() {
        let mut a = Assembler::new();
        a.push(Reg::Rdi);
        a.push(Reg::R12);
        a.pop(Reg::Rax);
        let code = a.finalize();
        assert_eq!(code, vec![0x57, 0x41, 0x54, 0x58]);
    }

    #[test]
    fn movabs_records_imm_offset() {
        let mut a = Assembler::new();
        a.push(Reg::Rbx);
        a.mov_reg_imm64(Reg::Rax, 0xdead_beef_0000_0004);
        let imm = a.last_imm_offset();
        assert_eq!(imm.size, 8);
        assert_eq!(imm.offset, 1 /* push rbx */ + 2 /* rex+opcode */);
    }

    #[test]
    fn forward_jump_resolves_to_correct_rel32() {
        let mut a = Assembler::new();
        let done = a.new_label();
        a.jmp(done);
        a.push(Reg::Rax); // 1 byte, pads the gap
        a.bind(done);
        let code = a.finalize();
        // jmp rel32 is 5 bytes (E9 + 4); target is right after, at offset 5.
        let rel = i32::from_le_bytes([code[1], code[2], code[3], code[4]]);
        assert_eq!(rel, 0);
    }

    #[test]
    fn mem_operand_inserts_sib_for_rsp_base() {
        let mut a = Assembler::new();
        a.mov_reg_mem(Reg::Rax, Reg::Rsp, 16);
        let code = a.finalize();
        // REX.W, 0x8B, ModRM(mod=10,reg=000,rm=100), SIB 0x24, disp32
        assert_eq!(code[0], 0x48);
        assert_eq!(code[1], 0x8B);
        assert_eq!(code[2], 0b10_000_100);
        assert_eq!(code[3], 0x24);
    }
}
