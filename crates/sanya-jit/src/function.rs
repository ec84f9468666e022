//! One function's code generator (§4.E "Code generation algorithm").
//!
//! Grounded on `codegen.cpp`'s `CGFunction::compile`/`compileCall` and
//! `codegen2.cpp`'s `tryIf`/`tryQuote`/`tryPrimOp`/`emitConst`: a single
//! pass over the body tree, emitting x86-64 directly with no
//! intermediate IR, tracking the virtual stack in lockstep via
//! [`Frame`] and recording every baked-in heap pointer's byte offset so
//! the collector can find and patch it later (§4.C).

use sanya_runtime::gc::ThreadState;
use sanya_runtime::globals::GlobalTable;
use sanya_runtime::layout::{
    CAR_OFFSET, CDR_OFFSET, CLOSURE_INFO_OFFSET, FunctionInfoLayout, HEADER_SIZE, PTR_SIZE,
    VECTOR_ELEM_OFFSET, align_up,
};
use sanya_runtime::object::{pair_car, pair_cdr, symbol_bytes};
use sanya_value::{Tag, Value};

use crate::asm::{Assembler, Reg};
use crate::error::CodegenError;
use crate::flags::CodegenFlags;
use crate::locals::Frame;
use crate::module::{list_to_vec, FunctionDef, Keywords};
use crate::reg::{ARG_REGS, C, F, HEAP_LIMIT, HEAP_PTR, SCRATCH, THREAD_STATE};

/// A primitive operator recognized by name (§4.A "Primitive operators").
#[derive(Debug, Clone, Copy)]
enum Primitive {
    Add,
    Sub,
    Lt,
    Cons,
    Car,
    Cdr,
    PairP,
    SymbolP,
    IntegerP,
    ProcedureP,
    VectorP,
    TrueP,
    FalseP,
    NullP,
    Trace,
    Error,
}

struct CGFunction<'a> {
    ts: &'a ThreadState,
    kw: &'a Keywords,
    flags: CodegenFlags,
    globals_vec: Value,
    asm: Assembler,
    frame: Frame,
    const_offsets: Vec<i64>,
}

/// Compile one registered function body to machine code, returning the
/// finished instruction stream and its `constOffsets` table (§3).
pub(crate) fn compile_function(
    ts: &ThreadState,
    kw: &Keywords,
    flags: CodegenFlags,
    def: &FunctionDef,
    globals_vec: Value,
) -> Result<(Vec<u8>, Vec<i64>), CodegenError> {
    let mut cg = CGFunction {
        ts,
        kw,
        flags,
        globals_vec,
        asm: Assembler::new(),
        frame: Frame::new(),
        const_offsets: Vec::new(),
    };
    cg.compile(def)?;
    let const_offsets = cg.const_offsets;
    let code = cg.asm.finalize();
    Ok((code, const_offsets))
}

impl<'a> CGFunction<'a> {
    fn compile(&mut self, def: &FunctionDef) -> Result<(), CodegenError> {
        // Prologue: the two unnamed base slots every frame carries
        // (§4.E "Local-variable accounting"), then the declared
        // arguments, each landing in the register the S2S convention
        // assigns it.
        self.asm.push(F);
        self.frame.push_unnamed()?;
        self.asm.push(C);
        self.frame.push_unnamed()?;

        if self.flags.stack_check {
            self.emit_stack_check();
        }

        for (i, &param) in def.params.iter().enumerate() {
            self.asm.push(ARG_REGS[i]);
            self.frame.push_named(param)?;
        }

        for (i, &expr) in def.body.iter().enumerate() {
            let is_last = i == def.body.len() - 1;
            if is_last {
                self.compile_expr(expr, true)?;
            } else {
                self.compile_expr(expr, false)?;
                self.asm.add_reg_imm32(Reg::Rsp, 8);
                self.frame.pop_unnamed();
            }
        }

        self.asm.pop(SCRATCH[0]);
        self.frame.pop_unnamed();
        self.asm.add_reg_imm32(Reg::Rsp, (self.frame.depth() * 8) as i32);
        self.asm.ret();
        Ok(())
    }

    fn emit_stack_check(&mut self) {
        self.asm.lea(Reg::Rsi, Reg::Rsp, 0);
        self.asm.mov_reg_imm64(Reg::Rdx, self.frame.descriptor().to_raw());
        self.asm.mov_reg_reg(Reg::Rdi, THREAD_STATE);
        self.asm
            .mov_reg_imm64(SCRATCH[0], sanya_runtime::ffi::sanya_check_stack_overflow as usize as u64);
        self.asm.call_reg(SCRATCH[0]);
    }

    // ---- expressions -------------------------------------------------

    fn compile_expr(&mut self, expr: Value, is_tail: bool) -> Result<(), CodegenError> {
        if expr.is_fixnum() || expr.is_singleton() {
            return self.push_const(expr);
        }
        if expr.is_symbol() {
            return self.compile_symbol(expr);
        }
        if expr.is_pair() {
            return self.compile_form(expr, is_tail);
        }
        Err(CodegenError::MalformedForm {
            form: "expression".to_string(),
            detail: format!("{expr:?} is not something this code generator can evaluate"),
        })
    }

    fn push_const(&mut self, v: Value) -> Result<(), CodegenError> {
        self.asm.mov_reg_value(SCRATCH[0], v);
        if v.is_heap_allocated() {
            self.record_const_offset();
        }
        self.asm.push(SCRATCH[0]);
        self.frame.push_unnamed()
    }

    fn record_const_offset(&mut self) {
        let imm = self.asm.last_imm_offset();
        self.const_offsets.push(imm.offset as i64);
    }

    fn compile_symbol(&mut self, sym: Value) -> Result<(), CodegenError> {
        if let Some(offset) = self.frame.lookup(sym) {
            self.asm.mov_reg_mem(SCRATCH[0], Reg::Rsp, (offset * 8) as i32);
            self.asm.push(SCRATCH[0]);
            return self.frame.push_unnamed();
        }

        let ix = GlobalTable::lookup_name(self.ts, sym).ok_or_else(|| CodegenError::UndefinedGlobal {
            name: String::from_utf8_lossy(symbol_bytes(sym)).into_owned(),
        })?;

        self.asm.mov_reg_value(SCRATCH[0], self.globals_vec);
        self.record_const_offset();
        let disp = VECTOR_ELEM_OFFSET as i64 - Tag::Vector as i64 + ix * PTR_SIZE as i64;
        self.asm.mov_reg_mem(SCRATCH[0], SCRATCH[0], disp as i32);
        self.asm.push(SCRATCH[0]);
        self.frame.push_unnamed()
    }

    fn compile_form(&mut self, expr: Value, is_tail: bool) -> Result<(), CodegenError> {
        let head = pair_car(expr);
        let rest = pair_cdr(expr);

        if head.is_symbol() {
            if head.to_raw() == self.kw.quote.to_raw() {
                return self.compile_quote(rest);
            }
            if head.to_raw() == self.kw.if_.to_raw() {
                return self.compile_if(rest, is_tail);
            }
            if head.to_raw() == self.kw.begin.to_raw() {
                return self.compile_body(list_to_vec(rest), is_tail);
            }
            if let Some(prim) = self.primitive_tag(head) {
                return self.compile_primitive(prim, rest, is_tail);
            }
        }
        self.compile_call(expr, is_tail)
    }

    fn compile_quote(&mut self, rest: Value) -> Result<(), CodegenError> {
        self.push_const(pair_car(rest))
    }

    fn compile_if(&mut self, rest: Value, is_tail: bool) -> Result<(), CodegenError> {
        let parts = list_to_vec(rest);
        if parts.len() != 3 {
            return Err(CodegenError::MalformedForm {
                form: "if".to_string(),
                detail: "expected (if test then else)".to_string(),
            });
        }

        self.compile_expr(parts[0], false)?;
        self.asm.pop(SCRATCH[0]);
        self.frame.pop_unnamed();
        self.asm.cmp_reg_imm32(SCRATCH[0], Value::new_false().to_raw() as i32);

        let on_false = self.asm.new_label();
        let done = self.asm.new_label();
        self.asm.je(on_false);

        self.compile_expr(parts[1], is_tail)?;
        self.asm.jmp(done);
        // Both arms net exactly one push onto an identically shaped
        // frame; rewind before compiling the other arm from the same
        // starting point `tryIf` in `codegen2.cpp` assumes.
        self.frame.pop_unnamed();

        self.asm.bind(on_false);
        self.compile_expr(parts[2], is_tail)?;

        self.asm.bind(done);
        Ok(())
    }

    fn compile_body(&mut self, exprs: Vec<Value>, is_tail: bool) -> Result<(), CodegenError> {
        if exprs.is_empty() {
            return self.push_const(Value::new_void());
        }
        let last = exprs.len() - 1;
        for (i, &e) in exprs.iter().enumerate() {
            if i == last {
                self.compile_expr(e, is_tail)?;
            } else {
                self.compile_expr(e, false)?;
                self.asm.add_reg_imm32(Reg::Rsp, 8);
                self.frame.pop_unnamed();
            }
        }
        Ok(())
    }

    // ---- primitive operators ------------------------------------------

    fn primitive_tag(&self, sym: Value) -> Option<Primitive> {
        let kw = self.kw;
        let r = sym.to_raw();
        let table = [
            (kw.add.to_raw(), Primitive::Add),
            (kw.sub.to_raw(), Primitive::Sub),
            (kw.lt.to_raw(), Primitive::Lt),
            (kw.cons.to_raw(), Primitive::Cons),
            (kw.car.to_raw(), Primitive::Car),
            (kw.cdr.to_raw(), Primitive::Cdr),
            (kw.pairp.to_raw(), Primitive::PairP),
            (kw.symbolp.to_raw(), Primitive::SymbolP),
            (kw.integerp.to_raw(), Primitive::IntegerP),
            (kw.procedurep.to_raw(), Primitive::ProcedureP),
            (kw.vectorp.to_raw(), Primitive::VectorP),
            (kw.truep.to_raw(), Primitive::TrueP),
            (kw.falsep.to_raw(), Primitive::FalseP),
            (kw.nullp.to_raw(), Primitive::NullP),
            (kw.trace.to_raw(), Primitive::Trace),
            (kw.error.to_raw(), Primitive::Error),
        ];
        table.into_iter().find(|(raw, _)| *raw == r).map(|(_, p)| p)
    }

    fn compile_primitive(&mut self, prim: Primitive, rest: Value, is_tail: bool) -> Result<(), CodegenError> {
        match prim {
            Primitive::Add => self.compile_arith_add(rest),
            Primitive::Sub => self.compile_arith_sub(rest),
            Primitive::Lt => self.compile_arith_lt(rest),
            Primitive::Cons => self.compile_cons(rest),
            Primitive::Car => self.compile_untagged_load("car#", rest, CAR_OFFSET),
            Primitive::Cdr => self.compile_untagged_load("cdr#", rest, CDR_OFFSET),
            Primitive::PairP => self.compile_tag_predicate("pair?#", rest, Tag::Pair),
            Primitive::SymbolP => self.compile_tag_predicate("symbol?#", rest, Tag::Symbol),
            Primitive::IntegerP => self.compile_tag_predicate("integer?#", rest, Tag::Fixnum),
            Primitive::ProcedureP => self.compile_tag_predicate("procedure?#", rest, Tag::Closure),
            Primitive::VectorP => self.compile_tag_predicate("vector?#", rest, Tag::Vector),
            Primitive::TrueP => self.compile_singleton_predicate("true?#", rest, Value::new_true()),
            Primitive::FalseP => self.compile_singleton_predicate("false?#", rest, Value::new_false()),
            Primitive::NullP => self.compile_singleton_predicate("null?#", rest, Value::new_nil()),
            Primitive::Trace => self.compile_trace(rest, is_tail),
            Primitive::Error => self.compile_error(rest),
        }
    }

    fn binary_operands(&self, form: &str, rest: Value) -> Result<Vec<Value>, CodegenError> {
        let parts = list_to_vec(rest);
        if parts.len() != 2 {
            return Err(CodegenError::MalformedForm {
                form: form.to_string(),
                detail: format!("expected 2 operands, got {}", parts.len()),
            });
        }
        Ok(parts)
    }

    fn unary_operand(&self, form: &str, rest: Value) -> Result<Value, CodegenError> {
        let parts = list_to_vec(rest);
        if parts.len() != 1 {
            return Err(CodegenError::MalformedForm {
                form: form.to_string(),
                detail: format!("expected 1 operand, got {}", parts.len()),
            });
        }
        Ok(parts[0])
    }

    fn compile_arith_add(&mut self, rest: Value) -> Result<(), CodegenError> {
        let parts = self.binary_operands("+#", rest)?;
        self.compile_expr(parts[0], false)?;
        self.compile_expr(parts[1], false)?;
        self.asm.pop(SCRATCH[0]); // b
        self.frame.pop_unnamed();
        self.asm.add_reg_mem(SCRATCH[0], Reg::Rsp, 0); // += a
        self.asm.sub_reg_imm32(SCRATCH[0], Tag::Fixnum as i32);
        self.asm.mov_mem_reg(Reg::Rsp, 0, SCRATCH[0]);
        Ok(())
    }

    fn compile_arith_sub(&mut self, rest: Value) -> Result<(), CodegenError> {
        let parts = self.binary_operands("-#", rest)?;
        self.compile_expr(parts[0], false)?;
        self.compile_expr(parts[1], false)?;
        self.asm.mov_reg_mem(SCRATCH[0], Reg::Rsp, 8); // a
        self.asm.sub_reg_mem(SCRATCH[0], Reg::Rsp, 0); // -= b
        self.asm.add_reg_imm32(SCRATCH[0], Tag::Fixnum as i32);
        self.asm.add_reg_imm32(Reg::Rsp, 8); // discard b's slot
        self.frame.pop_unnamed();
        self.asm.mov_mem_reg(Reg::Rsp, 0, SCRATCH[0]);
        Ok(())
    }

    fn compile_arith_lt(&mut self, rest: Value) -> Result<(), CodegenError> {
        let parts = self.binary_operands("<#", rest)?;
        self.compile_expr(parts[0], false)?;
        self.compile_expr(parts[1], false)?;
        self.asm.pop(SCRATCH[0]); // b
        self.frame.pop_unnamed();
        self.asm.cmp_reg_mem(SCRATCH[0], Reg::Rsp, 0); // flags = b - a
        self.asm.mov_reg_value(SCRATCH[1], Value::new_true());
        self.asm.mov_reg_value(SCRATCH[0], Value::new_false());
        self.asm.cmovg(SCRATCH[0], SCRATCH[1]); // b > a  <=>  a < b
        self.asm.mov_mem_reg(Reg::Rsp, 0, SCRATCH[0]);
        Ok(())
    }

    fn compile_cons(&mut self, rest: Value) -> Result<(), CodegenError> {
        let parts = self.binary_operands("cons#", rest)?;
        self.compile_expr(parts[0], false)?; // car
        self.compile_expr(parts[1], false)?; // cdr

        let size = align_up(HEADER_SIZE + 2 * PTR_SIZE) as i32;
        let slow = self.asm.new_label();
        let have_addr = self.asm.new_label();

        self.asm.lea(SCRATCH[0], HEAP_PTR, size);
        self.asm.cmp_reg_reg(SCRATCH[0], HEAP_LIMIT);
        self.asm.ja(slow);
        self.asm.mov_reg_reg(SCRATCH[1], HEAP_PTR); // addr = old heap_ptr
        self.asm.mov_reg_reg(HEAP_PTR, SCRATCH[0]); // bump
        self.asm.jmp(have_addr);

        self.asm.bind(slow);
        self.asm.lea(Reg::R11, Reg::Rsp, 0); // stack_ptr, before rsp moves
        self.asm.sub_reg_imm32(Reg::Rsp, 16); // out_regs scratch
        self.asm.mov_reg_reg(Reg::Rdi, THREAD_STATE);
        self.asm.mov_reg_imm64(Reg::Rsi, size as u64);
        self.asm.mov_reg_reg(Reg::Rdx, Reg::R11);
        self.asm.mov_reg_imm64(Reg::Rcx, self.frame.descriptor().to_raw());
        self.asm.mov_reg_reg(Reg::R8, HEAP_PTR);
        self.asm.lea(Reg::R9, Reg::Rsp, 0); // out_regs ptr
        self.asm.mov_reg_imm64(SCRATCH[0], sanya_runtime::ffi::sanya_alloc_slow as usize as u64);
        self.asm.call_reg(SCRATCH[0]);
        self.asm.mov_reg_reg(SCRATCH[1], Reg::Rax); // addr = returned address
        self.asm.mov_reg_mem(HEAP_PTR, Reg::Rsp, 0);
        self.asm.mov_reg_mem(HEAP_LIMIT, Reg::Rsp, 8);
        self.asm.add_reg_imm32(Reg::Rsp, 16);

        self.asm.bind(have_addr);
        self.asm.mov_reg_imm64(SCRATCH[0], (size as u64) << 32); // mark=0, size=size
        self.asm.mov_mem_reg(SCRATCH[1], 0, SCRATCH[0]);
        self.asm.mov_reg_imm64(SCRATCH[0], 0);
        self.asm.mov_mem_reg(SCRATCH[1], 8, SCRATCH[0]); // forwarding=0

        self.asm.pop(Reg::Rcx); // cdr (pushed last)
        self.frame.pop_unnamed();
        self.asm.pop(Reg::Rdx); // car
        self.frame.pop_unnamed();
        self.asm.mov_mem_reg(SCRATCH[1], CAR_OFFSET as i32, Reg::Rdx);
        self.asm.mov_mem_reg(SCRATCH[1], CDR_OFFSET as i32, Reg::Rcx);

        self.asm.lea(Reg::Rax, SCRATCH[1], Tag::Pair as i32);
        self.asm.push(Reg::Rax);
        self.frame.push_unnamed()
    }

    fn compile_untagged_load(&mut self, form: &str, rest: Value, field_offset: usize) -> Result<(), CodegenError> {
        let operand = self.unary_operand(form, rest)?;
        self.compile_expr(operand, false)?;
        self.asm.pop(SCRATCH[0]);
        self.frame.pop_unnamed();
        self.asm.mov_reg_mem(SCRATCH[0], SCRATCH[0], field_offset as i32 - Tag::Pair as i32);
        self.asm.push(SCRATCH[0]);
        self.frame.push_unnamed()
    }

    fn compile_tag_predicate(&mut self, form: &str, rest: Value, tag: Tag) -> Result<(), CodegenError> {
        let operand = self.unary_operand(form, rest)?;
        self.compile_expr(operand, false)?;
        self.asm.pop(SCRATCH[0]);
        self.frame.pop_unnamed();
        self.asm.and_reg_imm32(SCRATCH[0], sanya_value::TAG_MASK as i32);
        self.asm.cmp_reg_imm32(SCRATCH[0], tag as i32);
        self.asm.mov_reg_value(SCRATCH[1], Value::new_true());
        self.asm.mov_reg_value(SCRATCH[0], Value::new_false());
        self.asm.cmove(SCRATCH[0], SCRATCH[1]);
        self.asm.push(SCRATCH[0]);
        self.frame.push_unnamed()
    }

    fn compile_singleton_predicate(&mut self, form: &str, rest: Value, singleton: Value) -> Result<(), CodegenError> {
        let operand = self.unary_operand(form, rest)?;
        self.compile_expr(operand, false)?;
        self.asm.pop(SCRATCH[0]);
        self.frame.pop_unnamed();
        self.asm.cmp_reg_imm32(SCRATCH[0], singleton.to_raw() as i32);
        self.asm.mov_reg_value(SCRATCH[1], Value::new_true());
        self.asm.mov_reg_value(SCRATCH[0], Value::new_false());
        self.asm.cmove(SCRATCH[0], SCRATCH[1]);
        self.asm.push(SCRATCH[0]);
        self.frame.push_unnamed()
    }

    fn compile_trace(&mut self, rest: Value, is_tail: bool) -> Result<(), CodegenError> {
        let parts = self.binary_operands("trace#", rest)?;
        self.compile_expr(parts[0], false)?;
        self.asm.pop(Reg::Rsi);
        self.frame.pop_unnamed();
        self.asm.mov_reg_reg(Reg::Rdi, THREAD_STATE);
        self.asm.mov_reg_imm64(SCRATCH[0], sanya_runtime::ffi::sanya_trace_value as usize as u64);
        self.asm.call_reg(SCRATCH[0]);
        self.compile_expr(parts[1], is_tail)
    }

    fn compile_error(&mut self, rest: Value) -> Result<(), CodegenError> {
        let operand = self.unary_operand("error#", rest)?;
        self.compile_expr(operand, false)?;
        self.asm.pop(Reg::Rbx);
        self.frame.pop_unnamed();
        self.asm.lea(Reg::Rdx, Reg::Rsp, 0);
        self.asm.mov_reg_imm64(Reg::Rcx, self.frame.descriptor().to_raw());
        self.asm.mov_reg_reg(Reg::Rsi, Reg::Rbx);
        self.asm.mov_reg_reg(Reg::Rdi, THREAD_STATE);
        self.asm.mov_reg_imm64(SCRATCH[0], sanya_runtime::ffi::sanya_handle_user_error as usize as u64);
        self.asm.call_reg(SCRATCH[0]);
        // Never returns; keep the virtual stack balanced the same way a
        // tail call does, since control-flow-wise this is another dead end.
        self.frame.push_unnamed()
    }

    // ---- calls ---------------------------------------------------------

    fn compile_call(&mut self, expr: Value, is_tail: bool) -> Result<(), CodegenError> {
        let exprs = list_to_vec(expr);
        let argc = exprs.len() - 1;
        if argc > ARG_REGS.len() {
            return Err(CodegenError::TooManyArguments { argc });
        }
        let tail = is_tail && self.flags.tco;

        for (i, &e) in exprs.iter().enumerate() {
            self.compile_expr(e, false)?;
            let dst = if i == 0 { C } else { ARG_REGS[i - 1] };
            self.asm.pop(dst);
            self.frame.pop_unnamed();
        }

        let not_a_closure = self.asm.new_label();
        let arg_mismatch = self.asm.new_label();
        let done = self.asm.new_label();

        self.asm.mov_reg_reg(SCRATCH[0], C);
        self.asm.and_reg_imm32(SCRATCH[0], sanya_value::TAG_MASK as i32);
        self.asm.cmp_reg_imm32(SCRATCH[0], Tag::Closure as i32);
        self.asm.jne(not_a_closure);

        self.asm.mov_reg_mem(SCRATCH[0], C, CLOSURE_INFO_OFFSET as i32 - Tag::Closure as i32);
        self.asm.mov_reg_mem(SCRATCH[0], SCRATCH[0], FunctionInfoLayout::ARITY_OFFSET as i32);
        self.asm.cmp_reg_imm32(SCRATCH[0], argc as i32);
        self.asm.jne(arg_mismatch);

        if tail {
            self.asm.mov_reg_mem(F, Reg::Rsp, ((self.frame.depth() - 1) * 8) as i32);
        } else {
            self.asm.mov_reg_imm64(F, self.frame.descriptor().to_raw());
        }
        self.asm.mov_reg_mem(SCRATCH[0], C, CLOSURE_INFO_OFFSET as i32 - Tag::Closure as i32);
        self.asm.lea(SCRATCH[0], SCRATCH[0], FunctionInfoLayout::CODE_OFFSET as i32);

        if tail {
            self.asm.add_reg_imm32(Reg::Rsp, (self.frame.depth() * 8) as i32);
            self.asm.jmp_reg(SCRATCH[0]);
            self.frame.push_unnamed()?; // unreachable; balances bookkeeping
        } else {
            self.asm.call_reg(SCRATCH[0]);
            self.asm.push(Reg::Rax);
            self.frame.push_unnamed()?;
            self.asm.jmp(done);
        }

        self.asm.bind(not_a_closure);
        self.asm.mov_reg_reg(Reg::Rsi, C);
        self.asm.lea(Reg::Rdx, Reg::Rsp, 0);
        self.asm.mov_reg_imm64(Reg::Rcx, self.frame.descriptor().to_raw());
        self.asm.mov_reg_reg(Reg::Rdi, THREAD_STATE);
        self.asm
            .mov_reg_imm64(SCRATCH[0], sanya_runtime::ffi::sanya_handle_not_a_closure as usize as u64);
        self.asm.call_reg(SCRATCH[0]);

        self.asm.bind(arg_mismatch);
        self.asm.mov_reg_reg(Reg::Rsi, C);
        self.asm.mov_reg_imm64(Reg::Rdx, argc as u64);
        self.asm.lea(Reg::Rcx, Reg::Rsp, 0);
        self.asm.mov_reg_imm64(Reg::R8, self.frame.descriptor().to_raw());
        self.asm.mov_reg_reg(Reg::Rdi, THREAD_STATE);
        self.asm
            .mov_reg_imm64(SCRATCH[0], sanya_runtime::ffi::sanya_handle_arg_count_mismatch as usize as u64);
        self.asm.call_reg(SCRATCH[0]);

        if !tail {
            self.asm.bind(done);
        }
        Ok(())
    }
}
