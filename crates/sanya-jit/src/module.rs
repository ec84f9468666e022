//! Module-level orchestration: registering every top-level `define`
//! before compiling any body (§4.D, §4.E "a `CGFunction` is created and
//! registered ... After every function is registered, each `CGFunction`
//! emits its body").
//!
//! Grounded on `codegen2.cpp`'s `CGModule::genModule`: a first pass that
//! walks every top-level form, interning its name and installing an
//! empty, not-yet-compiled closure into the global table, followed by
//! exactly one call to trim the growable global array down to its final
//! vector, followed by a second pass that compiles each body against
//! that now-immutable vector's address.

use sanya_runtime::gc::ThreadState;
use sanya_runtime::globals::GlobalTable;
use sanya_runtime::object::{
    alloc_uncompiled_closure, alloc_vector, closure_set_info_addr, pair_car, pair_cdr, vector_set,
};
use sanya_runtime::symbol::intern_symbol;
use sanya_value::Value;

use crate::buffer::CodeBuffer;
use crate::error::CodegenError;
use crate::flags::CodegenFlags;
use crate::function::compile_function;
use crate::reg::ARG_REGS;

/// Interned symbols the code generator dispatches on, collected once up
/// front so every later comparison is a pointer comparison (§4.A).
pub(crate) struct Keywords {
    pub define: Value,
    pub lambda: Value,
    pub quote: Value,
    pub if_: Value,
    pub begin: Value,
    pub trace: Value,
    pub error: Value,
    pub add: Value,
    pub sub: Value,
    pub lt: Value,
    pub cons: Value,
    pub car: Value,
    pub cdr: Value,
    pub pairp: Value,
    pub symbolp: Value,
    pub integerp: Value,
    pub procedurep: Value,
    pub vectorp: Value,
    pub truep: Value,
    pub falsep: Value,
    pub nullp: Value,
    pub main: Value,
}

impl Keywords {
    fn new(ts: &ThreadState) -> Keywords {
        let sym = |s: &str| intern_symbol(ts, s.as_bytes());
        Keywords {
            define: sym("define"),
            lambda: sym("lambda"),
            quote: sym("quote"),
            if_: sym("if"),
            begin: sym("begin"),
            trace: sym("trace#"),
            error: sym("error#"),
            add: sym("+#"),
            sub: sym("-#"),
            lt: sym("<#"),
            cons: sym("cons#"),
            car: sym("car#"),
            cdr: sym("cdr#"),
            pairp: sym("pair?#"),
            symbolp: sym("symbol?#"),
            integerp: sym("integer?#"),
            procedurep: sym("procedure?#"),
            vectorp: sym("vector?#"),
            truep: sym("true?#"),
            falsep: sym("false?#"),
            nullp: sym("null?#"),
            main: sym("main"),
        }
    }
}

/// One `(define name (lambda (params…) body…))` form, registered but
/// not yet compiled.
pub(crate) struct FunctionDef {
    pub name: Value,
    pub params: Vec<Value>,
    pub body: Vec<Value>,
    pub closure: Value,
}

/// Walk a Sanya list into a Rust `Vec`, stopping at the first non-pair
/// (ordinarily `nil`, but a dotted tail is simply dropped the same way
/// the original's `forEachListItem` ignores it).
pub(crate) fn list_to_vec(mut v: Value) -> Vec<Value> {
    let mut out = Vec::new();
    while v.is_pair() {
        out.push(pair_car(v));
        v = pair_cdr(v);
    }
    out
}

fn malformed(form: &str, detail: impl Into<String>) -> CodegenError {
    CodegenError::MalformedForm { form: form.to_string(), detail: detail.into() }
}

fn register_define(ts: &ThreadState, kw: &Keywords, form: Value) -> Result<FunctionDef, CodegenError> {
    let parts = list_to_vec(form);
    if parts.len() != 3 || parts[0].to_raw() != kw.define.to_raw() {
        return Err(malformed("define", "expected (define name (lambda (params…) body…))"));
    }
    let name = parts[1];
    if !name.is_symbol() {
        return Err(malformed("define", "the name in a define must be a symbol"));
    }

    let lambda_parts = list_to_vec(parts[2]);
    if lambda_parts.len() < 3 || lambda_parts[0].to_raw() != kw.lambda.to_raw() {
        return Err(malformed("define", "expected a (lambda (params…) body…) form"));
    }
    let params = list_to_vec(lambda_parts[1]);
    if params.len() > ARG_REGS.len() {
        return Err(CodegenError::ArityTooLarge {
            name: String::from_utf8_lossy(sanya_runtime::object::symbol_bytes(name)).into_owned(),
            arity: params.len(),
        });
    }
    if name.to_raw() == kw.main.to_raw() && !params.is_empty() {
        return Err(CodegenError::MainTakesArguments);
    }
    let body = lambda_parts[2..].to_vec();

    let closure = alloc_uncompiled_closure(ts, 0);
    GlobalTable::add_name(ts, name, closure);

    Ok(FunctionDef { name, params, body, closure })
}

fn build_offsets_vector(ts: &ThreadState, offsets: &[i64]) -> Value {
    let vec = alloc_vector(ts, offsets.len() as i64, Value::new_fixnum(0));
    for (i, &off) in offsets.iter().enumerate() {
        vector_set(vec, i as i64, Value::new_fixnum(off));
    }
    vec
}

/// Compile every top-level `define` in `program` and return `main`'s
/// closure, ready for [`sanya_runtime::trampoline::call_main`].
pub fn compile_program(ts: &ThreadState, flags: CodegenFlags, program: Value) -> Result<Value, CodegenError> {
    let kw = Keywords::new(ts);
    let forms = list_to_vec(program);

    let mut defs = Vec::with_capacity(forms.len());
    for form in forms {
        defs.push(register_define(ts, &kw, form)?);
    }

    // Every name is registered; the global vector's address is now
    // stable and safe to bake into machine code as a constant (§4.D).
    let globals_vec = GlobalTable::trim_to_vector(ts);

    for def in &defs {
        let (code, const_offsets) = compile_function(ts, &kw, flags, def, globals_vec)?;
        let const_offsets_vec = build_offsets_vector(ts, &const_offsets);
        let buf = CodeBuffer::finalize(def.params.len() as i64, def.name, const_offsets_vec, 0, &code)?;
        // The allocation backing a compiled function's code never moves
        // and is never freed for the life of the process (buffer.rs);
        // leaking the handle here is how that lifetime is expressed.
        let buf: &'static CodeBuffer = Box::leak(Box::new(buf));
        closure_set_info_addr(def.closure, buf.base());
    }

    let main_ix = GlobalTable::lookup_name(ts, kw.main).ok_or(CodegenError::MissingMain)?;
    Ok(GlobalTable::get_slot(ts, main_ix))
}
