//! Raw field access and construction for heap-allocated cells (pairs,
//! symbols, closures, vectors), grounded on `object.hpp`'s `RawObject`
//! accessor table and `Object::new*` constructors.
//!
//! Every function here that *allocates* goes through
//! [`crate::gc::ThreadState::alloc`], which transparently triggers a
//! collection and retries once on exhaustion (§4.B).

use sanya_value::{Tag, Value};

use crate::function_info::FunctionInfo;
use crate::gc::ThreadState;
use crate::layout::{
    align_up, CAR_OFFSET, CDR_OFFSET, CLOSURE_INFO_OFFSET, CLOSURE_PAYLOAD_OFFSET, GcHeader,
    HEADER_SIZE, PTR_SIZE, VECTOR_ELEM_OFFSET, VECTOR_SIZE_OFFSET,
};

// ---- Pair ------------------------------------------------------------

#[must_use]
pub fn pair_car(v: Value) -> Value {
    debug_assert!(v.is_pair());
    unsafe { Value::from_raw(std::ptr::read_unaligned((v.raw() + CAR_OFFSET) as *const usize)) }
}

#[must_use]
pub fn pair_cdr(v: Value) -> Value {
    debug_assert!(v.is_pair());
    unsafe { Value::from_raw(std::ptr::read_unaligned((v.raw() + CDR_OFFSET) as *const usize)) }
}

pub fn pair_set_car(v: Value, new_car: Value) {
    debug_assert!(v.is_pair());
    unsafe { std::ptr::write_unaligned((v.raw() + CAR_OFFSET) as *mut usize, new_car.to_raw()) };
}

pub fn pair_set_cdr(v: Value, new_cdr: Value) {
    debug_assert!(v.is_pair());
    unsafe { std::ptr::write_unaligned((v.raw() + CDR_OFFSET) as *mut usize, new_cdr.to_raw()) };
}

pub fn alloc_pair(ts: &ThreadState, car: Value, cdr: Value) -> Value {
    let size = align_up(HEADER_SIZE + 2 * PTR_SIZE);
    let addr = ts.alloc(size);
    unsafe {
        GcHeader::write(addr, &GcHeader::fresh(size as u32));
        std::ptr::write_unaligned((addr + CAR_OFFSET) as *mut usize, car.to_raw());
        std::ptr::write_unaligned((addr + CDR_OFFSET) as *mut usize, cdr.to_raw());
    }
    Value::tag_pointer(addr, Tag::Pair)
}

// ---- Vector -----------------------------------------------------------

#[must_use]
pub fn vector_size(v: Value) -> i64 {
    debug_assert!(v.is_vector());
    unsafe { std::ptr::read_unaligned((v.raw() + VECTOR_SIZE_OFFSET) as *const i64) }
}

#[must_use]
pub fn vector_get(v: Value, index: i64) -> Value {
    debug_assert!(v.is_vector());
    debug_assert!(index >= 0 && index < vector_size(v));
    let addr = v.raw() + VECTOR_ELEM_OFFSET + (index as usize) * PTR_SIZE;
    unsafe { Value::from_raw(std::ptr::read_unaligned(addr as *const usize)) }
}

pub fn vector_set(v: Value, index: i64, value: Value) {
    debug_assert!(v.is_vector());
    debug_assert!(index >= 0 && index < vector_size(v));
    let addr = v.raw() + VECTOR_ELEM_OFFSET + (index as usize) * PTR_SIZE;
    unsafe { std::ptr::write_unaligned(addr as *mut usize, value.to_raw()) };
}

pub fn alloc_vector(ts: &ThreadState, len: i64, fill: Value) -> Value {
    debug_assert!(len >= 0);
    let size = align_up(HEADER_SIZE + PTR_SIZE + (len as usize) * PTR_SIZE);
    let addr = ts.alloc(size);
    unsafe {
        GcHeader::write(addr, &GcHeader::fresh(size as u32));
        std::ptr::write_unaligned((addr + VECTOR_SIZE_OFFSET) as *mut i64, len);
    }
    let v = Value::tag_pointer(addr, Tag::Vector);
    for i in 0..len {
        vector_set(v, i, fill);
    }
    v
}

// ---- Symbol -------------------------------------------------------------

/// Read a symbol's NUL-terminated byte payload. `v` must be a live
/// `Tag::Symbol` value.
#[must_use]
pub fn symbol_bytes(v: Value) -> &'static [u8] {
    debug_assert!(v.is_symbol());
    unsafe {
        let ptr = v.raw_symbol() as *const u8;
        let mut len = 0usize;
        while *ptr.add(len) != 0 {
            len += 1;
        }
        std::slice::from_raw_parts(ptr, len)
    }
}

pub fn alloc_symbol_from_bytes(ts: &ThreadState, bytes: &[u8]) -> Value {
    let payload = bytes.len() + 1; // NUL terminator
    let size = align_up(HEADER_SIZE + payload);
    let addr = ts.alloc(size);
    unsafe {
        GcHeader::write(addr, &GcHeader::fresh(size as u32));
        let dst = (addr + HEADER_SIZE) as *mut u8;
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), dst, bytes.len());
        *dst.add(bytes.len()) = 0;
    }
    Value::tag_pointer(addr, Tag::Symbol)
}

// ---- Closure ------------------------------------------------------------

/// Raw address of the closure's info block, or `0` if it has not been
/// compiled yet (legal per §4.C: "A null info pointer on a closure is
/// legal ... and is skipped").
#[must_use]
pub fn closure_info_addr(v: Value) -> usize {
    debug_assert!(v.is_closure());
    unsafe { std::ptr::read_unaligned((v.raw() + CLOSURE_INFO_OFFSET) as *const usize) }
}

#[must_use]
pub fn closure_info(v: Value) -> Option<FunctionInfo> {
    let addr = closure_info_addr(v);
    if addr == 0 {
        None
    } else {
        Some(unsafe { FunctionInfo::at(addr) })
    }
}

pub fn closure_set_info_addr(v: Value, addr: usize) {
    debug_assert!(v.is_closure());
    unsafe { std::ptr::write_unaligned((v.raw() + CLOSURE_INFO_OFFSET) as *mut usize, addr) };
}

#[must_use]
pub fn closure_payload(v: Value, index: i64) -> Value {
    debug_assert!(v.is_closure());
    let addr = v.raw() + CLOSURE_PAYLOAD_OFFSET + (index as usize) * PTR_SIZE;
    unsafe { Value::from_raw(std::ptr::read_unaligned(addr as *const usize)) }
}

pub fn closure_set_payload(v: Value, index: i64, value: Value) {
    debug_assert!(v.is_closure());
    let addr = v.raw() + CLOSURE_PAYLOAD_OFFSET + (index as usize) * PTR_SIZE;
    unsafe { std::ptr::write_unaligned(addr as *mut usize, value.to_raw()) };
}

/// Allocate a fresh closure cell with `num_payload` empty slots and an
/// info pointer of `0` (not-yet-compiled). The module-scope global
/// table (§4.D) inserts these before any function body is compiled, so
/// that forward references resolve to a real (if still-uncompiled)
/// closure.
pub fn alloc_uncompiled_closure(ts: &ThreadState, num_payload: i64) -> Value {
    debug_assert!(num_payload >= 0);
    let size = align_up(HEADER_SIZE + PTR_SIZE + (num_payload as usize) * PTR_SIZE);
    let addr = ts.alloc(size);
    unsafe {
        GcHeader::write(addr, &GcHeader::fresh(size as u32));
        std::ptr::write_unaligned((addr + CLOSURE_INFO_OFFSET) as *mut usize, 0usize);
    }
    let v = Value::tag_pointer(addr, Tag::Closure);
    for i in 0..num_payload {
        closure_set_payload(v, i, Value::new_nil());
    }
    v
}
