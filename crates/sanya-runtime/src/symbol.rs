//! Symbol interning (§4.A, §8 "Intern table").
//!
//! Grounded on `util.cpp`'s `newAssocList`/`assocLookup`/`assocInsert`:
//! the intern table is itself an ordinary managed list (a chain of
//! pairs used as a set), so the collector scavenges it as a root
//! exactly like any other value the thread state holds directly.

use sanya_value::Value;

use crate::gc::ThreadState;
use crate::object::{alloc_pair, alloc_symbol_from_bytes, pair_car, pair_cdr, symbol_bytes};

/// Intern `bytes`, returning the single canonical `Tag::Symbol` value
/// for that byte string (§4.A: "`internSymbol(s)` returns the single
/// canonical instance for a byte-equal name").
pub fn intern_symbol(ts: &ThreadState, bytes: &[u8]) -> Value {
    let mut iter = ts.symbol_intern_table();
    while !iter.is_nil() {
        let candidate = pair_car(iter);
        if symbol_bytes(candidate) == bytes {
            return candidate;
        }
        iter = pair_cdr(iter);
    }

    let fresh = ts.new_handle(alloc_symbol_from_bytes(ts, bytes));
    let updated = alloc_pair(ts, fresh.get(), ts.symbol_intern_table());
    ts.set_symbol_intern_table(updated);
    fresh.get()
}

/// A symbol created directly from bytes without going through the
/// intern table. Per §4.A, uninterned symbols compare by content, not
/// pointer identity -- the code generator never produces these, but
/// the frontend's `(quote some-uninterned-name)` path could.
pub fn new_uninterned_symbol(ts: &ThreadState, bytes: &[u8]) -> Value {
    alloc_symbol_from_bytes(ts, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::DEFAULT_SEMISPACE_SIZE;

    #[test]
    fn byte_equal_names_intern_to_the_same_pointer() {
        let ts = ThreadState::new(DEFAULT_SEMISPACE_SIZE);
        let a = intern_symbol(&ts, b"hello");
        let b = intern_symbol(&ts, b"hello");
        assert_eq!(a.to_raw(), b.to_raw());
    }

    #[test]
    fn distinct_names_intern_to_distinct_pointers() {
        let ts = ThreadState::new(DEFAULT_SEMISPACE_SIZE);
        let a = intern_symbol(&ts, b"hello");
        let b = intern_symbol(&ts, b"world");
        assert_ne!(a.to_raw(), b.to_raw());
    }
}
