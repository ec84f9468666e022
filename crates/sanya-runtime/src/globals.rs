//! Module-scope global table (§4.D).
//!
//! Grounded on `codegen2.hpp`'s `Module` class and `util.cpp`'s
//! `newGrowableArray`/`arrayAppend`/`arrayToVector`: an association
//! list (`name -> index`) paired with a growable array (a managed
//! `(vector . count)` pair that doubles its backing vector on
//! overflow), trimmed down to an exact-size vector exactly once, after
//! every top-level name has been registered and before any function
//! body is compiled.

use sanya_value::Value;

use crate::gc::ThreadState;
use crate::object::{alloc_pair, alloc_vector, pair_car, pair_cdr, vector_get, vector_set};

fn array_vector(arr: Value) -> Value {
    pair_car(arr)
}

fn array_len(arr: Value) -> i64 {
    pair_cdr(arr).from_fixnum()
}

pub(crate) fn new_growable_array(ts: &ThreadState) -> Value {
    let vec = alloc_vector(ts, 0, Value::new_nil());
    alloc_pair(ts, vec, Value::new_fixnum(0))
}

fn array_append(ts: &ThreadState, arr: Value, item: Value) -> Value {
    let vec = array_vector(arr);
    let size = crate::object::vector_size(vec);
    let next_ix = array_len(arr);
    if next_ix < size {
        vector_set(vec, next_ix, item);
        alloc_pair(ts, vec, Value::new_fixnum(next_ix + 1))
    } else {
        // `vec` and `item` must survive the allocation below (I3); a
        // collection here would otherwise leave both pointing at
        // relocated-away from-space memory before the copy loop runs.
        let old_vec = ts.new_handle(vec);
        let item = ts.new_handle(item);
        let new_size = size * 2 + 1;
        let new_vec = ts.new_handle(alloc_vector(ts, new_size, Value::new_nil()));
        for i in 0..size {
            vector_set(new_vec.get(), i, vector_get(old_vec.get(), i));
        }
        let grown = alloc_pair(ts, new_vec.get(), Value::new_fixnum(next_ix));
        array_append(ts, grown, item.get())
    }
}

/// The two-part module global table. All state lives on the
/// [`ThreadState`] it's constructed with, so that both halves are
/// ordinary GC roots scavenged the same way the symbol intern table is.
pub struct GlobalTable;

impl GlobalTable {
    /// Register `name -> value`. If `name` is already registered,
    /// overwrites its slot in place and returns the existing index;
    /// otherwise appends a new slot and returns its fresh index.
    pub fn add_name(ts: &ThreadState, name: Value, value: Value) -> i64 {
        if let Some(ix) = Self::lookup_name(ts, name) {
            let arr = ts.globals_array();
            vector_set(array_vector(arr), ix, value);
            return ix;
        }

        // `name` and the old `globals_assoc` have no other root until
        // they are woven into the new assoc list below; protect them
        // across the intervening allocations in `array_append` (I3).
        let name = ts.new_handle(name);
        let assoc = ts.new_handle(ts.globals_assoc());
        let arr = ts.globals_array();
        let ix = array_len(arr);
        let grown = array_append(ts, arr, value);
        ts.set_globals_array(grown);

        let entry = alloc_pair(ts, name.get(), Value::new_fixnum(ix));
        let new_assoc = alloc_pair(ts, entry, assoc.get());
        ts.set_globals_assoc(new_assoc);
        ix
    }

    /// Returns the slot index for `name`, or `None` (the original's
    /// `-1`) if it has never been registered.
    #[must_use]
    pub fn lookup_name(ts: &ThreadState, name: Value) -> Option<i64> {
        let mut iter = ts.globals_assoc();
        while !iter.is_nil() {
            let entry = pair_car(iter);
            // The code generator always interns, so global names
            // compare by symbol pointer identity (§4.A).
            if pair_car(entry).to_raw() == name.to_raw() {
                return Some(pair_cdr(entry).from_fixnum());
            }
            iter = pair_cdr(iter);
        }
        None
    }

    #[must_use]
    pub fn get_slot(ts: &ThreadState, index: i64) -> Value {
        vector_get(array_vector(ts.globals_array()), index)
    }

    pub fn set_slot(ts: &ThreadState, index: i64, value: Value) {
        vector_set(array_vector(ts.globals_array()), index, value);
    }

    /// Trim the growable array down to an exact-size vector
    /// (`Module::getRoot()`). The code generator calls this exactly
    /// once, after every top-level `define` has been registered and
    /// before any function body is compiled, then bakes the resulting
    /// vector's address into every function as a relocation-tracked
    /// immediate.
    #[must_use]
    pub fn trim_to_vector(ts: &ThreadState) -> Value {
        let arr = ts.globals_array();
        let len = array_len(arr);
        let trimmed = alloc_vector(ts, len, Value::new_nil());
        let vec = array_vector(arr);
        for i in 0..len {
            vector_set(trimmed, i, vector_get(vec, i));
        }
        trimmed
    }
}
