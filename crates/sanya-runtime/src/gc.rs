//! Thread state and the copying collector itself (§4.B, §4.C).
//!
//! Grounded on `gc.cpp`'s `ThreadState::create`/`gcAllocSlow`/
//! `gcScavenge`/`gcCollect`/`gcScavengeSchemeStack`. The single-thread
//! model of §5 means every mutable field below only ever needs
//! `Cell`-style interior mutability, never a lock.

use std::cell::Cell;

use log::{debug, info};
use once_cell::sync::OnceCell;
use sanya_value::{Tag, Value};

use crate::frame::FrameDescr;
use crate::function_info::FunctionInfo;
use crate::handle::{Handle, HandleList};
use crate::heap::Heap;
use crate::layout::{
    CAR_OFFSET, CDR_OFFSET, CLOSURE_INFO_OFFSET, CLOSURE_PAYLOAD_OFFSET, GcHeader, PTR_SIZE,
    VECTOR_ELEM_OFFSET, VECTOR_SIZE_OFFSET,
};

/// Process-global thread state (§5, §9 "Global mutable state"). A
/// single `ThreadState` is created for the life of the process; this
/// mirrors the original's `ThreadState::global_` static while keeping
/// construction explicit rather than reaching for a raw global.
static GLOBAL: OnceCell<ThreadState> = OnceCell::new();

pub struct ThreadState {
    pub heap: Heap,
    pub handles: HandleList,
    symbol_intern_table: Cell<Value>,
    globals_assoc: Cell<Value>,
    globals_array: Cell<Value>,
    last_frame_descr: Cell<FrameDescr>,
    first_stack_ptr: Cell<usize>,
    last_stack_ptr: Cell<usize>,
}

impl ThreadState {
    #[must_use]
    pub fn new(semispace_size: usize) -> ThreadState {
        let heap = Heap::new(semispace_size);
        let handles = HandleList::new();
        let ts = ThreadState {
            heap,
            handles,
            symbol_intern_table: Cell::new(Value::new_nil()),
            globals_assoc: Cell::new(Value::new_nil()),
            globals_array: Cell::new(Value::new_nil()),
            last_frame_descr: Cell::new(FrameDescr::EMPTY),
            first_stack_ptr: Cell::new(0),
            last_stack_ptr: Cell::new(0),
        };
        // The intern table and the global table's growable array are
        // themselves managed values; they can only be allocated once
        // `ts` exists to allocate against.
        ts.symbol_intern_table.set(Value::new_nil());
        ts.globals_array.set(crate::globals::new_growable_array(&ts));
        ts
    }

    /// Initialize and install the process-global thread state. Panics
    /// if called more than once.
    pub fn init_global(semispace_size: usize) -> &'static ThreadState {
        GLOBAL
            .set(ThreadState::new(semispace_size))
            .unwrap_or_else(|_| panic!("thread state already initialized"));
        GLOBAL.get().unwrap()
    }

    /// # Panics
    /// If [`Self::init_global`] has not run yet.
    #[must_use]
    pub fn global() -> &'static ThreadState {
        GLOBAL.get().expect("thread state not initialized")
    }

    #[must_use]
    pub fn heap_ptr(&self) -> usize {
        self.heap.heap_ptr()
    }

    #[must_use]
    pub fn heap_limit(&self) -> usize {
        self.heap.heap_limit()
    }

    pub fn sync_heap_registers(&self, heap_ptr: usize, heap_limit: usize) {
        self.heap.set_heap_ptr(heap_ptr);
        self.heap.set_heap_limit(heap_limit);
    }

    #[must_use]
    pub fn symbol_intern_table(&self) -> Value {
        self.symbol_intern_table.get()
    }

    pub fn set_symbol_intern_table(&self, v: Value) {
        self.symbol_intern_table.set(v);
    }

    #[must_use]
    pub fn globals_assoc(&self) -> Value {
        self.globals_assoc.get()
    }

    pub fn set_globals_assoc(&self, v: Value) {
        self.globals_assoc.set(v);
    }

    #[must_use]
    pub fn globals_array(&self) -> Value {
        self.globals_array.get()
    }

    pub fn set_globals_array(&self, v: Value) {
        self.globals_array.set(v);
    }

    #[must_use]
    pub fn last_frame_descr(&self) -> FrameDescr {
        self.last_frame_descr.get()
    }

    pub fn set_last_frame_descr(&self, fd: FrameDescr) {
        self.last_frame_descr.set(fd);
    }

    #[must_use]
    pub fn first_stack_ptr(&self) -> usize {
        self.first_stack_ptr.get()
    }

    pub fn set_first_stack_ptr(&self, ptr: usize) {
        self.first_stack_ptr.set(ptr);
    }

    #[must_use]
    pub fn last_stack_ptr(&self) -> usize {
        self.last_stack_ptr.get()
    }

    pub fn set_last_stack_ptr(&self, ptr: usize) {
        self.last_stack_ptr.set(ptr);
    }

    pub fn new_handle(&self, value: Value) -> Handle<'_> {
        Handle::new(&self.handles, value)
    }

    /// Bump-allocate `size` bytes (header included), running a
    /// collection and retrying once on exhaustion (§4.B). Aborts the
    /// process with a diagnostic if the heap is still too small after
    /// collecting, matching §4.C's "if the just-requested allocation
    /// still will not fit, abort with a fatal message".
    pub fn alloc(&self, size: usize) -> usize {
        if let Some(addr) = self.heap.try_bump(size) {
            return addr;
        }
        self.collect();
        self.heap.try_bump(size).unwrap_or_else(|| {
            eprintln!(
                "sanya: heap exhausted after collection (requested {} bytes, {} available)",
                self.heap.last_alloc_req(),
                self.heap.heap_limit() - self.heap.heap_ptr()
            );
            std::process::exit(1);
        })
    }

    /// Run one full Cheney-style collection cycle (§4.C).
    pub fn collect(&self) {
        debug!("gc: collection starting");
        self.heap.begin_collection();

        self.handles.for_each_mut(|v| self.scavenge(v));

        self.scavenge_scheme_stack();

        let table = self.scavenge(self.symbol_intern_table.get());
        self.symbol_intern_table.set(table);

        let assoc = self.scavenge(self.globals_assoc.get());
        self.globals_assoc.set(assoc);
        let array = self.scavenge(self.globals_array.get());
        self.globals_array.set(array);

        self.heap.finish_collection();

        info!(
            "[gcCollect] ({}/{})",
            self.heap.used(),
            self.heap.semispace_size()
        );
    }

    /// Scavenge one pointer-holding location `L` (§4.C "Scavenge of
    /// one pointer location L"). Returns the (possibly relocated)
    /// value that should replace whatever `L` used to hold.
    fn scavenge(&self, v: Value) -> Value {
        if !v.is_heap_allocated() {
            return v;
        }
        let tag = v.tag().expect("heap-allocated value must carry a tag");
        let addr = v.raw();
        let header = unsafe { GcHeader::read(addr) };

        if header.is_copied() {
            return Value::tag_pointer(header.forwarding as usize, tag);
        }
        if self.heap.is_in_to_space(addr) {
            return v;
        }

        let new_addr = self.heap.bump_copy(header.size as usize);
        unsafe {
            std::ptr::copy_nonoverlapping(
                addr as *const u8,
                new_addr as *mut u8,
                header.size as usize,
            );
            let mut fresh = GcHeader::read(new_addr);
            fresh.mark = 0;
            GcHeader::write(new_addr, &fresh);
        }

        let mut old_header = header;
        old_header.set_copied(new_addr as u64);
        unsafe { GcHeader::write(addr, &old_header) };

        let new_value = Value::tag_pointer(new_addr, tag);
        self.scavenge_interior(tag, new_value);
        new_value
    }

    /// Scavenge an already-relocated object's interior pointers,
    /// dispatched per tag exactly as §4.C's "Interior scavenging per
    /// tag" table specifies.
    fn scavenge_interior(&self, tag: Tag, v: Value) {
        match tag {
            Tag::Pair => {
                let addr = v.raw();
                unsafe {
                    self.scavenge_at((addr + CAR_OFFSET) as *mut usize);
                    self.scavenge_at((addr + CDR_OFFSET) as *mut usize);
                }
            }
            Tag::Vector => {
                let addr = v.raw();
                let len = unsafe {
                    std::ptr::read_unaligned((addr + VECTOR_SIZE_OFFSET) as *const i64)
                };
                for i in 0..len {
                    let slot = addr + VECTOR_ELEM_OFFSET + (i as usize) * PTR_SIZE;
                    unsafe { self.scavenge_at(slot as *mut usize) };
                }
            }
            Tag::Closure => {
                let addr = v.raw();
                let info_addr = unsafe {
                    std::ptr::read_unaligned((addr + CLOSURE_INFO_OFFSET) as *const usize)
                };
                if info_addr == 0 {
                    // Not-yet-compiled supercombinator: legal, nothing to scavenge.
                    return;
                }
                let info = unsafe { FunctionInfo::at(info_addr) };
                for i in 0..info.num_payload() {
                    let slot = addr + CLOSURE_PAYLOAD_OFFSET + (i as usize) * PTR_SIZE;
                    unsafe { self.scavenge_at(slot as *mut usize) };
                }

                let new_name = self.scavenge(info.name());
                info.set_name(new_name);
                let new_offsets = self.scavenge(info.const_offsets());
                info.set_const_offsets(new_offsets);

                if new_offsets.is_vector() {
                    let count = crate::object::vector_size(new_offsets);
                    for i in 0..count {
                        let offset = crate::object::vector_get(new_offsets, i).from_fixnum();
                        unsafe {
                            let patched = self.scavenge(info.read_const_at(offset));
                            info.patch_const_at(offset, patched);
                        }
                    }
                }
            }
            Tag::Symbol | Tag::Singleton | Tag::Fixnum | Tag::ForeignPtr => {}
        }
    }

    /// # Safety
    /// `loc` must point at a valid, in-bounds, word-sized slot.
    unsafe fn scavenge_at(&self, loc: *mut usize) {
        let v = Value::from_raw(std::ptr::read_unaligned(loc));
        let new_v = self.scavenge(v);
        std::ptr::write_unaligned(loc, new_v.to_raw());
    }

    /// Walk the native call stack via frame descriptors (§4.C
    /// "Scheme-stack walking"), scavenging every slot each descriptor
    /// marks as holding a managed pointer.
    fn scavenge_scheme_stack(&self) {
        let stack_top = self.first_stack_ptr.get();
        let mut stack_ptr = self.last_stack_ptr.get();
        if stack_ptr == stack_top {
            return;
        }

        let mut fd = self.last_frame_descr.get();
        loop {
            for i in 0..fd.frame_size() {
                if fd.is_ptr(i) {
                    let loc = (stack_ptr + i * PTR_SIZE) as *mut usize;
                    unsafe { self.scavenge_at(loc) };
                }
            }

            stack_ptr += (1 + fd.frame_size()) * PTR_SIZE;
            if stack_ptr == stack_top {
                break;
            }
            debug_assert!(stack_ptr < stack_top, "frame walk ran past firstStackPtr");
            fd = unsafe {
                FrameDescr::from_raw(std::ptr::read_unaligned((stack_ptr - 16) as *const u64))
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::DEFAULT_SEMISPACE_SIZE;
    use crate::object::{alloc_pair, pair_car, pair_cdr};

    #[test]
    fn handles_survive_a_forced_collection() {
        let ts = ThreadState::new(DEFAULT_SEMISPACE_SIZE);
        let pair = alloc_pair(&ts, Value::new_fixnum(1), Value::new_fixnum(2));
        let handle = ts.new_handle(pair);

        ts.collect();

        let relocated = handle.get();
        assert!(relocated.is_pair());
        assert_eq!(pair_car(relocated).from_fixnum(), 1);
        assert_eq!(pair_cdr(relocated).from_fixnum(), 2);
    }

    #[test]
    fn many_small_allocations_survive_repeated_collections() {
        let ts = ThreadState::new(64 * 1024);
        let mut list = Value::new_nil();
        let handle = ts.new_handle(list);
        for i in 0..200_000i64 {
            let extended = alloc_pair(&ts, Value::new_fixnum(i), handle.get());
            handle.set(extended);
        }
        list = handle.get();

        let mut count = 0i64;
        let mut iter = list;
        while !iter.is_nil() {
            count += 1;
            iter = pair_cdr(iter);
        }
        assert_eq!(count, 200_000);
    }
}
