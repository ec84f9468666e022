//! Semispace bump-pointer heap (§4.B).
//!
//! Grounded on `gc.cpp`'s `ThreadState::create`/`gcAllocSlow`: one
//! contiguous allocation split into two equal halves, a from-space and
//! a to-space, with allocation always bumping downward from... no --
//! upward from `heap_ptr` toward `heap_limit`, exactly like the
//! original's `heapPtr += size`.

use std::alloc::{alloc, dealloc, Layout};
use std::cell::Cell;
use std::ptr::NonNull;

use crate::layout::{align_up, HEAP_ALIGN};

/// Default size of *one* semispace half (§4.B: "Default semispace is
/// 256 KiB each half").
pub const DEFAULT_SEMISPACE_SIZE: usize = 256 * 1024;

/// The two-halves bump-pointer heap. All mutable bookkeeping lives in
/// `Cell`s: the heap is only ever touched from the single thread that
/// owns the enclosing `ThreadState` (§5), so this is plain
/// single-threaded interior mutability rather than anything lock-free.
pub struct Heap {
    base: NonNull<u8>,
    layout: Layout,
    semispace_size: usize,
    from_space: Cell<usize>,
    to_space: Cell<usize>,
    heap_ptr: Cell<usize>,
    heap_limit: Cell<usize>,
    /// Bump pointer used only while a collection is in progress.
    heap_copy_ptr: Cell<usize>,
    last_alloc_req: Cell<usize>,
}

impl Heap {
    #[must_use]
    pub fn new(semispace_size: usize) -> Heap {
        let total = semispace_size * 2;
        let layout = Layout::from_size_align(total, HEAP_ALIGN).expect("heap layout");
        let base = unsafe { NonNull::new(alloc(layout)).expect("heap allocation failed") };
        let base_addr = base.as_ptr() as usize;
        let from_space = base_addr;
        let to_space = base_addr + semispace_size;

        Heap {
            base,
            layout,
            semispace_size,
            from_space: Cell::new(from_space),
            to_space: Cell::new(to_space),
            heap_ptr: Cell::new(from_space),
            heap_limit: Cell::new(from_space + semispace_size),
            heap_copy_ptr: Cell::new(0),
            last_alloc_req: Cell::new(0),
        }
    }

    #[must_use]
    pub fn heap_ptr(&self) -> usize {
        self.heap_ptr.get()
    }

    #[must_use]
    pub fn heap_limit(&self) -> usize {
        self.heap_limit.get()
    }

    #[must_use]
    pub fn from_space(&self) -> usize {
        self.from_space.get()
    }

    #[must_use]
    pub fn to_space(&self) -> usize {
        self.to_space.get()
    }

    #[must_use]
    pub fn semispace_size(&self) -> usize {
        self.semispace_size
    }

    pub fn set_heap_ptr(&self, ptr: usize) {
        self.heap_ptr.set(ptr);
    }

    pub fn set_heap_limit(&self, limit: usize) {
        self.heap_limit.set(limit);
    }

    #[must_use]
    pub fn last_alloc_req(&self) -> usize {
        self.last_alloc_req.get()
    }

    #[must_use]
    pub fn is_in_to_space(&self, addr: usize) -> bool {
        addr >= self.to_space.get() && addr < self.to_space.get() + self.semispace_size
    }

    /// Bump-allocate `size` bytes, aligned up to [`HEAP_ALIGN`]. Returns
    /// `None` (recording `size` as `last_alloc_req`, §4.B's slow-path
    /// contract) if the request does not fit below `heap_limit`.
    pub fn try_bump(&self, size: usize) -> Option<usize> {
        let size = align_up(size);
        let ptr = self.heap_ptr.get();
        let next = ptr.checked_add(size)?;
        if next > self.heap_limit.get() {
            self.last_alloc_req.set(size);
            return None;
        }
        self.heap_ptr.set(next);
        Some(ptr)
    }

    /// Begin a collection cycle: reset the to-space copy pointer to the
    /// start of to-space (`heapCopyPtr() = heapToSpace()`).
    pub fn begin_collection(&self) {
        self.heap_copy_ptr.set(self.to_space.get());
    }

    #[must_use]
    pub fn copy_ptr(&self) -> usize {
        self.heap_copy_ptr.get()
    }

    /// Bump-allocate `size` bytes out of the in-progress to-space copy
    /// region. Infallible: to-space is always large enough to hold
    /// everything live in from-space, by construction of a semispace GC.
    pub fn bump_copy(&self, size: usize) -> usize {
        let size = align_up(size);
        let ptr = self.heap_copy_ptr.get();
        self.heap_copy_ptr.set(ptr + size);
        ptr
    }

    /// Finish a collection: swap from-/to-space, advance `heap_ptr` to
    /// the copy cursor, and reset `heap_limit`.
    pub fn finish_collection(&self) {
        let old_from = self.from_space.get();
        self.from_space.set(self.to_space.get());
        self.to_space.set(old_from);
        self.heap_ptr.set(self.heap_copy_ptr.get());
        self.heap_limit.set(self.from_space.get() + self.semispace_size);
    }

    #[must_use]
    pub fn used(&self) -> usize {
        self.semispace_size - (self.heap_limit.get() - self.heap_ptr.get())
    }
}

impl Drop for Heap {
    fn drop(&mut self) {
        unsafe { dealloc(self.base.as_ptr(), self.layout) };
    }
}
