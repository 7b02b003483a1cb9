// Original source: https://github.com/fornwall/allocation-counter
//
// Licensed under either of:
// - Apache License, Version 2.0.
// - MIT/X Consortium License
//
// Modifications:
// - Adjusted to work with the leakcensus module system
// - Records live blocks per call site instead of counting allocations
// - Tracks realloc moves and generic over the inner allocator

use std::alloc::{GlobalAlloc, Layout, System};
use std::ptr;

use crate::guard::with_active_ledger;
use crate::scope::{current_site, hook_enabled, inside_tracker, is_recording};

/// Global allocator that reports still-live blocks per call site.
///
/// Every allocation made while a [`SiteScope`](crate::SiteScope) is active on
/// the allocating thread is recorded in the active ledger under that scope's
/// site; every deallocation is offered to the ledger before the block goes
/// back to the inner allocator. Nothing is recorded while no
/// [`LeakCensus`](crate::LeakCensus) guard is active.
///
/// Enable the `leakcensus-alloc` feature to install it automatically, or
/// install it yourself:
///
/// ```rust,no_run
/// use leakcensus::LeakTracingAllocator;
///
/// #[global_allocator]
/// static GLOBAL: LeakTracingAllocator = LeakTracingAllocator::system();
/// # fn main() {}
/// ```
pub struct LeakTracingAllocator<A = System> {
    inner: A,
}

impl LeakTracingAllocator<System> {
    pub const fn system() -> Self {
        Self { inner: System }
    }
}

impl<A> LeakTracingAllocator<A> {
    pub const fn new(inner: A) -> Self {
        Self { inner }
    }
}

#[inline]
fn track_alloc(ptr: *mut u8) {
    if ptr.is_null() || !is_recording() {
        return;
    }

    let Some(site) = current_site() else {
        return;
    };

    inside_tracker(|| with_active_ledger(|ledger| ledger.record(ptr as usize, site)));
}

// Runs inside `untracked` too: a recorded block is released wherever it dies.
#[inline]
fn track_dealloc(ptr: *mut u8) {
    if !hook_enabled() {
        return;
    }

    inside_tracker(|| with_active_ledger(|ledger| ledger.release(ptr as usize)));
}

#[inline]
fn is_tracked(ptr: *mut u8) -> bool {
    hook_enabled()
        && inside_tracker(|| with_active_ledger(|ledger| ledger.is_live(ptr as usize)))
            .unwrap_or(false)
}

unsafe impl<A: GlobalAlloc> GlobalAlloc for LeakTracingAllocator<A> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { self.inner.alloc(layout) };
        track_alloc(ptr);
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { self.inner.alloc_zeroed(layout) };
        track_alloc(ptr);
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        track_dealloc(ptr);

        unsafe {
            self.inner.dealloc(ptr, layout);
        }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if !is_tracked(ptr) {
            return unsafe { self.inner.realloc(ptr, layout, new_size) };
        }

        // Tracked blocks never use the inner in-place realloc: it frees the old
        // address before the record could move, and another thread may be
        // handed that address in between. Untracked blocks keep the fast path.
        let new_layout = unsafe { Layout::from_size_align_unchecked(new_size, layout.align()) };
        let new_ptr = unsafe { self.inner.alloc(new_layout) };
        if new_ptr.is_null() {
            return new_ptr;
        }

        unsafe {
            ptr::copy_nonoverlapping(ptr, new_ptr, layout.size().min(new_size));
        }
        inside_tracker(|| {
            with_active_ledger(|ledger| ledger.relocate(ptr as usize, new_ptr as usize))
        });

        unsafe {
            self.inner.dealloc(ptr, layout);
        }
        new_ptr
    }
}
