use std::alloc::{GlobalAlloc, Layout, System};
use std::ptr::NonNull;
use std::sync::Arc;

use super::{AllocError, SiteAllocator};
use crate::{AllocationLedger, Site};

/// [`SiteAllocator`] that records every block in an injected ledger.
///
/// ```rust
/// use leakcensus::{AllocationLedger, SiteAllocator, TrackedAllocator};
/// use std::alloc::Layout;
/// use std::sync::Arc;
///
/// let ledger = Arc::new(AllocationLedger::new());
/// let allocator = TrackedAllocator::system(Arc::clone(&ledger));
///
/// let layout = Layout::new::<[u64; 4]>();
/// let block = allocator.allocate_here(layout).unwrap();
/// assert_eq!(ledger.live_count(), 1);
///
/// unsafe { allocator.deallocate(block, layout) };
/// assert!(ledger.is_empty());
/// ```
pub struct TrackedAllocator<A = System> {
    inner: A,
    ledger: Arc<AllocationLedger>,
}

impl TrackedAllocator<System> {
    pub fn system(ledger: Arc<AllocationLedger>) -> Self {
        Self::new(System, ledger)
    }
}

impl<A: GlobalAlloc> TrackedAllocator<A> {
    pub fn new(inner: A, ledger: Arc<AllocationLedger>) -> Self {
        Self { inner, ledger }
    }

    pub fn ledger(&self) -> &Arc<AllocationLedger> {
        &self.ledger
    }

    /// Allocates on behalf of the caller's location.
    #[track_caller]
    pub fn allocate_here(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        self.allocate(layout, Site::caller())
    }

    /// Like [`SiteAllocator::allocate`], with the block zero-filled.
    pub fn allocate_zeroed(&self, layout: Layout, site: Site) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            return Err(AllocError::new(layout));
        }

        let ptr = NonNull::new(unsafe { self.inner.alloc_zeroed(layout) })
            .ok_or(AllocError::new(layout))?;
        self.ledger.record(ptr.as_ptr() as usize, site);
        Ok(ptr)
    }
}

impl<A: GlobalAlloc> SiteAllocator for TrackedAllocator<A> {
    fn allocate(&self, layout: Layout, site: Site) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            return Err(AllocError::new(layout));
        }

        let ptr = NonNull::new(unsafe { self.inner.alloc(layout) })
            .ok_or(AllocError::new(layout))?;
        self.ledger.record(ptr.as_ptr() as usize, site);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.ledger.release(ptr.as_ptr() as usize);

        unsafe {
            self.inner.dealloc(ptr.as_ptr(), layout);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingAllocator;

    unsafe impl GlobalAlloc for FailingAllocator {
        unsafe fn alloc(&self, _layout: Layout) -> *mut u8 {
            std::ptr::null_mut()
        }

        unsafe fn dealloc(&self, _ptr: *mut u8, _layout: Layout) {}
    }

    #[test]
    fn test_leaked_blocks_reported_by_site() {
        let ledger = Arc::new(AllocationLedger::new());
        let allocator = TrackedAllocator::system(Arc::clone(&ledger));
        let layout = Layout::new::<u64>();
        let site = Site::new("pool.rs", 17);

        let kept = allocator.allocate(layout, site).unwrap();
        let freed = allocator.allocate(layout, site).unwrap();
        unsafe { allocator.deallocate(freed, layout) };

        let report = ledger.snapshot();
        assert_eq!(report.total_leaks(), 1);
        assert_eq!(report.files[0].file, "pool.rs");
        assert_eq!(report.files[0].sites[0].line, 17);

        unsafe { allocator.deallocate(kept, layout) };
        assert!(ledger.snapshot().is_empty());
    }

    #[test]
    fn test_allocate_here_uses_caller_location() {
        let ledger = Arc::new(AllocationLedger::new());
        let allocator = TrackedAllocator::system(Arc::clone(&ledger));
        let layout = Layout::new::<u32>();

        let expected = Site::new(file!(), line!() + 1);
        let block = allocator.allocate_here(layout).unwrap();
        assert_eq!(ledger.site_count(expected), Some(1));

        unsafe { allocator.deallocate(block, layout) };
    }

    #[test]
    fn test_zeroed_allocation() {
        let ledger = Arc::new(AllocationLedger::new());
        let allocator = TrackedAllocator::system(Arc::clone(&ledger));
        let layout = Layout::new::<[u8; 64]>();

        let block = allocator
            .allocate_zeroed(layout, Site::new("zero.rs", 1))
            .unwrap();
        let bytes = unsafe { std::slice::from_raw_parts(block.as_ptr(), 64) };
        assert!(bytes.iter().all(|&b| b == 0));
        assert_eq!(ledger.live_count(), 1);

        unsafe { allocator.deallocate(block, layout) };
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_failure_propagates_and_records_nothing() {
        let ledger = Arc::new(AllocationLedger::new());
        let allocator = TrackedAllocator::new(FailingAllocator, Arc::clone(&ledger));
        let layout = Layout::new::<u64>();

        let err = allocator
            .allocate(layout, Site::new("oom.rs", 2))
            .unwrap_err();
        assert_eq!(err.layout(), layout);
        assert!(err.to_string().contains("8 bytes"));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_zero_size_rejected() {
        let ledger = Arc::new(AllocationLedger::new());
        let allocator = TrackedAllocator::system(Arc::clone(&ledger));
        let layout = Layout::from_size_align(0, 1).unwrap();

        assert!(allocator.allocate(layout, Site::new("zst.rs", 1)).is_err());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_ledger_shared_between_allocators() {
        let ledger = Arc::new(AllocationLedger::new());
        let first = TrackedAllocator::system(Arc::clone(&ledger));
        let second = TrackedAllocator::system(Arc::clone(&ledger));
        let layout = Layout::new::<u16>();

        let a = first.allocate(layout, Site::new("a.rs", 1)).unwrap();
        let b = second.allocate(layout, Site::new("a.rs", 1)).unwrap();
        assert_eq!(ledger.site_count(Site::new("a.rs", 1)), Some(2));

        for block in [a, b] {
            unsafe { first.deallocate(block, layout) };
        }
        assert!(Arc::ptr_eq(first.ledger(), second.ledger()));
        assert!(ledger.is_empty());
    }
}
