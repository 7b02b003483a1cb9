use std::alloc::Layout;
use std::fmt;
use std::ptr::NonNull;

use crate::Site;

pub(crate) mod allocator;
pub(crate) mod tracked;

pub use allocator::LeakTracingAllocator;
pub use tracked::TrackedAllocator;

/// The underlying allocator could not satisfy a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocError {
    layout: Layout,
}

impl AllocError {
    pub(crate) fn new(layout: Layout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "memory allocation of {} bytes (align {}) failed",
            self.layout.size(),
            self.layout.align()
        )
    }
}

impl std::error::Error for AllocError {}

/// An allocator that is told where each request comes from.
///
/// This is the explicit alternative to intercepting the global allocator:
/// code that should be audited for leaks is handed a `SiteAllocator` and
/// passes the call site along with every request.
pub trait SiteAllocator {
    /// Allocates a block for `layout` on behalf of `site`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] when the underlying allocator fails or
    /// `layout` has zero size.
    fn allocate(&self, layout: Layout, site: Site) -> Result<NonNull<u8>, AllocError>;

    /// Returns a block to the allocator.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on this allocator with the
    /// same `layout`, and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}
