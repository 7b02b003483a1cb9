use leakcensus::{AllocationLedger, SiteAllocator, TrackedAllocator};
use std::alloc::Layout;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let ledger = Arc::new(AllocationLedger::new());
    let allocator = TrackedAllocator::system(Arc::clone(&ledger));
    let layout = Layout::from_size_align(64, 8)?;

    let mut blocks = Vec::new();
    for _ in 0..3 {
        blocks.push(allocator.allocate_here(layout)?);
    }
    let lost = allocator.allocate(layout, leakcensus::site!())?;

    for block in blocks.drain(..) {
        unsafe { allocator.deallocate(block, layout) };
    }

    println!("live allocations: {}", ledger.live_count());
    ledger.report();

    unsafe { allocator.deallocate(lost, layout) };
    assert!(ledger.is_empty());
    Ok(())
}
