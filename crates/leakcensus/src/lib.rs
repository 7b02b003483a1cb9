//! A call-site leak census for Rust programs.
//!
//! leakcensus records every tracked heap allocation that is still live,
//! together with the `(file, line)` it was requested from, and when tracking
//! stops reports what was never freed, grouped by call site:
//!
//! ```text
//! ============
//! MEMORY LEAKS
//!   src/cache.rs
//!     2 leaks at line 41
//! ```
//!
//! ## Setup & Usage
//!
//! Enable the `leakcensus-alloc` feature to install [`LeakTracingAllocator`]
//! as the global allocator, start a census in `main` and mark the code whose
//! allocations should be attributed:
//!
//! ```rust,ignore
//! #[leakcensus::track]
//! fn build_cache() -> Vec<String> {
//!     vec!["a".to_string()]
//! }
//!
//! #[leakcensus::main]
//! fn main() {
//!     std::mem::forget(build_cache());
//! }
//! ```
//!
//! Without the global hook, hand a [`TrackedAllocator`] to the code under
//! audit and it records into the [`AllocationLedger`] you give it.

pub use leakcensus_macros::{main, track};

mod alloc;
mod future;
mod guard;
mod ledger;
mod output;
mod report;
mod scope;
mod site;

pub use alloc::{AllocError, LeakTracingAllocator, SiteAllocator, TrackedAllocator};
pub use future::TrackedFuture;
pub use guard::{LeakCensus, LeakCensusBuilder};
pub use ledger::AllocationLedger;
pub use output::{build_table, Format, LeaksJson, Reporter};
pub use report::{FileLeaks, LeakReport, SiteLeaks};
pub use scope::{current_site, untracked, SiteScope, MAX_DEPTH};
pub use site::Site;

cfg_if::cfg_if! {
    if #[cfg(feature = "leakcensus-alloc")] {
        // Process-wide interception; records only while a census is active
        #[global_allocator]
        static GLOBAL: LeakTracingAllocator = LeakTracingAllocator::system();
    }
}
