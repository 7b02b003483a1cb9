//! Per-thread call-site context for the global allocation hook.
//!
//! `GlobalAlloc` is never told who asked for memory, so the site of an
//! allocation is threaded through a thread-local stack instead: entering a
//! [`SiteScope`] pushes a site, and every allocation the hook sees on that
//! thread until the scope is dropped is attributed to the innermost site.
//! Allocations made outside every scope are not recorded.
//!
//! Scopes nested deeper than [`MAX_DEPTH`] are counted but not stored; the
//! deepest stored site stays in effect until the stack unwinds below the cap.

use std::cell::Cell;
use std::thread::LocalKey;

use crate::Site;

pub const MAX_DEPTH: usize = 64;

pub struct SiteStack {
    pub depth: Cell<usize>,
    pub elements: [Cell<Option<Site>>; MAX_DEPTH],
}

thread_local! {
    pub static SITES: SiteStack = const { SiteStack {
        depth: Cell::new(0),
        elements: [const { Cell::new(None) }; MAX_DEPTH],
    } };

    // Non-zero inside `untracked`. Suppresses recording only; frees of live
    // blocks are still released.
    pub static UNTRACKED: Cell<u32> = const { Cell::new(0) };

    // Non-zero while this thread is inside the ledger or the allocation hook.
    // Allocations and frees made at that point are the tracker's own and
    // bypass it entirely.
    pub static IN_TRACKER: Cell<u32> = const { Cell::new(0) };
}

/// Innermost active site on the current thread.
#[inline]
pub fn current_site() -> Option<Site> {
    SITES
        .try_with(|stack| match stack.depth.get().min(MAX_DEPTH) {
            0 => None,
            depth => stack.elements[depth - 1].get(),
        })
        .ok()
        .flatten()
}

/// Whether the allocation hook may touch the ledger on this thread, i.e. the
/// thread is not already inside the tracker.
#[inline]
pub(crate) fn hook_enabled() -> bool {
    IN_TRACKER.try_with(|depth| depth.get() == 0).unwrap_or(false)
}

/// Whether new allocations on this thread should be recorded.
#[inline]
pub(crate) fn is_recording() -> bool {
    hook_enabled() && UNTRACKED.try_with(|depth| depth.get() == 0).unwrap_or(false)
}

/// Runs `f` without recording its allocations on the current thread.
///
/// Blocks that were recorded earlier and are freed inside `f` are still
/// released. Nested calls are fine; recording resumes when the outermost call
/// returns.
#[inline]
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _suspended = Suspended::new(&UNTRACKED);
    f()
}

/// Runs `f` with the allocation hook bypassed on the current thread.
#[inline]
pub(crate) fn inside_tracker<R>(f: impl FnOnce() -> R) -> R {
    let _suspended = Suspended::new(&IN_TRACKER);
    f()
}

struct Suspended {
    counter: Option<&'static LocalKey<Cell<u32>>>,
}

impl Suspended {
    #[inline]
    fn new(counter: &'static LocalKey<Cell<u32>>) -> Self {
        let active = counter.try_with(|depth| depth.set(depth.get() + 1)).is_ok();
        Self {
            counter: active.then_some(counter),
        }
    }
}

impl Drop for Suspended {
    #[inline]
    fn drop(&mut self) {
        if let Some(counter) = self.counter {
            let _ = counter.try_with(|depth| depth.set(depth.get() - 1));
        }
    }
}

/// Attributes heap allocations made on this thread to `site` until dropped.
///
/// Usually created by [`track_block!`](crate::track_block) or the
/// [`track`](crate::track) attribute rather than by hand.
///
/// Dropping a scope truncates the stack back to where it was entered, so a
/// forgotten inner scope cannot outlive its enclosing one.
pub struct SiteScope {
    // Stack depth before this scope was pushed; `None` if the thread-local
    // was already gone.
    depth: Option<usize>,
    // Scopes are tied to the thread-local stack they pushed onto.
    _not_send: std::marker::PhantomData<*const ()>,
}

impl SiteScope {
    #[inline]
    pub fn enter(site: Site) -> Self {
        let depth = SITES
            .try_with(|stack| {
                let depth = stack.depth.get();
                if let Some(slot) = stack.elements.get(depth) {
                    slot.set(Some(site));
                }
                stack.depth.set(depth + 1);
                depth
            })
            .ok();

        Self {
            depth,
            _not_send: std::marker::PhantomData,
        }
    }

    #[track_caller]
    #[inline]
    pub fn here() -> Self {
        Self::enter(Site::caller())
    }
}

impl Drop for SiteScope {
    #[inline]
    fn drop(&mut self) {
        let Some(entered) = self.depth else {
            return;
        };

        let _ = SITES.try_with(|stack| {
            let depth = stack.depth.get();
            if depth <= entered {
                return;
            }
            for slot in &stack.elements[entered.min(MAX_DEPTH)..depth.min(MAX_DEPTH)] {
                slot.set(None);
            }
            stack.depth.set(entered);
        });
    }
}

/// Evaluates an expression with its heap allocations attributed to the
/// macro's own location.
///
/// ```rust
/// # fn make() -> Vec<u8> { vec![1, 2, 3] }
/// let buffer = leakcensus::track_block!(make());
/// assert_eq!(buffer.len(), 3);
/// ```
#[macro_export]
macro_rules! track_block {
    ($expr:expr) => {{
        let _leakcensus_scope = $crate::SiteScope::enter($crate::site!());
        $expr
    }};
}
