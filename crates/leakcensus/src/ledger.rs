use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::report::{FileLeaks, LeakReport, SiteLeaks};
use crate::scope::{inside_tracker, untracked};
use crate::Site;

/// Both indexes over the live allocations. Only ever touched as a unit, under
/// the ledger's lock.
#[derive(Debug, Default)]
struct Indexes {
    by_address: HashMap<usize, Site>,
    // file -> line -> live count; a site with no live allocations has no entry
    by_site: BTreeMap<&'static str, BTreeMap<u32, usize>>,
}

impl Indexes {
    fn insert(&mut self, address: usize, site: Site) {
        // Recording a live address again replaces its record; the old site
        // gives its count back so every other site stays exact.
        if let Some(previous) = self.by_address.insert(address, site) {
            self.decrement(previous);
        }

        *self
            .by_site
            .entry(site.file)
            .or_default()
            .entry(site.line)
            .or_insert(0) += 1;
    }

    fn remove(&mut self, address: usize) -> Option<Site> {
        let site = self.by_address.remove(&address)?;
        self.decrement(site);
        Some(site)
    }

    fn decrement(&mut self, site: Site) {
        let Some(lines) = self.by_site.get_mut(site.file) else {
            return;
        };

        if let Some(count) = lines.get_mut(&site.line) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                lines.remove(&site.line);
            }
        }

        if lines.is_empty() {
            self.by_site.remove(site.file);
        }
    }
}

/// Bookkeeping for every live tracked allocation.
///
/// The ledger keeps a primary index from address to [`Site`] and a secondary,
/// derived index counting live allocations per `(file, line)`. Every
/// operation runs as a single critical section over both, so concurrent
/// callers never observe one index updated without the other.
///
/// The ledger's own bookkeeping allocations are made with tracking suspended,
/// so they never show up in a report. It never frees tracked blocks either:
/// leaked memory stays where it is, the ledger only remembers where it came
/// from.
///
/// # Examples
///
/// ```rust
/// use leakcensus::{AllocationLedger, Site};
///
/// let ledger = AllocationLedger::new();
/// ledger.record(0x1, Site::new("a.c", 5));
/// ledger.record(0x2, Site::new("b.c", 7));
/// ledger.record(0x3, Site::new("a.c", 5));
/// ledger.release(0x2);
///
/// let mut out = Vec::new();
/// ledger.write_report(&mut out).unwrap();
/// assert_eq!(
///     String::from_utf8(out).unwrap(),
///     "============\nMEMORY LEAKS\n  a.c\n    2 leaks at line 5\n"
/// );
/// ```
#[derive(Debug, Default)]
pub struct AllocationLedger {
    indexes: Mutex<Indexes>,
}

impl AllocationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // Nothing inside the critical sections can leave the indexes half
    // updated, so a poisoned lock still guards consistent data.
    fn indexes(&self) -> MutexGuard<'_, Indexes> {
        self.indexes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // The hook must not re-enter while this thread holds the lock.
    fn with_indexes<R>(&self, f: impl FnOnce(&mut Indexes) -> R) -> R {
        inside_tracker(|| f(&mut self.indexes()))
    }

    /// Records a freshly obtained block at `address`, allocated at `site`.
    ///
    /// `address` is expected not to be live. If it is, the old record is
    /// replaced and its site's count is given back.
    pub fn record(&self, address: usize, site: Site) {
        self.with_indexes(|indexes| indexes.insert(address, site));
    }

    /// Forgets the block at `address`.
    ///
    /// Releasing an address that was never recorded, or was already
    /// released, is a no-op: programs routinely free memory obtained before
    /// tracking started.
    pub fn release(&self, address: usize) {
        self.with_indexes(|indexes| {
            indexes.remove(address);
        });
    }

    /// Moves the live record at `old` to `new`, keeping its site. Used when a
    /// block is reallocated to a different address.
    ///
    /// Returns `false` and changes nothing when `old` is not live.
    pub fn relocate(&self, old: usize, new: usize) -> bool {
        self.with_indexes(|indexes| {
            match indexes.remove(old) {
                Some(site) => {
                    indexes.insert(new, site);
                    true
                }
                None => false,
            }
        })
    }

    /// Number of live tracked allocations.
    pub fn live_count(&self) -> usize {
        self.with_indexes(|indexes| indexes.by_address.len())
    }

    pub fn is_empty(&self) -> bool {
        self.live_count() == 0
    }

    pub fn is_live(&self, address: usize) -> bool {
        self.with_indexes(|indexes| indexes.by_address.contains_key(&address))
    }

    /// Live allocations recorded at `site`, or `None` when the site has none.
    pub fn site_count(&self, site: Site) -> Option<usize> {
        self.with_indexes(|indexes| {
            indexes
                .by_site
                .get(site.file)
                .and_then(|lines| lines.get(&site.line))
                .copied()
        })
    }

    /// Consistent copy of the per-site aggregation, files and lines ascending.
    pub fn snapshot(&self) -> LeakReport {
        self.with_indexes(|indexes| {
            let files = indexes
                .by_site
                .iter()
                .map(|(file, lines)| FileLeaks {
                    file: file.to_string(),
                    sites: lines
                        .iter()
                        .map(|(&line, &count)| SiteLeaks { line, count })
                        .collect(),
                })
                .collect();

            LeakReport::new(files)
        })
    }

    /// Writes the text leak report to `out`. Writes nothing when no
    /// allocation is live.
    pub fn write_report<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        let report = self.snapshot();
        untracked(|| write!(out, "{report}"))
    }

    /// Writes the text leak report to stderr. Output failures are ignored.
    pub fn report(&self) {
        let _ = self.write_report(&mut io::stderr().lock());
    }
}
