use arc_swap::ArcSwapOption;
use colored::*;
use std::sync::{Arc, OnceLock};

use crate::ledger::AllocationLedger;
use crate::output::{reporter_for, Format, Reporter};
use crate::report::LeakReport;
use crate::scope::{inside_tracker, untracked};

/// The ledger the global allocation hook records into, if any.
pub(crate) static LEAKCENSUS_STATE: OnceLock<ArcSwapOption<AllocationLedger>> = OnceLock::new();

#[inline]
pub(crate) fn with_active_ledger<R>(f: impl FnOnce(&AllocationLedger) -> R) -> Option<R> {
    let slot = LEAKCENSUS_STATE.get()?;
    let active = slot.load();
    match &*active {
        Some(ledger) => Some(f(ledger)),
        None => None,
    }
}

pub(crate) fn install(ledger: Arc<AllocationLedger>) {
    // The slot's own allocations must not reach the hook it is publishing to
    let installed = inside_tracker(|| {
        let slot = LEAKCENSUS_STATE.get_or_init(|| ArcSwapOption::from(None));
        if slot.load().is_some() {
            return false;
        }
        slot.store(Some(ledger));
        true
    });

    if !installed {
        panic!("More than one leakcensus guard cannot be alive at the same time.");
    }
}

/// Detaches `ledger` from the hook if it is the active one.
pub(crate) fn uninstall(ledger: &Arc<AllocationLedger>) -> bool {
    let Some(slot) = LEAKCENSUS_STATE.get() else {
        return false;
    };

    inside_tracker(|| {
        let active = slot.load_full();
        if active.is_some_and(|active| Arc::ptr_eq(&active, ledger)) {
            slot.store(None);
            return true;
        }
        false
    })
}

fn resolve_format(configured: Format, env_value: Option<&str>) -> Format {
    let Some(value) = env_value else {
        return configured;
    };

    match value.parse() {
        Ok(format) => format,
        Err(e) => {
            eprintln!(
                "{} LEAKCENSUS_FORMAT ignored: {}",
                "[leakcensus]".yellow().bold(),
                e
            );
            configured
        }
    }
}

/// Builder for a [`LeakCensus`] guard.
///
/// # Examples
///
/// ```rust
/// use leakcensus::{Format, LeakCensusBuilder};
///
/// let census = LeakCensusBuilder::new("main")
///     .format(Format::Table)
///     .build();
/// // tracked allocations are recorded until the guard is finished or dropped
/// census.finish();
/// ```
pub struct LeakCensusBuilder {
    caller_name: String,
    format: Format,
    reporter: Option<Box<dyn Reporter>>,
}

impl LeakCensusBuilder {
    pub fn new(caller_name: impl Into<String>) -> Self {
        Self {
            caller_name: caller_name.into(),
            format: Format::default(),
            reporter: None,
        }
    }

    /// Selects one of the built-in reporters. The `LEAKCENSUS_FORMAT`
    /// environment variable takes precedence when set.
    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Replaces the built-in reporters with a custom one.
    pub fn reporter(mut self, reporter: Box<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Creates a fresh ledger and makes it the one the global allocation hook
    /// records into.
    ///
    /// # Panics
    ///
    /// Panics if another guard is already active. Only one census can run at
    /// a time.
    pub fn build(self) -> LeakCensus {
        let reporter = match self.reporter {
            Some(reporter) => reporter,
            None => {
                let env_format = std::env::var("LEAKCENSUS_FORMAT").ok();
                reporter_for(resolve_format(self.format, env_format.as_deref()))
            }
        };

        let ledger = Arc::new(AllocationLedger::new());
        install(Arc::clone(&ledger));

        LeakCensus {
            ledger,
            reporter,
            caller_name: self.caller_name,
            finished: false,
        }
    }
}

/// Guard owning the process-wide leak census.
///
/// While the guard is alive, the global allocation hook records into its
/// ledger. Finalization happens exactly once, on [`finish`](Self::finish) or
/// on drop: the ledger is first detached from the hook, so frees that race
/// with shutdown no longer touch it, then a snapshot is taken under the
/// ledger's lock and handed to the reporter.
pub struct LeakCensus {
    ledger: Arc<AllocationLedger>,
    reporter: Box<dyn Reporter>,
    caller_name: String,
    finished: bool,
}

impl LeakCensus {
    pub fn ledger(&self) -> &Arc<AllocationLedger> {
        &self.ledger
    }

    pub fn caller_name(&self) -> &str {
        &self.caller_name
    }

    pub fn set_reporter(&mut self, reporter: Box<dyn Reporter>) {
        self.reporter = reporter;
    }

    /// Reports the current live allocations without stopping the census.
    pub fn report_now(&self) {
        let leaks = self.ledger.snapshot();
        self.emit(&leaks);
    }

    /// Stops the census, reports, and returns what was reported.
    pub fn finish(mut self) -> LeakReport {
        self.finalize()
    }

    fn finalize(&mut self) -> LeakReport {
        self.finished = true;
        uninstall(&self.ledger);

        let leaks = self.ledger.snapshot();
        self.emit(&leaks);
        leaks
    }

    fn emit(&self, leaks: &LeakReport) {
        let result = untracked(|| self.reporter.report(&self.caller_name, leaks));
        if let Err(e) = result {
            eprintln!(
                "{} Failed to write leak report: {}",
                "[leakcensus]".red().bold(),
                e
            );
        }
    }
}

impl Drop for LeakCensus {
    fn drop(&mut self) {
        if !self.finished {
            self.finalize();
        }
    }
}

/// Starts a leak census named after the calling function, with default
/// settings. Keep the returned guard alive for as long as tracking should
/// run.
///
/// ```rust
/// fn main() {
///     let _leakcensus = leakcensus::init!();
///     // ...
/// }
/// ```
#[macro_export]
macro_rules! init {
    () => {{
        fn __caller_fn() {}
        let caller_name = std::any::type_name_of_val(&__caller_fn);
        let caller_name = caller_name
            .strip_suffix("::__caller_fn")
            .unwrap_or(caller_name)
            .replace("::{{closure}}", "");

        $crate::LeakCensusBuilder::new(caller_name).build()
    }};
}
