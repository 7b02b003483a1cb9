use serde::{Deserialize, Serialize};
use std::fmt;

/// Live allocation count at one line of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteLeaks {
    pub line: u32,
    pub count: usize,
}

impl fmt::Display for SiteLeaks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} at line {}",
            self.count,
            if self.count == 1 { "leak" } else { "leaks" },
            self.line
        )
    }
}

/// All leaking lines of one file, ascending by line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLeaks {
    pub file: String,
    pub sites: Vec<SiteLeaks>,
}

impl FileLeaks {
    pub fn total_leaks(&self) -> usize {
        self.sites.iter().map(|s| s.count).sum()
    }
}

/// Snapshot of the ledger's per-site aggregation.
///
/// The `Display` implementation renders the leak report text:
///
/// ```text
/// ============
/// MEMORY LEAKS
///   src/cache.rs
///     2 leaks at line 41
///     1 leak at line 88
/// ```
///
/// An empty report renders as nothing at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeakReport {
    pub files: Vec<FileLeaks>,
}

impl LeakReport {
    /// Builds a report, dropping zero-count sites and empty files and sorting
    /// by file then line.
    pub fn new(files: Vec<FileLeaks>) -> Self {
        let mut files: Vec<FileLeaks> = files
            .into_iter()
            .map(|mut file| {
                file.sites.retain(|s| s.count > 0);
                file.sites.sort_by_key(|s| s.line);
                file
            })
            .filter(|file| !file.sites.is_empty())
            .collect();
        files.sort_by(|a, b| a.file.cmp(&b.file));

        Self { files }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Number of leaked allocations across all sites.
    pub fn total_leaks(&self) -> usize {
        self.files.iter().map(FileLeaks::total_leaks).sum()
    }

    /// Number of distinct `(file, line)` sites with leaks.
    pub fn site_total(&self) -> usize {
        self.files.iter().map(|f| f.sites.len()).sum()
    }

    /// Flattened `(file, line, count)` rows in report order.
    pub fn rows(&self) -> impl Iterator<Item = (&str, u32, usize)> + '_ {
        self.files.iter().flat_map(|file| {
            file.sites
                .iter()
                .map(move |site| (file.file.as_str(), site.line, site.count))
        })
    }
}

impl fmt::Display for LeakReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }

        writeln!(f, "============")?;
        writeln!(f, "MEMORY LEAKS")?;
        for file in &self.files {
            writeln!(f, "  {}", file.file)?;
            for site in &file.sites {
                writeln!(f, "    {site}")?;
            }
        }

        Ok(())
    }
}
