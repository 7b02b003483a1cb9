use crate::report::{FileLeaks, LeakReport};
use colored::*;
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

/// Output format of the built-in reporters.
///
/// * `Text` - the plain leak report on stderr, silent when nothing leaked (default)
/// * `Table` - one row per leaking site on stderr
/// * `Json` / `JsonPretty` - [`LeaksJson`] on stdout, always emitted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Text,
    Table,
    Json,
    JsonPretty,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Format::Text),
            "table" => Ok(Format::Table),
            "json" => Ok(Format::Json),
            "json-pretty" => Ok(Format::JsonPretty),
            other => Err(format!(
                "Unknown format {:?}. Expected one of: \"text\", \"table\", \"json\", \"json-pretty\"",
                other
            )),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Text => write!(f, "text"),
            Format::Table => write!(f, "table"),
            Format::Json => write!(f, "json"),
            Format::JsonPretty => write!(f, "json-pretty"),
        }
    }
}

/// Trait for implementing custom leak report output.
///
/// A reporter is handed a consistent snapshot of the ledger once tracking has
/// stopped (or on [`LeakCensus::report_now`](crate::LeakCensus::report_now)).
/// Custom reporters can forward leaks to log files, CI artifacts or test
/// assertions.
///
/// # Examples
///
/// ```rust
/// use leakcensus::{LeakReport, Reporter};
/// use std::error::Error;
///
/// struct CountOnly;
///
/// impl Reporter for CountOnly {
///     fn report(&self, caller_name: &str, leaks: &LeakReport) -> Result<(), Box<dyn Error>> {
///         eprintln!("{caller_name}: {} leaks", leaks.total_leaks());
///         Ok(())
///     }
/// }
/// ```
pub trait Reporter: Send {
    fn report(
        &self,
        caller_name: &str,
        leaks: &LeakReport,
    ) -> Result<(), Box<dyn std::error::Error>>;
}

/// JSON representation of a leak report.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LeaksJson {
    pub caller_name: String,
    pub total_leaks: usize,
    pub files: Vec<FileLeaks>,
}

impl LeaksJson {
    pub fn new(caller_name: &str, leaks: &LeakReport) -> Self {
        Self {
            caller_name: caller_name.to_string(),
            total_leaks: leaks.total_leaks(),
            files: leaks.files.clone(),
        }
    }

    /// The report carried by this JSON, normalized (sorted, zero counts dropped).
    pub fn to_report(&self) -> LeakReport {
        LeakReport::new(self.files.clone())
    }
}

pub(crate) fn reporter_for(format: Format) -> Box<dyn Reporter> {
    match format {
        Format::Text => Box::new(TextReporter),
        Format::Table => Box::new(TableReporter),
        Format::Json => Box::new(JsonReporter),
        Format::JsonPretty => Box::new(JsonPrettyReporter),
    }
}

pub fn build_table(leaks: &LeakReport) -> Table {
    let mut table = Table::new();

    table.add_row(Row::new(vec![
        Cell::new("File"),
        Cell::new("Line"),
        Cell::new("Leaks"),
    ]));

    for (file, line, count) in leaks.rows() {
        table.add_row(Row::new(vec![
            Cell::new(file),
            Cell::new(&line.to_string()),
            Cell::new(&count.to_string()),
        ]));
    }

    table
}

pub(crate) fn write_table<W: Write + ?Sized>(
    out: &mut W,
    caller_name: &str,
    leaks: &LeakReport,
) -> io::Result<()> {
    if leaks.is_empty() {
        writeln!(
            out,
            "{} No leaks detected in {}",
            "[leakcensus]".blue().bold(),
            caller_name.yellow().bold()
        )?;
        return Ok(());
    }

    writeln!(
        out,
        "{} {}: {} {} at {} {}",
        "[leakcensus]".blue().bold(),
        caller_name.yellow().bold(),
        leaks.total_leaks(),
        if leaks.total_leaks() == 1 { "leak" } else { "leaks" },
        leaks.site_total(),
        if leaks.site_total() == 1 { "site" } else { "sites" },
    )?;
    build_table(leaks).print(out)?;
    Ok(())
}

pub(crate) struct TextReporter;

impl Reporter for TextReporter {
    fn report(
        &self,
        _caller_name: &str,
        leaks: &LeakReport,
    ) -> Result<(), Box<dyn std::error::Error>> {
        write!(io::stderr().lock(), "{leaks}")?;
        Ok(())
    }
}

pub(crate) struct TableReporter;

impl Reporter for TableReporter {
    fn report(
        &self,
        caller_name: &str,
        leaks: &LeakReport,
    ) -> Result<(), Box<dyn std::error::Error>> {
        write_table(&mut io::stderr().lock(), caller_name, leaks)?;
        Ok(())
    }
}

pub(crate) struct JsonReporter;

impl Reporter for JsonReporter {
    fn report(
        &self,
        caller_name: &str,
        leaks: &LeakReport,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let json = LeaksJson::new(caller_name, leaks);
        println!("{}", serde_json::to_string(&json)?);
        Ok(())
    }
}

pub(crate) struct JsonPrettyReporter;

impl Reporter for JsonPrettyReporter {
    fn report(
        &self,
        caller_name: &str,
        leaks: &LeakReport,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let json = LeaksJson::new(caller_name, leaks);
        println!("{}", serde_json::to_string_pretty(&json)?);
        Ok(())
    }
}
