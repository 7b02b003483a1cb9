use clap::Parser;
use colored::*;
use eyre::{bail, Result};
use leakcensus::LeakReport;
use prettytable::{Cell, Row, Table};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Parser)]
pub struct DiffArgs {
    #[arg(long, help = "JSON leak report from the base run")]
    base: PathBuf,

    #[arg(long, help = "JSON leak report from the head run")]
    head: PathBuf,

    #[arg(long, help = "Exit with an error when any site leaks more than on base")]
    fail_on_new: bool,
}

impl DiffArgs {
    pub fn run(&self) -> Result<()> {
        let base = super::load_report(&self.base)?.to_report();
        let head = super::load_report(&self.head)?.to_report();

        let diffs = compare(&base, &head);
        if diffs.is_empty() {
            println!(
                "{} No leak changes ({} leaks on both sides)",
                "[leakcensus]".blue().bold(),
                head.total_leaks()
            );
            return Ok(());
        }

        println!(
            "{} {} → {} leaks",
            "[leakcensus]".blue().bold(),
            base.total_leaks(),
            head.total_leaks()
        );
        build_diff_table(&diffs).printstd();

        let grown = diffs.iter().filter(|d| d.head > d.base).count();
        if self.fail_on_new && grown > 0 {
            bail!("{} site(s) leak more than on base", grown);
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteDiff {
    pub file: String,
    pub line: u32,
    pub base: usize,
    pub head: usize,
}

impl SiteDiff {
    fn change(&self) -> String {
        let delta = self.head as i64 - self.base as i64;
        format!("{:+}", delta)
    }
}

/// Sites whose leak count differs between the two reports, in file/line order.
pub fn compare(base: &LeakReport, head: &LeakReport) -> Vec<SiteDiff> {
    let mut sites: BTreeMap<(&str, u32), (usize, usize)> = BTreeMap::new();

    for (file, line, count) in base.rows() {
        sites.entry((file, line)).or_default().0 = count;
    }
    for (file, line, count) in head.rows() {
        sites.entry((file, line)).or_default().1 = count;
    }

    sites
        .into_iter()
        .filter(|(_, (base, head))| base != head)
        .map(|((file, line), (base, head))| SiteDiff {
            file: file.to_string(),
            line,
            base,
            head,
        })
        .collect()
}

fn build_diff_table(diffs: &[SiteDiff]) -> Table {
    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("File"),
        Cell::new("Line"),
        Cell::new("Base"),
        Cell::new("Head"),
        Cell::new("Change"),
    ]));

    for diff in diffs {
        table.add_row(Row::new(vec![
            Cell::new(&diff.file),
            Cell::new(&diff.line.to_string()),
            Cell::new(&diff.base.to_string()),
            Cell::new(&diff.head.to_string()),
            Cell::new(&diff.change()),
        ]));
    }

    table
}
