use clap::Parser;
use colored::*;
use eyre::Result;
use leakcensus::{build_table, Format, LeaksJson};
use std::path::PathBuf;

#[derive(Debug, Parser)]
pub struct ShowArgs {
    #[arg(help = "JSON report written by a census with --format json")]
    report: PathBuf,

    #[arg(
        long,
        default_value = "text",
        help = "Output format: text, table, json or json-pretty"
    )]
    format: Format,
}

impl ShowArgs {
    pub fn run(&self) -> Result<()> {
        let json = super::load_report(&self.report)?;
        println!("{}", render(&json, self.format)?);
        Ok(())
    }
}

pub(crate) fn render(json: &LeaksJson, format: Format) -> Result<String> {
    let report = json.to_report();

    let rendered = match format {
        Format::Text => {
            if report.is_empty() {
                format!(
                    "{} No leaks recorded for {}",
                    "[leakcensus]".blue().bold(),
                    json.caller_name.yellow().bold()
                )
            } else {
                report.to_string().trim_end().to_string()
            }
        }
        Format::Table => format!(
            "{} {}: {} leaks\n{}",
            "[leakcensus]".blue().bold(),
            json.caller_name.yellow().bold(),
            report.total_leaks(),
            build_table(&report)
        ),
        Format::Json => serde_json::to_string(&LeaksJson::new(&json.caller_name, &report))?,
        Format::JsonPretty => {
            serde_json::to_string_pretty(&LeaksJson::new(&json.caller_name, &report))?
        }
    };

    Ok(rendered)
}
