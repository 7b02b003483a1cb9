pub mod diff;
pub mod show;

use eyre::{Result, WrapErr};
use leakcensus::LeaksJson;
use std::fs;
use std::path::Path;

pub(crate) fn load_report(path: &Path) -> Result<LeaksJson> {
    let contents = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    let json: LeaksJson = serde_json::from_str(&contents)
        .wrap_err_with(|| format!("{} is not a leakcensus JSON report", path.display()))?;
    Ok(json)
}
