use leakcensus::{LeakCensusBuilder, LeakReport, LeaksJson, Reporter};
use std::error::Error;
use std::path::PathBuf;
use tokio::sync::Mutex;

struct JsonFileReporter {
    path: PathBuf,
}

impl Reporter for JsonFileReporter {
    fn report(&self, caller_name: &str, leaks: &LeakReport) -> Result<(), Box<dyn Error>> {
        let json = LeaksJson::new(caller_name, leaks);
        std::fs::write(&self.path, serde_json::to_string_pretty(&json)?)?;
        println!("leak report written to {}", self.path.display());
        Ok(())
    }
}

#[leakcensus::track]
async fn load_settings(settings: &Mutex<Vec<&'static str>>, name: &str) -> String {
    let enabled = settings.lock().await.iter().any(|s| *s == name);
    format!("{name}={enabled}")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("leakcensus_report.json"));

    let census = LeakCensusBuilder::new("json_file_reporter::main")
        .reporter(Box::new(JsonFileReporter { path }))
        .build();

    let settings = Mutex::new(vec!["cache"]);
    let kept = load_settings(&settings, "cache").await;
    let leaked = load_settings(&settings, "metrics").await;
    std::mem::forget(leaked);
    println!("{kept}");
    drop(kept);

    census.finish();
    Ok(())
}
