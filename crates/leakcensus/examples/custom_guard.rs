use leakcensus::{LeakCensusBuilder, LeakReport, Reporter};
use std::error::Error;

struct SummaryReporter;

impl Reporter for SummaryReporter {
    fn report(&self, caller_name: &str, leaks: &LeakReport) -> Result<(), Box<dyn Error>> {
        println!("census: {caller_name}");
        println!("total leaks: {}", leaks.total_leaks());
        for (file, line, count) in leaks.rows() {
            println!("{file}:{line} {count}");
        }
        Ok(())
    }
}

#[leakcensus::track]
fn cache_entry(key: u32) -> String {
    format!("entry-{key}")
}

fn main() {
    let census = LeakCensusBuilder::new("custom_guard")
        .reporter(Box::new(SummaryReporter))
        .build();

    let mut cache = Vec::new();
    for key in 0..4 {
        cache.push(cache_entry(key));
    }
    // half of the cache outlives the census
    cache.truncate(2);

    census.report_now();
    let leaks = census.finish();
    assert_eq!(leaks.total_leaks(), 2);

    drop(cache);
}
