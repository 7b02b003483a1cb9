use std::collections::HashMap;

#[leakcensus::track]
fn word_counts(text: &str) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for word in text.split_whitespace() {
        *counts.entry(word.to_lowercase()).or_insert(0) += 1;
    }
    counts
}

#[leakcensus::main]
fn main() {
    for _ in 0..10 {
        let counts = word_counts("the quick brown fox jumps over the lazy dog");
        assert_eq!(counts["the"], 2);
    }

    let boxed: Vec<Box<u32>> = leakcensus::track_block!((0..16).map(Box::new).collect());
    drop(boxed);
}
