#[leakcensus::track]
fn leak_labels(n: usize) {
    for i in 0..n {
        Box::leak(format!("label-{i}").into_boxed_str());
    }
}

#[leakcensus::track]
fn leak_one() {
    std::mem::forget(vec![0u8; 32]);
}

#[leakcensus::main(format = "json-pretty")]
fn main() {
    leak_labels(2);
    leak_one();
}
