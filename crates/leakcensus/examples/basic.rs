#[leakcensus::track]
fn leak_boxes(n: usize) {
    for i in 0..n {
        std::mem::forget(Box::new(i));
    }
}

#[leakcensus::track]
fn balanced() -> usize {
    let buffer = vec![0u8; 256];
    std::hint::black_box(&buffer);
    buffer.len()
}

#[leakcensus::track]
fn nested() {
    balanced();
    std::mem::forget(String::from("nested"));
}

#[leakcensus::main]
fn main() {
    leak_boxes(3);
    balanced();
    nested();

    std::mem::forget(leakcensus::track_block!(vec![1u64, 2, 3]));

    let kept = leakcensus::track_block!(String::from("freed before the report"));
    println!("{kept}");
}
