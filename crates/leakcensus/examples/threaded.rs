use std::sync::mpsc;
use std::thread;

#[leakcensus::track]
fn produce(id: usize) -> Vec<usize> {
    (0..id + 1).collect()
}

#[leakcensus::track]
fn leak_per_worker(id: usize) {
    std::mem::forget(Box::new(id));
}

#[leakcensus::main(format = "table")]
fn main() {
    let (tx, rx) = mpsc::channel();

    let workers: Vec<_> = (0..4)
        .map(|id| {
            let tx = tx.clone();
            thread::spawn(move || {
                leak_per_worker(id);
                // freed on the receiving thread
                tx.send(produce(id)).ok();
            })
        })
        .collect();
    drop(tx);

    for worker in workers {
        worker.join().ok();
    }

    let received: usize = rx.iter().map(|batch| batch.len()).sum();
    println!("received {received} items");
}
