use std::sync::Arc;
use tokio::sync::Mutex;

#[leakcensus::track]
async fn fill_cache(cache: Arc<Mutex<Vec<String>>>, id: usize) {
    let entry = format!("worker-{id}");
    cache.lock().await.push(entry);
}

#[leakcensus::track]
async fn leak_after_lock(cache: Arc<Mutex<Vec<String>>>, id: usize) {
    let len = cache.lock().await.len();
    std::mem::forget(Box::new(id + len));
}

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
#[leakcensus::main]
async fn main() {
    let cache = Arc::new(Mutex::new(Vec::with_capacity(8)));

    let handles: Vec<_> = (0..8)
        .map(|id| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                fill_cache(Arc::clone(&cache), id).await;
                tokio::task::yield_now().await;
                leak_after_lock(cache, id).await;
            })
        })
        .collect();

    for handle in handles {
        handle.await.ok();
    }

    let entries = cache.lock().await.len();
    println!("cached {entries} entries");
}
