//! Small shared utilities

use std::future::Future;
use std::time::Instant;

use tracing::debug;

/// Run an async stage and log its wall-clock duration
pub async fn measure<T, F: Future<Output = T>>(label: &str, fut: F) -> T {
    let start = Instant::now();
    let out = fut.await;
    debug!(
        stage = label,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Stage timing"
    );
    out
}
