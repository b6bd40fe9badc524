use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

/// Identity work function that counts how many items it has processed.
pub fn counting_identity(
    counter: Arc<AtomicUsize>,
) -> impl Fn(u64) -> Result<Option<u64>> + Send + Sync + 'static {
    move |x| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Some(x))
    }
}

/// Identity work function that sleeps before returning its input.
pub fn slow_identity(
    delay: Duration,
) -> impl Fn(u64) -> Result<Option<u64>> + Send + Sync + 'static {
    move |x| {
        std::thread::sleep(delay);
        Ok(Some(x))
    }
}

/// Polls `condition` until it holds or `deadline` elapses.
pub fn wait_for(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}
