use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Fixed minimum delay between the starts of successive external calls.
///
/// One pacer is shared by every external capability (generation, embedding,
/// remote index queries) so they all wait on the same clock.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until `interval` has passed since the previous call started.
    pub fn wait_turn(&self) {
        if self.interval.is_zero() {
            return;
        }
        let mut last = self.last_call.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.interval {
                std::thread::sleep(self.interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }
}
