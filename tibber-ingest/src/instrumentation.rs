use std::{future::Future, sync::Arc, time::Duration};

use metrics::{Gauge, Histogram};
use tokio::time::Instant;

pub const STATUS_METRIC: &str = "scrape_status";
pub const DURATION_METRIC: &str = "scrape_duration_seconds";

/// Records the outcome of each cycle.
pub trait CycleRecorder: Send + Sync {
    fn record(&self, success: bool, elapsed: Duration);
}

impl<T: CycleRecorder + ?Sized> CycleRecorder for Arc<T> {
    fn record(&self, success: bool, elapsed: Duration) {
        (**self).record(success, elapsed)
    }
}

/// Status gauge and duration summary backed by the `metrics` recorder that
/// is current when this is constructed.
pub struct PrometheusCycleRecorder {
    status: Gauge,
    duration: Histogram,
}

impl PrometheusCycleRecorder {
    pub fn new() -> Self {
        metrics::describe_gauge!(STATUS_METRIC, "Status of the scrapes.");
        metrics::describe_histogram!(
            DURATION_METRIC,
            metrics::Unit::Seconds,
            "Duration of the scrapes."
        );

        Self {
            status: metrics::gauge!(STATUS_METRIC),
            duration: metrics::histogram!(DURATION_METRIC),
        }
    }
}

impl Default for PrometheusCycleRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleRecorder for PrometheusCycleRecorder {
    fn record(&self, success: bool, elapsed: Duration) {
        self.status.set(if success { 1.0 } else { 0.0 });
        self.duration.record(elapsed.as_secs_f64());
    }
}

/// Await `f`, then record its outcome and wall-clock duration. The result is
/// passed through untouched.
pub async fn instrumented<R, F, Fut, T, E>(recorder: &R, f: F) -> Result<T, E>
where
    R: CycleRecorder + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let start = Instant::now();
    let res = f().await;
    recorder.record(res.is_ok(), start.elapsed());
    res
}
