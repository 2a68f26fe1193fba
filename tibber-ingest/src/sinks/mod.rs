pub mod ilp_tcp;
pub mod influx_http;
pub mod line_protocol;

use std::{future::Future, sync::Arc, sync::Mutex, time::Duration};

use crate::point::Point;

pub use ilp_tcp::IlpTcpSink;
pub use influx_http::InfluxHttpSink;

#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("ilp write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("http write failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store rejected batch with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Destination for mapped points.
///
/// `write` only buffers. `flush` sends everything buffered so far and reports
/// whether the store accepted it; the buffer is empty afterwards either way.
#[async_trait::async_trait]
pub trait PointSink: Send + Sync {
    fn write(&self, point: Point);
    async fn flush(&self) -> Result<(), SinkError>;
}

#[async_trait::async_trait]
impl<T: PointSink + ?Sized> PointSink for Arc<T> {
    fn write(&self, point: Point) {
        (**self).write(point)
    }

    async fn flush(&self) -> Result<(), SinkError> {
        (**self).flush().await
    }
}

/// Points accumulated between two flushes.
#[derive(Default)]
pub struct PointBuffer {
    points: Mutex<Vec<Point>>,
}

impl PointBuffer {
    pub fn push(&self, point: Point) {
        self.points
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(point);
    }

    pub fn take(&self) -> Vec<Point> {
        std::mem::take(&mut *self.points.lock().unwrap_or_else(|e| e.into_inner()))
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.points.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-batch delivery attempts inside one flush.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self { max_retries, backoff }
    }
}

/// Run `send` until it succeeds or the policy is exhausted, sleeping
/// `backoff * attempt` between tries.
pub(crate) async fn send_with_retry<F, Fut>(
    policy: RetryPolicy,
    sink_name: &'static str,
    lines: usize,
    mut send: F,
) -> Result<(), SinkError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), SinkError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match send().await {
            Ok(()) => {
                metrics::counter!("sink_points_written_total", "sink" => sink_name)
                    .increment(lines as u64);
                return Ok(());
            }
            Err(e) if attempt < policy.max_retries => {
                attempt += 1;
                tracing::warn!(
                    error = %e,
                    attempt,
                    sink = sink_name,
                    "sink flush failed, retrying with backoff"
                );
                tokio::time::sleep(policy.backoff * attempt).await;
            }
            Err(e) => {
                tracing::error!(error = %e, sink = sink_name, "sink flush failed, giving up");
                metrics::counter!("sink_flush_errors_total", "sink" => sink_name).increment(1);
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use time::macros::datetime;

    #[test]
    fn buffer_take_drains_points() {
        let buf = PointBuffer::default();
        buf.push(Point::new("price", datetime!(2024-01-01 00:00:00 UTC)));
        buf.push(Point::new("price", datetime!(2024-01-01 01:00:00 UTC)));
        assert_eq!(buf.len(), 2);

        let taken = buf.take();
        assert_eq!(taken.len(), 2);
        assert!(buf.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn retry_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(2, Duration::from_millis(10));

        let res = send_with_retry(policy, "test", 1, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SinkError::Connect("refused".to_string())) }
        })
        .await;

        assert!(matches!(res, Err(SinkError::Connect(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_stops_on_first_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(5, Duration::from_millis(10));

        let res = send_with_retry(policy, "test", 1, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(SinkError::Connect("refused".to_string()))
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert!(res.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
