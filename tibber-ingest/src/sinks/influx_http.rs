use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

use super::{line_protocol, send_with_retry, PointBuffer, PointSink, RetryPolicy, SinkError};
use crate::point::Point;

/// Target bucket of an InfluxDB v2 write.
#[derive(Debug, Clone)]
pub struct InfluxTarget {
    pub url: String,
    pub org: String,
    pub bucket: String,
    pub token: String,
}

/// InfluxDB v2 `/api/v2/write` sink with nanosecond precision.
pub struct InfluxHttpSink {
    http: reqwest::Client,
    write_url: String,
    target: InfluxTarget,
    batch_size: usize,
    retry: RetryPolicy,
    buffer: PointBuffer,
}

impl InfluxHttpSink {
    pub fn new(
        target: InfluxTarget,
        timeout: Duration,
        batch_size: usize,
        retry: RetryPolicy,
    ) -> Result<Self, SinkError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let write_url = format!("{}/api/v2/write", target.url.trim_end_matches('/'));
        Ok(Self {
            http,
            write_url,
            target,
            batch_size: batch_size.max(1),
            retry,
            buffer: PointBuffer::default(),
        })
    }

    async fn send_payload(&self, payload: &str) -> Result<(), SinkError> {
        let resp = self
            .http
            .post(&self.write_url)
            .query(&[
                ("org", self.target.org.as_str()),
                ("bucket", self.target.bucket.as_str()),
                ("precision", "ns"),
            ])
            .header(AUTHORIZATION, format!("Token {}", self.target.token))
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(payload.to_owned())
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(SinkError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait::async_trait]
impl PointSink for InfluxHttpSink {
    fn write(&self, point: Point) {
        self.buffer.push(point);
    }

    async fn flush(&self) -> Result<(), SinkError> {
        let points = self.buffer.take();
        for batch in points.chunks(self.batch_size) {
            let (payload, lines) = line_protocol::encode_batch(batch);
            if lines == 0 {
                continue;
            }
            send_with_retry(self.retry, "influx_http", lines, || self.send_payload(&payload)).await?;
        }
        Ok(())
    }
}
