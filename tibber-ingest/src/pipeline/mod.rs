use std::sync::Arc;

use tibber_client::{ClientError, QueryExecutor, HOMES_QUERY};
use time::OffsetDateTime;

use crate::{
    sinks::{PointSink, SinkError},
    transform,
};

#[derive(thiserror::Error, Debug)]
pub enum CycleError {
    #[error("fetch failed: {0}")]
    Fetch(#[source] ClientError),
    #[error("write failed: {0}")]
    Write(#[source] SinkError),
}

/// One fetch → map → write execution.
#[async_trait::async_trait]
pub trait Cycle: Send + Sync {
    async fn run_cycle(&self, credential: &str) -> Result<(), CycleError>;
}

#[async_trait::async_trait]
impl<T: Cycle + ?Sized> Cycle for Arc<T> {
    async fn run_cycle(&self, credential: &str) -> Result<(), CycleError> {
        (**self).run_cycle(credential).await
    }
}

/// Fetches the homes query, maps it to points and hands them to the sink.
pub struct Collector<Q, S> {
    executor: Q,
    sink: S,
    emit_home_point: bool,
}

impl<Q, S> Collector<Q, S> {
    pub fn new(executor: Q, sink: S) -> Self {
        Self {
            executor,
            sink,
            emit_home_point: false,
        }
    }

    /// Also write a `home` point with `online=1` per home on every cycle.
    pub fn with_home_point(mut self, enabled: bool) -> Self {
        self.emit_home_point = enabled;
        self
    }
}

#[async_trait::async_trait]
impl<Q, S> Cycle for Collector<Q, S>
where
    Q: QueryExecutor,
    S: PointSink,
{
    async fn run_cycle(&self, credential: &str) -> Result<(), CycleError> {
        let response = self
            .executor
            .execute(HOMES_QUERY, credential)
            .await
            .map_err(CycleError::Fetch)?;

        let points = if self.emit_home_point {
            transform::map_response_with_home_points(&response, OffsetDateTime::now_utc())
        } else {
            transform::map_response(&response)
        };

        let homes = response.viewer.homes.len();
        let written = points.len();
        for point in points {
            self.sink.write(point);
        }
        self.sink.flush().await.map_err(CycleError::Write)?;

        tracing::info!(homes, points = written, "cycle written");
        Ok(())
    }
}
