use std::time::Duration;

use anyhow::Result;
use tibber_client::GraphqlClient;
use tibber_ingest::{
    config::{AppConfig, SinkKind},
    instrumentation::PrometheusCycleRecorder,
    metrics_server, observability,
    pipeline::Collector,
    point::Point,
    scheduler::Scheduler,
    sinks::{influx_http::InfluxTarget, IlpTcpSink, InfluxHttpSink, PointSink, RetryPolicy, SinkError},
};
use tokio_util::sync::CancellationToken;

enum ConfiguredSink {
    InfluxHttp(InfluxHttpSink),
    IlpTcp(IlpTcpSink),
}

impl ConfiguredSink {
    fn from_config(cfg: &AppConfig) -> Result<Self> {
        let retry = RetryPolicy::new(
            cfg.sink.max_retries,
            Duration::from_millis(cfg.sink.retry_backoff_ms),
        );

        let sink = match cfg.sink.kind {
            SinkKind::InfluxHttp => Self::InfluxHttp(InfluxHttpSink::new(
                InfluxTarget {
                    url: cfg.influxdb.url.clone(),
                    org: cfg.influxdb.org.clone(),
                    bucket: cfg.influxdb.bucket.clone(),
                    token: cfg.influxdb.token.clone(),
                },
                Duration::from_secs(cfg.influxdb.timeout_secs),
                cfg.sink.batch_size,
                retry,
            )?),
            SinkKind::IlpTcp => Self::IlpTcp(IlpTcpSink::new(cfg.ilp_addr()?, cfg.sink.batch_size, retry)),
        };
        Ok(sink)
    }
}

#[async_trait::async_trait]
impl PointSink for ConfiguredSink {
    fn write(&self, point: Point) {
        match self {
            Self::InfluxHttp(s) => s.write(point),
            Self::IlpTcp(s) => s.write(point),
        }
    }

    async fn flush(&self) -> Result<(), SinkError> {
        match self {
            Self::InfluxHttp(s) => s.flush().await,
            Self::IlpTcp(s) => s.flush().await,
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let cfg = AppConfig::load()?;
    observability::init_tracing(&cfg.logging)?;

    let handle = metrics_server::install_recorder()?;
    let recorder = PrometheusCycleRecorder::new();

    let client = GraphqlClient::new(
        cfg.tibber.endpoint.clone(),
        Duration::from_secs(cfg.tibber.timeout_secs),
    )?;
    let sink = ConfiguredSink::from_config(&cfg)?;
    let collector = Collector::new(client, sink).with_home_point(cfg.sink.emit_home_point);
    let scheduler = Scheduler::new(
        collector,
        recorder,
        cfg.schedule.interval(),
        cfg.tibber.token.clone(),
    );

    // A bind failure aborts start-up.
    let listener = tokio::net::TcpListener::bind(cfg.http_bind_addr()?).await?;

    let shutdown = CancellationToken::new();
    let scheduler_task = tokio::spawn(scheduler.run(shutdown.clone()));
    let http_task = tokio::spawn(metrics_server::serve(listener, handle, shutdown.clone()));

    shutdown_signal().await;
    tracing::info!("shutdown requested, waiting for the current cycle to finish");
    shutdown.cancel();

    let (cycles, served) = tokio::join!(scheduler_task, http_task);
    match cycles {
        Ok(cycles) => tracing::info!(cycles, "scheduler joined"),
        Err(e) => tracing::error!(error = %e, "scheduler task failed"),
    }
    if let Err(e) = served? {
        tracing::error!(error = %e, "health and metrics server error");
    }

    Ok(())
}
