use axum::{extract::State, http::StatusCode, routing::get, Router};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Install the process-wide Prometheus recorder and return the handle used
/// to render it.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// `/metrics` renders the recorder; every other path is the liveness probe
/// and answers `200 OK` with an empty body.
pub fn router(handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .fallback(health_handler)
        .with_state(handle)
}

/// Serve until `shutdown` is cancelled. In-flight requests are allowed to
/// complete.
pub async fn serve(
    listener: TcpListener,
    handle: PrometheusHandle,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "health and metrics server listening");
    }

    axum::serve(listener, router(handle).into_make_service())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn metrics_handler(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

async fn health_handler() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use crate::instrumentation::{CycleRecorder, PrometheusCycleRecorder};

    fn local_handle() -> (PrometheusHandle, PrometheusCycleRecorder) {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let cycle_recorder = metrics::with_local_recorder(&recorder, PrometheusCycleRecorder::new);
        (handle, cycle_recorder)
    }

    async fn get_path(app: Router, path: &str) -> (StatusCode, String) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn health_probe_answers_ok_with_empty_body() {
        let (handle, _) = local_handle();

        for path in ["/", "/healthz", "/anything/else"] {
            let (status, body) = get_path(router(handle.clone()), path).await;
            assert_eq!(status, StatusCode::OK);
            assert!(body.is_empty());
        }
    }

    #[tokio::test]
    async fn metrics_exposes_cycle_series() {
        let (handle, cycle_recorder) = local_handle();
        cycle_recorder.record(true, Duration::from_millis(1200));

        let (status, body) = get_path(router(handle), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("scrape_status 1"));
        assert!(body.contains("scrape_duration_seconds"));
    }

    #[tokio::test]
    async fn serve_stops_on_cancellation() {
        let (handle, _) = local_handle();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(serve(listener, handle, shutdown.clone()));
        shutdown.cancel();

        assert!(task.await.unwrap().is_ok());
    }
}
