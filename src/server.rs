//! Server bootstrap shared by both binaries
//!
//! Tracing setup, middleware layering, and serving until a stop signal.

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{Request, Response};
use axum::Router;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, info_span, Span};
use uuid::Uuid;

/// Initialize the tracing subscriber from `RUST_LOG`
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

/// Span for one request, tagged with a fresh request id
fn request_span(request: &Request<Body>) -> Span {
    info_span!(
        "request",
        request_id = %Uuid::new_v4(),
        method = %request.method(),
        uri = %request.uri(),
    )
}

fn log_completion(response: &Response<Body>, latency: Duration, _span: &Span) {
    info!(
        status = response.status().as_u16(),
        duration_ms = latency.as_millis(),
        "Request completed"
    );
}

/// Wrap a service router with the common middleware stack
pub fn with_layers(router: Router, max_upload_bytes: usize) -> Router {
    router
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_response(log_completion),
        )
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// Bind `addr` and serve `app` until Ctrl+C or SIGTERM
pub async fn serve(app: Router, addr: &str, name: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server address {}: {}", addr, e))?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        service = name,
        version = env!("CARGO_PKG_VERSION"),
        "Listening on http://{}",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(stop_signal())
        .await?;

    info!(service = name, "Stopped");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix
async fn stop_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Ctrl+C received, draining connections"),
                    _ = sigterm.recv() => info!("SIGTERM received, draining connections"),
                }
                return;
            }
            Err(e) => tracing::warn!(error = %e, "SIGTERM handler unavailable"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Ctrl+C handler unavailable");
        std::future::pending::<()>().await;
    }
    info!("Ctrl+C received, draining connections");
}
