use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use docrecon_core::{Pipeline, UploadEvent};
use tower_http::trace::TraceLayer;

pub fn router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/", post(push))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(pipeline)
}

pub async fn serve(pipeline: Pipeline, port: u16) -> anyhow::Result<()> {
    let app = router(Arc::new(pipeline));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening for push deliveries on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

/// A 2xx acknowledges the delivery; anything else makes Pub/Sub redeliver,
/// so only retryable failures and aborted runs answer 500.
async fn push(State(pipeline): State<Arc<Pipeline>>, body: Bytes) -> StatusCode {
    let event = match UploadEvent::from_push_envelope(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("Dropping undecodable delivery: {}", e);
            return StatusCode::NO_CONTENT;
        }
    };

    // Run detached so a closed push connection cannot cancel the run halfway
    // through its cleanup.
    let run = {
        let event = event.clone();
        tokio::spawn(async move { pipeline.run(&event).await })
    };

    let result = match run.await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Run for {} aborted: {}", event.name, e);
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };

    match result {
        Ok(output) => {
            tracing::info!(
                "Reconciled {} in {}ms",
                output.document_name,
                output.duration_ms
            );
            StatusCode::NO_CONTENT
        }
        Err(e) if e.is_retryable() => {
            tracing::error!("Run for {} failed, requesting redelivery: {}", event.name, e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
        Err(e) => {
            tracing::error!("Run for {} failed permanently: {}", event.name, e);
            StatusCode::NO_CONTENT
        }
    }
}
