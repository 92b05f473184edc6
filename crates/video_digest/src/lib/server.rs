//! HTTP surface: `POST /analyze` and `GET /health`.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    error::AnalysisError,
    llm::{transcriber::Transcriber, TextModel, VisionModel},
    media::MediaAcquirer,
    types::{AnalysisResult, VideoRequest},
    AnalysisOrchestrator,
};

pub fn router<M, T, C>(orchestrator: Arc<AnalysisOrchestrator<M, T, C>>) -> Router
where
    M: MediaAcquirer + Send + Sync + 'static,
    T: Transcriber + Send + Sync + 'static,
    C: VisionModel + TextModel + Send + Sync + 'static,
{
    Router::new()
        .route("/analyze", post(analyze_video::<M, T, C>))
        .route("/health", get(health_check))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(orchestrator)
}

/// Serves `router` until ctrl-c is received
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    tracing::info!(addr = ?listener.local_addr()?, "Listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutting down");
        })
        .await
}

async fn analyze_video<M, T, C>(
    State(orchestrator): State<Arc<AnalysisOrchestrator<M, T, C>>>,
    Json(request): Json<VideoRequest>,
) -> Result<Json<AnalysisResult>, ApiError>
where
    M: MediaAcquirer + Send + Sync + 'static,
    T: Transcriber + Send + Sync + 'static,
    C: VisionModel + TextModel + Send + Sync + 'static,
{
    let result = orchestrator.analyze(&request.url).await?;
    Ok(Json(result))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

#[derive(Debug)]
pub struct ApiError(AnalysisError);

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.0.to_string() }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
