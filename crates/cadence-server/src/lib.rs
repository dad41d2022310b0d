//! Cadence Web Server
//!
//! Axum-based REST API for the Cadence recurring-payment detector.
//!
//! Two endpoints carry the whole workflow: POST a batch of transactions
//! and get back the recurring groups, or read the current recurring set
//! without ingesting anything.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use cadence_core::{
    ClassifierConfig, Database, IngestOutcome, RawTransaction, RecurrenceEngine, TransactionGroup,
};

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub classifier: ClassifierConfig,
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// GET /health - Liveness check
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// POST /api/transactions - Ingest a batch and return the recurring groups
///
/// Malformed items are reported in the `rejected` field without failing
/// the rest of the batch.
async fn ingest_transactions(
    State(state): State<Arc<AppState>>,
    Json(batch): Json<Vec<RawTransaction>>,
) -> Result<Json<IngestOutcome>, AppError> {
    let engine = RecurrenceEngine::with_config(&state.db, &state.db, state.classifier.clone());
    let outcome = engine.ingest(&batch)?;
    Ok(Json(outcome))
}

/// GET /api/recurring - Current recurring groups, sorted by canonical name
async fn list_recurring(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TransactionGroup>>, AppError> {
    let engine = RecurrenceEngine::with_config(&state.db, &state.db, state.classifier.clone());
    let groups = engine.list_recurring()?;
    Ok(Json(groups))
}

async fn not_found() -> AppError {
    AppError::not_found("Route not found")
}

/// Create the application router
pub fn create_router(db: Database, classifier: ClassifierConfig) -> Router {
    let state = Arc::new(AppState { db, classifier });

    let api_routes = Router::new()
        .route("/transactions", post(ingest_transactions))
        .route("/recurring", get(list_recurring));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes)
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the server
pub async fn serve(
    db: Database,
    host: &str,
    port: u16,
    classifier: ClassifierConfig,
) -> anyhow::Result<()> {
    let app = create_router(db, classifier);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}

#[cfg(test)]
mod tests;
