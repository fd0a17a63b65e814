//! HTTP surface: one router over the chain, token, user and miner
//! handlers, plus the error-to-status mapping they all share.

use axum::{
    Router,
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
};
use chrono::Utc;
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use spyglass_chain::{ChainError, ConnectionState};

use crate::AppState;
use crate::{blockchain, miners, tokens, users};

// ── Error helper ─────────────────────────────────────────────────────────────

pub(crate) struct ApiError(anyhow::Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.downcast_ref::<ChainError>() {
            Some(ChainError::Validation { .. }) => StatusCode::BAD_REQUEST,
            Some(ChainError::NotFound(_)) => StatusCode::NOT_FOUND,
            Some(ChainError::Connection(_) | ChainError::Rpc(_)) => StatusCode::BAD_GATEWAY,
            Some(ChainError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            None => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({ "success": false, "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(e: E) -> Self {
        ApiError(e.into())
    }
}

pub(crate) type ApiResult<T> = Result<Json<T>, ApiError>;

// ── Router ───────────────────────────────────────────────────────────────────

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/reconnect", post(reconnect))
        .route("/api/blockchain/status", get(blockchain::status))
        .route("/api/blockchain/blocks", get(blockchain::blocks))
        .route("/api/blockchain/blocks/latest", get(blockchain::latest_block))
        .route("/api/blockchain/blocks/{height}", get(blockchain::block_by_height))
        .route("/api/blockchain/validators", get(blockchain::validators))
        .route("/api/blockchain/network", get(blockchain::network))
        .route("/api/blockchain/search/{query}", get(blockchain::search))
        .route("/api/tokens/transfer", post(tokens::transfer))
        .route("/api/tokens/mint", post(tokens::mint))
        .route("/api/tokens/info/{denom}", get(tokens::info))
        .route("/api/tokens/transactions", get(tokens::transactions))
        .route("/api/tokens/transaction/{hash}", get(tokens::transaction))
        .route("/api/users/create", post(users::create))
        .route("/api/users", get(users::list))
        .route("/api/users/{id}", get(users::detail))
        .route("/api/users/{id}/balance", get(users::balance))
        .route("/api/users/address/{address}", get(users::by_address))
        .route("/api/miners/register", post(miners::register))
        .route("/api/miners", get(miners::list))
        .route("/api/miners/{id}", get(miners::detail))
        .route("/api/miners/{id}/mine", post(miners::mine))
        .route("/api/miners/{id}/status", put(miners::set_status))
        .route("/api/miners/stats/overview", get(miners::overview))
        .route("/api/miners/{id}/history", get(miners::history))
        .fallback(not_found)
        .layer(cors)
        .with_state(state)
}

// ── /health ──────────────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> Json<Value> {
    let conn = state.dispatcher.manager().state();
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "connection": conn.to_string(),
        "connected": conn == ConnectionState::Connected,
    }))
}

// ── /api/reconnect ───────────────────────────────────────────────────────────

async fn reconnect(State(state): State<AppState>) -> Json<Value> {
    info!("manual reconnect requested");
    let outcome = state.dispatcher.manager().reconnect().await;
    Json(json!({
        "success": outcome.is_some(),
        "state": state.dispatcher.manager().state().to_string(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

// ── Fallback ─────────────────────────────────────────────────────────────────

async fn not_found(uri: Uri) -> impl IntoResponse {
    let body = json!({ "success": false, "error": format!("no route for {uri}") });
    (StatusCode::NOT_FOUND, Json(body))
}
