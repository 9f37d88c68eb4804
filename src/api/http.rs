use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::facade::QueryFacade;
use crate::config::ApiConfig;
use crate::error::ValidationError;
use crate::models::Transaction;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Server error: {0}")]
    Server(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(ValidationError::MissingParameter(_)) => "missing_parameter",
            ApiError::Validation(ValidationError::MalformedBody(_)) => "malformed_body",
            ApiError::Server(_) => "server_error",
        }
    }
}

impl From<ApiError> for StatusCode {
    fn from(error: ApiError) -> Self {
        error.status_code()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Response structure for block endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct BlockResponse {
    pub current_block: u64,
}

/// Request body for subscribe endpoint
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubscribeResponse {
    pub success: bool,
}

/// Response structure for status endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub current_block: u64,
    pub watched_addresses: usize,
}

/// Query parameters for transactions endpoint
#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    pub address: Option<String>,
}

/// Error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub facade: Arc<QueryFacade>,
}

/// Build the HTTP router over the query facade
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/block", get(get_block))
        .route("/subscribe", post(subscribe))
        .route("/transactions", get(get_transactions))
        .route("/status", get(get_status))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// HTTP API server
pub struct ApiServer {
    facade: Arc<QueryFacade>,
    bind_address: String,
}

impl ApiServer {
    pub fn new(facade: Arc<QueryFacade>, config: &ApiConfig) -> Self {
        Self {
            facade,
            bind_address: config.bind_address(),
        }
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    /// Bind the configured address and serve until `shutdown` is cancelled
    pub async fn start(&self, shutdown: CancellationToken) -> Result<(), ApiError> {
        let listener = TcpListener::bind(&self.bind_address)
            .await
            .map_err(|e| ApiError::Server(format!("Failed to bind to {}: {}", self.bind_address, e)))?;

        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` is cancelled
    pub async fn serve(&self, listener: TcpListener, shutdown: CancellationToken) -> Result<(), ApiError> {
        let app = router(AppState {
            facade: self.facade.clone(),
        });

        let local_addr = listener
            .local_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| self.bind_address.clone());
        log::info!("HTTP API server listening on {}", local_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| ApiError::Server(format!("Server error: {}", e)))?;

        log::info!("HTTP API server stopped");
        Ok(())
    }
}

/// GET /block - Highest fully processed block
pub async fn get_block(State(state): State<AppState>) -> Json<BlockResponse> {
    Json(BlockResponse {
        current_block: state.facade.current_block(),
    })
}

/// POST /subscribe - Add an address to the watch list
pub async fn subscribe(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SubscribeResponse>, ApiError> {
    let request: SubscribeRequest = serde_json::from_slice(&body)
        .map_err(|e| ValidationError::MalformedBody(e.to_string()))?;

    Ok(Json(SubscribeResponse {
        success: state.facade.subscribe(&request.address),
    }))
}

/// GET /transactions - Recorded transactions touching an address
pub async fn get_transactions(
    Query(params): Query<TransactionsQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let address = match params.address {
        Some(address) if !address.is_empty() => address,
        _ => return Err(ValidationError::MissingParameter("address".to_string()).into()),
    };

    Ok(Json(state.facade.transactions_for(&address)))
}

/// GET /status - Sync progress and watch list size
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let status = state.facade.status();
    Json(StatusResponse {
        status: "ok".to_string(),
        current_block: status.current_block,
        watched_addresses: status.watched_addresses,
    })
}
