//! REST API server for powledger
//!
//! Serves the `GET /chain` contract other nodes use during conflict
//! resolution, plus endpoints to submit transactions, mine, and manage peers.

use axum::{
    extract::{Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::blockchain::Block;
use crate::error::ChainError;
use crate::node::Node;
use crate::peers::normalize_address;
use crate::sync::ChainResponse;
use crate::transaction::Transaction;

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BlockchainError(ChainError),
    InvalidInput(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BlockchainError(e) => {
                let status = match &e {
                    ChainError::StaleTip { .. } => StatusCode::CONFLICT,
                    ChainError::MiningCancelled => StatusCode::SERVICE_UNAVAILABLE,
                    ChainError::InvalidProofOfWork(_) | ChainError::InvalidBlockLinkage(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        ApiError::BlockchainError(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
pub struct TransactionResponse {
    pub message: String,
    pub index: u64,
}

#[derive(Serialize)]
pub struct MineResponse {
    pub message: String,
    pub block: Block,
}

#[derive(Deserialize)]
pub struct RegisterNodesRequest {
    #[serde(default)]
    pub nodes: Vec<String>,
}

#[derive(Serialize)]
pub struct RegisterNodesResponse {
    pub message: String,
    pub added: Vec<String>,
    pub rejected: Vec<String>,
    pub total_nodes: Vec<String>,
}

#[derive(Serialize)]
pub struct ResolveResponse {
    pub message: String,
    pub replaced: bool,
    pub chain: Vec<Block>,
}

// ============================================================================
// Middleware
// ============================================================================

/// Logs method, path, status and duration for every request.
async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the API router with all endpoints
pub fn build_api_router(node: Arc<Node>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE]);

    Router::new()
        // Chain endpoints
        .route("/chain", get(full_chain))
        .route("/mine", post(mine))
        // Transaction endpoints
        .route("/transactions/new", post(new_transaction))
        .route("/transactions/pending", get(pending_transactions))
        // Peer endpoints
        .route("/nodes", get(list_nodes))
        .route("/nodes/register", post(register_nodes))
        .route("/nodes/resolve", get(resolve_nodes))
        // System endpoints
        .route("/health", get(health_check))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(node)
        .layer(cors)
}

/// Serve the API until the node shuts down.
pub async fn run_api_server(node: Arc<Node>) -> Result<(), ChainError> {
    let bind = format!(
        "{}:{}",
        node.config.network.bind_address, node.config.network.api_port
    );
    let addr: SocketAddr = bind
        .parse()
        .map_err(|e| ChainError::ConfigError(format!("invalid bind address {}: {}", bind, e)))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");

    let shutdown = node.shutdown_token();
    let app = build_api_router(node);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn full_chain(State(node): State<Arc<Node>>) -> Json<ChainResponse> {
    Json(node.chain_snapshot().await)
}

async fn mine(State(node): State<Arc<Node>>) -> Result<Json<MineResponse>, ApiError> {
    let block = node.mine().await?;
    Ok(Json(MineResponse {
        message: format!("New block {} forged", block.index),
        block,
    }))
}

async fn new_transaction(
    State(node): State<Arc<Node>>,
    Json(tx): Json<Transaction>,
) -> Result<impl IntoResponse, ApiError> {
    let index = node.register_transaction(tx).await?;
    Ok((
        StatusCode::CREATED,
        Json(TransactionResponse {
            message: format!("Transaction will be added to block {}", index),
            index,
        }),
    ))
}

async fn pending_transactions(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let pending = node.ledger.read().await.pending_transactions().to_vec();
    Json(serde_json::json!({
        "count": pending.len(),
        "transactions": pending,
    }))
}

fn sorted_nodes(node: &Node) -> Vec<String> {
    let mut nodes: Vec<String> = node.peers.all().into_iter().collect();
    nodes.sort();
    nodes
}

async fn list_nodes(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let nodes = sorted_nodes(&node);
    Json(serde_json::json!({
        "count": nodes.len(),
        "nodes": nodes,
    }))
}

async fn register_nodes(
    State(node): State<Arc<Node>>,
    Json(req): Json<RegisterNodesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.nodes.is_empty() {
        return Err(ApiError::InvalidInput(
            "Please supply a valid list of nodes".to_string(),
        ));
    }

    let mut added = Vec::new();
    let mut rejected = Vec::new();
    for address in req.nodes {
        match normalize_address(&address) {
            Some(normalized) => {
                if node.register_peer(&normalized) {
                    added.push(normalized);
                }
            }
            None => rejected.push(address),
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(RegisterNodesResponse {
            message: format!("{} new node(s) have been added", added.len()),
            added,
            rejected,
            total_nodes: sorted_nodes(&node),
        }),
    ))
}

async fn resolve_nodes(State(node): State<Arc<Node>>) -> Result<Json<ResolveResponse>, ApiError> {
    let replaced = node.resolve_conflicts().await?;
    let chain = node.ledger.read().await.chain().to_vec();
    let message = if replaced {
        "Our chain was replaced"
    } else {
        "Our chain is authoritative"
    };

    Ok(Json(ResolveResponse {
        message: message.to_string(),
        replaced,
        chain,
    }))
}

async fn health_check(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let height = node.ledger.read().await.len();
    let (status, label) = if node.is_shutting_down() {
        (StatusCode::SERVICE_UNAVAILABLE, "shutting_down")
    } else {
        (StatusCode::OK, "healthy")
    };

    (
        status,
        Json(serde_json::json!({
            "status": label,
            "height": height,
            "peers": node.peers.len(),
            "blocks_mined": node.blocks_mined(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}
