//! HTTP transport: a single JSON-RPC POST endpoint over the six query
//! methods in [`crate::handlers`].

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tracing::{debug, error, info};

use crate::error::RpcError;
use crate::handlers::{dispatch, AppState};
use crate::types::JsonRpcResponse;

async fn rpc_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<crate::types::JsonRpcRequest>,
) -> Json<JsonRpcResponse> {
    match dispatch(&state, &request.method, &request.params) {
        Ok(result) => Json(JsonRpcResponse::result(request.id, result)),
        Err(err) => {
            // Not-found and unpack failures are an ordinary part of the
            // query surface, never logged as errors; only a genuine store
            // failure is worth an error-level log.
            match &err {
                RpcError::State(_) => {
                    error!(method = %request.method, error = %err, "rpc request failed");
                }
                _ => {
                    debug!(method = %request.method, error = %err, "rpc request returned a client error");
                }
            }
            Json(JsonRpcResponse::error(request.id, err.code(), err.to_string()))
        }
    }
}

/// Serves the query API at `endpoint` until the process is interrupted.
/// `state` is shared with nothing else but its own `Arc`; the ingestion
/// task owns its caches separately and only exchanges the watermark with
/// this server through `AppState::block_height`.
pub async fn serve(endpoint: SocketAddr, state: Arc<AppState>) -> Result<(), std::io::Error> {
    let app = Router::new()
        .route("/", post(rpc_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(endpoint).await?;
    info!(%endpoint, "query server listening");
    axum::serve(listener, app).await
}
