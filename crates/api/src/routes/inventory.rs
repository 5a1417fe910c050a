//! Reservation RPC served from the local inventory adapter.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use inventory::{ReserveRequest, ReserveResponse};

use crate::AppState;
use crate::error::ApiError;

type RpcResult = Result<(StatusCode, Json<ReserveResponse>), ApiError>;

/// POST /inventory/reserve: all-or-nothing reservation of a line batch.
#[tracing::instrument(skip(state, body))]
pub async fn reserve(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ReserveRequest>, JsonRejection>,
) -> RpcResult {
    let Json(req) = body?;
    let result = state.inventory.reserve(&req.into_items()).await;
    Ok(respond(result))
}

/// POST /inventory/unreserve: gives a reserved batch back.
#[tracing::instrument(skip(state, body))]
pub async fn unreserve(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ReserveRequest>, JsonRejection>,
) -> RpcResult {
    let Json(req) = body?;
    let result = state.inventory.unreserve(&req.into_items()).await;
    Ok(respond(result))
}

fn respond(result: inventory::Result<()>) -> (StatusCode, Json<ReserveResponse>) {
    match result {
        Ok(()) => (StatusCode::OK, Json(ReserveResponse::ok())),
        Err(e) => {
            let (status, body) = ReserveResponse::from_error(&e);
            if status.is_server_error() {
                tracing::error!(error = %e, "reservation endpoint failed");
            }
            (status, Json(body))
        }
    }
}
