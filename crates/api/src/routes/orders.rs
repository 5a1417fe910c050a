//! Order endpoints acting on behalf of the calling user.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::OrderId;
use domain::{Order, OrderLineRequest, OrderStatus, OrderSummary};
use saga::{OrderingError, PlacedOrder};
use serde::Deserialize;

use crate::AppState;
use crate::caller::{CurrentCaller, USER_EMAIL_HEADER};
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub lines: Vec<OrderLineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

// -- Handlers --

/// POST /orders/create: places a pending order and returns its payment link.
///
/// The caller's email is required here since notifications go to it.
#[tracing::instrument(skip(state, caller, body), fields(user_id = %caller.user_id))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentCaller(caller): CurrentCaller,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PlacedOrder>), ApiError> {
    if caller.email.is_empty() {
        return Err(ApiError::Unauthorized(format!(
            "missing {USER_EMAIL_HEADER} header"
        )));
    }
    let Json(req) = body?;
    let placed = state.orchestrator.create_order(&caller, &req.lines).await?;
    Ok((StatusCode::CREATED, Json(placed)))
}

/// GET /orders/all: the caller's orders, newest first.
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.user_id))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    CurrentCaller(caller): CurrentCaller,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    Ok(Json(state.orchestrator.get_all_orders(&caller).await?))
}

/// GET /orders/{id}: one order with current product detail on each line.
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.user_id))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id = parse_order_id(&id)?;
    Ok(Json(state.orchestrator.get_order_by_id(&caller, order_id).await?))
}

/// PUT /orders/cancel/{id}
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.user_id))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id = parse_order_id(&id)?;
    Ok(Json(state.orchestrator.cancel_order_as(&caller, order_id).await?))
}

/// POST /orders/update-status/delivering/{id}
pub async fn mark_delivering(
    state: State<Arc<AppState>>,
    caller: CurrentCaller,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    set_status(state, caller, &id, OrderStatus::Delivering).await
}

/// POST /orders/update-status/delivered/{id}
pub async fn mark_delivered(
    state: State<Arc<AppState>>,
    caller: CurrentCaller,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    set_status(state, caller, &id, OrderStatus::Delivered).await
}

/// PUT /orders/{id}/status: `{"status": "..."}`.
pub async fn update_status(
    state: State<Arc<AppState>>,
    caller: CurrentCaller,
    Path(id): Path<String>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<Order>, ApiError> {
    let Json(req) = body?;
    let target = OrderStatus::parse(&req.status).ok_or_else(|| {
        OrderingError::Validation(format!("unknown order status {:?}", req.status))
    })?;
    set_status(state, caller, &id, target).await
}

#[tracing::instrument(skip(state, caller), fields(user_id = %caller.user_id))]
async fn set_status(
    State(state): State<Arc<AppState>>,
    CurrentCaller(caller): CurrentCaller,
    id: &str,
    target: OrderStatus,
) -> Result<Json<Order>, ApiError> {
    let order_id = parse_order_id(id)?;
    let order = state
        .orchestrator
        .update_order_status(&caller, order_id, target)
        .await?;
    Ok(Json(order))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    OrderId::parse(id).map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))
}
