//! Reservation RPC: wire types shared by the HTTP endpoint and its client.
//!
//! `POST {base}/inventory/reserve` and `POST {base}/inventory/unreserve` both
//! take `{"products": [{"product_id", "quantity"}]}` and answer
//! `{"success": bool}`, with an error code and message on failure.

use async_trait::async_trait;
use common::ProductId;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::{InventoryError, InventoryService, ReservationItem, Result};

pub const RESERVE_PATH: &str = "/inventory/reserve";
pub const UNRESERVE_PATH: &str = "/inventory/unreserve";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveRequest {
    pub products: Vec<RpcLine>,
}

impl ReserveRequest {
    pub fn from_items(items: &[ReservationItem]) -> Self {
        Self {
            products: items
                .iter()
                .map(|item| RpcLine {
                    product_id: item.product_id,
                    quantity: item.quantity,
                })
                .collect(),
        }
    }

    pub fn into_items(self) -> Vec<ReservationItem> {
        self.products
            .into_iter()
            .map(|line| ReservationItem::new(line.product_id, line.quantity))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
}

impl ReserveResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            code: None,
            error: None,
            product_id: None,
        }
    }

    /// Builds the failure body and status an endpoint answers with.
    pub fn from_error(err: &InventoryError) -> (StatusCode, Self) {
        let (status, code, product_id) = match err {
            InventoryError::ProductNotFound(id) => (StatusCode::NOT_FOUND, "not_found", Some(*id)),
            InventoryError::OutOfStock(id) => (StatusCode::CONFLICT, "out_of_stock", Some(*id)),
            InventoryError::InsufficientStock { product_id, .. } => {
                (StatusCode::CONFLICT, "insufficient_stock", Some(*product_id))
            }
            InventoryError::Rejected(_) => (StatusCode::CONFLICT, "rejected", None),
            InventoryError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable", None),
            InventoryError::Timeout(_) | InventoryError::Rpc(_) | InventoryError::Database(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", None)
            }
        };

        (
            status,
            Self {
                success: false,
                code: Some(code.to_string()),
                error: Some(err.to_string()),
                product_id,
            },
        )
    }

    /// Interprets an endpoint answer as seen by the client.
    pub fn into_result(self, status: StatusCode) -> Result<()> {
        if status.is_success() && self.success {
            return Ok(());
        }

        let message = self
            .error
            .unwrap_or_else(|| format!("reservation failed with status {status}"));
        match (self.code.as_deref(), self.product_id) {
            (Some("not_found"), Some(id)) => Err(InventoryError::ProductNotFound(id)),
            (Some("out_of_stock"), Some(id)) => Err(InventoryError::OutOfStock(id)),
            (Some("insufficient_stock" | "rejected"), _) => Err(InventoryError::Rejected(message)),
            (Some("unavailable"), _) => Err(InventoryError::Unavailable(message)),
            _ if status == StatusCode::SERVICE_UNAVAILABLE => Err(InventoryError::Unavailable(message)),
            _ if status == StatusCode::CONFLICT => Err(InventoryError::Rejected(message)),
            _ => Err(InventoryError::Rpc(message)),
        }
    }
}

/// Reservation client for an inventory service reached over HTTP.
///
/// Deadlines and retries are left to [`crate::RetryingInventory`].
#[derive(Clone)]
pub struct HttpInventoryClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpInventoryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[tracing::instrument(skip(self, items), fields(lines = items.len()))]
    async fn post(&self, path: &str, items: &[ReservationItem]) -> Result<()> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&ReserveRequest::from_items(items))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    InventoryError::Unavailable(e.to_string())
                } else {
                    InventoryError::Rpc(e.to_string())
                }
            })?;

        let status = response.status();
        match response.json::<ReserveResponse>().await {
            Ok(body) => body.into_result(status),
            Err(_) if status == StatusCode::SERVICE_UNAVAILABLE => {
                Err(InventoryError::Unavailable(format!("HTTP {status}")))
            }
            Err(e) => Err(InventoryError::Rpc(format!("HTTP {status}: {e}"))),
        }
    }
}

#[async_trait]
impl InventoryService for HttpInventoryClient {
    async fn reserve(&self, items: &[ReservationItem]) -> Result<()> {
        self.post(RESERVE_PATH, items).await
    }

    async fn unreserve(&self, items: &[ReservationItem]) -> Result<()> {
        self.post(UNRESERVE_PATH, items).await
    }
}
