//! Inventory reservation for the order saga.
//!
//! Stock is owned exclusively by this crate. A reservation covers a whole set
//! of lines and is applied all-or-nothing; [`InventoryService::unreserve`] is
//! its compensating action.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod retry;
pub mod rpc;
pub mod service;

pub use error::{InventoryError, Result};
pub use memory::InMemoryInventory;
pub use postgres::PostgresInventory;
pub use retry::{RetryPolicy, RetryingInventory};
pub use rpc::{HttpInventoryClient, ReserveRequest, ReserveResponse, RpcLine};
pub use service::{InventoryService, ProductCatalog, ReservationItem, merge_items};
