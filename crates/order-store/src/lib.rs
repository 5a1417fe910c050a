//! Order persistence.
//!
//! [`OrderStore`] is implemented in memory for tests and local runs, and on
//! PostgreSQL via sqlx.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use store::{OrderStore, Transition};
