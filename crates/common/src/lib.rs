//! Shared identifiers and value types used across the order workspace.

pub mod money;
pub mod types;

pub use money::Money;
pub use types::{OrderId, ProductId, Role, UserId};
