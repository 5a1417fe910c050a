//! Domain layer for the order system.
//!
//! This crate provides:
//! - `Order` / `OrderLine` records with price snapshots
//! - `OrderStatus` state machine
//! - `Product` detail used for pricing and display

pub mod order;
pub mod product;

pub use order::{
    Order, OrderError, OrderLine, OrderLineRequest, OrderStatus, OrderSummary, validate_lines,
};
pub use product::Product;
