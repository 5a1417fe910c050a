//! HTTP handlers grouped by surface.

pub mod health;
pub mod inventory;
pub mod metrics;
pub mod orders;
pub mod webhook;
