//! API Module
//!
//! HTTP surface of the share driver: share and snapshot lifecycle calls,
//! backend stats, health and Prometheus metrics.

pub mod rest;
pub mod server;

pub use rest::*;
pub use server::*;
