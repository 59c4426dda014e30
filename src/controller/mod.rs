//! # Controller
//!
//! Core controller modules for the tenant sync controller.
//!
//! - `reconciler`: Core reconciliation logic and retry policy
//! - `server`: HTTP server for metrics and health checks

pub mod reconciler;
pub mod server;
