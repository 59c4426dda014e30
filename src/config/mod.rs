//! # Configuration
//!
//! Controller configuration loaded from environment variables at startup.
//!
//! - `controller`: watched resources, downstream endpoints and retry policy
//! - `server`: metrics/probe HTTP server settings

pub mod controller;
pub mod server;

pub use controller::{ConfigError, ControllerConfig, EndpointSource, Endpoints, LogFormat};
pub use server::ServerConfig;
