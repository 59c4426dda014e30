//! # Resource Client
//!
//! The HTTP seam between the reconcilers and the downstream REST APIs.
//!
//! Reconcilers only see [`ResourceClient`]; production uses
//! [`RestResourceClient`], tests substitute a scripted client.

mod rest;

pub use rest::RestResourceClient;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Basic-auth credentials attached to a request
#[derive(Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: Zeroizing<String>,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: &str) -> Self {
        Self {
            username: username.into(),
            password: Zeroizing::new(password.to_string()),
        }
    }
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ResourceRequest {
    pub method: Method,
    pub url: String,
    /// Sent as `application/json` when present
    pub body: Option<Value>,
    pub basic_auth: Option<BasicAuth>,
}

impl ResourceRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            basic_auth: None,
        }
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn basic_auth(mut self, auth: BasicAuth) -> Self {
        self.basic_auth = Some(auth);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceResponse {
    pub status: u16,
    pub body: String,
}

impl ResourceResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Build(String),
    #[error("{method} {url} timed out")]
    Timeout { method: Method, url: String },
    #[error("{method} {url} failed: {message}")]
    Transport {
        method: Method,
        url: String,
        message: String,
    },
}

/// Issues one HTTP request and returns status and body
///
/// Any status code is a successful call; only failures to get a response at
/// all are errors.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    async fn send(&self, request: ResourceRequest) -> Result<ResourceResponse, ClientError>;
}
