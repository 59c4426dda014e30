//! reqwest implementation of [`ResourceClient`]
//!
//! Uses rustls, a per-request timeout and optional acceptance of invalid
//! downstream certificates.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, Instrument};

use super::{ClientError, Method, ResourceClient, ResourceRequest, ResourceResponse};

pub struct RestResourceClient {
    http_client: Client,
    timeout: Duration,
}

impl std::fmt::Debug for RestResourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestResourceClient")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RestResourceClient {
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built
    pub fn new(timeout: Duration, insecure_skip_tls_verify: bool) -> Result<Self, ClientError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(insecure_skip_tls_verify)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;

        Ok(Self {
            http_client,
            timeout,
        })
    }

    fn make_request(&self, request: &ResourceRequest) -> reqwest::RequestBuilder {
        let mut builder = match request.method {
            Method::Get => self.http_client.get(&request.url),
            Method::Post => self.http_client.post(&request.url),
            Method::Put => self.http_client.put(&request.url),
        };

        if let Some(auth) = &request.basic_auth {
            builder = builder.basic_auth(&auth.username, Some(auth.password.as_str()));
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        builder
    }
}

#[async_trait]
impl ResourceClient for RestResourceClient {
    async fn send(&self, request: ResourceRequest) -> Result<ResourceResponse, ClientError> {
        let span = tracing::debug_span!(
            "http.request",
            method = request.method.as_str(),
            url = %request.url
        );

        async {
            let to_error = |e: reqwest::Error| {
                if e.is_timeout() {
                    ClientError::Timeout {
                        method: request.method,
                        url: request.url.clone(),
                    }
                } else {
                    ClientError::Transport {
                        method: request.method,
                        url: request.url.clone(),
                        message: e.to_string(),
                    }
                }
            };

            let response = self.make_request(&request).send().await.map_err(to_error)?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(to_error)?;
            debug!(status, "http.response");

            Ok(ResourceResponse { status, body })
        }
        .instrument(span)
        .await
    }
}
