use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use super::{FlagResolver, ResolveRequest, ResolveResponse, ResolvedFlags, Sdk};
use crate::config::{ApiConfig, Config};
use crate::context::EvaluationContext;
use crate::error::{ConfigurationError, ResolveError};

/// Resolves flags against the remote resolver over HTTP.
///
/// The underlying client has no overall timeout. `FlagClient` bounds every
/// resolution with its own deadline, which may be longer than the configured
/// one; `with_request_timeout` caps requests when used on its own.
#[derive(Clone, Debug)]
pub struct HttpResolver {
    client: reqwest::Client,
    base_url: String,
    request_timeout: Option<Duration>,
}

impl HttpResolver {
    pub fn new(base_url: &str) -> Result<Self, ConfigurationError> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout: None,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigurationError> {
        Self::new(config.resolver_url())
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1/flags:resolve", self.base_url)
    }
}

#[async_trait]
impl FlagResolver for HttpResolver {
    async fn resolve(
        &self,
        config: &ApiConfig,
        flags: &[String],
        context: &EvaluationContext,
    ) -> Result<ResolvedFlags, ResolveError> {
        let request = ResolveRequest {
            client_secret: config.api_key.clone(),
            apply: true,
            evaluation_context: context.to_json_map(),
            flags: flags.to_vec(),
            sdk: Sdk::default(),
        };

        debug!(flags = ?flags, endpoint = %self.endpoint(), "resolving flags");

        let mut builder = self
            .client
            .post(self.endpoint())
            .header("Accept", "application/json")
            .json(&request);
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "resolver rejected request");
            return Err(ResolveError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let resolved: ResolveResponse = serde_json::from_str(&body)?;
        Ok(resolved.into())
    }
}
