use dotenvy::dotenv;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigurationError;

pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_millis(3000);
pub const DEFAULT_EVENTS_URL: &str = "https://events.confidence.dev";

/// Deployment region of the resolver service.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Region {
    EU,
    US,
    #[default]
    Global,
}

impl Region {
    pub fn url(&self) -> &'static str {
        match self {
            Region::EU => "https://resolver.eu.confidence.dev",
            Region::US => "https://resolver.us.confidence.dev",
            Region::Global => "https://resolver.confidence.dev",
        }
    }
}

impl FromStr for Region {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eu" => Ok(Region::EU),
            "us" => Ok(Region::US),
            "global" | "" => Ok(Region::Global),
            other => Err(ConfigurationError::UnknownRegion(other.to_string())),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::EU => f.write_str("eu"),
            Region::US => f.write_str("us"),
            Region::Global => f.write_str("global"),
        }
    }
}

/// Credential and region, the two things every backend call needs.
#[derive(Clone, Eq, PartialEq)]
pub struct ApiConfig {
    pub api_key: String,
    pub region: Region,
}

impl ApiConfig {
    pub fn new(api_key: impl Into<String>, region: Region) -> Self {
        Self {
            api_key: api_key.into(),
            region,
        }
    }
}

// The client secret must never end up in logs.
impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_key", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub api: ApiConfig,
    pub resolve_timeout: Duration,
    /// Overrides the region resolver URL.
    pub resolver_url: Option<String>,
    pub events_url: String,
}

impl Config {
    pub fn new(api_key: impl Into<String>, region: Region) -> Self {
        Self {
            api: ApiConfig::new(api_key, region),
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
            resolver_url: None,
            events_url: DEFAULT_EVENTS_URL.to_string(),
        }
    }

    /// Reads the configuration from the process environment, loading `.env` first.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let _ = dotenv().is_ok();

        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("CONFIDENCE_CLIENT_SECRET").ok_or(ConfigurationError::MissingCredential)?;

        let region = match lookup("CONFIDENCE_REGION") {
            Some(region) => region.parse()?,
            None => Region::default(),
        };

        let resolve_timeout = match lookup("CONFIDENCE_RESOLVE_TIMEOUT_MS") {
            Some(raw) => {
                let millis: u64 = raw.trim().parse().map_err(|_| ConfigurationError::InvalidSetting {
                    name: "CONFIDENCE_RESOLVE_TIMEOUT_MS".to_string(),
                    message: format!("'{}' is not a valid number of milliseconds", raw),
                })?;
                Duration::from_millis(millis)
            }
            None => DEFAULT_RESOLVE_TIMEOUT,
        };

        let resolver_url = lookup("CONFIDENCE_RESOLVER_URL").filter(|url| !url.trim().is_empty());
        let events_url = lookup("CONFIDENCE_EVENTS_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_EVENTS_URL.to_string());

        Ok(Self {
            api: ApiConfig::new(api_key, region),
            resolve_timeout,
            resolver_url,
            events_url,
        })
    }

    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    pub fn with_resolver_url(mut self, url: impl Into<String>) -> Self {
        self.resolver_url = Some(url.into());
        self
    }

    pub fn with_events_url(mut self, url: impl Into<String>) -> Self {
        self.events_url = url.into();
        self
    }

    pub fn resolver_url(&self) -> &str {
        self.resolver_url
            .as_deref()
            .unwrap_or_else(|| self.api.region.url())
            .trim_end_matches('/')
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_client_secret(&self.api.api_key)?;

        if self.resolve_timeout.is_zero() {
            return Err(ConfigurationError::InvalidSetting {
                name: "resolve_timeout".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

// HELPER FUNCTIONS

/// Checks the client secret is usable as a credential.
pub fn validate_client_secret(secret: &str) -> Result<(), ConfigurationError> {
    if secret.trim().is_empty() {
        return Err(ConfigurationError::MissingCredential);
    }

    if secret.len() > 256 {
        return Err(ConfigurationError::MalformedCredential(
            "longer than 256 characters".to_string(),
        ));
    }

    if secret.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ConfigurationError::MalformedCredential(
            "contains whitespace or control characters".to_string(),
        ));
    }

    Ok(())
}
