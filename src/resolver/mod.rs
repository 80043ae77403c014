pub mod http;
pub mod schema;
pub mod local;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::ApiConfig;
use crate::context::EvaluationContext;
use crate::error::ResolveError;
use crate::value::FlagValue;

pub use http::HttpResolver;
pub use local::StaticResolver;
pub use schema::{FlagSchema, SchemaType};

pub const SDK_ID: &str = "SDK_ID_RUST_CONFIDENCE";

pub fn sdk_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Backend able to resolve flags for a context.
#[async_trait]
pub trait FlagResolver: Send + Sync {
    /// `flags` holds resource names, e.g. `flags/hawkflag`.
    async fn resolve(
        &self,
        config: &ApiConfig,
        flags: &[String],
        context: &EvaluationContext,
    ) -> Result<ResolvedFlags, ResolveError>;
}

// MODELS

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedFlags {
    pub resolve_token: String,
    pub flags: Vec<ResolvedFlag>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFlag {
    pub flag: String,
    pub variant: Option<String>,
    /// `None` when no variant was assigned.
    pub value: Option<FlagValue>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sdk {
    pub id: String,
    pub version: String,
}

impl Default for Sdk {
    fn default() -> Self {
        Self {
            id: SDK_ID.to_string(),
            version: sdk_version().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub client_secret: String,
    pub apply: bool,
    pub evaluation_context: Map<String, Value>,
    pub flags: Vec<String>,
    pub sdk: Sdk,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    #[serde(default)]
    pub resolved_flags: Vec<NetworkResolvedFlag>,
    #[serde(default)]
    pub resolve_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkResolvedFlag {
    pub flag: String,
    #[serde(default)]
    pub variant: String,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub flag_schema: Option<FlagSchema>,
}

impl From<NetworkResolvedFlag> for ResolvedFlag {
    fn from(flag: NetworkResolvedFlag) -> Self {
        let value = schema::decode_flag_value(flag.value.as_ref(), flag.flag_schema.as_ref());
        let variant = Some(flag.variant).filter(|variant| !variant.is_empty());

        ResolvedFlag {
            flag: flag.flag,
            variant,
            value,
            reason: flag.reason,
        }
    }
}

impl From<ResolveResponse> for ResolvedFlags {
    fn from(response: ResolveResponse) -> Self {
        ResolvedFlags {
            resolve_token: response.resolve_token,
            flags: response.resolved_flags.into_iter().map(Into::into).collect(),
        }
    }
}
