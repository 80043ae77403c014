//! OpenFeature provider backed by a [`FlagClient`].
//!
//! Each evaluation scopes the client to the context OpenFeature hands in and
//! goes through `get_flag`. Fallbacks surface as OpenFeature errors, so the
//! OpenFeature client answers with the caller's default.

pub mod convert;

use async_trait::async_trait;
use open_feature::provider::{FeatureProvider, ProviderMetadata, ResolutionDetails};
use open_feature::{
    EvaluationContext as OpenFeatureContext, EvaluationError as OpenFeatureError, StructValue as OpenFeatureStruct,
};
use std::fmt;
use tracing::debug;

use crate::client::FlagClient;
use crate::evaluation::FlagType;
use crate::value::StructValue;

pub const PROVIDER_NAME: &str = "confidence-client";

pub struct OpenFeatureProvider {
    metadata: ProviderMetadata,
    client: FlagClient,
}

impl fmt::Debug for OpenFeatureProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenFeatureProvider")
            .field("name", &self.metadata.name)
            .field("client", &self.client)
            .finish()
    }
}

impl OpenFeatureProvider {
    pub fn new(client: FlagClient) -> Self {
        Self {
            metadata: ProviderMetadata {
                name: PROVIDER_NAME.to_string(),
            },
            client,
        }
    }

    async fn evaluate<T: FlagType>(
        &self,
        flag_key: &str,
        default_value: T,
        context: &OpenFeatureContext,
    ) -> Result<ResolutionDetails<T>, OpenFeatureError> {
        let context = convert::context_from_open_feature(context).map_err(|error| {
            debug!(flag = flag_key, error = %error, "rejecting evaluation context");
            convert::error_to_open_feature(error)
        })?;

        let details = self.client.with_context(context).get_flag(flag_key, default_value).await;
        convert::resolution_details(details)
    }
}

#[async_trait]
impl FeatureProvider for OpenFeatureProvider {
    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    async fn resolve_bool_value(
        &self,
        flag_key: &str,
        evaluation_context: &OpenFeatureContext,
    ) -> Result<ResolutionDetails<bool>, OpenFeatureError> {
        self.evaluate(flag_key, false, evaluation_context).await
    }

    async fn resolve_int_value(
        &self,
        flag_key: &str,
        evaluation_context: &OpenFeatureContext,
    ) -> Result<ResolutionDetails<i64>, OpenFeatureError> {
        self.evaluate(flag_key, 0i64, evaluation_context).await
    }

    async fn resolve_float_value(
        &self,
        flag_key: &str,
        evaluation_context: &OpenFeatureContext,
    ) -> Result<ResolutionDetails<f64>, OpenFeatureError> {
        self.evaluate(flag_key, 0.0f64, evaluation_context).await
    }

    async fn resolve_string_value(
        &self,
        flag_key: &str,
        evaluation_context: &OpenFeatureContext,
    ) -> Result<ResolutionDetails<String>, OpenFeatureError> {
        self.evaluate(flag_key, String::new(), evaluation_context).await
    }

    async fn resolve_struct_value(
        &self,
        flag_key: &str,
        evaluation_context: &OpenFeatureContext,
    ) -> Result<ResolutionDetails<OpenFeatureStruct>, OpenFeatureError> {
        let details = self
            .evaluate(flag_key, StructValue::default(), evaluation_context)
            .await?;

        Ok(ResolutionDetails {
            value: convert::struct_to_open_feature(details.value),
            variant: details.variant,
            reason: details.reason,
            flag_metadata: details.flag_metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, Config, Region};
    use crate::context::EvaluationContext;
    use crate::error::ResolveError;
    use crate::events::MemorySink;
    use crate::resolver::{FlagResolver, ResolvedFlags, StaticResolver};
    use open_feature::{EvaluationErrorCode, EvaluationReason, OpenFeature, Value};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn test_flag() -> StructValue {
        StructValue::default()
            .with_field(
                "struct-key",
                StructValue::default()
                    .with_field("boolean-key", true)
                    .with_field("string-key", "treatment-struct")
                    .with_field("double-key", 123.23)
                    .with_field("integer-key", 23)
                    .with_field(
                        "nested-struct-key",
                        StructValue::default().with_field("nested-boolean-key", true),
                    ),
            )
            .with_field("boolean-key", true)
            .with_field("string-key", "treatment")
            .with_field("double-key", 20.203)
            .with_field("integer-key", 40)
    }

    fn provider() -> OpenFeatureProvider {
        let resolver = StaticResolver::new().with_flag("test-flag", "flags/test-flag/variants/treatment", test_flag());
        let client = FlagClient::with_parts(
            Config::new("valid-key", Region::Global),
            Arc::new(resolver),
            Arc::new(MemorySink::new()),
        )
        .unwrap();

        OpenFeatureProvider::new(client)
    }

    fn context() -> OpenFeatureContext {
        OpenFeatureContext {
            targeting_key: Some("3poj234lknwfklnasflkaflakjlkejelkfjlkj".to_string()),
            custom_fields: HashMap::new(),
        }
    }

    struct DownResolver;

    #[async_trait]
    impl FlagResolver for DownResolver {
        async fn resolve(
            &self,
            _config: &ApiConfig,
            _flags: &[String],
            _context: &EvaluationContext,
        ) -> Result<ResolvedFlags, ResolveError> {
            Err(ResolveError::Status {
                status: 503,
                body: "unavailable".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_resolve_boolean_value() {
        let details = provider()
            .resolve_bool_value("test-flag.boolean-key", &context())
            .await
            .unwrap();

        assert!(details.value);
        assert_eq!(details.reason, Some(EvaluationReason::TargetingMatch));
        assert_eq!(details.variant.as_deref(), Some("flags/test-flag/variants/treatment"));
    }

    #[tokio::test]
    async fn test_resolve_nested_values() {
        let provider = provider();

        let nested = provider
            .resolve_bool_value("test-flag.struct-key.boolean-key", &context())
            .await
            .unwrap();
        assert!(nested.value);

        let double_nested = provider
            .resolve_bool_value("test-flag.struct-key.nested-struct-key.nested-boolean-key", &context())
            .await
            .unwrap();
        assert!(double_nested.value);

        let number = provider
            .resolve_float_value("test-flag.struct-key.double-key", &context())
            .await
            .unwrap();
        assert_eq!(number.value, 123.23);
    }

    #[tokio::test]
    async fn test_resolve_whole_object() {
        let details = provider().resolve_struct_value("test-flag", &context()).await.unwrap();

        assert_eq!(details.value.fields.len(), 5);
        assert_eq!(details.value.fields["integer-key"], Value::Int(40));
        match &details.value.fields["struct-key"] {
            Value::Struct(inner) => assert_eq!(inner.fields["integer-key"], Value::Int(23)),
            other => panic!("expected struct, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_type_mismatch_is_reported() {
        let error = provider()
            .resolve_int_value("test-flag.string-key", &context())
            .await
            .unwrap_err();

        assert_eq!(error.code, EvaluationErrorCode::TypeMismatch);
    }

    #[tokio::test]
    async fn test_unknown_flag_is_reported() {
        let error = provider()
            .resolve_string_value("other-flag.string-key", &context())
            .await
            .unwrap_err();

        assert_eq!(error.code, EvaluationErrorCode::FlagNotFound);
    }

    #[tokio::test]
    async fn test_backend_failure_is_general_error() {
        let client = FlagClient::with_parts(
            Config::new("valid-key", Region::Global),
            Arc::new(DownResolver),
            Arc::new(MemorySink::new()),
        )
        .unwrap();
        let provider = OpenFeatureProvider::new(client);

        let error = provider
            .resolve_string_value("test-flag.string-key", &context())
            .await
            .unwrap_err();

        assert!(matches!(error.code, EvaluationErrorCode::General(ref message) if message.contains("503")));
    }

    #[tokio::test]
    async fn test_open_feature_client_uses_provider() {
        let client = {
            let mut api = OpenFeature::singleton_mut().await;
            api.set_provider(provider()).await;
            api.create_client()
        };

        let value = client
            .get_bool_value("test-flag.struct-key.boolean-key", Some(&context()), None)
            .await
            .unwrap();
        assert!(value);

        assert_eq!(provider().metadata().name, PROVIDER_NAME);
    }
}
