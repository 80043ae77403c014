use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{ApiConfig, Config};
use crate::context::EvaluationContext;
use crate::error::{ConfigurationError, ResolveError};
use crate::evaluation::{evaluate_flag, EvaluationDetails, FlagKey, FlagType, Resolution};
use crate::events::{Event, EventPublisher, EventSink, HttpEventSink};
use crate::resolver::{FlagResolver, HttpResolver};
use crate::value::{FlagValue, StructValue};

/// Handle for resolving flags and tracking events under one context.
///
/// Cloning is cheap: the resolver and the event publisher are shared. A
/// handle's context is fixed at construction; `with_context` returns a new
/// handle and leaves the receiver as it was.
#[derive(Clone)]
pub struct FlagClient {
    api: ApiConfig,
    context: EvaluationContext,
    resolver: Arc<dyn FlagResolver>,
    publisher: EventPublisher,
    resolve_timeout: Duration,
}

impl FlagClient {
    /// Builds a client talking to the regional resolver and the events service.
    pub fn initialize(config: Config) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let resolver = HttpResolver::from_config(&config)?;
        let sink = HttpEventSink::new(&config.events_url, config.resolve_timeout)?;

        info!(region = %config.api.region, "flag client initialized");

        Self::with_parts(config, Arc::new(resolver), Arc::new(sink))
    }

    /// Builds a client on top of the given resolver and event sink.
    pub fn with_parts(
        config: Config,
        resolver: Arc<dyn FlagResolver>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let publisher = EventPublisher::start(config.api.api_key.clone(), sink);

        Ok(Self {
            api: config.api,
            context: EvaluationContext::default(),
            resolver,
            publisher,
            resolve_timeout: config.resolve_timeout,
        })
    }

    pub fn with_context(&self, context: EvaluationContext) -> Self {
        Self {
            context,
            ..self.clone()
        }
    }

    pub fn context(&self) -> &EvaluationContext {
        &self.context
    }

    /// Queues an event and returns without waiting for delivery.
    pub fn track(&self, event_name: &str, properties: HashMap<String, FlagValue>) {
        let event = Event::new(event_name, &self.context, &properties);
        debug!(event = event_name, "tracking event");
        self.publisher.publish(event);
    }

    /// Waits for events tracked so far to be handed to the sink.
    pub async fn flush(&self) {
        self.publisher.flush().await;
    }

    pub async fn resolve_string(&self, flag_key: &str, default_value: impl Into<String>) -> String {
        self.resolve(flag_key, default_value.into(), self.resolve_timeout)
            .await
            .into_value()
    }

    pub async fn resolve_string_with_timeout(
        &self,
        flag_key: &str,
        default_value: impl Into<String>,
        timeout: Duration,
    ) -> String {
        self.resolve(flag_key, default_value.into(), timeout)
            .await
            .into_value()
    }

    pub async fn resolve_bool(&self, flag_key: &str, default_value: bool) -> bool {
        self.resolve(flag_key, default_value, self.resolve_timeout)
            .await
            .into_value()
    }

    pub async fn resolve_int(&self, flag_key: &str, default_value: i64) -> i64 {
        self.resolve(flag_key, default_value, self.resolve_timeout)
            .await
            .into_value()
    }

    pub async fn resolve_float(&self, flag_key: &str, default_value: f64) -> f64 {
        self.resolve(flag_key, default_value, self.resolve_timeout)
            .await
            .into_value()
    }

    pub async fn resolve_struct(&self, flag_key: &str, default_value: StructValue) -> StructValue {
        self.resolve(flag_key, default_value, self.resolve_timeout)
            .await
            .into_value()
    }

    /// Like the `resolve_*` functions but keeps variant, reason and error code.
    pub async fn get_flag<T: FlagType>(&self, flag_key: &str, default_value: T) -> EvaluationDetails<T> {
        self.resolve(flag_key, default_value, self.resolve_timeout)
            .await
            .into_details()
    }

    async fn resolve<T: FlagType>(&self, flag_key: &str, default_value: T, timeout: Duration) -> Resolution<T> {
        let resolution = match FlagKey::parse(flag_key) {
            Ok(key) => self.fetch(&key, default_value, timeout).await,
            Err(error) => Resolution::fallback(flag_key, default_value, error),
        };

        if let Some(error) = resolution.error() {
            debug!(flag = flag_key, code = %error.code, error = %error.message, "serving default value");
        }

        resolution
    }

    async fn fetch<T: FlagType>(&self, key: &FlagKey<'_>, default_value: T, timeout: Duration) -> Resolution<T> {
        let flags = [key.resource_name()];
        let response = tokio::time::timeout(timeout, self.resolver.resolve(&self.api, &flags, &self.context)).await;

        match response {
            Ok(Ok(resolved)) => evaluate_flag(key, &resolved.flags, default_value),
            Ok(Err(error)) => Resolution::fallback(key.raw, default_value, error.into()),
            Err(_) => Resolution::fallback(key.raw, default_value, ResolveError::Timeout(timeout).into()),
        }
    }
}

impl fmt::Debug for FlagClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagClient")
            .field("api", &self.api)
            .field("context", &self.context)
            .field("resolve_timeout", &self.resolve_timeout)
            .finish_non_exhaustive()
    }
}
