//! Client for resolving feature flags and tracking events.
//!
//! ```no_run
//! use std::collections::HashMap;
//! use confidence_client::{Config, EvaluationContext, FlagClient, Region};
//!
//! # async fn run() -> Result<(), confidence_client::ConfigurationError> {
//! let root = FlagClient::initialize(Config::new("CLIENT_SECRET", Region::EU))?;
//! let client = root.with_context(EvaluationContext::new().with_targeting_key("uuid-1234"));
//!
//! client.track("navigate", HashMap::new());
//! let color = client.resolve_string("hawkflag.color", "false").await;
//! println!("Flag value: {}", color);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod evaluation;
pub mod events;
pub mod logging;
pub mod provider;
pub mod resolver;
pub mod value;

pub use client::FlagClient;
pub use config::{ApiConfig, Config, Region};
pub use context::{EvaluationContext, IdGenerator, RandomNumberGenerator, SequentialIdGenerator, UuidGenerator};
pub use error::{ConfigurationError, ErrorCode, EvaluationError, PublishError, ResolveError};
pub use evaluation::{EvaluationDetails, EvaluationReason, FlagType};
pub use events::{Event, EventSink, HttpEventSink, MemorySink};
pub use provider::OpenFeatureProvider;
pub use resolver::{FlagResolver, HttpResolver, StaticResolver};
pub use value::{FlagValue, StructValue};
