use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use crate::value::FlagValue;

pub const TARGETING_KEY: &str = "targeting_key";

/// Attributes the backend uses to pick a variant.
///
/// Built once, then handed to a client by value. There is no way to change
/// a context in place: every `with_*` call consumes it and returns a new one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvaluationContext {
    fields: HashMap<String, FlagValue>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context holding only a targeting key taken from `generator`.
    pub fn generated(generator: &dyn IdGenerator) -> Self {
        Self::new().with_targeting_key(generator.generate())
    }

    #[must_use]
    pub fn with_targeting_key(self, key: impl Into<String>) -> Self {
        self.with_field(TARGETING_KEY, key.into())
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FlagValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn targeting_key(&self) -> Option<&str> {
        self.fields.get(TARGETING_KEY).and_then(FlagValue::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&FlagValue> {
        self.fields.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn to_json_map(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect()
    }
}

impl From<HashMap<String, FlagValue>> for EvaluationContext {
    fn from(fields: HashMap<String, FlagValue>) -> Self {
        Self { fields }
    }
}

impl<K, V> FromIterator<(K, V)> for EvaluationContext
where
    K: Into<String>,
    V: Into<FlagValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// IDENTIFIERS

/// Source of targeting identifiers.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random UUID v4, the default.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Random unsigned 64 bit number rendered in decimal, used for visitor ids.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomNumberGenerator;

impl IdGenerator for RandomNumberGenerator {
    fn generate(&self) -> String {
        rand::random::<u64>().to_string()
    }
}

/// Deterministic ids: `prefix-1`, `prefix-2`, ...
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}
