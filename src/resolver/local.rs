use async_trait::async_trait;
use std::collections::HashMap;

use super::{FlagResolver, ResolvedFlag, ResolvedFlags};
use crate::config::ApiConfig;
use crate::context::EvaluationContext;
use crate::error::ResolveError;
use crate::value::{FlagValue, StructValue};

#[derive(Debug, Clone)]
struct StaticFlag {
    variant: String,
    value: StructValue,
}

/// Serves a fixed set of flag values regardless of context.
///
/// Used for offline runs and tests; no targeting is applied.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    flags: HashMap<String, StaticFlag>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// `name` is the bare flag name, without the `flags/` prefix.
    #[must_use]
    pub fn with_flag(mut self, name: impl Into<String>, variant: impl Into<String>, value: StructValue) -> Self {
        let name = name.into();
        self.flags.insert(
            format!("flags/{}", name),
            StaticFlag {
                variant: variant.into(),
                value,
            },
        );
        self
    }
}

#[async_trait]
impl FlagResolver for StaticResolver {
    async fn resolve(
        &self,
        _config: &ApiConfig,
        flags: &[String],
        _context: &EvaluationContext,
    ) -> Result<ResolvedFlags, ResolveError> {
        let flags = flags
            .iter()
            .filter_map(|name| {
                self.flags.get(name).map(|flag| ResolvedFlag {
                    flag: name.clone(),
                    variant: Some(flag.variant.clone()),
                    value: Some(FlagValue::Struct(flag.value.clone())),
                    reason: Some("RESOLVE_REASON_MATCH".to_string()),
                })
            })
            .collect();

        Ok(ResolvedFlags {
            resolve_token: String::new(),
            flags,
        })
    }
}
