use std::fmt;

use crate::error::{ErrorCode, EvaluationError};
use crate::resolver::ResolvedFlag;
use crate::value::{FlagValue, StructValue};

pub const UNKNOWN_VARIANT: &str = "unknown";

const REASON_TARGETING_KEY_ERROR: &str = "RESOLVE_REASON_TARGETING_KEY_ERROR";
const REASON_ERROR: &str = "RESOLVE_REASON_ERROR";

// Reason for an evaluation result
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum EvaluationReason {
    Static,
    /// Nothing matched, or the caller's default was used.
    Default,
    TargetingMatch,
    Disabled,
    #[default]
    Unknown,
    Error,
    Other(String),
}

impl EvaluationReason {
    /// Maps the backend's resolve reason. A missing reason means the value was served as is.
    pub fn from_wire(reason: Option<&str>) -> Self {
        match reason {
            None => Self::Static,
            Some("RESOLVE_REASON_MATCH") => Self::TargetingMatch,
            Some("RESOLVE_REASON_NO_SEGMENT_MATCH") | Some("RESOLVE_REASON_NO_TREATMENT_MATCH") => {
                Self::Default
            }
            Some("RESOLVE_REASON_FLAG_ARCHIVED") => Self::Disabled,
            Some(REASON_TARGETING_KEY_ERROR) | Some(REASON_ERROR) => Self::Error,
            Some("RESOLVE_REASON_UNSPECIFIED") => Self::Unknown,
            Some(other) => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EvaluationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Static => "STATIC",
            Self::Default => "DEFAULT",
            Self::TargetingMatch => "TARGETING_MATCH",
            Self::Disabled => "DISABLED",
            Self::Unknown => "UNKNOWN",
            Self::Error => "ERROR",
            Self::Other(reason) => reason.as_str(),
        };
        f.write_str(reason)
    }
}

// Flag evaluation result
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationDetails<T> {
    pub flag_key: String,
    pub value: T,
    pub variant: Option<String>,
    pub reason: EvaluationReason,
    pub error_code: Option<ErrorCode>,
    pub error_message: Option<String>,
}

/// Outcome of one resolution before it is collapsed for the caller.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution<T> {
    Resolved(EvaluationDetails<T>),
    Fallback {
        flag_key: String,
        value: T,
        error: EvaluationError,
    },
}

impl<T> Resolution<T> {
    pub fn fallback(flag_key: &str, default: T, error: EvaluationError) -> Self {
        Resolution::Fallback {
            flag_key: flag_key.to_string(),
            value: default,
            error,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Resolution::Fallback { .. })
    }

    pub fn error(&self) -> Option<&EvaluationError> {
        match self {
            Resolution::Resolved(_) => None,
            Resolution::Fallback { error, .. } => Some(error),
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Resolution::Resolved(details) => details.value,
            Resolution::Fallback { value, .. } => value,
        }
    }

    pub fn into_details(self) -> EvaluationDetails<T> {
        match self {
            Resolution::Resolved(details) => details,
            Resolution::Fallback {
                flag_key,
                value,
                error,
            } => EvaluationDetails {
                flag_key,
                value,
                variant: None,
                reason: EvaluationReason::Error,
                error_code: Some(error.code),
                error_message: Some(error.message),
            },
        }
    }
}

/// Types a flag value can be read as.
pub trait FlagType: Sized + Send {
    fn from_flag_value(value: &FlagValue) -> Option<Self>;
}

impl FlagType for bool {
    fn from_flag_value(value: &FlagValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FlagType for i64 {
    fn from_flag_value(value: &FlagValue) -> Option<Self> {
        value.as_i64()
    }
}

impl FlagType for f64 {
    fn from_flag_value(value: &FlagValue) -> Option<Self> {
        value.as_f64()
    }
}

impl FlagType for String {
    fn from_flag_value(value: &FlagValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FlagType for StructValue {
    fn from_flag_value(value: &FlagValue) -> Option<Self> {
        value.as_struct().cloned()
    }
}

impl FlagType for FlagValue {
    fn from_flag_value(value: &FlagValue) -> Option<Self> {
        Some(value.clone())
    }
}

/// A dotted flag key split into the flag name and a property path.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FlagKey<'a> {
    pub raw: &'a str,
    pub name: &'a str,
    pub path: Vec<&'a str>,
}

impl<'a> FlagKey<'a> {
    pub fn parse(raw: &'a str) -> Result<Self, EvaluationError> {
        let mut segments = raw.split('.');
        let name = segments.next().unwrap_or_default();
        if name.trim().is_empty() {
            return Err(EvaluationError::flag_not_found(format!(
                "Invalid flag key format: '{}'",
                raw
            )));
        }

        let path: Vec<&str> = segments.collect();
        if path.iter().any(|segment| segment.is_empty()) {
            return Err(EvaluationError::flag_not_found(format!(
                "Invalid flag key format: '{}'",
                raw
            )));
        }

        Ok(Self { raw, name, path })
    }

    /// Name of the flag as the backend knows it.
    pub fn resource_name(&self) -> String {
        format!("flags/{}", self.name)
    }
}

/// Pick the value `key` points at out of a resolve response.
pub fn evaluate_flag<T: FlagType>(key: &FlagKey<'_>, flags: &[ResolvedFlag], default: T) -> Resolution<T> {
    // Step 1: Find the flag the backend resolved for us
    let resource = key.resource_name();
    let flag = match flags.iter().find(|flag| flag.flag == resource) {
        Some(flag) => flag,
        None => {
            return Resolution::fallback(
                key.raw,
                default,
                EvaluationError::flag_not_found(format!("Flag '{}' was not resolved", key.name)),
            );
        }
    };

    // Step 2: Errors the backend reported for this flag
    let backend_error = match flag.reason.as_deref() {
        Some(REASON_TARGETING_KEY_ERROR) => Some(EvaluationError::new(
            ErrorCode::TargetingKeyMissing,
            format!("Backend could not target flag '{}'", key.name),
        )),
        Some(REASON_ERROR) => Some(EvaluationError::new(
            ErrorCode::General,
            format!("Backend failed to resolve flag '{}'", key.name),
        )),
        _ => None,
    };
    if let Some(error) = backend_error {
        return Resolution::fallback(key.raw, default, error);
    }

    let reason = EvaluationReason::from_wire(flag.reason.as_deref());

    // Step 3: No variant assigned, the default is the answer
    let root = match &flag.value {
        Some(value) => value,
        None => {
            return Resolution::Resolved(EvaluationDetails {
                flag_key: key.raw.to_string(),
                value: default,
                variant: flag.variant.clone(),
                reason: match reason {
                    EvaluationReason::Disabled => EvaluationReason::Disabled,
                    _ => EvaluationReason::Default,
                },
                error_code: None,
                error_message: None,
            });
        }
    };

    // Step 4: Walk the property path into the struct
    let leaf = match walk_path(root, key) {
        Ok(leaf) => leaf,
        Err(error) => return Resolution::fallback(key.raw, default, error),
    };

    // Step 5: Read the leaf as the requested type
    match T::from_flag_value(leaf) {
        Some(value) => Resolution::Resolved(EvaluationDetails {
            flag_key: key.raw.to_string(),
            value,
            variant: Some(
                flag.variant
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_VARIANT.to_string()),
            ),
            reason,
            error_code: None,
            error_message: None,
        }),
        None => Resolution::fallback(key.raw, default, EvaluationError::type_mismatch(key.raw)),
    }
}

fn walk_path<'v>(root: &'v FlagValue, key: &FlagKey<'_>) -> Result<&'v FlagValue, EvaluationError> {
    let mut current = root;

    for segment in &key.path {
        let fields = current
            .as_struct()
            .ok_or_else(|| EvaluationError::type_mismatch(key.raw))?;

        current = fields.get(segment).ok_or_else(|| {
            EvaluationError::flag_not_found(format!(
                "Property '{}' not found in flag '{}'",
                segment, key.name
            ))
        })?;
    }

    Ok(current)
}
