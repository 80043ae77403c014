use open_feature::provider::ResolutionDetails;
use open_feature::{
    EvaluationContext as OpenFeatureContext, EvaluationContextFieldValue, EvaluationError as OpenFeatureError,
    EvaluationErrorCode, EvaluationReason as OpenFeatureReason, StructValue as OpenFeatureStruct, Value,
};
use std::collections::HashMap;

use crate::context::{EvaluationContext, TARGETING_KEY};
use crate::error::{ErrorCode, EvaluationError};
use crate::evaluation::{EvaluationDetails, EvaluationReason};
use crate::value::{FlagValue, StructValue};

// CONTEXT

/// Custom fields become context fields, the targeting key lands under `targeting_key`.
pub fn context_from_open_feature(context: &OpenFeatureContext) -> Result<EvaluationContext, EvaluationError> {
    let mut fields = HashMap::with_capacity(context.custom_fields.len() + 1);

    for (key, value) in &context.custom_fields {
        fields.insert(key.clone(), field_value(key, value)?);
    }
    if let Some(targeting_key) = &context.targeting_key {
        fields.insert(TARGETING_KEY.to_string(), FlagValue::from(targeting_key.as_str()));
    }

    Ok(EvaluationContext::from(fields))
}

fn field_value(key: &str, value: &EvaluationContextFieldValue) -> Result<FlagValue, EvaluationError> {
    match value {
        EvaluationContextFieldValue::Bool(value) => Ok(FlagValue::Bool(*value)),
        EvaluationContextFieldValue::Int(value) => Ok(FlagValue::Int(*value)),
        EvaluationContextFieldValue::Float(value) => Ok(FlagValue::Float(*value)),
        EvaluationContextFieldValue::String(value) => Ok(FlagValue::String(value.clone())),
        EvaluationContextFieldValue::DateTime(value) => Ok(FlagValue::String(value.to_string())),
        EvaluationContextFieldValue::Struct(value) => (**value)
            .downcast_ref::<OpenFeatureStruct>()
            .map(|value| FlagValue::Struct(struct_from_open_feature(value)))
            .ok_or_else(|| {
                EvaluationError::new(
                    ErrorCode::InvalidContext,
                    format!("context field '{}' holds an unsupported struct type", key),
                )
            }),
    }
}

// VALUES

pub fn value_from_open_feature(value: &Value) -> FlagValue {
    match value {
        Value::Bool(value) => FlagValue::Bool(*value),
        Value::Int(value) => FlagValue::Int(*value),
        Value::Float(value) => FlagValue::Float(*value),
        Value::String(value) => FlagValue::String(value.clone()),
        Value::Array(values) => FlagValue::Array(values.iter().map(value_from_open_feature).collect()),
        Value::Struct(value) => FlagValue::Struct(struct_from_open_feature(value)),
    }
}

pub fn struct_from_open_feature(value: &OpenFeatureStruct) -> StructValue {
    StructValue {
        fields: value
            .fields
            .iter()
            .map(|(key, value)| (key.clone(), value_from_open_feature(value)))
            .collect(),
    }
}

pub fn value_to_open_feature(value: FlagValue) -> Value {
    match value {
        FlagValue::Bool(value) => Value::Bool(value),
        FlagValue::Int(value) => Value::Int(value),
        FlagValue::Float(value) => Value::Float(value),
        FlagValue::String(value) => Value::String(value),
        FlagValue::Array(values) => Value::Array(values.into_iter().map(value_to_open_feature).collect()),
        FlagValue::Struct(value) => Value::Struct(struct_to_open_feature(value)),
    }
}

pub fn struct_to_open_feature(value: StructValue) -> OpenFeatureStruct {
    OpenFeatureStruct {
        fields: value
            .fields
            .into_iter()
            .map(|(key, value)| (key, value_to_open_feature(value)))
            .collect(),
    }
}

// RESULTS

pub fn reason_to_open_feature(reason: EvaluationReason) -> OpenFeatureReason {
    match reason {
        EvaluationReason::Static => OpenFeatureReason::Static,
        EvaluationReason::Default => OpenFeatureReason::Default,
        EvaluationReason::TargetingMatch => OpenFeatureReason::TargetingMatch,
        EvaluationReason::Disabled => OpenFeatureReason::Disabled,
        EvaluationReason::Unknown => OpenFeatureReason::Unknown,
        EvaluationReason::Error => OpenFeatureReason::Error,
        EvaluationReason::Other(other) => OpenFeatureReason::Other(other),
    }
}

pub fn error_to_open_feature(error: EvaluationError) -> OpenFeatureError {
    let code = match error.code {
        ErrorCode::FlagNotFound => EvaluationErrorCode::FlagNotFound,
        ErrorCode::ParseError => EvaluationErrorCode::ParseError,
        ErrorCode::TypeMismatch => EvaluationErrorCode::TypeMismatch,
        ErrorCode::TargetingKeyMissing => EvaluationErrorCode::TargetingKeyMissing,
        ErrorCode::InvalidContext => EvaluationErrorCode::InvalidContext,
        ErrorCode::General => EvaluationErrorCode::General(error.message.clone()),
    };

    OpenFeatureError {
        code,
        message: Some(error.message),
    }
}

/// A fallback becomes an error so the OpenFeature client serves its own default.
pub fn resolution_details<T>(details: EvaluationDetails<T>) -> Result<ResolutionDetails<T>, OpenFeatureError> {
    if let Some(code) = details.error_code {
        let message = details.error_message.unwrap_or_default();
        return Err(error_to_open_feature(EvaluationError::new(code, message)));
    }

    Ok(ResolutionDetails {
        value: details.value,
        variant: details.variant,
        reason: Some(reason_to_open_feature(details.reason)),
        flag_metadata: None,
    })
}
