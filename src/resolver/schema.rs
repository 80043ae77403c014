use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;

use crate::value::{FlagValue, StructValue};

/// Declared types of a flag's fields, as sent alongside the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlagSchema {
    pub schema: HashMap<String, SchemaType>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaType {
    Bool,
    Int,
    Double,
    String,
    Struct(HashMap<String, SchemaType>),
    List(Box<SchemaType>),
    Unknown,
}

impl<'de> Deserialize<'de> for FlagSchema {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        FlagSchema::from_json(&raw).map_err(D::Error::custom)
    }
}

impl FlagSchema {
    /// Parses `{"schema": {field: {"<kind>Schema": ...}}}`.
    pub fn from_json(raw: &Value) -> Result<Self, String> {
        let fields = match raw.get("schema") {
            Some(Value::Object(fields)) => fields,
            Some(Value::Null) | None => return Ok(FlagSchema::default()),
            Some(other) => return Err(format!("expected schema object, found {}", other)),
        };

        Ok(FlagSchema {
            schema: parse_fields(fields)?,
        })
    }
}

fn parse_fields(fields: &Map<String, Value>) -> Result<HashMap<String, SchemaType>, String> {
    fields
        .iter()
        .map(|(key, value)| parse_type(value).map(|schema_type| (key.clone(), schema_type)))
        .collect()
}

fn parse_type(value: &Value) -> Result<SchemaType, String> {
    if value.get("boolSchema").is_some() {
        return Ok(SchemaType::Bool);
    }
    if value.get("intSchema").is_some() {
        return Ok(SchemaType::Int);
    }
    if value.get("doubleSchema").is_some() {
        return Ok(SchemaType::Double);
    }
    if value.get("stringSchema").is_some() {
        return Ok(SchemaType::String);
    }
    if let Some(struct_schema) = value.get("structSchema") {
        let nested = FlagSchema::from_json(struct_schema)?;
        return Ok(SchemaType::Struct(nested.schema));
    }
    if let Some(list_schema) = value.get("listSchema") {
        let element = match list_schema.get("elementSchema") {
            Some(element) => parse_type(element)?,
            None => SchemaType::Unknown,
        };
        return Ok(SchemaType::List(Box::new(element)));
    }

    Ok(SchemaType::Unknown)
}

/// Decodes a flag's root value. Without a schema JSON types decide.
pub fn decode_flag_value(value: Option<&Value>, schema: Option<&FlagSchema>) -> Option<FlagValue> {
    let value = value?;

    match (value, schema) {
        (Value::Object(map), Some(schema)) => Some(FlagValue::Struct(decode_struct(map, &schema.schema))),
        (other, _) => FlagValue::from_json(other),
    }
}

fn decode_struct(map: &Map<String, Value>, schema: &HashMap<String, SchemaType>) -> StructValue {
    let fields = map
        .iter()
        .filter_map(|(key, value)| {
            let decoded = match schema.get(key) {
                Some(schema_type) => decode(value, schema_type),
                None => FlagValue::from_json(value),
            };
            decoded.map(|decoded| (key.clone(), decoded))
        })
        .collect();

    StructValue { fields }
}

fn decode(value: &Value, schema_type: &SchemaType) -> Option<FlagValue> {
    match (schema_type, value) {
        (_, Value::Null) => None,
        (SchemaType::Bool, Value::Bool(b)) => Some(FlagValue::Bool(*b)),
        (SchemaType::Int, Value::Number(n)) => whole_number(n)
            .map(FlagValue::Int)
            .or_else(|| FlagValue::from_json(value)),
        // int64 is rendered as a string in proto3 JSON
        (SchemaType::Int, Value::String(s)) => s.parse().ok().map(FlagValue::Int),
        (SchemaType::Double, Value::Number(n)) => n.as_f64().map(FlagValue::Float),
        (SchemaType::Double, Value::String(s)) => s.parse().ok().map(FlagValue::Float),
        (SchemaType::String, Value::String(s)) => Some(FlagValue::String(s.clone())),
        (SchemaType::Struct(fields), Value::Object(map)) => {
            Some(FlagValue::Struct(decode_struct(map, fields)))
        }
        (SchemaType::List(element), Value::Array(items)) => Some(FlagValue::Array(
            items.iter().filter_map(|item| decode(item, element)).collect(),
        )),
        (_, other) => FlagValue::from_json(other),
    }
}

/// `4.0` counts as an int, `3.7` does not.
fn whole_number(n: &Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    let f = n.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_schema_kinds() {
        let schema: FlagSchema = serde_json::from_value(json!({
            "schema": {
                "enabled": { "boolSchema": {} },
                "count": { "intSchema": {} },
                "ratio": { "doubleSchema": {} },
                "color": { "stringSchema": {} },
                "tags": { "listSchema": { "elementSchema": { "stringSchema": {} } } },
                "inner": { "structSchema": { "schema": { "on": { "boolSchema": {} } } } },
                "mystery": { "somethingSchema": {} }
            }
        }))
        .unwrap();

        assert_eq!(schema.schema["enabled"], SchemaType::Bool);
        assert_eq!(schema.schema["count"], SchemaType::Int);
        assert_eq!(schema.schema["ratio"], SchemaType::Double);
        assert_eq!(schema.schema["color"], SchemaType::String);
        assert_eq!(schema.schema["tags"], SchemaType::List(Box::new(SchemaType::String)));
        assert_eq!(schema.schema["mystery"], SchemaType::Unknown);
        match &schema.schema["inner"] {
            SchemaType::Struct(fields) => assert_eq!(fields["on"], SchemaType::Bool),
            other => panic!("expected struct schema, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_respects_schema() {
        let schema: FlagSchema = serde_json::from_value(json!({
            "schema": {
                "count": { "intSchema": {} },
                "ratio": { "doubleSchema": {} },
                "tags": { "listSchema": { "elementSchema": { "stringSchema": {} } } }
            }
        }))
        .unwrap();
        let value = json!({ "count": 3.0, "ratio": 1, "tags": ["a", "b"], "unset": null });

        let decoded = decode_flag_value(Some(&value), Some(&schema)).unwrap();
        let fields = decoded.as_struct().unwrap();

        assert_eq!(fields.get("count"), Some(&FlagValue::Int(3)));
        assert_eq!(fields.get("ratio"), Some(&FlagValue::Float(1.0)));
        assert_eq!(fields.get("tags").and_then(FlagValue::as_array).map(|t| t.len()), Some(2));
        assert!(fields.get("unset").is_none());
    }

    #[test]
    fn test_fractional_number_is_not_an_int() {
        let schema: FlagSchema = serde_json::from_value(json!({
            "schema": { "n": { "intSchema": {} }, "m": { "intSchema": {} } }
        }))
        .unwrap();
        let value = json!({ "n": 3.7, "m": 4.0 });

        let decoded = decode_flag_value(Some(&value), Some(&schema)).unwrap();
        let fields = decoded.as_struct().unwrap();

        // kept as a float so a typed int read reports a mismatch
        assert_eq!(fields.get("n"), Some(&FlagValue::Float(3.7)));
        assert_eq!(fields.get("m"), Some(&FlagValue::Int(4)));
    }

    #[test]
    fn test_missing_schema_section() {
        let schema: FlagSchema = serde_json::from_value(json!({})).unwrap();
        assert!(schema.schema.is_empty());
        assert_eq!(decode_flag_value(None, Some(&schema)), None);
    }
}
