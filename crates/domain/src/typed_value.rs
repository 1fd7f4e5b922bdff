//! Decoder for the typed-value wire representation of stored documents.
//!
//! Every value on the wire is an object with exactly one tag, for example
//! `{"integerValue": "3"}` or `{"mapValue": {"fields": {...}}}`. Decoding
//! unwraps the tags recursively into plain JSON values and reports every
//! malformed field with its dotted path.

use serde_json::{Map, Number, Value};

/// Decodes a whole document body (`{"fields": {...}, ...}`) into a native map.
pub fn decode_document(document: &Value) -> Result<Value, Vec<String>> {
    let Some(fields) = document.get("fields") else {
        return Err(vec!["document has no 'fields' member".to_owned()]);
    };
    let Some(fields) = fields.as_object() else {
        return Err(vec!["document 'fields' member must be an object".to_owned()]);
    };

    decode_fields(fields)
}

/// Decodes a typed-value field map into a native JSON object.
pub fn decode_fields(fields: &Map<String, Value>) -> Result<Value, Vec<String>> {
    let mut errors = Vec::new();
    let decoded = decode_field_map(fields, "", &mut errors);

    if errors.is_empty() {
        Ok(decoded)
    } else {
        Err(errors)
    }
}

/// Decodes one typed value.
pub fn decode_value(value: &Value) -> Result<Value, Vec<String>> {
    let mut errors = Vec::new();
    let decoded = decode_at(value, "$", &mut errors);

    if errors.is_empty() {
        Ok(decoded)
    } else {
        Err(errors)
    }
}

fn decode_field_map(fields: &Map<String, Value>, prefix: &str, errors: &mut Vec<String>) -> Value {
    let mut decoded = Map::with_capacity(fields.len());
    for (name, value) in fields {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };
        decoded.insert(name.clone(), decode_at(value, &path, errors));
    }

    Value::Object(decoded)
}

fn decode_at(value: &Value, path: &str, errors: &mut Vec<String>) -> Value {
    let Some(wrapper) = value.as_object() else {
        errors.push(format!("{path}: expected a typed value object, found {value}"));
        return Value::Null;
    };

    let mut tags = wrapper.iter();
    let (Some((tag, inner)), None) = (tags.next(), tags.next()) else {
        errors.push(format!(
            "{path}: typed value must carry exactly one tag, found {}",
            wrapper.len()
        ));
        return Value::Null;
    };

    match tag.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => match inner {
            Value::Bool(flag) => Value::Bool(*flag),
            other => {
                errors.push(format!("{path}: booleanValue must be a boolean, found {other}"));
                Value::Null
            }
        },
        "integerValue" => decode_integer(inner, path, errors),
        "doubleValue" => decode_double(inner, path, errors),
        "stringValue" | "timestampValue" | "referenceValue" => match inner {
            Value::String(text) => Value::String(text.clone()),
            other => {
                errors.push(format!("{path}: {tag} must be a string, found {other}"));
                Value::Null
            }
        },
        "mapValue" => match inner.get("fields") {
            None => Value::Object(Map::new()),
            Some(Value::Object(fields)) => decode_field_map(fields, path, errors),
            Some(other) => {
                errors.push(format!(
                    "{path}: mapValue.fields must be an object, found {other}"
                ));
                Value::Null
            }
        },
        "arrayValue" => match inner.get("values") {
            None => Value::Array(Vec::new()),
            Some(Value::Array(values)) => Value::Array(
                values
                    .iter()
                    .enumerate()
                    .map(|(index, item)| decode_at(item, &format!("{path}[{index}]"), errors))
                    .collect(),
            ),
            Some(other) => {
                errors.push(format!(
                    "{path}: arrayValue.values must be an array, found {other}"
                ));
                Value::Null
            }
        },
        unsupported => {
            errors.push(format!("{path}: unsupported typed value '{unsupported}'"));
            Value::Null
        }
    }
}

fn decode_integer(inner: &Value, path: &str, errors: &mut Vec<String>) -> Value {
    let parsed = match inner {
        Value::String(text) => text.parse::<i64>().ok(),
        Value::Number(number) => number.as_i64(),
        _ => None,
    };

    match parsed {
        Some(integer) => Value::Number(Number::from(integer)),
        None => {
            errors.push(format!(
                "{path}: integerValue must be a 64-bit integer, found {inner}"
            ));
            Value::Null
        }
    }
}

fn decode_double(inner: &Value, path: &str, errors: &mut Vec<String>) -> Value {
    let parsed = match inner {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.parse::<f64>().ok(),
        _ => None,
    };

    match parsed.and_then(Number::from_f64) {
        Some(number) => Value::Number(number),
        None => {
            errors.push(format!(
                "{path}: doubleValue must be a finite number, found {inner}"
            ));
            Value::Null
        }
    }
}
