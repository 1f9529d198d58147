use chrono::NaiveDateTime;

use crate::core::{DATETIME_FORMAT, OrmError, Result, Value};
use crate::schema::descriptor::{FieldDescriptor, SemanticType};

/// Qualifier appended to the identity column's inferred type.
pub const IDENTITY_QUALIFIER: &str = "AUTO_INCREMENT PRIMARY KEY";

/// Resolves the column type string for a field descriptor.
///
/// An explicit override wins verbatim; otherwise the type is inferred from
/// the semantic type, and the identity field picks up the auto-increment
/// primary-key qualifier.
pub fn column_type_for(field: &FieldDescriptor) -> String {
    if let Some(explicit) = &field.column_type {
        return explicit.clone();
    }

    let base = match field.semantic {
        SemanticType::Integer => "INT",
        SemanticType::Float => "FLOAT",
        SemanticType::Text => "VARCHAR(255)",
        SemanticType::Boolean => "BOOLEAN",
        SemanticType::DateTime => "DATETIME",
        SemanticType::Reference(_) => "INT",
        SemanticType::Serialized => "TEXT",
    };

    if field.is_identity() {
        format!("{} {}", base, IDENTITY_QUALIFIER)
    } else {
        base.to_string()
    }
}

/// Save-side coercion: host value to column representation.
///
/// Dates become fixed-format text, serialized payloads become JSON text,
/// reference columns already carry the referenced identity, and scalars
/// pass through unchanged.
pub fn to_column_value(field: &FieldDescriptor, value: Value) -> Result<Value> {
    match (field.semantic, value) {
        (_, Value::Null) => Ok(Value::Null),
        (SemanticType::DateTime, Value::DateTime(ts)) => {
            Ok(Value::Text(ts.format(DATETIME_FORMAT).to_string()))
        }
        (SemanticType::Serialized, Value::Json(v)) => serde_json::to_string(&v)
            .map(Value::Text)
            .map_err(|e| OrmError::Coercion(format!("JSON serialization failed: {}", e))),
        (_, v) => Ok(v),
    }
}

/// Load-side coercion: column representation back to host value, driven by
/// the field's declared semantic type.
///
/// Reference columns pass the stored identity through; resolving the
/// referenced instance is the depth-bounded load hook's job.
pub fn from_column_value(field: &FieldDescriptor, value: Value) -> Result<Value> {
    match (field.semantic, value) {
        (_, Value::Null) => Ok(Value::Null),
        (SemanticType::DateTime, Value::Text(s)) => {
            NaiveDateTime::parse_from_str(&s, DATETIME_FORMAT)
                .map(Value::DateTime)
                .map_err(|e| OrmError::Coercion(format!("invalid DATETIME value '{}': {}", s, e)))
        }
        (SemanticType::DateTime, v @ Value::DateTime(_)) => Ok(v),
        (SemanticType::Serialized, Value::Text(s)) => serde_json::from_str(&s)
            .map(Value::Json)
            .map_err(|e| OrmError::Coercion(format!("invalid serialized value: {}", e))),
        (SemanticType::Serialized, v @ Value::Json(_)) => Ok(v),
        (SemanticType::Integer | SemanticType::Reference(_), Value::Text(s)) => s
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|e| OrmError::Coercion(format!("invalid INT value '{}': {}", s, e))),
        (SemanticType::Float, Value::Integer(i)) => Ok(Value::Float(i as f64)),
        (SemanticType::Float, Value::Text(s)) => s
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| OrmError::Coercion(format!("invalid FLOAT value '{}': {}", s, e))),
        (SemanticType::Boolean, Value::Integer(i)) => Ok(Value::Boolean(i != 0)),
        (_, v) => Ok(v),
    }
}
