use crate::tasks::spec::{PropertyType, TaskSpec};
use crate::tasks::Payload;
use serde_json::{Number, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("payload validation failed for task `{task_id}`: {}", render_violations(.violations))]
pub struct PayloadValidationError {
    pub task_id: String,
    pub violations: Vec<FieldViolation>,
}

impl PayloadValidationError {
    pub fn fields(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.field.as_str()).collect()
    }
}

fn render_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.field, v.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Checks `payload` against the task's declared inputs and returns exactly the
/// declared fields. Unknown keys are rejected, required fields must be present
/// and non-null, optional fields fall back to their default or `null`.
pub fn validate_task_payload(
    spec: &TaskSpec,
    payload: &Payload,
) -> Result<Payload, PayloadValidationError> {
    let required = spec.inputs.required_set();
    let mut violations = Vec::new();
    let mut validated = Payload::new();

    for (field, schema) in &spec.inputs.properties {
        let is_required = required.contains(field.as_str());
        match payload.get(field) {
            None if is_required => violations.push(FieldViolation {
                field: field.clone(),
                reason: "field required".to_string(),
            }),
            None => {
                validated.insert(
                    field.clone(),
                    schema.default.clone().unwrap_or(Value::Null),
                );
            }
            Some(Value::Null) if is_required => violations.push(FieldViolation {
                field: field.clone(),
                reason: format!("expected {}, got null", schema.property_type),
            }),
            Some(Value::Null) => {
                validated.insert(field.clone(), Value::Null);
            }
            Some(value) => match coerce_value(value, schema.property_type) {
                Ok(coerced) => {
                    validated.insert(field.clone(), coerced);
                }
                Err(reason) => violations.push(FieldViolation {
                    field: field.clone(),
                    reason,
                }),
            },
        }
    }

    for key in payload.keys() {
        if !spec.inputs.properties.contains_key(key) {
            violations.push(FieldViolation {
                field: key.clone(),
                reason: "extra fields not permitted".to_string(),
            });
        }
    }

    if violations.is_empty() {
        Ok(validated)
    } else {
        Err(PayloadValidationError {
            task_id: spec.id.to_string(),
            violations,
        })
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(expected: PropertyType, value: &Value) -> String {
    format!("expected {expected}, got {}", value_kind(value))
}

pub(crate) fn coerce_value(value: &Value, expected: PropertyType) -> Result<Value, String> {
    match expected {
        PropertyType::String => match value {
            Value::String(_) => Ok(value.clone()),
            _ => Err(mismatch(expected, value)),
        },
        PropertyType::Integer => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
            Value::Number(n) => match n.as_f64() {
                Some(f) if f.is_finite() && f.fract() == 0.0 => Ok(Value::from(f as i64)),
                _ => Err("expected integer, got fractional number".to_string()),
            },
            Value::String(raw) => raw
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("expected integer, got string `{raw}`")),
            _ => Err(mismatch(expected, value)),
        },
        PropertyType::Number => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("expected number, got string `{raw}`")),
            _ => Err(mismatch(expected, value)),
        },
        PropertyType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Ok(Value::Bool(false)),
                Some(1) => Ok(Value::Bool(true)),
                _ => Err("expected boolean, got number other than 0 or 1".to_string()),
            },
            Value::String(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
                "false" | "0" | "no" | "off" => Ok(Value::Bool(false)),
                _ => Err(format!("expected boolean, got string `{raw}`")),
            },
            _ => Err(mismatch(expected, value)),
        },
        PropertyType::Object => match value {
            Value::Object(_) => Ok(value.clone()),
            _ => Err(mismatch(expected, value)),
        },
        PropertyType::Array => match value {
            Value::Array(_) => Ok(value.clone()),
            _ => Err(mismatch(expected, value)),
        },
    }
}
