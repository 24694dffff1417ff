use crate::shared::ids::{HandlerKey, TaskId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Type tag of a declared payload property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Integer => write!(f, "integer"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
            Self::Object => write!(f, "object"),
            Self::Array => write!(f, "array"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Object shape shared by task inputs and outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl ObjectSchema {
    pub fn required_set(&self) -> BTreeSet<&str> {
        self.required.iter().map(String::as_str).collect()
    }

    fn validate(&self, label: &str) -> Result<(), String> {
        if self.schema_type != "object" {
            return Err(format!(
                "`{label}.type` must be `object`, got `{}`",
                self.schema_type
            ));
        }
        for field in &self.required {
            if !self.properties.contains_key(field) {
                return Err(format!(
                    "`{label}.required` lists `{field}` which is not a declared property"
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConstraints {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for TaskConstraints {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_max_attempts() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub id: TaskId,
    pub handler: HandlerKey,
    pub goal: String,
    pub inputs: ObjectSchema,
    pub outputs: ObjectSchema,
    #[serde(default)]
    pub tools_allowed: Vec<String>,
    #[serde(default)]
    pub constraints: TaskConstraints,
}

impl TaskSpec {
    pub fn validate(&self) -> Result<(), String> {
        if self.goal.trim().is_empty() {
            return Err("`goal` must be non-empty".to_string());
        }
        self.inputs.validate("inputs")?;
        self.outputs.validate("outputs")?;
        if self.constraints.max_attempts < 1 {
            return Err("`constraints.max_attempts` must be >= 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str = r#"
id: demo_task
handler: append_comment
goal: Append a line
inputs:
  type: object
  properties:
    target_file: { type: string }
    count: { type: integer, default: 3 }
  required: [target_file]
outputs:
  type: object
  properties:
    changed_file: { type: string }
  required: [changed_file]
tools_allowed: [fs.append_text]
"#;

    #[test]
    fn spec_parses_with_default_constraints() {
        let spec: TaskSpec = serde_yaml::from_str(SPEC).expect("parse spec");
        assert_eq!(spec.id.as_str(), "demo_task");
        assert_eq!(spec.constraints.max_attempts, 1);
        assert_eq!(
            spec.inputs.properties["count"].default,
            Some(Value::from(3))
        );
        spec.validate().expect("valid spec");
    }

    #[test]
    fn unknown_type_tag_fails_to_parse() {
        let raw = SPEC.replace("{ type: integer, default: 3 }", "{ type: decimal }");
        assert!(serde_yaml::from_str::<TaskSpec>(&raw).is_err());
    }

    #[test]
    fn required_field_must_be_declared() {
        let raw = SPEC.replace("required: [target_file]", "required: [target_file, missing]");
        let spec: TaskSpec = serde_yaml::from_str(&raw).expect("parse spec");
        let err = spec.validate().expect_err("must fail");
        assert!(err.contains("`missing`"));
    }
}
