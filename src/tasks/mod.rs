pub mod error;
pub mod registry;
pub mod spec;
pub mod validation;

pub use error::RegistryError;
pub use registry::{HandlerMap, TaskCatalog, TaskRegistry};
pub use spec::{ObjectSchema, PropertySchema, PropertyType, TaskConstraints, TaskSpec};
pub use validation::{validate_task_payload, FieldViolation, PayloadValidationError};

/// Untyped task payload: a JSON object.
pub type Payload = serde_json::Map<String, serde_json::Value>;
