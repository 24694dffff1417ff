use serde::{Deserialize, Serialize};

/// Task ids and handler keys are snake_case: a lowercase ASCII letter
/// followed by lowercase letters, digits or `_`.
pub fn check_snake_identifier(kind: &str, raw: &str) -> Result<(), String> {
    let mut chars = raw.chars();
    match chars.next() {
        None => Err(format!("{kind} must be non-empty")),
        Some(first) if !first.is_ascii_lowercase() => {
            Err(format!("{kind} `{raw}` must start with a lowercase letter"))
        }
        Some(_) => {
            if chars.all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_') {
                Ok(())
            } else {
                Err(format!(
                    "{kind} `{raw}` may contain only lowercase letters, digits and '_'"
                ))
            }
        }
    }
}

macro_rules! snake_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn parse(raw: &str) -> Result<Self, String> {
                check_snake_identifier($kind, raw).map(|()| Self(raw.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(raw: String) -> Result<Self, Self::Error> {
                check_snake_identifier($kind, &raw)?;
                Ok(Self(raw))
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

snake_id!(
    /// Registry key of a task definition, e.g. `append_hello_agent_comment`.
    TaskId,
    "task id"
);
snake_id!(
    /// Name of a built-in handler in the handler table, e.g. `daily_report`.
    HandlerKey,
    "handler key"
);
