//! Schema capabilities used to validate request and response bodies.
//!
//! # Data Flow
//! ```text
//! raw JSON value
//!     → Schema::validate (typed.rs: serde, json.rs: JSON Schema)
//!     → Ok(()) or SchemaError (diagnostic kept for logs only)
//! ```
//!
//! # Design Decisions
//! - Routes hold schemas as `Arc<dyn Schema>` so one registry can carry
//!   differently typed routes
//! - Schemas only accept or reject; typed decoding happens at the call site
//!   that knows the concrete type

pub mod json;
pub mod typed;

use serde_json::Value;

pub use json::JsonSchema;
pub use typed::Typed;

/// Errors produced while compiling or evaluating a schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The schema document could not be parsed as JSON.
    #[error("schema is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The schema document could not be compiled.
    #[error("failed to compile schema: {0}")]
    Compile(String),

    /// The value does not satisfy the schema.
    #[error("validation failed against {schema}: {message}")]
    Invalid { schema: String, message: String },
}

/// A validation capability for JSON values.
pub trait Schema: Send + Sync {
    /// Check `value` against this schema.
    fn validate(&self, value: &Value) -> Result<(), SchemaError>;

    /// Short label used in logs.
    fn describe(&self) -> String;

    /// Convenience wrapper around [`Schema::validate`].
    fn is_valid(&self, value: &Value) -> bool {
        self.validate(value).is_ok()
    }
}

/// Schema that accepts every value.
#[derive(Debug, Clone, Copy, Default)]
pub struct Any;

impl Schema for Any {
    fn validate(&self, _value: &Value) -> Result<(), SchemaError> {
        Ok(())
    }

    fn describe(&self) -> String {
        "any".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_any_accepts_everything() {
        assert!(Any.is_valid(&json!(null)));
        assert!(Any.is_valid(&json!({"a": [1, 2]})));
    }
}
