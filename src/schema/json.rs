//! JSON Schema backed validation.

use jsonschema::Validator;
use serde_json::Value;

use crate::schema::{Schema, SchemaError};

/// A compiled JSON Schema document.
pub struct JsonSchema {
    validator: Validator,
    title: String,
}

impl JsonSchema {
    /// Compile a schema from a JSON value.
    pub fn from_value(schema: &Value) -> Result<Self, SchemaError> {
        let validator = jsonschema::validator_for(schema)
            .map_err(|err| SchemaError::Compile(err.to_string()))?;

        let title = schema
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("json-schema")
            .to_string();

        Ok(Self { validator, title })
    }

    /// Compile a schema from a JSON string.
    pub fn parse(schema_json: &str) -> Result<Self, SchemaError> {
        let schema: Value = serde_json::from_str(schema_json)?;
        Self::from_value(&schema)
    }
}

impl Schema for JsonSchema {
    fn validate(&self, value: &Value) -> Result<(), SchemaError> {
        let mut errors = self.validator.iter_errors(value);
        if let Some(first) = errors.next() {
            let mut message = first.to_string();
            for err in errors.take(3) {
                message.push_str("; ");
                message.push_str(&err.to_string());
            }
            return Err(SchemaError::Invalid {
                schema: self.title.clone(),
                message,
            });
        }

        Ok(())
    }

    fn describe(&self) -> String {
        self.title.clone()
    }
}

impl std::fmt::Debug for JsonSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSchema").field("title", &self.title).finish()
    }
}
