//! Serde-backed schemas: a value is valid when it deserializes into `T`.

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::schema::{Schema, SchemaError};

/// Schema derived from a Rust type's `Deserialize` implementation.
pub struct Typed<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Typed<T> {
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<T> Default for Typed<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Typed<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Typed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Typed<{}>", type_name::<T>())
    }
}

impl<T: DeserializeOwned> Schema for Typed<T> {
    fn validate(&self, value: &Value) -> Result<(), SchemaError> {
        T::deserialize(value)
            .map(|_| ())
            .map_err(|e| SchemaError::Invalid {
                schema: self.describe(),
                message: e.to_string(),
            })
    }

    fn describe(&self) -> String {
        type_name::<T>().to_string()
    }
}
