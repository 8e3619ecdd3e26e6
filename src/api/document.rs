//! Purpose: Schemaless record type for tables whose shape is only known at runtime.
//! Exports: `Document`.
//! Role: Lets the CLI (and dynamic callers) store arbitrary JSON objects.
//! Invariants: A document is always a JSON object; its shape is `RecordShape::Open`.
//! Invariants: The type-derived table name is `document`; callers pick real tables via suffix.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::error::{Error, ErrorKind};
use crate::core::record::{FieldValue, Record, RecordShape, non_scalar_field};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Object(object) => Ok(Self(object)),
            _ => Err(Error::new(ErrorKind::Usage)
                .with_message("document must be a JSON object")
                .with_hint("Wrap values in an object, e.g. {\"Name\": \"Jonas\"}.")),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(name.into(), value)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Document {
    fn from(object: Map<String, Value>) -> Self {
        Self(object)
    }
}

impl Record for Document {
    fn shape() -> Result<RecordShape, Error> {
        Ok(RecordShape::Open)
    }

    fn field(&self, name: &str) -> Result<Option<FieldValue>, Error> {
        match self.0.get(name) {
            Some(value) => FieldValue::from_json(value)
                .map(Some)
                .ok_or_else(|| non_scalar_field(name)),
            None => Ok(None),
        }
    }
}
