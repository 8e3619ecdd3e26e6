//! Purpose: Define the capability a type needs to be stored as a record.
//! Exports: `Record`, `RecordShape`, `FieldValue`, `type_table_name`.
//! Role: Compile-time replacement for runtime reflection over record fields.
//! Invariants: Field names are the serialized `Data` keys, matched case-sensitively.
//! Invariants: Only scalar fields (null, bool, number, string) are addressable.
use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::core::error::{Error, ErrorKind};

/// The set of field names a record type exposes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RecordShape {
    /// Every record of the type carries exactly these fields.
    Closed(BTreeSet<String>),
    /// Schemaless; fields are discovered per record.
    Open,
}

impl RecordShape {
    pub fn allows(&self, field: &str) -> bool {
        match self {
            RecordShape::Closed(names) => names.contains(field),
            RecordShape::Open => true,
        }
    }
}

/// A type that can be persisted in a table.
///
/// The defaults derive everything from the type's serde implementation:
/// the table is the lowercased type name, the shape is the key set of
/// `Self::default()` serialized as a JSON object, and field access reads the
/// serialized value. Types override these when they know better (for example
/// a hand-written accessor that avoids serializing the whole record).
///
/// The default shape only sees fields that `Self::default()` actually
/// serializes. A field behind `#[serde(skip_serializing_if = ...)]` or
/// `#[serde(flatten)]` over an empty map is invisible to it, so filters and
/// sums on that field fail as unknown. Such types override `shape()` and
/// list the field explicitly.
pub trait Record: Serialize + DeserializeOwned + Default {
    fn table_name() -> String {
        type_table_name::<Self>()
    }

    fn shape() -> Result<RecordShape, Error> {
        let object = serialize_object(&Self::default())?;
        Ok(RecordShape::Closed(object.keys().cloned().collect()))
    }

    /// Returns `Ok(None)` when the record has no field with this name.
    fn field(&self, name: &str) -> Result<Option<FieldValue>, Error> {
        let object = serialize_object(self)?;
        match object.get(name) {
            Some(value) => FieldValue::from_json(value)
                .map(Some)
                .ok_or_else(|| non_scalar_field(name)),
            None => Ok(None),
        }
    }
}

/// Lowercased final path segment of the type name, generic arguments dropped:
/// `app::model::Person` becomes `person`, `Wrapper<u8>` becomes `wrapper`.
pub fn type_table_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_lowercase()
}

/// A scalar field value read from a record.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
}

impl FieldValue {
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(FieldValue::Null),
            Value::Bool(flag) => Some(FieldValue::Bool(*flag)),
            Value::Number(number) => {
                if let Some(int) = number.as_i64() {
                    Some(FieldValue::Int(int))
                } else if let Some(uint) = number.as_u64() {
                    Some(FieldValue::UInt(uint))
                } else {
                    number.as_f64().map(FieldValue::Float)
                }
            }
            Value::String(text) => Some(FieldValue::Str(text.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Integer view used by sums; floats and non-numbers yield `None`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(int) => Some(*int),
            FieldValue::UInt(uint) => i64::try_from(*uint).ok(),
            _ => None,
        }
    }

    /// Trimmed, lowercased rendering used for equality filters.
    pub fn normalized(&self) -> String {
        normalize(&self.to_string())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str("null"),
            FieldValue::Bool(flag) => write!(f, "{flag}"),
            FieldValue::Int(int) => write!(f, "{int}"),
            FieldValue::UInt(uint) => write!(f, "{uint}"),
            FieldValue::Float(float) => write!(f, "{float}"),
            FieldValue::Str(text) => f.write_str(text),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

pub(crate) fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

pub(crate) fn non_scalar_field(name: &str) -> Error {
    Error::new(ErrorKind::Field)
        .with_message(format!("field `{name}` is not a scalar value"))
        .with_hint("Only null, boolean, number, and string fields can be filtered or summed.")
}

fn serialize_object<T: Serialize + ?Sized>(record: &T) -> Result<Map<String, Value>, Error> {
    let value = serde_json::to_value(record).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to serialize record")
            .with_source(err)
    })?;
    match value {
        Value::Object(object) => Ok(object),
        other => Err(Error::new(ErrorKind::Field)
            .with_message(format!(
                "record does not serialize to a JSON object (got {})",
                json_type_name(&other)
            ))
            .with_hint("Records must be structs with named fields.")),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldValue, Record, RecordShape, type_table_name};
    use crate::core::error::ErrorKind;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
    #[serde(rename_all = "PascalCase")]
    struct Person {
        name: String,
        age: i64,
        sex: bool,
    }

    impl Record for Person {}

    #[derive(Default, Deserialize, Serialize)]
    struct Tagged {
        tags: Vec<String>,
    }

    impl Record for Tagged {}

    #[derive(Default, Deserialize, Serialize)]
    struct Sparse {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nickname: Option<String>,
    }

    impl Record for Sparse {}

    #[derive(Default, Deserialize, Serialize)]
    struct Profile {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nickname: Option<String>,
    }

    impl Record for Profile {
        fn shape() -> Result<RecordShape, crate::core::error::Error> {
            Ok(RecordShape::Closed(
                ["name", "nickname"].into_iter().map(String::from).collect(),
            ))
        }
    }

    struct Wrapper<T>(std::marker::PhantomData<T>);

    #[test]
    fn table_name_is_lowercased_type_name() {
        assert_eq!(Person::table_name(), "person");
        assert_eq!(type_table_name::<Wrapper<u8>>(), "wrapper");
        assert_eq!(type_table_name::<String>(), "string");
    }

    #[test]
    fn default_shape_lists_serialized_fields() {
        let RecordShape::Closed(names) = Person::shape().expect("shape") else {
            panic!("expected closed shape");
        };
        let names: Vec<_> = names.into_iter().collect();
        assert_eq!(names, vec!["Age", "Name", "Sex"]);
    }

    #[test]
    fn skipped_fields_need_an_explicit_shape() {
        assert!(!Sparse::shape().expect("shape").allows("nickname"));
        assert!(Profile::shape().expect("shape").allows("nickname"));

        let profile = Profile {
            name: "Woody".to_string(),
            nickname: Some("ant".to_string()),
        };
        assert_eq!(
            profile.field("nickname").expect("field"),
            Some(FieldValue::Str("ant".to_string()))
        );
        assert_eq!(Profile::default().field("nickname").expect("field"), None);
    }

    #[test]
    fn field_lookup_is_case_sensitive() {
        let person = Person {
            name: "Jonas".to_string(),
            age: 44,
            sex: true,
        };
        assert_eq!(person.field("Age").expect("field"), Some(FieldValue::Int(44)));
        assert_eq!(person.field("age").expect("field"), None);
        assert_eq!(
            person.field("Name").expect("field"),
            Some(FieldValue::Str("Jonas".to_string()))
        );
    }

    #[test]
    fn nested_fields_are_field_errors() {
        let tagged = Tagged {
            tags: vec!["a".to_string()],
        };
        let err = tagged.field("tags").expect_err("non-scalar");
        assert_eq!(err.kind(), ErrorKind::Field);
    }

    #[test]
    fn display_matches_default_rendering() {
        assert_eq!(FieldValue::Bool(true).to_string(), "true");
        assert_eq!(FieldValue::Int(-3).to_string(), "-3");
        assert_eq!(FieldValue::Float(3.0).to_string(), "3");
        assert_eq!(FieldValue::Float(2.5).to_string(), "2.5");
        assert_eq!(FieldValue::Str("  Mixed Case ".into()).normalized(), "mixed case");
    }

    #[test]
    fn json_numbers_pick_the_narrowest_variant() {
        assert_eq!(FieldValue::from_json(&json!(5)), Some(FieldValue::Int(5)));
        assert_eq!(
            FieldValue::from_json(&json!(u64::MAX)),
            Some(FieldValue::UInt(u64::MAX))
        );
        assert_eq!(FieldValue::from_json(&json!(1.5)), Some(FieldValue::Float(1.5)));
        assert_eq!(FieldValue::from_json(&json!([1])), None);
        assert_eq!(FieldValue::UInt(u64::MAX).as_i64(), None);
        assert_eq!(FieldValue::Float(1.0).as_i64(), None);
    }
}
