//! Runtime values flowing through the in-memory evaluator, plus the JSON
//! bridge used by the CLI.
use std::cmp::Ordering;

use serde_json::{Map, Number, Value as Json};
use time::macros::format_description;
use time::{Date, PrimitiveDateTime};
use uuid::Uuid;

use crate::convert::{parse_enum, parse_text};
use crate::error::{CompileError, Result};
use crate::schema::{Schema, TypeRef};
use crate::shape::ShapeInstance;

/// Typed runtime value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Null literal.
    Null,
    /// Boolean literal.
    Bool(bool),
    /// Signed 64-bit integer literal.
    Int(i64),
    /// 64-bit floating point literal.
    Float(f64),
    /// UTF-8 string literal.
    String(String),
    /// Unique identifier.
    Uuid(Uuid),
    /// Calendar date.
    Date(Date),
    /// Date and time without offset.
    DateTime(PrimitiveDateTime),
    /// Enumeration constant.
    Enum(EnumValue),
    /// Homogeneous list.
    List(Vec<Value>),
    /// Entity instance.
    Record(Record),
    /// Instance of a synthesized projection shape.
    Shape(ShapeInstance),
}

/// Enumeration constant; `name` is absent for undeclared ordinals.
#[derive(Clone, Debug)]
pub struct EnumValue {
    /// Integer ordinal.
    pub ordinal: i64,
    /// Declared constant name.
    pub name: Option<String>,
}

impl PartialEq for EnumValue {
    fn eq(&self, other: &Self) -> bool {
        self.ordinal == other.ordinal
    }
}

/// Entity instance with fields in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name`, replacing any previous value.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets `name`, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Field value; absent fields read as `None`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    /// Iterates fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl Value {
    /// Whether the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Canonical textual form.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(v) => v.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::String(v) => v.clone(),
            Value::Uuid(v) => v.hyphenated().to_string(),
            Value::Date(v) => v
                .format(format_description!("[year]-[month]-[day]"))
                .unwrap_or_else(|_| v.to_string()),
            Value::DateTime(v) => v
                .format(format_description!(
                    "[year]-[month]-[day] [hour]:[minute]:[second]"
                ))
                .unwrap_or_else(|_| v.to_string()),
            Value::Enum(v) => v
                .name
                .clone()
                .unwrap_or_else(|| v.ordinal.to_string()),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(Value::to_text).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Record(record) => {
                let parts: Vec<String> = record
                    .iter()
                    .map(|(name, value)| format!("{name} = {}", value.to_text()))
                    .collect();
                format!("{{ {} }}", parts.join(", "))
            }
            Value::Shape(instance) => {
                let parts: Vec<String> = instance
                    .iter()
                    .map(|(name, value)| format!("{name} = {}", value.to_text()))
                    .collect();
                format!("{{ {} }}", parts.join(", "))
            }
        }
    }

    /// Orders two non-null values of the same kind; integers and floats
    /// compare numerically.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::Enum(a), Value::Enum(b)) => Some(a.ordinal.cmp(&b.ordinal)),
            _ => None,
        }
    }

    /// Builds a value of type `ty` from its JSON form.
    pub fn from_json(json: &Json, ty: &TypeRef, schema: &Schema) -> Result<Value> {
        let mismatch = || CompileError::Document(format!("JSON value {json} is not a valid {ty}"));
        match (ty.underlying(), json) {
            (_, Json::Null) => Ok(Value::Null),
            (TypeRef::Bool, Json::Bool(v)) => Ok(Value::Bool(*v)),
            (TypeRef::Int, Json::Number(n)) => n.as_i64().map(Value::Int).ok_or_else(mismatch),
            (TypeRef::Float, Json::Number(n)) => {
                n.as_f64().map(Value::Float).ok_or_else(mismatch)
            }
            (TypeRef::Enum(name), Json::Number(n)) => {
                let ordinal = n.as_i64().ok_or_else(mismatch)?;
                parse_enum(&ordinal.to_string(), name, schema).map(Value::Enum)
            }
            (TypeRef::List(elem), Json::Array(items)) => items
                .iter()
                .map(|item| Value::from_json(item, elem, schema))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            (TypeRef::Record(name), Json::Object(map)) => {
                let def = schema.record(name)?;
                let mut record = Record::new();
                for field in def.fields() {
                    let value = match map.get(&field.name) {
                        Some(json) => Value::from_json(json, &field.ty, schema)?,
                        None => Value::Null,
                    };
                    record.insert(field.name.clone(), value);
                }
                Ok(Value::Record(record))
            }
            (scalar, Json::String(text)) if !matches!(scalar, TypeRef::List(_)) => {
                parse_text(text, scalar, schema)
            }
            _ => Err(mismatch()),
        }
    }

    /// Renders the value as JSON.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(v) => Json::Bool(*v),
            Value::Int(v) => Json::Number((*v).into()),
            Value::Float(v) => Number::from_f64(*v).map_or(Json::Null, Json::Number),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Record(record) => Json::Object(
                record
                    .iter()
                    .map(|(name, value)| (name.to_owned(), value.to_json()))
                    .collect::<Map<_, _>>(),
            ),
            Value::Shape(instance) => Json::Object(
                instance
                    .iter()
                    .map(|(name, value)| (name.to_owned(), value.to_json()))
                    .collect::<Map<_, _>>(),
            ),
            other => Json::String(other.to_text()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Value::Uuid(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Record(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
