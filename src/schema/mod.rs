//! Type tags and the entity catalog that path resolution and literal
//! conversion consult.
//!
//! Record types reference each other by name so that navigation properties
//! may form cycles (a person holds an id card which points back at the
//! person).

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

use crate::error::{CompileError, Result};
use crate::shape::ShapeId;

/// Type tag attached to every expression node, field, and shape slot.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// Boolean.
    Bool,
    /// Signed 64-bit integer.
    Int,
    /// 64-bit floating point.
    Float,
    /// UTF-8 text.
    String,
    /// Unique identifier.
    Uuid,
    /// Calendar date.
    Date,
    /// Date and time of day without offset.
    DateTime,
    /// Enumeration declared in the schema.
    Enum(String),
    /// Record type declared in the schema.
    Record(String),
    /// Synthesized projection shape.
    Shape(ShapeId),
    /// Homogeneous list.
    List(Box<TypeRef>),
    /// Nullable wrapper around a non-null type.
    Nullable(Box<TypeRef>),
}

impl TypeRef {
    /// Wraps the type as nullable; already-nullable types are returned as is.
    pub fn nullable(self) -> Self {
        match self {
            TypeRef::Nullable(_) => self,
            other => TypeRef::Nullable(Box::new(other)),
        }
    }

    /// List of `elem`.
    pub fn list(elem: TypeRef) -> Self {
        TypeRef::List(Box::new(elem))
    }

    /// Strips a nullable wrapper.
    pub fn underlying(&self) -> &TypeRef {
        match self {
            TypeRef::Nullable(inner) => inner,
            other => other,
        }
    }

    /// Whether the type carries an explicit nullable wrapper.
    pub fn is_nullable(&self) -> bool {
        matches!(self, TypeRef::Nullable(_))
    }

    /// Whether the underlying type is textual.
    pub fn is_text(&self) -> bool {
        matches!(self.underlying(), TypeRef::String)
    }

    /// Whether values of this type can hold null without a nullable wrapper.
    pub fn admits_null(&self) -> bool {
        matches!(
            self,
            TypeRef::Nullable(_)
                | TypeRef::String
                | TypeRef::Record(_)
                | TypeRef::Shape(_)
                | TypeRef::List(_)
        )
    }

    /// Whether `<`, `<=`, `>`, `>=` are defined on the underlying type.
    pub fn is_orderable(&self) -> bool {
        matches!(
            self.underlying(),
            TypeRef::Int | TypeRef::Float | TypeRef::String | TypeRef::Date | TypeRef::DateTime
        )
    }

    /// Record name when the underlying type is a record.
    pub fn record_name(&self) -> Option<&str> {
        match self.underlying() {
            TypeRef::Record(name) => Some(name),
            _ => None,
        }
    }

    /// Two types compare for equality when their underlying types agree.
    pub fn equatable_with(&self, other: &TypeRef) -> bool {
        self.underlying() == other.underlying()
    }

    /// Parses a canonical type name, resolving record and enum names against
    /// `schema`.
    pub fn parse(text: &str, schema: &Schema) -> Result<Self> {
        let text = text.trim();
        if let Some(inner) = text.strip_suffix('?') {
            return Ok(TypeRef::parse(inner, schema)?.nullable());
        }
        if let Some(inner) = text
            .strip_prefix("list<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            return Ok(TypeRef::list(TypeRef::parse(inner, schema)?));
        }
        Ok(match text {
            "bool" => TypeRef::Bool,
            "int" => TypeRef::Int,
            "float" => TypeRef::Float,
            "string" => TypeRef::String,
            "uuid" => TypeRef::Uuid,
            "date" => TypeRef::Date,
            "datetime" => TypeRef::DateTime,
            name if schema.records.contains_key(name) => TypeRef::Record(name.to_owned()),
            name if schema.enums.contains_key(name) => TypeRef::Enum(name.to_owned()),
            other => return Err(CompileError::Schema(format!("unknown type '{other}'"))),
        })
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Bool => f.write_str("bool"),
            TypeRef::Int => f.write_str("int"),
            TypeRef::Float => f.write_str("float"),
            TypeRef::String => f.write_str("string"),
            TypeRef::Uuid => f.write_str("uuid"),
            TypeRef::Date => f.write_str("date"),
            TypeRef::DateTime => f.write_str("datetime"),
            TypeRef::Enum(name) | TypeRef::Record(name) => f.write_str(name),
            TypeRef::Shape(id) => write!(f, "{id}"),
            TypeRef::List(elem) => write!(f, "list<{elem}>"),
            TypeRef::Nullable(inner) => write!(f, "{inner}?"),
        }
    }
}

/// Named, typed field of a record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Field type.
    pub ty: TypeRef,
}

/// Entity type with an ordered field list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordType {
    name: String,
    fields: Vec<FieldDef>,
}

impl RecordType {
    /// Creates an empty record type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Appends a field.
    pub fn field(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            ty,
        });
        self
    }

    /// Record name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Looks up a field by exact name.
    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Enumeration with named integer constants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumType {
    name: String,
    constants: Vec<(String, i64)>,
}

impl EnumType {
    /// Creates an enumeration with no constants.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constants: Vec::new(),
        }
    }

    /// Appends a named constant.
    pub fn constant(mut self, name: impl Into<String>, ordinal: i64) -> Self {
        self.constants.push((name.into(), ordinal));
        self
    }

    /// Enumeration name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordinal of the constant called `name` (case-sensitive).
    pub fn ordinal_of(&self, name: &str) -> Option<i64> {
        self.constants
            .iter()
            .find(|(constant, _)| constant == name)
            .map(|(_, ordinal)| *ordinal)
    }

    /// Name of the first constant with `ordinal`, if declared.
    pub fn name_of(&self, ordinal: i64) -> Option<&str> {
        self.constants
            .iter()
            .find(|(_, value)| *value == ordinal)
            .map(|(name, _)| name.as_str())
    }
}

/// Catalog of record and enum types.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    records: HashMap<String, RecordType>,
    enums: HashMap<String, EnumType>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a record type.
    pub fn with_record(mut self, record: RecordType) -> Self {
        self.records.insert(record.name.clone(), record);
        self
    }

    /// Registers an enumeration.
    pub fn with_enum(mut self, enumeration: EnumType) -> Self {
        self.enums.insert(enumeration.name.clone(), enumeration);
        self
    }

    /// Resolves a record type by name.
    pub fn record(&self, name: &str) -> Result<&RecordType> {
        self.records
            .get(name)
            .ok_or_else(|| CompileError::Schema(format!("unknown record type '{name}'")))
    }

    /// Resolves an enumeration by name.
    pub fn enumeration(&self, name: &str) -> Result<&EnumType> {
        self.enums
            .get(name)
            .ok_or_else(|| CompileError::Schema(format!("unknown enum type '{name}'")))
    }

    /// Checks that every field type refers to a declared record or enum.
    pub fn validate(&self) -> Result<()> {
        for record in self.records.values() {
            for field in &record.fields {
                self.check_type(&field.ty)?;
            }
        }
        Ok(())
    }

    fn check_type(&self, ty: &TypeRef) -> Result<()> {
        match ty {
            TypeRef::Record(name) => self.record(name).map(|_| ()),
            TypeRef::Enum(name) => self.enumeration(name).map(|_| ()),
            TypeRef::List(inner) | TypeRef::Nullable(inner) => self.check_type(inner),
            _ => Ok(()),
        }
    }

    /// Loads a schema from its JSON document form.
    ///
    /// ```json
    /// {"records": [{"name": "Person", "fields": [{"name": "Age", "type": "int?"}]}],
    ///  "enums": [{"name": "Mood", "constants": [{"name": "Calm", "value": 0}]}]}
    /// ```
    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: RawSchema = serde_json::from_str(text)
            .map_err(|err| CompileError::Schema(format!("malformed schema document: {err}")))?;

        // Register every name first so fields can reference types declared later.
        let mut schema = Schema::new();
        for record in &raw.records {
            schema = schema.with_record(RecordType::new(record.name.clone()));
        }
        for enumeration in raw.enums {
            let mut def = EnumType::new(enumeration.name);
            for constant in enumeration.constants {
                def = def.constant(constant.name, constant.value);
            }
            schema = schema.with_enum(def);
        }

        let mut records = Vec::with_capacity(raw.records.len());
        for record in raw.records {
            let mut def = RecordType::new(record.name);
            for field in record.fields {
                let ty = TypeRef::parse(&field.ty, &schema)?;
                def = def.field(field.name, ty);
            }
            records.push(def);
        }
        for record in records {
            schema = schema.with_record(record);
        }
        Ok(schema)
    }
}

#[derive(Debug, Deserialize)]
struct RawSchema {
    #[serde(default)]
    records: Vec<RawRecord>,
    #[serde(default)]
    enums: Vec<RawEnum>,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    name: String,
    #[serde(default)]
    fields: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    name: String,
    #[serde(rename = "type")]
    ty: String,
}

#[derive(Debug, Deserialize)]
struct RawEnum {
    name: String,
    #[serde(default)]
    constants: Vec<RawConstant>,
}

#[derive(Debug, Deserialize)]
struct RawConstant {
    name: String,
    value: i64,
}
