//! Synthesized projection shapes.
//!
//! A [`Shape`] is a record descriptor built on demand for one ordered field
//! signature. Shapes are only ever created by a [`ShapeCache`] and handed out
//! as `Arc<Shape>`; two projections with the same signature share the same
//! allocation, so `Arc::ptr_eq` is the identity test.

mod cache;

use std::fmt;
use std::sync::Arc;

pub use cache::{ShapeCache, ShapeCacheStats};

use crate::error::{CompileError, Result};
use crate::schema::TypeRef;
use crate::value::Value;

const NAME_TYPE_SEPARATOR: char = '~';
const PAIR_SEPARATOR: char = '|';

/// Process-unique shape identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub u32);

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shape#{}", self.0)
    }
}

/// Canonical, order-sensitive serialization of a field signature.
///
/// Each pair is rendered as `name~type` and pairs are joined with `|`, in
/// the order given. Reordering the same fields produces a different key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SignatureKey(String);

impl SignatureKey {
    /// Builds the key for `fields`, rejecting names that would make the key
    /// ambiguous.
    pub fn new(fields: &[(String, TypeRef)]) -> Result<Self> {
        let mut key = String::new();
        for (idx, (name, ty)) in fields.iter().enumerate() {
            if name.is_empty() {
                return Err(CompileError::mapping(name, "output field name is empty"));
            }
            if name.contains([NAME_TYPE_SEPARATOR, PAIR_SEPARATOR]) {
                return Err(CompileError::mapping(
                    name,
                    "output field names may not contain '~' or '|'",
                ));
            }
            if fields[..idx].iter().any(|(seen, _)| seen == name) {
                return Err(CompileError::mapping(name, "duplicate output field name"));
            }
            if idx > 0 {
                key.push(PAIR_SEPARATOR);
            }
            key.push_str(name);
            key.push(NAME_TYPE_SEPARATOR);
            key.push_str(&ty.to_string());
        }
        Ok(Self(key))
    }

    /// Serialized key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Public, immutable slot of a shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShapeField {
    /// Field name.
    pub name: String,
    /// Field type.
    pub ty: TypeRef,
}

/// Record descriptor exposing exactly the fields of one signature.
#[derive(Debug)]
pub struct Shape {
    id: ShapeId,
    fields: Vec<ShapeField>,
    signature: SignatureKey,
}

impl Shape {
    pub(crate) fn synthesize(id: ShapeId, signature: SignatureKey, fields: &[(String, TypeRef)]) -> Self {
        Self {
            id,
            fields: fields
                .iter()
                .map(|(name, ty)| ShapeField {
                    name: name.clone(),
                    ty: ty.clone(),
                })
                .collect(),
            signature,
        }
    }

    /// Shape identifier.
    pub fn id(&self) -> ShapeId {
        self.id
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[ShapeField] {
        &self.fields
    }

    /// Signature this shape was synthesized for.
    pub fn signature(&self) -> &SignatureKey {
        &self.signature
    }

    /// Type tag of instances of this shape.
    pub fn type_ref(&self) -> TypeRef {
        TypeRef::Shape(self.id)
    }

    /// Position of the field called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    /// Positional constructor: one value per field, in declaration order.
    pub fn construct(self: &Arc<Self>, values: Vec<Value>) -> Result<ShapeInstance> {
        if values.len() != self.fields.len() {
            return Err(CompileError::Evaluation(format!(
                "{} takes {} values, got {}",
                self.id,
                self.fields.len(),
                values.len()
            )));
        }
        Ok(ShapeInstance {
            shape: Arc::clone(self),
            values,
        })
    }
}

/// Instance of a synthesized shape.
#[derive(Clone, Debug)]
pub struct ShapeInstance {
    shape: Arc<Shape>,
    values: Vec<Value>,
}

impl ShapeInstance {
    /// Shape of this instance.
    pub fn shape(&self) -> &Arc<Shape> {
        &self.shape
    }

    /// Field value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.shape.index_of(name).map(|idx| &self.values[idx])
    }

    /// Values in field order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Iterates `(name, value)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.shape
            .fields
            .iter()
            .map(|field| field.name.as_str())
            .zip(self.values.iter())
    }
}

impl PartialEq for ShapeInstance {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shape, &other.shape) && self.values == other.values
    }
}
