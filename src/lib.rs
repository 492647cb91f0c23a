//! Compiles declarative projections and filters into typed expression trees.
//!
//! A [`ProjectionCompiler`] turns a list of [`Mapping`]s into
//! `root => new shape(...)`, where the shape is synthesized on demand and
//! shared through a [`ShapeCache`]. A [`FilterCompiler`] turns
//! [`FilterDescriptor`]s, or text such as `Jo% or %ne`, into predicates.
//! Both produce [`Lambda`]s that an external engine can lower, or that
//! [`MemoryQuery`] evaluates in memory.

pub mod convert;
pub mod error;
pub mod expr;
pub mod filter;
pub mod mapping;
pub mod options;
pub mod path;
pub mod projection;
pub mod query;
pub mod schema;
pub mod shape;
pub mod value;

pub use error::{CompileError, CompileErrorWithCode, Result};
pub use expr::{Expr, ExprBuilder, Lambda, Param};
pub use filter::{text_filter, FilterCompiler, FilterDescriptor, FilterOperator};
pub use mapping::Mapping;
pub use options::{CompilerOptions, ConfigError};
pub use projection::{Projection, ProjectionCompiler};
pub use query::MemoryQuery;
pub use schema::{EnumType, RecordType, Schema, TypeRef};
pub use shape::{Shape, ShapeCache, ShapeId, ShapeInstance};
pub use value::{EnumValue, Record, Value};
