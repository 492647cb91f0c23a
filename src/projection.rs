//! Projection compiler: mapping list to `root => new shape(...)`.

use std::sync::Arc;

use tracing::debug;

use crate::error::{CompileError, Result};
use crate::expr::{Expr, Lambda, Param};
use crate::mapping::Mapping;
use crate::options::CompilerOptions;
use crate::schema::{Schema, TypeRef};
use crate::shape::{Shape, ShapeCache, ShapeInstance};
use crate::value::Value;

/// Compiled projection.
#[derive(Clone, Debug)]
pub struct Projection {
    lambda: Lambda,
    shape: Arc<Shape>,
}

impl Projection {
    /// Transformation expression `root => new shape(...)`.
    pub fn lambda(&self) -> &Lambda {
        &self.lambda
    }

    /// Output shape.
    pub fn shape(&self) -> &Arc<Shape> {
        &self.shape
    }

    /// Applies the projection to one root entity.
    pub fn apply(&self, root: &Value) -> Result<ShapeInstance> {
        match self.lambda.invoke(root)? {
            Value::Shape(instance) => Ok(instance),
            other => Err(CompileError::Evaluation(format!(
                "projection produced '{}' instead of a shape",
                other.to_text()
            ))),
        }
    }
}

/// Builds projections against one schema.
pub struct ProjectionCompiler<'a> {
    schema: &'a Schema,
    cache: &'a ShapeCache,
    root_name: String,
}

impl<'a> ProjectionCompiler<'a> {
    /// Compiler backed by the process-wide shape cache.
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            cache: ShapeCache::global(),
            root_name: CompilerOptions::default().projection.root_parameter,
        }
    }

    /// Uses `cache` instead of the process-wide one.
    pub fn with_cache(mut self, cache: &'a ShapeCache) -> Self {
        self.cache = cache;
        self
    }

    /// Applies `[projection]` options.
    pub fn with_options(mut self, options: &CompilerOptions) -> Self {
        self.root_name = options.projection.root_parameter.clone();
        self
    }

    /// Compiles `mappings` over a fresh root parameter typed `root_type`.
    pub fn compile(&self, root_type: &TypeRef, mappings: &[Mapping]) -> Result<Projection> {
        let root = Param::new(self.root_name.clone(), root_type.clone());
        self.compile_with_root(mappings, root)
    }

    /// Compiles `mappings` over a caller-supplied root parameter.
    pub fn compile_with_root(&self, mappings: &[Mapping], root: Param) -> Result<Projection> {
        // All mappings are built before the cache is touched.
        let mut built = Vec::with_capacity(mappings.len());
        for mapping in mappings {
            built.push((mapping.to(), mapping.build_expression(self.schema, &root)?));
        }
        let fields: Vec<(String, TypeRef)> = built
            .iter()
            .map(|(to, expr)| ((*to).to_owned(), expr.ty()))
            .collect();
        let shape = self.cache.get_or_create(&fields)?;

        let mut args = Vec::with_capacity(shape.fields().len());
        for field in shape.fields() {
            let index = built
                .iter()
                .position(|(to, _)| *to == field.name)
                .ok_or_else(|| CompileError::mapping(&field.name, "no mapping produces this field"))?;
            args.push(built[index].1.clone());
        }
        let body = Expr::construct(&shape, args)?;
        let lambda = Lambda::new(root, body);
        debug!(
            shape = %shape.id(),
            fields = shape.fields().len(),
            expr = %lambda,
            "projection.compile"
        );
        Ok(Projection { lambda, shape })
    }
}
