//! Mapping rules: each produces one named, typed output field from a root
//! entity.

use crate::error::{CompileError, Result};
use crate::expr::{Expr, ExprBuilder, Lambda, Param};
use crate::path;
use crate::schema::{Schema, TypeRef};

/// One output field of a projection.
#[derive(Clone, Debug)]
pub enum Mapping {
    /// Copies the value found at a dotted path.
    Direct {
        /// Output field name.
        to: String,
        /// Dotted path on the root.
        from: String,
    },
    /// Arbitrary pure expression over the root.
    Computed(ComputedMapping),
}

/// Expression built against its own placeholder parameter; compiling
/// rebinds the placeholder to the projection's root.
#[derive(Clone, Debug)]
pub struct ComputedMapping {
    to: String,
    lambda: Lambda,
}

impl ComputedMapping {
    /// Output field name.
    pub fn to(&self) -> &str {
        &self.to
    }

    /// Stored expression.
    pub fn lambda(&self) -> &Lambda {
        &self.lambda
    }
}

impl Mapping {
    /// Direct path mapping.
    pub fn direct(to: impl Into<String>, from: impl Into<String>) -> Self {
        Mapping::Direct {
            to: to.into(),
            from: from.into(),
        }
    }

    /// Computed mapping from a prebuilt lambda.
    ///
    /// The body may only reference the lambda's own parameter.
    pub fn computed(to: impl Into<String>, lambda: Lambda) -> Result<Self> {
        let to = to.into();
        if let Some(stray) = lambda
            .body()
            .free_params()
            .into_iter()
            .find(|param| param != lambda.param())
        {
            return Err(CompileError::mapping(
                to,
                format!(
                    "expression references parameter '{}' besides its own",
                    stray.name()
                ),
            ));
        }
        Ok(Mapping::Computed(ComputedMapping { to, lambda }))
    }

    /// Builds the lambda with [`Lambda::build`] and wraps it.
    pub fn compute<'s, F>(
        schema: &'s Schema,
        root: TypeRef,
        to: impl Into<String>,
        build: F,
    ) -> Result<Self>
    where
        F: FnOnce(ExprBuilder<'s>) -> Result<ExprBuilder<'s>>,
    {
        Mapping::computed(to, Lambda::build(schema, root, build)?)
    }

    /// Output field name.
    pub fn to(&self) -> &str {
        match self {
            Mapping::Direct { to, .. } => to,
            Mapping::Computed(computed) => &computed.to,
        }
    }

    /// Type of the output field when compiled against `root`.
    pub fn result_type(&self, schema: &Schema, root: &Param) -> Result<TypeRef> {
        self.build_expression(schema, root).map(|expr| expr.ty())
    }

    /// Expression producing the output field from `root`.
    pub fn build_expression(&self, schema: &Schema, root: &Param) -> Result<Expr> {
        match self {
            Mapping::Direct { from, .. } => path::resolve(schema, &Expr::param(root), from),
            Mapping::Computed(computed) => {
                let expected = computed.lambda.param().ty();
                if expected != root.ty() {
                    return Err(CompileError::mapping(
                        &computed.to,
                        format!("expression is over {expected}, root is {}", root.ty()),
                    ));
                }
                Ok(computed.lambda.apply_to(root))
            }
        }
    }
}
