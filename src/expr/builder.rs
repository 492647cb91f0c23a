use crate::error::{CompileError, Result};
use crate::path;
use crate::schema::{Schema, TypeRef};
use crate::value::Value;

use super::{BinaryOp, Expr, Method};

/// Fluent facade for writing computed mappings and ad-hoc predicates.
///
/// Each step validates types immediately, so closures passed to
/// [`Lambda::build`](super::Lambda::build) can use `?` between steps.
#[derive(Clone, Debug)]
pub struct ExprBuilder<'s> {
    schema: &'s Schema,
    expr: Expr,
}

impl<'s> ExprBuilder<'s> {
    /// Wraps `expr`.
    pub fn new(schema: &'s Schema, expr: Expr) -> Self {
        Self { schema, expr }
    }

    /// Schema used for path resolution.
    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    /// Borrow the built expression.
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Finishes building.
    pub fn into_expr(self) -> Expr {
        self.expr
    }

    fn wrap(&self, expr: Expr) -> Self {
        Self {
            schema: self.schema,
            expr,
        }
    }

    /// Reads a dotted field path off the current expression.
    pub fn path(&self, path: &str) -> Result<Self> {
        Ok(self.wrap(path::resolve(self.schema, &self.expr, path)?))
    }

    /// Constant whose type is inferred from the value.
    ///
    /// Null, enum, list, and record constants have no single natural type;
    /// use [`ExprBuilder::typed`] for those.
    pub fn lit(&self, value: impl Into<Value>) -> Result<Self> {
        let value = value.into();
        let ty = match &value {
            Value::Bool(_) => TypeRef::Bool,
            Value::Int(_) => TypeRef::Int,
            Value::Float(_) => TypeRef::Float,
            Value::String(_) => TypeRef::String,
            Value::Uuid(_) => TypeRef::Uuid,
            Value::Date(_) => TypeRef::Date,
            Value::DateTime(_) => TypeRef::DateTime,
            other => {
                return Err(CompileError::mismatch(
                    "untyped literal",
                    format!("'{}'", other.to_text()),
                ))
            }
        };
        Ok(self.wrap(Expr::literal(value, ty)?))
    }

    /// Constant with an explicit type.
    pub fn typed(&self, value: impl Into<Value>, ty: TypeRef) -> Result<Self> {
        Ok(self.wrap(Expr::literal(value, ty)?))
    }

    fn text_call(self, method: Method, arg: &str) -> Result<Self> {
        let arg = Expr::literal(arg, TypeRef::String)?;
        let expr = Expr::call(method, self.expr, vec![arg])?;
        Ok(Self {
            schema: self.schema,
            expr,
        })
    }

    /// `self.starts_with(prefix)`
    pub fn starts_with(self, prefix: &str) -> Result<Self> {
        self.text_call(Method::StartsWith, prefix)
    }

    /// `self.ends_with(suffix)`
    pub fn ends_with(self, suffix: &str) -> Result<Self> {
        self.text_call(Method::EndsWith, suffix)
    }

    /// `self.contains(needle)`
    pub fn contains(self, needle: &str) -> Result<Self> {
        self.text_call(Method::Contains, needle)
    }

    /// `self.to_text()`
    pub fn to_text(self) -> Result<Self> {
        let expr = Expr::call(Method::ToText, self.expr, Vec::new())?;
        Ok(Self {
            schema: self.schema,
            expr,
        })
    }

    fn binary(self, op: BinaryOp, other: ExprBuilder<'_>) -> Result<Self> {
        let expr = Expr::binary(op, self.expr, other.expr)?;
        Ok(Self {
            schema: self.schema,
            expr,
        })
    }

    /// `self == other`
    pub fn eq(self, other: ExprBuilder<'_>) -> Result<Self> {
        self.binary(BinaryOp::Equal, other)
    }

    /// `self != other`
    pub fn ne(self, other: ExprBuilder<'_>) -> Result<Self> {
        self.binary(BinaryOp::NotEqual, other)
    }

    /// `self < other`
    pub fn lt(self, other: ExprBuilder<'_>) -> Result<Self> {
        self.binary(BinaryOp::LessThan, other)
    }

    /// `self <= other`
    pub fn le(self, other: ExprBuilder<'_>) -> Result<Self> {
        self.binary(BinaryOp::LessThanOrEqual, other)
    }

    /// `self > other`
    pub fn gt(self, other: ExprBuilder<'_>) -> Result<Self> {
        self.binary(BinaryOp::GreaterThan, other)
    }

    /// `self >= other`
    pub fn ge(self, other: ExprBuilder<'_>) -> Result<Self> {
        self.binary(BinaryOp::GreaterThanOrEqual, other)
    }

    /// `self && other`
    pub fn and(self, other: ExprBuilder<'_>) -> Result<Self> {
        self.binary(BinaryOp::AndAlso, other)
    }

    /// `self || other`
    pub fn or(self, other: ExprBuilder<'_>) -> Result<Self> {
        self.binary(BinaryOp::OrElse, other)
    }

    /// `!self`
    pub fn not(self) -> Result<Self> {
        let expr = Expr::not(self.expr)?;
        Ok(Self {
            schema: self.schema,
            expr,
        })
    }

    /// `self ? if_true : if_false`
    pub fn then_else(self, if_true: ExprBuilder<'_>, if_false: ExprBuilder<'_>) -> Result<Self> {
        let expr = Expr::conditional(self.expr, if_true.expr, if_false.expr)?;
        Ok(Self {
            schema: self.schema,
            expr,
        })
    }
}
