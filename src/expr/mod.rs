//! Typed expression trees produced by both compilers.
//!
//! Trees are plain data: every node carries enough type information to be
//! lowered by an external query engine, and [`Lambda::invoke`] evaluates them
//! in memory. Constructors validate operand types, so a tree that exists is
//! well-typed.

mod builder;
mod eval;
mod rebind;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub use builder::ExprBuilder;

use crate::error::{CompileError, Result};
use crate::schema::{FieldDef, Schema, TypeRef};
use crate::shape::Shape;
use crate::value::Value;

static NEXT_PARAM_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique parameter identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(u64);

/// Lambda parameter. Two params are the same variable only if their ids
/// match; the name is cosmetic.
#[derive(Clone, Debug)]
pub struct Param {
    id: ParamId,
    name: String,
    ty: TypeRef,
}

impl Param {
    /// Creates a fresh parameter.
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            id: ParamId(NEXT_PARAM_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            ty,
        }
    }

    /// Identity of the parameter.
    pub fn id(&self) -> ParamId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter type.
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }
}

impl PartialEq for Param {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Param {}

/// Binary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// Short-circuit conjunction.
    AndAlso,
    /// Short-circuit disjunction.
    OrElse,
}

impl BinaryOp {
    /// Operator symbol used by `Display`.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::AndAlso => "&&",
            BinaryOp::OrElse => "||",
        }
    }

    /// Whether the operator is one of `<`, `<=`, `>`, `>=`.
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            BinaryOp::LessThan
                | BinaryOp::LessThanOrEqual
                | BinaryOp::GreaterThan
                | BinaryOp::GreaterThanOrEqual
        )
    }
}

/// Unary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Logical negation.
    Not,
}

/// Methods callable on a target expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    /// `text.starts_with(prefix)`
    StartsWith,
    /// `text.ends_with(suffix)`
    EndsWith,
    /// `text.contains(needle)`
    Contains,
    /// `text.equals(other)`, ordinal text comparison.
    TextEquals,
    /// `value.to_text()`
    ToText,
    /// `list.contains(item)`
    ListContains,
}

impl Method {
    /// Method name used by `Display`.
    pub fn name(self) -> &'static str {
        match self {
            Method::StartsWith => "starts_with",
            Method::EndsWith => "ends_with",
            Method::Contains | Method::ListContains => "contains",
            Method::TextEquals => "equals",
            Method::ToText => "to_text",
        }
    }
}

/// Expression node.
#[derive(Clone, Debug)]
pub enum Expr {
    /// Reference to a lambda parameter.
    Param(Param),
    /// Field read off a record-typed target.
    Field {
        /// Expression producing the record.
        target: Box<Expr>,
        /// Field name.
        name: String,
        /// Declared field type.
        ty: TypeRef,
    },
    /// Constant.
    Literal {
        /// Constant value.
        value: Value,
        /// Static type of the constant.
        ty: TypeRef,
    },
    /// Binary operator application.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// Unary operator application.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expr>,
    },
    /// Method call.
    Call {
        /// Method.
        method: Method,
        /// Receiver.
        target: Box<Expr>,
        /// Arguments.
        args: Vec<Expr>,
    },
    /// `test ? if_true : if_false`
    Conditional {
        /// Boolean condition.
        test: Box<Expr>,
        /// Value when the condition holds.
        if_true: Box<Expr>,
        /// Value otherwise.
        if_false: Box<Expr>,
        /// Result type.
        ty: TypeRef,
    },
    /// Static conversion between a type and its nullable form.
    Convert {
        /// Converted expression.
        operand: Box<Expr>,
        /// Target type.
        ty: TypeRef,
    },
    /// Positional construction of a synthesized shape.
    New {
        /// Shape being constructed.
        shape: Arc<Shape>,
        /// One argument per shape field, in field order.
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Static type of the expression.
    pub fn ty(&self) -> TypeRef {
        match self {
            Expr::Param(param) => param.ty.clone(),
            Expr::Field { ty, .. }
            | Expr::Literal { ty, .. }
            | Expr::Conditional { ty, .. }
            | Expr::Convert { ty, .. } => ty.clone(),
            Expr::Binary { .. } | Expr::Unary { .. } => TypeRef::Bool,
            Expr::Call { method, .. } => match method {
                Method::ToText => TypeRef::String,
                _ => TypeRef::Bool,
            },
            Expr::New { shape, .. } => shape.type_ref(),
        }
    }

    /// Reference to `param`.
    pub fn param(param: &Param) -> Expr {
        Expr::Param(param.clone())
    }

    /// Typed constant; null is accepted for every type.
    pub fn literal(value: impl Into<Value>, ty: TypeRef) -> Result<Expr> {
        let value = value.into();
        if !fits(&value, &ty) {
            return Err(CompileError::mismatch(
                "literal",
                format!("value '{}' of type {ty}", value.to_text()),
            ));
        }
        Ok(Expr::Literal { value, ty })
    }

    /// Null constant of type `ty`.
    pub fn null(ty: TypeRef) -> Expr {
        Expr::Literal {
            value: Value::Null,
            ty,
        }
    }

    /// Boolean `true`.
    pub fn always_true() -> Expr {
        Expr::Literal {
            value: Value::Bool(true),
            ty: TypeRef::Bool,
        }
    }

    pub(crate) fn field(target: Expr, def: &FieldDef) -> Expr {
        Expr::Field {
            target: Box::new(target),
            name: def.name.clone(),
            ty: def.ty.clone(),
        }
    }

    /// Applies a binary operator.
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Result<Expr> {
        let (lt, rt) = (left.ty(), right.ty());
        let ok = match op {
            BinaryOp::AndAlso | BinaryOp::OrElse => {
                lt.underlying() == &TypeRef::Bool && rt.underlying() == &TypeRef::Bool
            }
            BinaryOp::Equal | BinaryOp::NotEqual => lt.equatable_with(&rt),
            _ => lt.equatable_with(&rt) && lt.is_orderable(),
        };
        if !ok {
            return Err(CompileError::mismatch(
                op.symbol(),
                format!("{lt} and {rt}"),
            ));
        }
        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// `left == right`
    pub fn equal(left: Expr, right: Expr) -> Result<Expr> {
        Expr::binary(BinaryOp::Equal, left, right)
    }

    /// Logical negation.
    pub fn not(operand: Expr) -> Result<Expr> {
        let ty = operand.ty();
        if ty.underlying() != &TypeRef::Bool {
            return Err(CompileError::mismatch("!", ty));
        }
        Ok(Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        })
    }

    /// Calls `method` on `target`.
    pub fn call(method: Method, target: Expr, args: Vec<Expr>) -> Result<Expr> {
        let target_ty = target.ty();
        let arg_types: Vec<TypeRef> = args.iter().map(Expr::ty).collect();
        let ok = match method {
            Method::StartsWith | Method::EndsWith | Method::Contains | Method::TextEquals => {
                target_ty.is_text() && matches!(arg_types.as_slice(), [arg] if arg.is_text())
            }
            Method::ToText => arg_types.is_empty(),
            Method::ListContains => match (target_ty.underlying(), arg_types.as_slice()) {
                (TypeRef::List(elem), [arg]) => elem.equatable_with(arg),
                _ => false,
            },
        };
        if !ok {
            let rendered: Vec<String> = arg_types.iter().map(ToString::to_string).collect();
            return Err(CompileError::mismatch(
                method.name(),
                format!("{target_ty}({})", rendered.join(", ")),
            ));
        }
        Ok(Expr::Call {
            method,
            target: Box::new(target),
            args,
        })
    }

    /// `test ? if_true : if_false`; the result is nullable if either branch is.
    pub fn conditional(test: Expr, if_true: Expr, if_false: Expr) -> Result<Expr> {
        let (tt, at, bt) = (test.ty(), if_true.ty(), if_false.ty());
        if tt.underlying() != &TypeRef::Bool || !at.equatable_with(&bt) {
            return Err(CompileError::mismatch(
                "conditional",
                format!("{tt} ? {at} : {bt}"),
            ));
        }
        let ty = if bt.is_nullable() { bt } else { at };
        Ok(Expr::Conditional {
            test: Box::new(test),
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
            ty,
        })
    }

    /// Converts between a type and its nullable form.
    pub fn convert(operand: Expr, ty: TypeRef) -> Result<Expr> {
        let from = operand.ty();
        if !from.equatable_with(&ty) {
            return Err(CompileError::mismatch("convert", format!("{from} to {ty}")));
        }
        Ok(Expr::Convert {
            operand: Box::new(operand),
            ty,
        })
    }

    /// Constructs `shape` positionally.
    pub fn construct(shape: &Arc<Shape>, args: Vec<Expr>) -> Result<Expr> {
        if args.len() != shape.fields().len() {
            return Err(CompileError::mismatch(
                "constructor",
                format!("{} with {} arguments", shape.id(), args.len()),
            ));
        }
        for (field, arg) in shape.fields().iter().zip(&args) {
            let arg_ty = arg.ty();
            if arg_ty != field.ty {
                return Err(CompileError::mismatch(
                    "constructor",
                    format!("{arg_ty} for field '{}: {}'", field.name, field.ty),
                ));
            }
        }
        Ok(Expr::New {
            shape: Arc::clone(shape),
            args,
        })
    }

    /// Folds `exprs` with `op`, left to right. Returns `None` for no input.
    pub fn fold(op: BinaryOp, exprs: impl IntoIterator<Item = Expr>) -> Result<Option<Expr>> {
        let mut acc: Option<Expr> = None;
        for expr in exprs {
            acc = Some(match acc {
                Some(prev) => Expr::binary(op, prev, expr)?,
                None => expr,
            });
        }
        Ok(acc)
    }
}

fn fits(value: &Value, ty: &TypeRef) -> bool {
    match (value, ty.underlying()) {
        (Value::Null, _) => true,
        (Value::Bool(_), TypeRef::Bool)
        | (Value::Int(_), TypeRef::Int)
        | (Value::Float(_), TypeRef::Float)
        | (Value::String(_), TypeRef::String)
        | (Value::Uuid(_), TypeRef::Uuid)
        | (Value::Date(_), TypeRef::Date)
        | (Value::DateTime(_), TypeRef::DateTime)
        | (Value::Enum(_), TypeRef::Enum(_))
        | (Value::Record(_), TypeRef::Record(_)) => true,
        (Value::Shape(instance), TypeRef::Shape(id)) => instance.shape().id() == *id,
        (Value::List(items), TypeRef::List(elem)) => items.iter().all(|item| fits(item, elem)),
        _ => false,
    }
}

/// Single-parameter expression `param => body`.
#[derive(Clone, Debug)]
pub struct Lambda {
    param: Param,
    body: Expr,
}

impl Lambda {
    /// Wraps `body` as a lambda over `param`.
    pub fn new(param: Param, body: Expr) -> Self {
        Self { param, body }
    }

    /// Builds a lambda over a fresh placeholder parameter typed `root`.
    ///
    /// ```ignore
    /// let has_lion = Lambda::build(&schema, person, |p| {
    ///     p.path("FavouriteAnimal")?.contains("Lion")
    /// })?;
    /// ```
    pub fn build<'s, F>(schema: &'s Schema, root: TypeRef, build: F) -> Result<Lambda>
    where
        F: FnOnce(ExprBuilder<'s>) -> Result<ExprBuilder<'s>>,
    {
        let param = Param::new("p", root);
        let body = build(ExprBuilder::new(schema, Expr::param(&param)))?.into_expr();
        Ok(Lambda { param, body })
    }

    /// Always-true predicate over a fresh parameter typed `root`.
    pub fn always_true(root: TypeRef) -> Lambda {
        Lambda {
            param: Param::new("x", root),
            body: Expr::always_true(),
        }
    }

    /// The lambda's parameter.
    pub fn param(&self) -> &Param {
        &self.param
    }

    /// The lambda's body.
    pub fn body(&self) -> &Expr {
        &self.body
    }

    /// Type of the body.
    pub fn result_type(&self) -> TypeRef {
        self.body.ty()
    }

    /// Body with the parameter replaced by `root`.
    pub fn apply_to(&self, root: &Param) -> Expr {
        self.body.rebind(&self.param, &Expr::param(root))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Param(param) => f.write_str(&param.name),
            Expr::Field { target, name, .. } => write!(f, "{target}.{name}"),
            Expr::Literal { value, .. } => write_literal(f, value),
            Expr::Binary { op, left, right } => write!(f, "({left} {} {right})", op.symbol()),
            Expr::Unary {
                op: UnaryOp::Not,
                operand,
            } => write!(f, "!{operand}"),
            Expr::Call {
                method,
                target,
                args,
            } => {
                write!(f, "{target}.{}(", method.name())?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Expr::Conditional {
                test,
                if_true,
                if_false,
                ..
            } => write!(f, "({test} ? {if_true} : {if_false})"),
            Expr::Convert { operand, ty } => write!(f, "({ty}){operand}"),
            Expr::New { shape, args } => {
                write!(f, "new {}(", shape.id())?;
                write_list(f, args)?;
                f.write_str(")")
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, exprs: &[Expr]) -> fmt::Result {
    for (idx, expr) in exprs.iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{expr}")?;
    }
    Ok(())
}

fn write_literal(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Null => f.write_str("null"),
        Value::String(text) => write!(f, "{text:?}"),
        Value::Uuid(_) | Value::Date(_) | Value::DateTime(_) => {
            write!(f, "{:?}", value.to_text())
        }
        Value::List(items) => {
            f.write_str("[")?;
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    f.write_str(", ")?;
                }
                write_literal(f, item)?;
            }
            f.write_str("]")
        }
        other => f.write_str(&other.to_text()),
    }
}

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.param.name, self.body)
    }
}
