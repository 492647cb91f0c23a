//! In-memory evaluator.
//!
//! Field reads and method calls propagate null (reading through a missing
//! navigation yields null instead of failing). Comparisons are lifted:
//! `null == null` holds, and any ordering involving null is false.

use std::cmp::Ordering;

use super::{BinaryOp, Expr, Lambda, Method, ParamId, UnaryOp};
use crate::error::{CompileError, Result};
use crate::value::Value;

struct Binding<'a> {
    param: ParamId,
    value: &'a Value,
}

impl Lambda {
    /// Evaluates the body with the parameter bound to `arg`.
    pub fn invoke(&self, arg: &Value) -> Result<Value> {
        let binding = Binding {
            param: self.param.id(),
            value: arg,
        };
        eval(&self.body, &binding)
    }

    /// Evaluates a predicate; null counts as false.
    pub fn test(&self, arg: &Value) -> Result<bool> {
        match self.invoke(arg)? {
            Value::Bool(flag) => Ok(flag),
            Value::Null => Ok(false),
            other => Err(CompileError::Evaluation(format!(
                "predicate produced non-boolean '{}'",
                other.to_text()
            ))),
        }
    }
}

fn eval(expr: &Expr, env: &Binding<'_>) -> Result<Value> {
    match expr {
        Expr::Param(param) if param.id() == env.param => Ok(env.value.clone()),
        Expr::Param(param) => Err(CompileError::Evaluation(format!(
            "parameter '{}' is not bound",
            param.name()
        ))),
        Expr::Literal { value, .. } => Ok(value.clone()),
        Expr::Field { target, name, .. } => match eval(target, env)? {
            Value::Null => Ok(Value::Null),
            Value::Record(record) => Ok(record.get(name).cloned().unwrap_or(Value::Null)),
            Value::Shape(instance) => instance.get(name).cloned().ok_or_else(|| {
                CompileError::Evaluation(format!("{} has no field '{name}'", instance.shape().id()))
            }),
            other => Err(CompileError::Evaluation(format!(
                "cannot read '{name}' from '{}'",
                other.to_text()
            ))),
        },
        Expr::Binary { op, left, right } => eval_binary(*op, left, right, env),
        Expr::Unary {
            op: UnaryOp::Not,
            operand,
        } => match eval(operand, env)? {
            Value::Bool(flag) => Ok(Value::Bool(!flag)),
            Value::Null => Ok(Value::Null),
            other => Err(non_bool(&other)),
        },
        Expr::Call {
            method,
            target,
            args,
        } => {
            let target = eval(target, env)?;
            let args = args
                .iter()
                .map(|arg| eval(arg, env))
                .collect::<Result<Vec<_>>>()?;
            eval_call(*method, target, args)
        }
        Expr::Conditional {
            test,
            if_true,
            if_false,
            ..
        } => match eval(test, env)? {
            Value::Bool(true) => eval(if_true, env),
            Value::Bool(false) | Value::Null => eval(if_false, env),
            other => Err(non_bool(&other)),
        },
        Expr::Convert { operand, ty } => {
            let value = eval(operand, env)?;
            if value.is_null() && !ty.admits_null() {
                return Err(CompileError::Evaluation(format!(
                    "null cannot be converted to {ty}"
                )));
            }
            Ok(value)
        }
        Expr::New { shape, args } => {
            let values = args
                .iter()
                .map(|arg| eval(arg, env))
                .collect::<Result<Vec<_>>>()?;
            shape.construct(values).map(Value::Shape)
        }
    }
}

fn eval_binary(op: BinaryOp, left: &Expr, right: &Expr, env: &Binding<'_>) -> Result<Value> {
    match op {
        BinaryOp::AndAlso => {
            let lhs = as_flag(eval(left, env)?)?;
            if lhs == Some(false) {
                return Ok(Value::Bool(false));
            }
            let rhs = as_flag(eval(right, env)?)?;
            Ok(match (lhs, rhs) {
                (_, Some(false)) => Value::Bool(false),
                (Some(true), Some(true)) => Value::Bool(true),
                _ => Value::Null,
            })
        }
        BinaryOp::OrElse => {
            let lhs = as_flag(eval(left, env)?)?;
            if lhs == Some(true) {
                return Ok(Value::Bool(true));
            }
            let rhs = as_flag(eval(right, env)?)?;
            Ok(match (lhs, rhs) {
                (_, Some(true)) => Value::Bool(true),
                (Some(false), Some(false)) => Value::Bool(false),
                _ => Value::Null,
            })
        }
        BinaryOp::Equal => Ok(Value::Bool(lifted_eq(
            &eval(left, env)?,
            &eval(right, env)?,
        ))),
        BinaryOp::NotEqual => Ok(Value::Bool(!lifted_eq(
            &eval(left, env)?,
            &eval(right, env)?,
        ))),
        ordering => {
            let (lhs, rhs) = (eval(left, env)?, eval(right, env)?);
            if lhs.is_null() || rhs.is_null() {
                return Ok(Value::Bool(false));
            }
            let ord = lhs.compare(&rhs).ok_or_else(|| {
                CompileError::Evaluation(format!(
                    "cannot order '{}' against '{}'",
                    lhs.to_text(),
                    rhs.to_text()
                ))
            })?;
            Ok(Value::Bool(match ordering {
                BinaryOp::LessThan => ord == Ordering::Less,
                BinaryOp::LessThanOrEqual => ord != Ordering::Greater,
                BinaryOp::GreaterThan => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            }))
        }
    }
}

fn eval_call(method: Method, target: Value, args: Vec<Value>) -> Result<Value> {
    if method == Method::ListContains {
        let Value::List(items) = target else {
            return Ok(Value::Null);
        };
        let needle = args.into_iter().next().unwrap_or(Value::Null);
        return Ok(Value::Bool(items.iter().any(|item| lifted_eq(item, &needle))));
    }
    if target.is_null() {
        return Ok(Value::Null);
    }
    if method == Method::ToText {
        return Ok(Value::String(target.to_text()));
    }
    let (Value::String(text), Some(Value::String(arg))) = (&target, args.first()) else {
        if args.first().map_or(true, Value::is_null) {
            return Ok(Value::Null);
        }
        return Err(CompileError::Evaluation(format!(
            "{} expects text operands",
            method.name()
        )));
    };
    let hit = match method {
        Method::StartsWith => text.starts_with(arg.as_str()),
        Method::EndsWith => text.ends_with(arg.as_str()),
        Method::Contains => text.contains(arg.as_str()),
        _ => text == arg,
    };
    Ok(Value::Bool(hit))
}

fn lifted_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        _ => left == right || left.compare(right) == Some(Ordering::Equal),
    }
}

fn as_flag(value: Value) -> Result<Option<bool>> {
    match value {
        Value::Bool(flag) => Ok(Some(flag)),
        Value::Null => Ok(None),
        other => Err(non_bool(&other)),
    }
}

fn non_bool(value: &Value) -> CompileError {
    CompileError::Evaluation(format!("expected a boolean, found '{}'", value.to_text()))
}
