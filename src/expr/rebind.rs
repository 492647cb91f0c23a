//! Structural passes over expression trees.

use std::collections::BTreeSet;

use super::{Expr, Param};

impl Expr {
    /// Replaces every reference to `from` with `to`, leaving all other nodes
    /// structurally unchanged.
    pub fn rebind(&self, from: &Param, to: &Expr) -> Expr {
        let go = |expr: &Expr| Box::new(expr.rebind(from, to));
        match self {
            Expr::Param(param) if param == from => to.clone(),
            Expr::Param(_) | Expr::Literal { .. } => self.clone(),
            Expr::Field { target, name, ty } => Expr::Field {
                target: go(target),
                name: name.clone(),
                ty: ty.clone(),
            },
            Expr::Binary { op, left, right } => Expr::Binary {
                op: *op,
                left: go(left),
                right: go(right),
            },
            Expr::Unary { op, operand } => Expr::Unary {
                op: *op,
                operand: go(operand),
            },
            Expr::Call {
                method,
                target,
                args,
            } => Expr::Call {
                method: *method,
                target: go(target),
                args: args.iter().map(|arg| arg.rebind(from, to)).collect(),
            },
            Expr::Conditional {
                test,
                if_true,
                if_false,
                ty,
            } => Expr::Conditional {
                test: go(test),
                if_true: go(if_true),
                if_false: go(if_false),
                ty: ty.clone(),
            },
            Expr::Convert { operand, ty } => Expr::Convert {
                operand: go(operand),
                ty: ty.clone(),
            },
            Expr::New { shape, args } => Expr::New {
                shape: shape.clone(),
                args: args.iter().map(|arg| arg.rebind(from, to)).collect(),
            },
        }
    }

    /// Distinct parameters referenced anywhere in the tree, in first-seen
    /// order.
    pub fn free_params(&self) -> Vec<Param> {
        let mut found = Vec::new();
        self.walk(&mut |expr| {
            if let Expr::Param(param) = expr {
                if !found.contains(param) {
                    found.push(param.clone());
                }
            }
            true
        });
        found
    }

    /// Dotted field paths read off `param`.
    ///
    /// Only the longest chain is reported: reading `x.IdCard.FirstName`
    /// yields `IdCard.FirstName`, not `IdCard`. A bare use of the parameter
    /// is reported as the empty path.
    pub fn member_paths(&self, param: &Param) -> BTreeSet<String> {
        let mut paths = BTreeSet::new();
        self.walk(&mut |expr| match field_chain(expr, param) {
            Some(path) => {
                paths.insert(path);
                false
            }
            None => true,
        });
        paths
    }

    /// Pre-order traversal; `visit` returns whether to descend.
    fn walk(&self, visit: &mut impl FnMut(&Expr) -> bool) {
        if !visit(self) {
            return;
        }
        match self {
            Expr::Param(_) | Expr::Literal { .. } => {}
            Expr::Field { target, .. } => target.walk(visit),
            Expr::Binary { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Expr::Unary { operand, .. } | Expr::Convert { operand, .. } => operand.walk(visit),
            Expr::Call { target, args, .. } => {
                target.walk(visit);
                for arg in args {
                    arg.walk(visit);
                }
            }
            Expr::Conditional {
                test,
                if_true,
                if_false,
                ..
            } => {
                test.walk(visit);
                if_true.walk(visit);
                if_false.walk(visit);
            }
            Expr::New { args, .. } => {
                for arg in args {
                    arg.walk(visit);
                }
            }
        }
    }
}

fn field_chain(expr: &Expr, param: &Param) -> Option<String> {
    match expr {
        Expr::Param(p) if p == param => Some(String::new()),
        Expr::Field { target, name, .. } => {
            let prefix = field_chain(target, param)?;
            Some(if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}.{name}")
            })
        }
        _ => None,
    }
}
