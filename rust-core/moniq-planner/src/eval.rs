// SPDX-License-Identifier: PMPL-1.0-or-later
//! Partial evaluation.
//!
//! Replaces every maximal subtree that does not reference the query
//! parameter with the constant it evaluates to, then applies a few local
//! rewrites that the folded tree exposes:
//! - `!!x` → `x`
//! - `(T)(object)x` → `(T)x`
//! - `new { a = x }.a` → `x`
//! - `c ? x : y` with a constant test → the chosen branch

use tracing::trace;

use moniq_model::Value;

use crate::error::QueryError;
use crate::expr::{CastType, Expr, Member, UnaryOp};
use crate::interp::{self, Captures, Scope};

/// Folds the parameter-independent parts of a predicate.
pub struct PartialEvaluator<'a> {
    parameter: &'a str,
    captures: &'a Captures,
}

impl<'a> PartialEvaluator<'a> {
    pub fn new(parameter: &'a str, captures: &'a Captures) -> Self {
        Self {
            parameter,
            captures,
        }
    }

    /// Return an equivalent tree with every constant subtree folded.
    pub fn fold(&self, expr: &Expr) -> Result<Expr, QueryError> {
        for name in expr.parameters() {
            if name != self.parameter {
                return Err(QueryError::UnboundParameter(name));
            }
        }
        self.fold_node(expr.clone())
    }

    fn fold_node(&self, expr: Expr) -> Result<Expr, QueryError> {
        if let Expr::Constant(_) = expr {
            return Ok(expr);
        }
        if !expr.has_parameter() {
            let scope = Scope::new(self.parameter, self.captures);
            let value = interp::evaluate(&expr, &scope)?;
            trace!(expression = %expr, value = %value, "folded constant subtree");
            return Ok(Expr::Constant(value));
        }

        let mut failure = None;
        let rebuilt = expr.map_children(&mut |child| {
            if failure.is_some() {
                return child;
            }
            match self.fold_node(child) {
                Ok(folded) => folded,
                Err(e) => {
                    failure = Some(e);
                    Expr::Constant(Value::Null)
                }
            }
        });
        if let Some(e) = failure {
            return Err(e);
        }
        Ok(simplify(rebuilt))
    }
}

fn simplify(expr: Expr) -> Expr {
    match expr {
        Expr::Unary {
            op: UnaryOp::Not,
            operand,
        } => match *operand {
            Expr::Unary {
                op: UnaryOp::Not,
                operand: inner,
            } => *inner,
            other => other.not(),
        },
        Expr::Cast { expr, to } if to != CastType::Object => match *expr {
            Expr::Cast {
                expr: inner,
                to: CastType::Object,
            } => simplify(inner.cast(to)),
            other => other.cast(to),
        },
        Expr::Member { target, member } => match (*target, member) {
            (Expr::NewObject(fields), Member::Field(name)) => {
                project(fields, &name).unwrap_or_else(|fields| {
                    Expr::NewObject(fields).member(Member::Field(name))
                })
            }
            (target, member) => target.member(member),
        },
        Expr::Conditional {
            test,
            if_true,
            if_false,
        } => match test.as_bool_constant() {
            Some(true) => *if_true,
            Some(false) => *if_false,
            None => Expr::Conditional {
                test,
                if_true,
                if_false,
            },
        },
        other => other,
    }
}

/// Pick a field out of an object literal, or hand the fields back.
fn project(fields: Vec<(String, Expr)>, name: &str) -> Result<Expr, Vec<(String, Expr)>> {
    match fields.iter().position(|(k, _)| k == name) {
        Some(i) => Ok(fields.into_iter().nth(i).map(|(_, v)| v).unwrap_or_else(Expr::null)),
        None => Err(fields),
    }
}
