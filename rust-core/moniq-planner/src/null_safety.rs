// SPDX-License-Identifier: PMPL-1.0-or-later
//! Static null-safety analysis.
//!
//! Rejects a folded predicate that would dereference a chain rooted at an
//! optional property without first checking it. Boolean methods called
//! directly on such a chain are allowed since they evaluate to `false` on an
//! absent receiver. Recognized guards:
//!
//! | Form                      | Chain is known present in |
//! |---------------------------|---------------------------|
//! | `c != null ? a : b`       | `a`                       |
//! | `c == null ? a : b`       | `b`                       |
//! | `c.HasValue ? a : b`      | `a`                       |
//! | `c != null && rest`       | `rest`                    |
//! | `c == null \|\| rest`     | `rest`                    |
//! | `c ?? d`                  | result is never null      |

use moniq_model::Value;

use crate::error::QueryError;
use crate::expr::{BinaryOp, Expr, Member, Method, UnaryOp};

/// Check `body` for unguarded dereferences of nullable chains.
///
/// The first violation found is reported, innermost first: in
/// `s.Message.Substring(0, 3).Length` it is `Substring` that fails.
pub fn check(body: &Expr) -> Result<(), QueryError> {
    let analyzer = Analyzer { root: body };
    analyzer.visit(body, &Vec::new()).map(|_| ())
}

struct Analyzer<'a> {
    root: &'a Expr,
}

impl Analyzer<'_> {
    /// Returns whether `expr` may evaluate to null given the chains in
    /// `present`, which are known to be non-null at this point.
    fn visit(&self, expr: &Expr, present: &[Expr]) -> Result<bool, QueryError> {
        let nullable = match expr {
            Expr::Constant(v) => v.is_null(),
            Expr::Parameter(_) | Expr::Captured(_) => false,
            Expr::Member { target, member } => {
                let target_nullable = self.visit(target, present)?;
                match member {
                    Member::HasValue => false,
                    Member::Property(p) if matches!(target.as_ref(), Expr::Parameter(_)) => {
                        p.is_optional()
                    }
                    _ if target_nullable => return Err(self.violation(member.name(), target)),
                    _ => false,
                }
            }
            Expr::Call {
                receiver,
                method,
                args,
            } => {
                let mut any_arg_nullable = false;
                for a in args {
                    any_arg_nullable |= self.visit(a, present)?;
                }
                match receiver {
                    Some(r) => {
                        let receiver_nullable = self.visit(r, present)?;
                        if receiver_nullable && !method.is_boolean() {
                            return Err(self.violation(method.name(), r));
                        }
                        false
                    }
                    None => matches!(method, Method::Max | Method::Min) && any_arg_nullable,
                }
            }
            Expr::Unary { operand, .. } => self.visit(operand, present)?,
            Expr::Binary { op, left, right } => match op {
                BinaryOp::AndAlso => {
                    self.visit(left, present)?;
                    let extended = extend(present, facts(left, true));
                    self.visit(right, &extended)?;
                    false
                }
                BinaryOp::OrElse => {
                    self.visit(left, present)?;
                    let extended = extend(present, facts(left, false));
                    self.visit(right, &extended)?;
                    false
                }
                BinaryOp::Coalesce => {
                    self.visit(left, present)?;
                    self.visit(right, present)?
                }
                op if op.is_comparison() => {
                    self.visit(left, present)?;
                    self.visit(right, present)?;
                    false
                }
                BinaryOp::Add if is_string_constant(left) || is_string_constant(right) => {
                    self.visit(left, present)?;
                    self.visit(right, present)?;
                    false
                }
                _ => {
                    let l = self.visit(left, present)?;
                    let r = self.visit(right, present)?;
                    l || r
                }
            },
            Expr::Conditional {
                test,
                if_true,
                if_false,
            } => {
                self.visit(test, present)?;
                let when_true = extend(present, facts(test, true));
                let when_false = extend(present, facts(test, false));
                let t = self.visit(if_true, &when_true)?;
                let f = self.visit(if_false, &when_false)?;
                t || f
            }
            Expr::Cast { expr: inner, .. } => self.visit(inner, present)?,
            Expr::NewObject(fields) => {
                for (_, v) in fields {
                    self.visit(v, present)?;
                }
                false
            }
        };
        Ok(nullable && !present.contains(expr))
    }

    fn violation(&self, member: &str, chain: &Expr) -> QueryError {
        QueryError::NullSafetyViolation {
            member: member.to_string(),
            chain: chain.to_string(),
            expression: self.root.to_string(),
        }
    }
}

fn extend(present: &[Expr], more: Vec<Expr>) -> Vec<Expr> {
    let mut out = present.to_vec();
    out.extend(more);
    out
}

fn is_string_constant(expr: &Expr) -> bool {
    matches!(expr, Expr::Constant(Value::Str(_)))
}

fn is_null(expr: &Expr) -> bool {
    matches!(expr, Expr::Constant(Value::Null))
}

/// Whether `expr` reads through `chain` in a way that fails when it is null.
pub(crate) fn dereferences(expr: &Expr, chain: &Expr) -> bool {
    let mut found = false;
    expr.visit(&mut |node| {
        found |= match node {
            Expr::Member { target, member } => {
                *member != Member::HasValue && target.as_ref() == chain
            }
            Expr::Call {
                receiver: Some(r),
                method,
                ..
            } => !method.is_boolean() && r.as_ref() == chain,
            _ => false,
        };
    });
    found
}

/// Chains known to be non-null when `test` evaluates to `outcome`.
pub(crate) fn facts(test: &Expr, outcome: bool) -> Vec<Expr> {
    match test {
        Expr::Binary { op, left, right }
            if matches!(op, BinaryOp::Equal | BinaryOp::NotEqual) =>
        {
            let chain = if is_null(right) {
                left
            } else if is_null(left) {
                right
            } else {
                return Vec::new();
            };
            // `c != null` proves presence when true, `c == null` when false.
            let proves = (*op == BinaryOp::NotEqual) == outcome;
            if proves {
                vec![chain.as_ref().clone()]
            } else {
                Vec::new()
            }
        }
        Expr::Member {
            target,
            member: Member::HasValue,
        } if outcome => vec![target.as_ref().clone()],
        Expr::Unary {
            op: UnaryOp::Not,
            operand,
        } => facts(operand, !outcome),
        Expr::Binary {
            op: BinaryOp::AndAlso,
            left,
            right,
        } if outcome => {
            let mut out = facts(left, true);
            out.extend(facts(right, true));
            out
        }
        Expr::Binary {
            op: BinaryOp::OrElse,
            left,
            right,
        } if !outcome => {
            let mut out = facts(left, false);
            out.extend(facts(right, false));
            out
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moniq_model::Property;

    fn s() -> Expr {
        Expr::param("s")
    }

    fn message() -> Expr {
        s().prop(Property::Message)
    }

    fn substring3(e: Expr) -> Expr {
        e.call(Method::Substring, vec![Expr::lit(0i64), Expr::lit(3i64)])
    }

    #[test]
    fn test_unguarded_chain_rejected_innermost_first() {
        let e = substring3(message()).length().eq(3i64);
        match check(&e) {
            Err(QueryError::NullSafetyViolation { member, chain, .. }) => {
                assert_eq!(member, "Substring");
                assert_eq!(chain, "s.Message");
            }
            other => panic!("expected violation, got {other:?}"),
        }
    }

    #[test]
    fn test_boolean_method_allowed() {
        assert!(check(&message().contains("x")).is_ok());
        assert!(check(&message().starts_with("x")).is_ok());
    }

    #[test]
    fn test_member_access_rejected() {
        let e = message().length().gt(0i64);
        assert!(matches!(
            check(&e),
            Err(QueryError::NullSafetyViolation { ref member, .. }) if member == "Length"
        ));
    }

    #[test]
    fn test_method_on_required_property_allowed() {
        let e = substring3(s().prop(Property::Name)).eq("abc");
        assert!(check(&e).is_ok());
    }

    #[test]
    fn test_ternary_guard() {
        let e = Expr::cond(
            message().ne(Expr::null()),
            substring3(message()).eq("abc"),
            false,
        );
        assert!(check(&e).is_ok());

        let inverted = Expr::cond(
            message().eq(Expr::null()),
            false,
            substring3(message()).eq("abc"),
        );
        assert!(check(&inverted).is_ok());
    }

    #[test]
    fn test_guard_on_wrong_branch_rejected() {
        let e = Expr::cond(
            message().eq(Expr::null()),
            substring3(message()).eq("abc"),
            false,
        );
        assert!(check(&e).is_err());
    }

    #[test]
    fn test_has_value_guard() {
        let last_up = s().prop(Property::LastUp);
        let e = Expr::cond(
            last_up.clone().has_value(),
            last_up.member(Member::Value).gt(Expr::lit(0i64)),
            false,
        );
        assert!(check(&e).is_ok());
    }

    #[test]
    fn test_and_or_guards() {
        let and = message().ne(Expr::null()).and(message().length().gt(3i64));
        assert!(check(&and).is_ok());
        let or = message().eq(Expr::null()).or(message().length().gt(3i64));
        assert!(check(&or).is_ok());
        let wrong = message().eq(Expr::null()).and(message().length().gt(3i64));
        assert!(check(&wrong).is_err());
    }

    #[test]
    fn test_coalesce_guard() {
        let e = message().coalesce("").length().gt(3i64);
        assert!(check(&e).is_ok());
    }

    #[test]
    fn test_guard_through_negation() {
        let e = message()
            .eq(Expr::null())
            .not()
            .and(message().call(Method::ToUpper, vec![]).eq("X"));
        assert!(check(&e).is_ok());
    }

    #[test]
    fn test_dereferences() {
        assert!(dereferences(&message().length().gt(3i64), &message()));
        assert!(dereferences(&substring3(message()).eq("abc"), &message()));
        assert!(!dereferences(&message().contains("x"), &message()));
        assert!(!dereferences(&message().has_value(), &message()));
        assert!(!dereferences(&s().prop(Property::Name).length().gt(3i64), &message()));
    }

    #[test]
    fn test_guarded_ternary_result_may_be_null() {
        let e = Expr::cond(s().prop(Property::Active), message(), Expr::null())
            .length()
            .gt(1i64);
        assert!(check(&e).is_err());
    }
}
