// SPDX-License-Identifier: PMPL-1.0-or-later
//! Boolean normalization and DNF decomposition.
//!
//! [`normalize`] rewrites comparisons against boolean literals, pushes
//! negation down to atomic literals and absorbs constants. [`to_dnf`] then
//! expands the result into a disjunction of conjunctions, preserving the
//! source order of both the `OR` terms and the literals inside each term.
//!
//! A null guard on the left of `||` only protects the right side while the
//! two stay joined. When they are split into separate branches, every
//! conjunction from the right that dereferences a guarded chain is prefixed
//! with `chain != null`; `a || b` and `a || (chain != null && b)` agree
//! whenever `a` being false proves the chain present.

use tracing::debug;

use moniq_model::Value;

use crate::error::QueryError;
use crate::expr::{BinaryOp, Expr, UnaryOp};
use crate::null_safety;

/// A disjunction of conjunctions. Empty means `false`; a single empty
/// conjunction means `true`.
pub type Dnf = Vec<Vec<Expr>>;

/// Normalize a folded boolean predicate.
pub fn normalize(expr: Expr) -> Expr {
    match expr {
        Expr::Unary {
            op: UnaryOp::Not,
            operand,
        } => negate(normalize(*operand)),
        Expr::Binary { op, left, right } => {
            let left = normalize(*left);
            let right = normalize(*right);
            match op {
                BinaryOp::AndAlso => and(left, right),
                BinaryOp::OrElse => or(left, right),
                BinaryOp::Equal | BinaryOp::NotEqual => {
                    compare_with_bool(op, left, right)
                }
                _ => left.binary(op, right),
            }
        }
        other => other,
    }
}

/// `x == true` → `x`, `x != true` → `!x`, and mirrored forms.
fn compare_with_bool(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let (literal, operand) = match (left.as_bool_constant(), right.as_bool_constant()) {
        (Some(_), Some(_)) => {
            let equal = left == right;
            return Expr::Constant(Value::Bool(equal == (op == BinaryOp::Equal)));
        }
        (None, Some(b)) => (b, left),
        (Some(b), None) => (b, right),
        (None, None) => return left.binary(op, right),
    };
    let keep = literal == (op == BinaryOp::Equal);
    if keep {
        operand
    } else {
        negate(operand)
    }
}

/// The negation of an already normalized expression, pushed to the literals.
fn negate(expr: Expr) -> Expr {
    match expr {
        Expr::Constant(Value::Bool(b)) => Expr::Constant(Value::Bool(!b)),
        Expr::Unary {
            op: UnaryOp::Not,
            operand,
        } => *operand,
        Expr::Binary {
            op: BinaryOp::AndAlso,
            left,
            right,
        } => or(negate(*left), negate(*right)),
        Expr::Binary {
            op: BinaryOp::OrElse,
            left,
            right,
        } => and(negate(*left), negate(*right)),
        Expr::Binary {
            op: BinaryOp::Equal,
            left,
            right,
        } => Expr::Binary {
            op: BinaryOp::NotEqual,
            left,
            right,
        },
        Expr::Binary {
            op: BinaryOp::NotEqual,
            left,
            right,
        } => Expr::Binary {
            op: BinaryOp::Equal,
            left,
            right,
        },
        // Ordering comparisons are lifted: `!(x > 5)` also holds when `x` is
        // absent, so it cannot become `x <= 5`.
        other => other.not(),
    }
}

fn and(left: Expr, right: Expr) -> Expr {
    match (left.as_bool_constant(), right.as_bool_constant()) {
        (Some(false), _) | (_, Some(false)) => Expr::Constant(Value::Bool(false)),
        (Some(true), _) => right,
        (_, Some(true)) => left,
        _ => left.and(right),
    }
}

fn or(left: Expr, right: Expr) -> Expr {
    match (left.as_bool_constant(), right.as_bool_constant()) {
        (Some(true), _) | (_, Some(true)) => Expr::Constant(Value::Bool(true)),
        (Some(false), _) => right,
        (_, Some(false)) => left,
        _ => left.or(right),
    }
}

/// Expand a normalized predicate into disjunctive normal form.
///
/// Fails with [`QueryError::PlanTooLarge`] when more than `max_branches`
/// conjunctions would be produced.
pub fn to_dnf(expr: &Expr, max_branches: usize) -> Result<Dnf, QueryError> {
    let dnf = expand(expr, max_branches)?;
    let dnf = dedup_conjunctions(dnf.into_iter().map(dedup_literals).collect());
    debug!(branches = dnf.len(), "expanded predicate to DNF");
    Ok(dnf)
}

fn expand(expr: &Expr, limit: usize) -> Result<Dnf, QueryError> {
    match expr {
        Expr::Constant(Value::Bool(true)) => Ok(vec![Vec::new()]),
        Expr::Constant(Value::Bool(false)) => Ok(Vec::new()),
        Expr::Binary {
            op: BinaryOp::OrElse,
            left,
            right,
        } => {
            let mut out = expand(left, limit)?;
            let mut rest = expand(right, limit)?;
            guard_right(left, &mut rest);
            let total = out.len() + rest.len();
            if total > limit {
                return Err(QueryError::PlanTooLarge {
                    branches: total,
                    limit,
                });
            }
            out.extend(rest);
            Ok(out)
        }
        Expr::Binary {
            op: BinaryOp::AndAlso,
            left,
            right,
        } => {
            let lhs = expand(left, limit)?;
            let rhs = expand(right, limit)?;
            let total = lhs.len().saturating_mul(rhs.len());
            if total > limit {
                return Err(QueryError::PlanTooLarge {
                    branches: total,
                    limit,
                });
            }
            let mut out = Vec::with_capacity(total);
            for l in &lhs {
                for r in &rhs {
                    let mut conj = l.clone();
                    conj.extend(r.iter().cloned());
                    out.push(conj);
                }
            }
            Ok(out)
        }
        literal => Ok(vec![vec![literal.clone()]]),
    }
}

/// Prefix conjunctions of `rest` with the presence checks that `left`
/// being false establishes, where they dereference the checked chain.
fn guard_right(left: &Expr, rest: &mut Dnf) {
    let chains = null_safety::facts(left, false);
    if chains.is_empty() {
        return;
    }
    for conj in rest.iter_mut() {
        let mut guards: Vec<Expr> = chains
            .iter()
            .filter(|chain| conj.iter().any(|l| null_safety::dereferences(l, chain)))
            .map(|chain| chain.clone().ne(Expr::null()))
            .collect();
        if !guards.is_empty() {
            guards.append(conj);
            *conj = guards;
        }
    }
}

/// Remove repeated literals, keeping the first occurrence.
fn dedup_literals(conj: Vec<Expr>) -> Vec<Expr> {
    let mut out: Vec<Expr> = Vec::with_capacity(conj.len());
    for lit in conj {
        if !out.contains(&lit) {
            out.push(lit);
        }
    }
    out
}

/// Remove conjunctions holding the same set of literals as an earlier one.
fn dedup_conjunctions(dnf: Dnf) -> Dnf {
    let mut out: Dnf = Vec::with_capacity(dnf.len());
    for conj in dnf {
        let seen = out
            .iter()
            .any(|c| c.len() == conj.len() && c.iter().all(|l| conj.contains(l)));
        if !seen {
            out.push(conj);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use moniq_model::Property;

    fn s() -> Expr {
        Expr::param("s")
    }

    fn name_is(v: &str) -> Expr {
        s().prop(Property::Name).eq(v)
    }

    fn active() -> Expr {
        s().prop(Property::Active)
    }

    #[test]
    fn test_bool_literal_comparisons() {
        assert_eq!(normalize(active().eq(true)), active());
        assert_eq!(normalize(active().ne(false)), active());
        assert_eq!(normalize(Expr::lit(true).eq(active())), active());
        assert_eq!(normalize(active().eq(false)), active().not());
        assert_eq!(normalize(active().ne(true)), active().not());
        assert_eq!(normalize(Expr::lit(false).ne(active())), active());
    }

    #[test]
    fn test_de_morgan() {
        let e = name_is("a").and(active()).not();
        assert_eq!(
            normalize(e),
            s().prop(Property::Name).ne("a").or(active().not())
        );
        let e = name_is("a").or(name_is("b")).not();
        assert_eq!(
            normalize(e),
            s().prop(Property::Name)
                .ne("a")
                .and(s().prop(Property::Name).ne("b"))
        );
    }

    #[test]
    fn test_negated_ordering_stays_wrapped() {
        let e = s().prop(Property::Id).gt(5i64).not();
        assert_eq!(normalize(e.clone()), e);
    }

    #[test]
    fn test_constant_absorption() {
        assert_eq!(normalize(Expr::lit(true).and(active())), active());
        assert_eq!(
            normalize(active().and(false)).as_bool_constant(),
            Some(false)
        );
        assert_eq!(normalize(Expr::lit(false).or(active())), active());
        assert_eq!(normalize(active().or(true)).as_bool_constant(), Some(true));
    }

    #[test]
    fn test_dnf_distributes_left_to_right() {
        // (a || b) && c  →  [a, c], [b, c]
        let e = name_is("a").or(name_is("b")).and(active());
        let dnf = to_dnf(&normalize(e), 64).unwrap();
        assert_eq!(
            dnf,
            vec![vec![name_is("a"), active()], vec![name_is("b"), active()]]
        );
    }

    #[test]
    fn test_dnf_dedups_literals_and_conjunctions() {
        let e = name_is("a")
            .and(name_is("a"))
            .or(active().and(name_is("a")))
            .or(name_is("a").and(active()));
        let dnf = to_dnf(&normalize(e), 64).unwrap();
        assert_eq!(
            dnf,
            vec![vec![name_is("a")], vec![active(), name_is("a")]]
        );
    }

    #[test]
    fn test_dnf_constants() {
        assert_eq!(to_dnf(&Expr::lit(true), 8).unwrap(), vec![Vec::<Expr>::new()]);
        assert!(to_dnf(&Expr::lit(false), 8).unwrap().is_empty());
    }

    #[test]
    fn test_dnf_limit() {
        // (a||b) && (c||d) && (e||f) expands to 8 branches.
        let pair = |x: &str, y: &str| name_is(x).or(name_is(y));
        let e = pair("a", "b").and(pair("c", "d")).and(pair("e", "f"));
        assert_eq!(to_dnf(&e, 8).unwrap().len(), 8);
        assert!(matches!(
            to_dnf(&e, 7),
            Err(QueryError::PlanTooLarge { branches: 8, limit: 7 })
        ));
    }

    fn message() -> Expr {
        s().prop(Property::Message)
    }

    #[test]
    fn test_or_guard_carried_into_split_branch() {
        let long = message().length().gt(3i64);
        let e = message().eq(Expr::null()).or(long.clone());
        let dnf = to_dnf(&normalize(e), 64).unwrap();
        assert_eq!(
            dnf,
            vec![
                vec![message().eq(Expr::null())],
                vec![message().ne(Expr::null()), long],
            ]
        );
    }

    #[test]
    fn test_or_guard_survives_de_morgan() {
        // !(m != null && m.Length > 3)  →  m == null || !(m.Length > 3)
        let long = message().length().gt(3i64);
        let e = message().ne(Expr::null()).and(long.clone()).not();
        let dnf = to_dnf(&normalize(e), 64).unwrap();
        assert_eq!(dnf[1], vec![message().ne(Expr::null()), long.not()]);
    }

    #[test]
    fn test_or_guard_distributed_under_and() {
        let long = message().length().gt(3i64);
        let e = message().eq(Expr::null()).or(long.clone()).and(active());
        let dnf = to_dnf(&normalize(e), 64).unwrap();
        assert_eq!(
            dnf,
            vec![
                vec![message().eq(Expr::null()), active()],
                vec![message().ne(Expr::null()), long, active()],
            ]
        );
    }

    #[test]
    fn test_or_guard_skipped_for_boolean_methods() {
        let e = message().eq(Expr::null()).or(message().contains("x"));
        let dnf = to_dnf(&normalize(e), 64).unwrap();
        assert_eq!(dnf[1], vec![message().contains("x")]);
    }

    #[test]
    fn test_same_property_conjunction_kept() {
        let e = name_is("a").and(name_is("b"));
        let dnf = to_dnf(&normalize(e), 64).unwrap();
        assert_eq!(dnf, vec![vec![name_is("a"), name_is("b")]]);
    }
}
