// SPDX-License-Identifier: PMPL-1.0-or-later
//! Property-based tests for folding, normalization and DNF expansion

use proptest::prelude::*;

use moniq_model::{ObjectKind, Property, Record};
use moniq_planner::interp::{self, Captures, Scope};
use moniq_planner::{normalize, to_dnf, Expr, PartialEvaluator, Planner, Predicate, QueryError};

fn s() -> Expr {
    Expr::param("s")
}

fn arb_literal() -> impl Strategy<Value = Expr> {
    prop_oneof![
        (0i64..6).prop_map(|n| s().prop(Property::Id).gt(n)),
        (0i64..6).prop_map(|n| s().prop(Property::Id).eq(n)),
        prop::sample::select(vec!["x", "y"]).prop_map(|n| s().prop(Property::Name).eq(n)),
        Just(s().prop(Property::Active)),
        any::<bool>().prop_map(|b| s().prop(Property::Active).eq(b)),
        any::<bool>().prop_map(Expr::lit),
        // Parameter-free arithmetic the evaluator folds away.
        (0i64..4, 0i64..4).prop_map(|(a, b)| Expr::lit(a).add(b).gt(2i64)),
    ]
}

fn arb_body() -> impl Strategy<Value = Expr> {
    arb_literal().prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a.and(b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a.or(b)),
            inner.prop_map(Expr::not),
        ]
    })
}

fn arb_record() -> impl Strategy<Value = Record> {
    (0i64..6, prop::sample::select(vec!["x", "y", "z"]), any::<bool>()).prop_map(
        |(id, name, active)| {
            Record::new(ObjectKind::Sensor, id)
                .with(Property::Name, name)
                .with(Property::Active, active)
        },
    )
}

fn holds(body: &Expr, record: &Record) -> bool {
    let captures = Captures::new();
    let scope = Scope::new("s", &captures).with_record(record);
    interp::matches(body, &scope).unwrap()
}

proptest! {
    #[test]
    fn test_folding_preserves_meaning(body in arb_body(), record in arb_record()) {
        let captures = Captures::new();
        let folded = PartialEvaluator::new("s", &captures).fold(&body).unwrap();
        prop_assert_eq!(holds(&folded, &record), holds(&body, &record));
    }

    #[test]
    fn test_folding_is_idempotent(body in arb_body()) {
        let captures = Captures::new();
        let evaluator = PartialEvaluator::new("s", &captures);
        let once = evaluator.fold(&body).unwrap();
        let twice = evaluator.fold(&once).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn test_dnf_preserves_meaning(body in arb_body(), record in arb_record()) {
        let captures = Captures::new();
        let folded = PartialEvaluator::new("s", &captures).fold(&body).unwrap();
        let dnf = to_dnf(&normalize(folded), 1 << 16).unwrap();
        let any_branch = dnf
            .iter()
            .any(|conj| conj.iter().all(|literal| holds(literal, &record)));
        prop_assert_eq!(any_branch, holds(&body, &record));
    }

    #[test]
    fn test_normalized_negation_only_wraps_literals(body in arb_body()) {
        fn check(e: &Expr) -> bool {
            match e {
                Expr::Unary { operand, .. } => !matches!(
                    operand.as_ref(),
                    Expr::Binary {
                        op: moniq_planner::BinaryOp::AndAlso | moniq_planner::BinaryOp::OrElse,
                        ..
                    } | Expr::Unary { .. }
                ),
                Expr::Binary { left, right, .. } => check(left) && check(right),
                _ => true,
            }
        }
        prop_assert!(check(&normalize(body)));
    }

    #[test]
    fn test_plan_respects_branch_limit(body in arb_body(), limit in 1usize..8) {
        let planner = Planner::new(moniq_planner::PlannerConfig {
            max_branches: limit,
            ..Default::default()
        });
        let predicate = Predicate::new("s", body);
        match planner.plan(
            ObjectKind::Sensor,
            &predicate,
            &Captures::new(),
            Default::default(),
        ) {
            Ok(plan) => prop_assert!(plan.branches.len() <= limit),
            Err(QueryError::PlanTooLarge { branches, limit: l }) => {
                prop_assert_eq!(l, limit);
                prop_assert!(branches > limit);
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }
}
