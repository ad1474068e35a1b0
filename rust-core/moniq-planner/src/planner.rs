// SPDX-License-Identifier: PMPL-1.0-or-later
//! Query planner: predicate in, [`QueryPlan`] out.

use tracing::debug;

use moniq_model::{CapabilityTable, ObjectKind, Value};

use crate::classify::Classifier;
use crate::config::PlannerConfig;
use crate::error::QueryError;
use crate::eval::PartialEvaluator;
use crate::expr::{Expr, Predicate};
use crate::interp::Captures;
use crate::normalize::{normalize, to_dnf};
use crate::null_safety;
use crate::plan::{PagingHints, QueryPlan};

/// The query planner.
///
/// Compiles a predicate into a [`QueryPlan`] by:
/// 1. Folding every parameter-independent subtree into a constant
/// 2. Rejecting unguarded dereferences of nullable chains
/// 3. Normalizing and expanding into disjunctive normal form
/// 4. Splitting each conjunction into remote filters and residual literals
///
/// Planning is pure and performs no I/O; every planning error surfaces here.
pub struct Planner<'t> {
    config: PlannerConfig,
    table: &'t CapabilityTable,
}

impl Planner<'static> {
    /// Create a planner over the standard capability table.
    pub fn new(config: PlannerConfig) -> Self {
        Self::with_table(config, CapabilityTable::standard())
    }
}

impl Default for Planner<'static> {
    fn default() -> Self {
        Self::new(PlannerConfig::default())
    }
}

impl<'t> Planner<'t> {
    pub fn with_table(config: PlannerConfig, table: &'t CapabilityTable) -> Self {
        Self { config, table }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn plan(
        &self,
        kind: ObjectKind,
        predicate: &Predicate,
        captures: &Captures,
        paging: PagingHints,
    ) -> Result<QueryPlan, QueryError> {
        self.config.validate()?;
        let parameter = predicate.parameter.as_str();

        debug!(kind = %kind, predicate = %predicate, "planning query");

        // A predicate that folds to null never holds, as in local evaluation.
        let folded = match PartialEvaluator::new(parameter, captures).fold(&predicate.body)? {
            Expr::Constant(Value::Null) => Expr::Constant(Value::Bool(false)),
            Expr::Constant(value) if !matches!(value, Value::Bool(_)) => {
                return Err(QueryError::NotBoolean(predicate.body.to_string()))
            }
            other => other,
        };
        null_safety::check(&folded)?;

        let normalized = normalize(folded.clone());
        let dnf = to_dnf(&normalized, self.config.max_branches)?;
        let branches = Classifier::new(self.table, kind, parameter)
            .strict(self.config.strict)
            .classify(dnf)?;

        let paging_pushed = !paging.is_unbounded()
            && branches.len() == 1
            && branches.iter().all(|b| b.residual.is_empty());

        debug!(
            kind = %kind,
            branches = branches.len(),
            remote_filters = branches.iter().map(|b| b.remote.len()).sum::<usize>(),
            residual_literals = branches.iter().map(|b| b.residual.len()).sum::<usize>(),
            paging_pushed,
            "planned query"
        );

        Ok(QueryPlan {
            kind,
            parameter: parameter.to_string(),
            predicate: folded,
            branches,
            paging,
            paging_pushed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Method;
    use crate::plan::BranchStrategy;
    use moniq_model::{Capability, FilterOperator, Property, PropertyCapabilities, SerializationRule};

    fn plan(predicate: Predicate) -> Result<QueryPlan, QueryError> {
        Planner::default().plan(
            ObjectKind::Sensor,
            &predicate,
            &Captures::new(),
            PagingHints::default(),
        )
    }

    #[test]
    fn test_full_pipeline() {
        let captures = Captures::new().with("wanted", "Down");
        let p = Predicate::build("s", |s| {
            s.clone()
                .prop(Property::Status)
                .eq(Expr::captured("wanted"))
                .and(s.clone().prop(Property::Name).contains("ping"))
                .or(s.prop(Property::Priority).ge(4i64))
        });
        let plan = Planner::default()
            .plan(ObjectKind::Sensor, &p, &captures, PagingHints::default())
            .unwrap();
        assert_eq!(plan.branches.len(), 2);
        assert_eq!(plan.branches[0].remote.len(), 2);
        assert_eq!(plan.branches[0].strategy(), BranchStrategy::RemoteThenFilter);
        let priority = plan.branches[1].remote.iter().next().unwrap();
        assert_eq!(priority.atom.operator, FilterOperator::GreaterThan);
        assert_eq!(priority.serialized, "3");
    }

    #[test]
    fn test_false_predicate_is_unsatisfiable() {
        let p = Predicate::build("s", |s| s.prop(Property::Id).eq(1i64).and(false));
        let plan = plan(p).unwrap();
        assert!(plan.is_unsatisfiable());
    }

    #[test]
    fn test_true_predicate_fetches_everything() {
        let plan = plan(Predicate::new("s", Expr::lit(true))).unwrap();
        assert_eq!(plan.branches.len(), 1);
        assert_eq!(plan.branches[0].strategy(), BranchStrategy::FetchAllThenFilter);
    }

    #[test]
    fn test_non_boolean_predicate_rejected() {
        let err = plan(Predicate::new("s", Expr::lit(3i64))).unwrap_err();
        assert!(matches!(err, QueryError::NotBoolean(_)));
    }

    #[test]
    fn test_null_predicate_is_unsatisfiable() {
        let captures = Captures::new().with("flag", Value::Null);
        let p = Predicate::new("s", Expr::captured("flag"));
        let plan = Planner::default()
            .plan(ObjectKind::Sensor, &p, &captures, PagingHints::default())
            .unwrap();
        assert!(plan.is_unsatisfiable());
        assert_eq!(plan.predicate, Expr::lit(false));
    }

    #[test]
    fn test_overflowing_constant_is_an_evaluation_error() {
        let p = Predicate::build("s", |s| {
            Expr::lit("abc")
                .call(Method::Substring, vec![Expr::lit(i64::MAX), Expr::lit(1i64)])
                .eq(s.prop(Property::Name))
        });
        assert!(matches!(plan(p).unwrap_err(), QueryError::Evaluation { .. }));
    }

    #[test]
    fn test_null_safety_runs_before_classification() {
        let p = Predicate::build("s", |s| {
            s.prop(Property::Message)
                .call(Method::Substring, vec![Expr::lit(0i64), Expr::lit(3i64)])
                .length()
                .eq(3i64)
        });
        assert!(matches!(
            plan(p).unwrap_err(),
            QueryError::NullSafetyViolation { .. }
        ));
    }

    #[test]
    fn test_paging_pushed_only_for_single_exact_branch() {
        let paging = PagingHints {
            skip: 0,
            limit: Some(5),
        };
        let planner = Planner::default();
        let exact = Predicate::build("s", |s| s.prop(Property::Id).gt(10i64));
        let plan = planner
            .plan(ObjectKind::Sensor, &exact, &Captures::new(), paging)
            .unwrap();
        assert!(plan.paging_pushed);
        assert_eq!(plan.remote_paging(), paging);

        let approximate = Predicate::build("s", |s| s.prop(Property::Name).eq("x"));
        let plan = planner
            .plan(ObjectKind::Sensor, &approximate, &Captures::new(), paging)
            .unwrap();
        assert!(!plan.paging_pushed);
        assert_eq!(plan.remote_paging(), PagingHints::default());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let planner = Planner::new(PlannerConfig {
            max_concurrency: 0,
            ..Default::default()
        });
        let p = Predicate::new("s", Expr::lit(true));
        assert!(matches!(
            planner.plan(ObjectKind::Sensor, &p, &Captures::new(), PagingHints::default()),
            Err(QueryError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_custom_table() {
        let mut table = CapabilityTable::new();
        table.define(PropertyCapabilities::new(
            Property::Name,
            SerializationRule::Text,
            [
                Capability::Supported(moniq_model::Fidelity::Exact),
                Capability::Unsupported,
                Capability::Unsupported,
                Capability::Unsupported,
                Capability::Unsupported,
            ],
        ));
        let planner = Planner::with_table(PlannerConfig::default(), &table);
        let p = Predicate::build("s", |s| s.prop(Property::Name).eq("x"));
        let plan = planner
            .plan(ObjectKind::Sensor, &p, &Captures::new(), PagingHints::default())
            .unwrap();
        assert!(plan.branches[0].residual.is_empty());

        let other = Predicate::build("s", |s| s.prop(Property::Id).eq(1i64));
        assert!(matches!(
            planner.plan(ObjectKind::Sensor, &other, &Captures::new(), PagingHints::default()),
            Err(QueryError::UnsupportedFilterProperty { .. })
        ));
    }

    #[test]
    fn test_plan_too_large() {
        let planner = Planner::new(PlannerConfig {
            max_branches: 2,
            ..Default::default()
        });
        let p = Predicate::build("s", |s| {
            s.clone()
                .prop(Property::Id)
                .eq(1i64)
                .or(s.clone().prop(Property::Id).eq(2i64))
                .or(s.prop(Property::Id).eq(3i64))
        });
        assert!(matches!(
            planner.plan(ObjectKind::Sensor, &p, &Captures::new(), PagingHints::default()),
            Err(QueryError::PlanTooLarge { .. })
        ));
    }
}
