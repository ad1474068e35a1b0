// SPDX-License-Identifier: PMPL-1.0-or-later
//! Expression interpreter.
//!
//! Evaluates a tree against an optional record bound to the query parameter.
//! The partial evaluator runs it with no record to fold constant subtrees;
//! residual filtering and projection run it with each retrieved record.
//!
//! Absent values are lifted: ordering comparisons with an absent operand are
//! `false`, `==` treats two absent values as equal, boolean string methods on
//! an absent receiver are `false`, and arithmetic on an absent operand is
//! absent. Any other access through an absent value is an error.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use moniq_model::{EnumValue, Record, Value};

use crate::error::QueryError;
use crate::expr::{BinaryOp, CastType, Expr, Member, Method, UnaryOp};

/// Values of captured variables, supplied by the caller at plan time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Captures {
    values: BTreeMap<String, Value>,
}

impl Captures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bind(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// What the free names of an expression resolve to.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub parameter: &'a str,
    pub record: Option<&'a Record>,
    pub captures: &'a Captures,
}

impl<'a> Scope<'a> {
    pub fn new(parameter: &'a str, captures: &'a Captures) -> Self {
        Self {
            parameter,
            record: None,
            captures,
        }
    }

    pub fn with_record(self, record: &'a Record) -> Self {
        Self {
            record: Some(record),
            ..self
        }
    }
}

/// Evaluate `expr` in `scope`.
pub fn evaluate(expr: &Expr, scope: &Scope<'_>) -> Result<Value, QueryError> {
    match expr {
        Expr::Constant(v) => Ok(v.clone()),
        Expr::Parameter(name) => {
            if name != scope.parameter {
                return Err(QueryError::UnboundParameter(name.clone()));
            }
            match scope.record {
                Some(record) => Ok(record.to_value()),
                None => Err(QueryError::evaluation(expr, "no record is bound")),
            }
        }
        Expr::Captured(name) => scope
            .captures
            .get(name)
            .cloned()
            .ok_or_else(|| QueryError::UnboundVariable(name.clone())),
        Expr::Member { target, member } => eval_member(expr, target, member, scope),
        Expr::Call {
            receiver,
            method,
            args,
        } => {
            let recv = match receiver {
                Some(r) => Some(evaluate(r, scope)?),
                None => None,
            };
            let args = args
                .iter()
                .map(|a| evaluate(a, scope))
                .collect::<Result<Vec<_>, _>>()?;
            eval_call(expr, recv, *method, &args)
        }
        Expr::Unary { op, operand } => {
            let v = evaluate(operand, scope)?;
            match (op, v) {
                (_, Value::Null) => Ok(Value::Null),
                (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                (UnaryOp::Negate, Value::Int(i)) => i
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| QueryError::evaluation(expr, "integer overflow")),
                (UnaryOp::Negate, Value::Float(x)) => Ok(Value::Float(-x)),
                (UnaryOp::Negate, Value::Duration(s)) => s
                    .checked_neg()
                    .map(Value::Duration)
                    .ok_or_else(|| QueryError::evaluation(expr, "interval overflow")),
                (_, v) => Err(QueryError::evaluation(
                    expr,
                    format!("operator not defined for {}", v.type_name()),
                )),
            }
        }
        Expr::Binary { op, left, right } => eval_binary(expr, *op, left, right, scope),
        Expr::Conditional {
            test,
            if_true,
            if_false,
        } => match evaluate(test, scope)? {
            Value::Bool(true) => evaluate(if_true, scope),
            Value::Bool(false) => evaluate(if_false, scope),
            other => Err(QueryError::evaluation(
                test,
                format!("condition is {}, not bool", other.type_name()),
            )),
        },
        Expr::Cast { expr: inner, to } => {
            let v = evaluate(inner, scope)?;
            cast(expr, v, to)
        }
        Expr::NewObject(fields) => {
            let mut out = BTreeMap::new();
            for (name, e) in fields {
                out.insert(name.clone(), evaluate(e, scope)?);
            }
            Ok(Value::Object(out))
        }
    }
}

/// Evaluate a predicate body against a record. Absent results count as `false`.
pub fn matches(expr: &Expr, scope: &Scope<'_>) -> Result<bool, QueryError> {
    match evaluate(expr, scope)? {
        Value::Bool(b) => Ok(b),
        Value::Null => Ok(false),
        _ => Err(QueryError::NotBoolean(expr.to_string())),
    }
}

fn eval_member(
    expr: &Expr,
    target: &Expr,
    member: &Member,
    scope: &Scope<'_>,
) -> Result<Value, QueryError> {
    if let (Expr::Parameter(name), Member::Property(p)) = (target, member) {
        if name != scope.parameter {
            return Err(QueryError::UnboundParameter(name.clone()));
        }
        return match scope.record {
            Some(record) => Ok(record.get(*p).clone()),
            None => Err(QueryError::evaluation(expr, "no record is bound")),
        };
    }

    let value = evaluate(target, scope)?;
    match (member, value) {
        (Member::HasValue, v) => Ok(Value::Bool(!v.is_null())),
        (_, Value::Null) => Err(QueryError::evaluation(
            expr,
            format!("'{target}' is null"),
        )),
        (Member::Value, v) => Ok(v),
        (Member::Length, Value::Str(s)) => Ok(Value::Int(s.chars().count() as i64)),
        (Member::Length, Value::List(items)) => Ok(Value::Int(items.len() as i64)),
        (Member::TotalSeconds, Value::Duration(s)) => Ok(Value::Float(s as f64)),
        (Member::Property(p), Value::Object(fields)) => {
            Ok(fields.get(p.name()).cloned().unwrap_or(Value::Null))
        }
        (Member::Field(name), Value::Object(mut fields)) => {
            fields.remove(name.as_str()).ok_or_else(|| {
                QueryError::evaluation(expr, format!("no field named '{name}'"))
            })
        }
        (m, v) => Err(QueryError::evaluation(
            expr,
            format!("{} has no member '{m}'", v.type_name()),
        )),
    }
}

fn eval_call(
    expr: &Expr,
    recv: Option<Value>,
    method: Method,
    args: &[Value],
) -> Result<Value, QueryError> {
    let arity = |n: usize| {
        if args.len() == n {
            Ok(())
        } else {
            Err(QueryError::evaluation(
                expr,
                format!("{method} expects {n} argument(s), got {}", args.len()),
            ))
        }
    };
    let type_error = |v: &Value| {
        QueryError::evaluation(
            expr,
            format!("{method} is not defined for {}", v.type_name()),
        )
    };

    if method.is_static() {
        return match method {
            Method::Now => {
                arity(0)?;
                Ok(Value::DateTime(Utc::now()))
            }
            Method::Concat => Ok(Value::Str(args.iter().map(plain_string).collect())),
            Method::Max | Method::Min => {
                arity(2)?;
                let (a, b) = (&args[0], &args[1]);
                if a.is_null() || b.is_null() {
                    return Ok(Value::Null);
                }
                let ord = a.compare(b).ok_or_else(|| {
                    QueryError::evaluation(
                        expr,
                        format!("cannot compare {} with {}", a.type_name(), b.type_name()),
                    )
                })?;
                let pick_a = match method {
                    Method::Max => ord != Ordering::Less,
                    _ => ord != Ordering::Greater,
                };
                Ok(if pick_a { a.clone() } else { b.clone() })
            }
            _ => Err(type_error(&Value::Null)),
        };
    }

    let recv = recv.ok_or_else(|| {
        QueryError::evaluation(expr, format!("{method} requires a receiver"))
    })?;

    if method.is_boolean() {
        arity(1)?;
        let arg = &args[0];
        if recv.is_null() {
            return Ok(Value::Bool(false));
        }
        let result = match (method, &recv, arg) {
            (Method::Equals, r, a) => r.equals(a),
            (Method::Contains, Value::List(items), a) => items.iter().any(|i| i.equals(a)),
            (_, Value::Str(_), Value::Null) => {
                return Err(QueryError::evaluation(expr, "argument is null"))
            }
            (Method::Contains, Value::Str(s), Value::Str(a)) => s.contains(a.as_str()),
            (Method::StartsWith, Value::Str(s), Value::Str(a)) => s.starts_with(a.as_str()),
            (Method::EndsWith, Value::Str(s), Value::Str(a)) => s.ends_with(a.as_str()),
            (_, r, _) => return Err(type_error(r)),
        };
        return Ok(Value::Bool(result));
    }

    if recv.is_null() {
        return Err(QueryError::evaluation(
            expr,
            format!("{method} called on a null value"),
        ));
    }

    match (method, &recv) {
        (Method::ToString, v) => {
            arity(0)?;
            Ok(Value::Str(plain_string(v)))
        }
        (Method::ToUpper, Value::Str(s)) => {
            arity(0)?;
            Ok(Value::Str(s.to_uppercase()))
        }
        (Method::ToLower, Value::Str(s)) => {
            arity(0)?;
            Ok(Value::Str(s.to_lowercase()))
        }
        (Method::Trim, Value::Str(s)) => {
            arity(0)?;
            Ok(Value::Str(s.trim().to_string()))
        }
        (Method::Substring, Value::Str(s)) => substring(expr, s, args),
        (Method::IndexOf, Value::Str(s)) => {
            arity(1)?;
            let needle = args[0].as_str().ok_or_else(|| type_error(&args[0]))?;
            let index = s
                .find(needle)
                .map(|byte| s[..byte].chars().count() as i64)
                .unwrap_or(-1);
            Ok(Value::Int(index))
        }
        (Method::AddSeconds | Method::AddDays, Value::DateTime(dt)) => {
            arity(1)?;
            let amount = match &args[0] {
                Value::Int(i) => *i as f64,
                Value::Float(x) => *x,
                other => return Err(type_error(other)),
            };
            let seconds = match method {
                Method::AddDays => amount * 86_400.0,
                _ => amount,
            };
            Duration::try_milliseconds((seconds * 1000.0) as i64)
                .and_then(|delta| dt.checked_add_signed(delta))
                .map(Value::DateTime)
                .ok_or_else(|| QueryError::evaluation(expr, "date out of range"))
        }
        (_, v) => Err(type_error(v)),
    }
}

fn substring(expr: &Expr, s: &str, args: &[Value]) -> Result<Value, QueryError> {
    let chars: Vec<char> = s.chars().collect();
    let start = args.first().and_then(Value::as_int);
    let len = match args.get(1) {
        Some(v) => v.as_int().map(Some),
        None => Some(None),
    };
    let (Some(start), Some(len)) = (start, len) else {
        return Err(QueryError::evaluation(expr, "Substring expects integer arguments"));
    };
    let total = chars.len() as i64;
    let end = match len {
        Some(l) => start
            .checked_add(l)
            .ok_or_else(|| QueryError::evaluation(expr, "Substring length overflows"))?,
        None => total,
    };
    if start < 0 || start > total || end < start || end > total {
        return Err(QueryError::evaluation(
            expr,
            format!("index out of range for string of length {total}"),
        ));
    }
    Ok(Value::Str(chars[start as usize..end as usize].iter().collect()))
}

fn eval_binary(
    expr: &Expr,
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    scope: &Scope<'_>,
) -> Result<Value, QueryError> {
    match op {
        BinaryOp::AndAlso | BinaryOp::OrElse => {
            let short = op == BinaryOp::OrElse;
            match evaluate(left, scope)? {
                Value::Bool(b) if b == short => Ok(Value::Bool(short)),
                Value::Bool(_) => match evaluate(right, scope)? {
                    Value::Bool(b) => Ok(Value::Bool(b)),
                    other => Err(QueryError::evaluation(
                        right,
                        format!("operand is {}, not bool", other.type_name()),
                    )),
                },
                other => Err(QueryError::evaluation(
                    left,
                    format!("operand is {}, not bool", other.type_name()),
                )),
            }
        }
        BinaryOp::Coalesce => match evaluate(left, scope)? {
            Value::Null => evaluate(right, scope),
            v => Ok(v),
        },
        _ => {
            let l = evaluate(left, scope)?;
            let r = evaluate(right, scope)?;
            apply_binary(expr, op, l, r)
        }
    }
}

/// Apply a non-short-circuiting binary operator to two values.
pub fn apply_binary(expr: &Expr, op: BinaryOp, l: Value, r: Value) -> Result<Value, QueryError> {
    match op {
        BinaryOp::Equal => return Ok(Value::Bool(l.equals(&r))),
        BinaryOp::NotEqual => return Ok(Value::Bool(!l.equals(&r))),
        BinaryOp::GreaterThan
        | BinaryOp::GreaterThanOrEqual
        | BinaryOp::LessThan
        | BinaryOp::LessThanOrEqual => {
            if l.is_null() || r.is_null() {
                return Ok(Value::Bool(false));
            }
            let ord = l.compare(&r).ok_or_else(|| {
                QueryError::evaluation(
                    expr,
                    format!("cannot compare {} with {}", l.type_name(), r.type_name()),
                )
            })?;
            let holds = match op {
                BinaryOp::GreaterThan => ord == Ordering::Greater,
                BinaryOp::GreaterThanOrEqual => ord != Ordering::Less,
                BinaryOp::LessThan => ord == Ordering::Less,
                _ => ord != Ordering::Greater,
            };
            return Ok(Value::Bool(holds));
        }
        _ => {}
    }

    // String concatenation treats an absent operand as empty.
    if op == BinaryOp::Add && (matches!(l, Value::Str(_)) || matches!(r, Value::Str(_))) {
        return Ok(Value::Str(format!("{}{}", plain_string(&l), plain_string(&r))));
    }
    if l.is_null() || r.is_null() {
        return Ok(Value::Null);
    }

    let overflow = || QueryError::evaluation(expr, "arithmetic overflow");
    let result = match (op, &l, &r) {
        (BinaryOp::Add, Value::Int(a), Value::Int(b)) => Value::Int(a.checked_add(*b).ok_or_else(overflow)?),
        (BinaryOp::Subtract, Value::Int(a), Value::Int(b)) => Value::Int(a.checked_sub(*b).ok_or_else(overflow)?),
        (BinaryOp::Multiply, Value::Int(a), Value::Int(b)) => Value::Int(a.checked_mul(*b).ok_or_else(overflow)?),
        (BinaryOp::Divide, Value::Int(_), Value::Int(0)) => {
            return Err(QueryError::evaluation(expr, "division by zero"))
        }
        (BinaryOp::Divide, Value::Int(a), Value::Int(b)) => Value::Int(a.checked_div(*b).ok_or_else(overflow)?),
        (BinaryOp::Add, Value::DateTime(t), Value::Duration(s)) => Value::DateTime(
            Duration::try_seconds(*s)
                .and_then(|delta| t.checked_add_signed(delta))
                .ok_or_else(overflow)?,
        ),
        (BinaryOp::Subtract, Value::DateTime(t), Value::Duration(s)) => Value::DateTime(
            Duration::try_seconds(*s)
                .and_then(|delta| t.checked_sub_signed(delta))
                .ok_or_else(overflow)?,
        ),
        (BinaryOp::Subtract, Value::DateTime(a), Value::DateTime(b)) => {
            Value::Duration((*a - *b).num_seconds())
        }
        (BinaryOp::Add, Value::Duration(a), Value::Duration(b)) => Value::Duration(a.checked_add(*b).ok_or_else(overflow)?),
        (BinaryOp::Subtract, Value::Duration(a), Value::Duration(b)) => Value::Duration(a.checked_sub(*b).ok_or_else(overflow)?),
        (_, a, b) => match (as_float(a), as_float(b)) {
            (Some(a), Some(b)) => Value::Float(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Subtract => a - b,
                BinaryOp::Multiply => a * b,
                _ => a / b,
            }),
            _ => {
                return Err(QueryError::evaluation(
                    expr,
                    format!(
                        "operator '{op}' not defined for {} and {}",
                        l.type_name(),
                        r.type_name()
                    ),
                ))
            }
        },
    };
    Ok(result)
}

fn as_float(v: &Value) -> Option<f64> {
    match v {
        Value::Int(i) => Some(*i as f64),
        Value::Float(x) => Some(*x),
        _ => None,
    }
}

fn cast(expr: &Expr, v: Value, to: &CastType) -> Result<Value, QueryError> {
    let fail = |v: &Value| {
        QueryError::evaluation(expr, format!("cannot cast {} to {to}", v.type_name()))
    };
    match (to, v) {
        (CastType::Object, v) => Ok(v),
        (CastType::Nullable(_), Value::Null) => Ok(Value::Null),
        (CastType::Nullable(inner), v) => cast(expr, v, inner),
        (CastType::Str, v @ (Value::Str(_) | Value::Null)) => Ok(v),
        (_, Value::Null) => Err(fail(&Value::Null)),
        (CastType::Int, Value::Int(i)) => Ok(Value::Int(i)),
        (CastType::Int, Value::Float(x)) => Ok(Value::Int(x.trunc() as i64)),
        (CastType::Int, Value::Enum(e)) => Ok(Value::Int(e.code)),
        (CastType::Float, Value::Float(x)) => Ok(Value::Float(x)),
        (CastType::Float, Value::Int(i)) => Ok(Value::Float(i as f64)),
        (CastType::Float, Value::Enum(e)) => Ok(Value::Float(e.code as f64)),
        (CastType::Bool, Value::Bool(b)) => Ok(Value::Bool(b)),
        (CastType::Enum(kind), Value::Int(code)) => Ok(Value::Enum(EnumValue { kind: *kind, code })),
        (CastType::Enum(kind), Value::Enum(e)) if e.kind == *kind => Ok(Value::Enum(e)),
        (_, v) => Err(fail(&v)),
    }
}

/// Text of a value as string concatenation and `ToString` render it.
pub fn plain_string(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::Str(s) => s.clone(),
        Value::Enum(e) => e.name().map(str::to_string).unwrap_or_else(|| e.code.to_string()),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;
    use moniq_model::{EnumKind, ObjectKind, Property};

    fn sensor() -> Record {
        Record::new(ObjectKind::Sensor, 1001)
            .with(Property::Name, "Ping")
            .with(Property::Message, Value::Null)
            .with(Property::Tags, vec!["wan", "core"])
            .with(Property::Status, EnumKind::Status.from_name("Down").unwrap())
            .with(Property::Interval, Value::Duration(60))
    }

    fn eval_on(expr: &Expr, record: &Record) -> Result<Value, QueryError> {
        let captures = Captures::new();
        let scope = Scope::new("s", &captures).with_record(record);
        evaluate(expr, &scope)
    }

    fn eval_const(expr: &Expr) -> Result<Value, QueryError> {
        let captures = Captures::new();
        evaluate(expr, &Scope::new("s", &captures))
    }

    fn s() -> Expr {
        Expr::param("s")
    }

    #[test]
    fn test_property_access() {
        let r = sensor();
        assert_eq!(
            eval_on(&s().prop(Property::Name), &r).unwrap(),
            Value::from("Ping")
        );
        assert_eq!(eval_on(&s().prop(Property::Comments), &r).unwrap(), Value::Null);
    }

    #[test]
    fn test_lifted_comparisons() {
        let r = sensor();
        let gt = s().prop(Property::Message).gt("a");
        assert_eq!(eval_on(&gt, &r).unwrap(), Value::Bool(false));
        let eq_null = s().prop(Property::Message).eq(Expr::null());
        assert_eq!(eval_on(&eq_null, &r).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_boolean_method_on_null_is_false() {
        let r = sensor();
        let e = s().prop(Property::Message).contains("x");
        assert_eq!(eval_on(&e, &r).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_non_boolean_method_on_null_fails() {
        let r = sensor();
        let e = s()
            .prop(Property::Message)
            .call(Method::Substring, vec![Expr::lit(0i64), Expr::lit(3i64)]);
        assert!(matches!(eval_on(&e, &r), Err(QueryError::Evaluation { .. })));
    }

    #[test]
    fn test_string_contains_is_ordinal() {
        let r = sensor();
        assert_eq!(
            eval_on(&s().prop(Property::Name).contains("in"), &r).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            eval_on(&s().prop(Property::Name).contains("PING"), &r).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_list_contains() {
        let r = sensor();
        let e = s().prop(Property::Tags).contains("core");
        assert_eq!(eval_on(&e, &r).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_enum_compares_with_int_and_name() {
        let r = sensor();
        let by_code = s().prop(Property::Status).cast(CastType::Int).eq(5i64);
        assert_eq!(eval_on(&by_code, &r).unwrap(), Value::Bool(true));
        let by_enum = s().prop(Property::Status).eq(Expr::status("Down"));
        assert_eq!(eval_on(&by_enum, &r).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_short_circuit() {
        // The right-hand side would fail on the null message.
        let r = sensor();
        let e = s()
            .prop(Property::Message)
            .ne(Expr::null())
            .and(s().prop(Property::Message).length().gt(3i64));
        assert_eq!(eval_on(&e, &r).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_coalesce_and_conditional() {
        let r = sensor();
        let e = s().prop(Property::Message).coalesce("none");
        assert_eq!(eval_on(&e, &r).unwrap(), Value::from("none"));
        let c = Expr::cond(s().prop(Property::Message).has_value(), 1i64, 2i64);
        assert_eq!(eval_on(&c, &r).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval_const(&Expr::lit(7i64).div(2i64)).unwrap(), Value::Int(3));
        assert_eq!(eval_const(&Expr::lit(1i64).add(0.5)).unwrap(), Value::Float(1.5));
        assert_eq!(
            eval_const(&Expr::lit("a").add(Expr::null())).unwrap(),
            Value::from("a")
        );
        assert!(eval_const(&Expr::lit(1i64).div(0i64)).is_err());
        assert!(eval_const(&Expr::lit(i64::MAX).add(1i64)).is_err());
    }

    #[test]
    fn test_negating_min_interval_fails() {
        let e = Expr::lit(Value::Duration(i64::MIN)).neg();
        assert!(matches!(eval_const(&e), Err(QueryError::Evaluation { .. })));
        let ok = Expr::lit(Value::Duration(60)).neg();
        assert_eq!(eval_const(&ok).unwrap(), Value::Duration(-60));
    }

    #[test]
    fn test_string_methods() {
        let e = Expr::lit(" Ping ")
            .call(Method::Trim, vec![])
            .call(Method::ToLower, vec![]);
        assert_eq!(eval_const(&e).unwrap(), Value::from("ping"));
        let sub = Expr::lit("monitor").call(Method::Substring, vec![Expr::lit(1i64), Expr::lit(3i64)]);
        assert_eq!(eval_const(&sub).unwrap(), Value::from("oni"));
        let bad = Expr::lit("abc").call(Method::Substring, vec![Expr::lit(2i64), Expr::lit(5i64)]);
        assert!(eval_const(&bad).is_err());
        let huge = Expr::lit("abc").call(Method::Substring, vec![Expr::lit(i64::MAX), Expr::lit(1i64)]);
        assert!(matches!(eval_const(&huge), Err(QueryError::Evaluation { .. })));
        let idx = Expr::lit("monitor").call(Method::IndexOf, vec![Expr::lit("it")]);
        assert_eq!(eval_const(&idx).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_static_methods() {
        let max = Expr::call_static(Method::Max, vec![Expr::lit(3i64), Expr::lit(9i64)]);
        assert_eq!(eval_const(&max).unwrap(), Value::Int(9));
        let concat = Expr::call_static(Method::Concat, vec![Expr::lit("a"), Expr::lit(1i64)]);
        assert_eq!(eval_const(&concat).unwrap(), Value::from("a1"));
        assert!(matches!(
            eval_const(&Expr::call_static(Method::Now, vec![])).unwrap(),
            Value::DateTime(_)
        ));
    }

    #[test]
    fn test_casts() {
        assert_eq!(
            eval_const(&Expr::lit(5i64).cast(CastType::Enum(EnumKind::Status))).unwrap(),
            Value::Enum(EnumValue {
                kind: EnumKind::Status,
                code: 5
            })
        );
        assert_eq!(eval_const(&Expr::lit(2.9).cast(CastType::Int)).unwrap(), Value::Int(2));
        let nullable = CastType::Nullable(Box::new(CastType::Int));
        assert_eq!(eval_const(&Expr::null().cast(nullable)).unwrap(), Value::Null);
        assert!(eval_const(&Expr::null().cast(CastType::Int)).is_err());
    }

    #[test]
    fn test_new_object_and_field() {
        let r = sensor();
        let e = Expr::new_object([("n", s().prop(Property::Name))]).field("n");
        assert_eq!(eval_on(&e, &r).unwrap(), Value::from("Ping"));
    }

    #[test]
    fn test_unbound_names() {
        assert!(matches!(
            eval_const(&Expr::captured("x")),
            Err(QueryError::UnboundVariable(ref n)) if n == "x"
        ));
        assert!(matches!(
            eval_const(&Expr::param("t").prop(Property::Id)),
            Err(QueryError::UnboundParameter(_))
        ));
    }

    #[test]
    fn test_matches_requires_boolean() {
        let r = sensor();
        let captures = Captures::new();
        let scope = Scope::new("s", &captures).with_record(&r);
        assert!(matches!(
            matches(&s().prop(Property::Name), &scope),
            Err(QueryError::NotBoolean(_))
        ));
        assert!(!matches(&Expr::null(), &scope).unwrap());
    }

    #[test]
    fn test_interval_total_seconds() {
        let r = sensor();
        let e = s().prop(Property::Interval).member(Member::TotalSeconds).ge(60i64);
        assert_eq!(eval_on(&e, &r).unwrap(), Value::Bool(true));
    }
}
