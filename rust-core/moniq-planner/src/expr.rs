// SPDX-License-Identifier: PMPL-1.0-or-later
//! Predicate expression trees.
//!
//! An [`Expr`] is an immutable tree over a closed set of node variants. Every
//! planning stage matches it exhaustively and returns a new tree; nothing is
//! mutated in place. Trees serialize with serde so predicates can be stored
//! and loaded as JSON, and render as readable source text for diagnostics:
//!
//! ```text
//! s => s.Name.Contains("ping") && (s.Status == status.Down || s.Priority > 3)
//! ```

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use moniq_model::{EnumKind, EnumValue, Property, Value};

use crate::error::QueryError;

/// A member accessed on a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Member {
    /// A property of the record bound to the query parameter.
    Property(Property),
    /// Length of a string or list.
    Length,
    /// Whether a nullable value is present.
    HasValue,
    /// The underlying value of a nullable.
    Value,
    /// Whole seconds of a duration.
    TotalSeconds,
    /// A named field of an anonymous object.
    Field(String),
}

impl Member {
    pub fn name(&self) -> &str {
        match self {
            Member::Property(p) => p.name(),
            Member::Length => "Length",
            Member::HasValue => "HasValue",
            Member::Value => "Value",
            Member::TotalSeconds => "TotalSeconds",
            Member::Field(name) => name,
        }
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    // Boolean instance methods.
    Contains,
    StartsWith,
    EndsWith,
    Equals,
    // Instance methods.
    Substring,
    ToUpper,
    ToLower,
    Trim,
    ToString,
    IndexOf,
    AddSeconds,
    AddDays,
    // Static methods.
    Concat,
    Max,
    Min,
    Now,
}

impl Method {
    /// Boolean methods evaluate to `false` on an absent receiver instead of
    /// failing, so they may be called on a nullable chain without a guard.
    pub fn is_boolean(self) -> bool {
        matches!(
            self,
            Method::Contains | Method::StartsWith | Method::EndsWith | Method::Equals
        )
    }

    pub fn is_static(self) -> bool {
        matches!(self, Method::Concat | Method::Max | Method::Min | Method::Now)
    }

    pub fn name(self) -> &'static str {
        match self {
            Method::Contains => "Contains",
            Method::StartsWith => "StartsWith",
            Method::EndsWith => "EndsWith",
            Method::Equals => "Equals",
            Method::Substring => "Substring",
            Method::ToUpper => "ToUpper",
            Method::ToLower => "ToLower",
            Method::Trim => "Trim",
            Method::ToString => "ToString",
            Method::IndexOf => "IndexOf",
            Method::AddSeconds => "AddSeconds",
            Method::AddDays => "AddDays",
            Method::Concat => "Concat",
            Method::Max => "Max",
            Method::Min => "Min",
            Method::Now => "Now",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    AndAlso,
    OrElse,
    Add,
    Subtract,
    Multiply,
    Divide,
    Coalesce,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::AndAlso => "&&",
            BinaryOp::OrElse => "||",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Coalesce => "??",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::GreaterThan
                | BinaryOp::GreaterThanOrEqual
                | BinaryOp::LessThan
                | BinaryOp::LessThanOrEqual
        )
    }

    /// The comparison that holds when the operands are swapped.
    pub fn flip(self) -> Self {
        match self {
            BinaryOp::GreaterThan => BinaryOp::LessThan,
            BinaryOp::GreaterThanOrEqual => BinaryOp::LessThanOrEqual,
            BinaryOp::LessThan => BinaryOp::GreaterThan,
            BinaryOp::LessThanOrEqual => BinaryOp::GreaterThanOrEqual,
            other => other,
        }
    }

    fn precedence(self) -> u8 {
        match self {
            BinaryOp::Coalesce => 1,
            BinaryOp::OrElse => 2,
            BinaryOp::AndAlso => 3,
            BinaryOp::Equal | BinaryOp::NotEqual => 4,
            BinaryOp::GreaterThan
            | BinaryOp::GreaterThanOrEqual
            | BinaryOp::LessThan
            | BinaryOp::LessThanOrEqual => 5,
            BinaryOp::Add | BinaryOp::Subtract => 6,
            BinaryOp::Multiply | BinaryOp::Divide => 7,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Target type of a cast.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastType {
    Int,
    Float,
    Bool,
    Str,
    Enum(EnumKind),
    /// Boxing.
    Object,
    Nullable(Box<CastType>),
}

impl fmt::Display for CastType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CastType::Int => write!(f, "int"),
            CastType::Float => write!(f, "double"),
            CastType::Bool => write!(f, "bool"),
            CastType::Str => write!(f, "string"),
            CastType::Enum(EnumKind::Status) => write!(f, "Status"),
            CastType::Enum(EnumKind::Priority) => write!(f, "Priority"),
            CastType::Object => write!(f, "object"),
            CastType::Nullable(inner) => write!(f, "{inner}?"),
        }
    }
}

/// A node of a predicate expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Constant(Value),
    /// A lambda parameter. Only the query's own parameter may appear.
    Parameter(String),
    /// A variable captured from the calling scope, bound at plan time.
    Captured(String),
    Member {
        target: Box<Expr>,
        member: Member,
    },
    Call {
        /// `None` for static methods.
        receiver: Option<Box<Expr>>,
        method: Method,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
    },
    Cast {
        expr: Box<Expr>,
        to: CastType,
    },
    /// An anonymous object, `new { a = x, b = y }`.
    NewObject(Vec<(String, Expr)>),
}

impl Expr {
    // ---- constructors ----

    pub fn param(name: impl Into<String>) -> Self {
        Expr::Parameter(name.into())
    }

    pub fn lit(value: impl Into<Value>) -> Self {
        Expr::Constant(value.into())
    }

    pub fn null() -> Self {
        Expr::Constant(Value::Null)
    }

    pub fn captured(name: impl Into<String>) -> Self {
        Expr::Captured(name.into())
    }

    /// A status enum constant by name; unknown names produce a code-less
    /// enum that never matches.
    pub fn status(name: &str) -> Self {
        Expr::Constant(enum_constant(EnumKind::Status, name))
    }

    pub fn priority(name: &str) -> Self {
        Expr::Constant(enum_constant(EnumKind::Priority, name))
    }

    pub fn cond(test: Expr, if_true: impl Into<Expr>, if_false: impl Into<Expr>) -> Self {
        Expr::Conditional {
            test: Box::new(test),
            if_true: Box::new(if_true.into()),
            if_false: Box::new(if_false.into()),
        }
    }

    pub fn call_static(method: Method, args: Vec<Expr>) -> Self {
        Expr::Call {
            receiver: None,
            method,
            args,
        }
    }

    pub fn new_object<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Expr)>,
        S: Into<String>,
    {
        Expr::NewObject(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    // ---- fluent builders ----

    pub fn member(self, member: Member) -> Self {
        Expr::Member {
            target: Box::new(self),
            member,
        }
    }

    pub fn prop(self, property: Property) -> Self {
        self.member(Member::Property(property))
    }

    pub fn field(self, name: impl Into<String>) -> Self {
        self.member(Member::Field(name.into()))
    }

    pub fn length(self) -> Self {
        self.member(Member::Length)
    }

    pub fn has_value(self) -> Self {
        self.member(Member::HasValue)
    }

    pub fn call(self, method: Method, args: Vec<Expr>) -> Self {
        Expr::Call {
            receiver: Some(Box::new(self)),
            method,
            args,
        }
    }

    pub fn contains(self, arg: impl Into<Expr>) -> Self {
        self.call(Method::Contains, vec![arg.into()])
    }

    pub fn starts_with(self, arg: impl Into<Expr>) -> Self {
        self.call(Method::StartsWith, vec![arg.into()])
    }

    pub fn ends_with(self, arg: impl Into<Expr>) -> Self {
        self.call(Method::EndsWith, vec![arg.into()])
    }

    pub fn binary(self, op: BinaryOp, right: impl Into<Expr>) -> Self {
        Expr::Binary {
            op,
            left: Box::new(self),
            right: Box::new(right.into()),
        }
    }

    pub fn eq(self, right: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Equal, right)
    }

    pub fn ne(self, right: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::NotEqual, right)
    }

    pub fn gt(self, right: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::GreaterThan, right)
    }

    pub fn ge(self, right: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::GreaterThanOrEqual, right)
    }

    pub fn lt(self, right: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::LessThan, right)
    }

    pub fn le(self, right: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::LessThanOrEqual, right)
    }

    pub fn and(self, right: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::AndAlso, right)
    }

    pub fn or(self, right: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::OrElse, right)
    }

    pub fn add(self, right: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Add, right)
    }

    pub fn sub(self, right: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Subtract, right)
    }

    pub fn mul(self, right: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Multiply, right)
    }

    pub fn div(self, right: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Divide, right)
    }

    pub fn coalesce(self, right: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Coalesce, right)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(self),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn neg(self) -> Self {
        Expr::Unary {
            op: UnaryOp::Negate,
            operand: Box::new(self),
        }
    }

    pub fn cast(self, to: CastType) -> Self {
        Expr::Cast {
            expr: Box::new(self),
            to,
        }
    }

    // ---- inspection ----

    pub fn as_constant(&self) -> Option<&Value> {
        match self {
            Expr::Constant(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool_constant(&self) -> Option<bool> {
        self.as_constant().and_then(Value::as_bool)
    }

    /// Whether any parameter appears in the tree.
    pub fn has_parameter(&self) -> bool {
        let mut found = false;
        self.visit(&mut |e| {
            if matches!(e, Expr::Parameter(_)) {
                found = true;
            }
        });
        found
    }

    /// Whether the named parameter appears in the tree.
    pub fn references_parameter(&self, name: &str) -> bool {
        let mut found = false;
        self.visit(&mut |e| {
            if matches!(e, Expr::Parameter(p) if p == name) {
                found = true;
            }
        });
        found
    }

    /// Names of every parameter appearing in the tree.
    pub fn parameters(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.visit(&mut |e| {
            if let Expr::Parameter(p) = e {
                names.insert(p.clone());
            }
        });
        names
    }

    /// Properties read from the query parameter anywhere in the tree.
    pub fn properties(&self) -> BTreeSet<Property> {
        let mut props = BTreeSet::new();
        self.visit(&mut |e| {
            if let Expr::Member {
                target,
                member: Member::Property(p),
            } = e
            {
                if matches!(target.as_ref(), Expr::Parameter(_)) {
                    props.insert(*p);
                }
            }
        });
        props
    }

    /// Replace every occurrence of parameter `from` with `to`.
    pub fn rename_parameter(self, from: &str, to: &str) -> Expr {
        self.map_children(&mut |child| child.rename_parameter(from, to))
            .rename_self(from, to)
    }

    fn rename_self(self, from: &str, to: &str) -> Expr {
        match self {
            Expr::Parameter(p) if p == from => Expr::Parameter(to.to_string()),
            other => other,
        }
    }

    /// Pre-order traversal over every node.
    pub fn visit(&self, f: &mut impl FnMut(&Expr)) {
        f(self);
        match self {
            Expr::Constant(_) | Expr::Parameter(_) | Expr::Captured(_) => {}
            Expr::Member { target, .. } => target.visit(f),
            Expr::Call { receiver, args, .. } => {
                if let Some(r) = receiver {
                    r.visit(f);
                }
                for a in args {
                    a.visit(f);
                }
            }
            Expr::Unary { operand, .. } => operand.visit(f),
            Expr::Binary { left, right, .. } => {
                left.visit(f);
                right.visit(f);
            }
            Expr::Conditional {
                test,
                if_true,
                if_false,
            } => {
                test.visit(f);
                if_true.visit(f);
                if_false.visit(f);
            }
            Expr::Cast { expr, .. } => expr.visit(f),
            Expr::NewObject(fields) => {
                for (_, v) in fields {
                    v.visit(f);
                }
            }
        }
    }

    /// Rebuild the node with `f` applied to each direct child.
    pub fn map_children(self, f: &mut impl FnMut(Expr) -> Expr) -> Expr {
        match self {
            leaf @ (Expr::Constant(_) | Expr::Parameter(_) | Expr::Captured(_)) => leaf,
            Expr::Member { target, member } => Expr::Member {
                target: Box::new(f(*target)),
                member,
            },
            Expr::Call {
                receiver,
                method,
                args,
            } => Expr::Call {
                receiver: receiver.map(|r| Box::new(f(*r))),
                method,
                args: args.into_iter().map(&mut *f).collect(),
            },
            Expr::Unary { op, operand } => Expr::Unary {
                op,
                operand: Box::new(f(*operand)),
            },
            Expr::Binary { op, left, right } => {
                let left = f(*left);
                let right = f(*right);
                Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }
            Expr::Conditional {
                test,
                if_true,
                if_false,
            } => {
                let test = f(*test);
                let if_true = f(*if_true);
                let if_false = f(*if_false);
                Expr::Conditional {
                    test: Box::new(test),
                    if_true: Box::new(if_true),
                    if_false: Box::new(if_false),
                }
            }
            Expr::Cast { expr, to } => Expr::Cast {
                expr: Box::new(f(*expr)),
                to,
            },
            Expr::NewObject(fields) => {
                Expr::NewObject(fields.into_iter().map(|(k, v)| (k, f(v))).collect())
            }
        }
    }

    /// Join expressions with `&&`, left to right. `true` when empty.
    pub fn conjunction(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        exprs
            .into_iter()
            .reduce(|acc, e| acc.and(e))
            .unwrap_or(Expr::Constant(Value::Bool(true)))
    }

    /// Join expressions with `||`, left to right. `false` when empty.
    pub fn disjunction(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        exprs
            .into_iter()
            .reduce(|acc, e| acc.or(e))
            .unwrap_or(Expr::Constant(Value::Bool(false)))
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Binary { op, .. } => op.precedence(),
            Expr::Conditional { .. } => 0,
            _ => 10,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        if self.precedence() < min {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

fn enum_constant(kind: EnumKind, name: &str) -> Value {
    match kind.from_name(name) {
        Ok(e) => Value::Enum(e),
        Err(_) => Value::Str(name.to_string()),
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(v) => write!(f, "{v}"),
            Expr::Parameter(name) | Expr::Captured(name) => f.write_str(name),
            Expr::Member { target, member } => {
                target.fmt_operand(f, 10)?;
                write!(f, ".{member}")
            }
            Expr::Call {
                receiver,
                method,
                args,
            } => {
                if let Some(r) = receiver {
                    r.fmt_operand(f, 10)?;
                    write!(f, ".")?;
                }
                write!(f, "{method}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
            Expr::Unary { op, operand } => {
                match op {
                    UnaryOp::Not => write!(f, "!")?,
                    UnaryOp::Negate => write!(f, "-")?,
                }
                operand.fmt_operand(f, 10)
            }
            Expr::Binary { op, left, right } => {
                let prec = op.precedence();
                left.fmt_operand(f, prec)?;
                write!(f, " {op} ")?;
                // && and || are associative; everything else groups to the left.
                let same_assoc = matches!(
                    (op, right.as_ref()),
                    (BinaryOp::AndAlso, Expr::Binary { op: BinaryOp::AndAlso, .. })
                        | (BinaryOp::OrElse, Expr::Binary { op: BinaryOp::OrElse, .. })
                );
                if same_assoc {
                    right.fmt_operand(f, prec)
                } else {
                    right.fmt_operand(f, prec + 1)
                }
            }
            Expr::Conditional {
                test,
                if_true,
                if_false,
            } => {
                test.fmt_operand(f, 1)?;
                write!(f, " ? ")?;
                if_true.fmt_operand(f, 1)?;
                write!(f, " : ")?;
                if_false.fmt_operand(f, 0)
            }
            Expr::Cast { expr, to } => {
                write!(f, "({to})")?;
                expr.fmt_operand(f, 10)
            }
            Expr::NewObject(fields) => {
                write!(f, "new {{ ")?;
                for (i, (name, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name} = {v}")?;
                }
                write!(f, " }}")
            }
        }
    }
}

macro_rules! expr_from_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for Expr {
                fn from(v: $t) -> Self {
                    Expr::Constant(Value::from(v))
                }
            }
        )*
    };
}

expr_from_value!(bool, i64, i32, f64, &str, String, EnumValue, DateTime<Utc>);

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Expr::Constant(v)
    }
}

/// A boolean lambda `parameter => body`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub parameter: String,
    pub body: Expr,
}

impl Predicate {
    pub fn new(parameter: impl Into<String>, body: Expr) -> Self {
        Self {
            parameter: parameter.into(),
            body,
        }
    }

    /// Build a predicate from a closure receiving the parameter node.
    pub fn build(parameter: &str, f: impl FnOnce(Expr) -> Expr) -> Self {
        Self::new(parameter, f(Expr::param(parameter)))
    }

    pub fn from_json(json: &str) -> Result<Self, QueryError> {
        serde_json::from_str(json).map_err(|e| QueryError::InvalidPredicate(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, QueryError> {
        serde_json::to_string(self).map_err(|e| QueryError::InvalidPredicate(e.to_string()))
    }

    /// `self && other`, with `other`'s parameter renamed to this one's.
    pub fn and(self, other: Predicate) -> Predicate {
        let body = other.body.rename_parameter(&other.parameter, &self.parameter);
        Predicate {
            parameter: self.parameter,
            body: self.body.and(body),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.parameter, self.body)
    }
}
