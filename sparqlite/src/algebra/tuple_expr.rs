// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query algebra tree
//!
//! Built by an external front end and only read by evaluation. Children are
//! `Arc`-shared so iterations can keep a handle on the subtree they evaluate
//! lazily (right side of a nested-loop join, path hop expression).

use super::value_expr::ValueExpr;
use crate::model::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Pattern variable, optionally fixed to a constant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Var {
    pub name: String,
    pub value: Option<Value>,
}

impl Var {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// Anonymous constant; never produces a binding
    pub fn constant(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self {
            name: format!("_const_{}", value),
            value: Some(value),
        }
    }

    pub fn is_constant(&self) -> bool {
        self.value.is_some()
    }
}

/// `target` is bound to the value of `source` from the child
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionElem {
    pub source: String,
    pub target: String,
}

impl ProjectionElem {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            source: name.clone(),
            target: name,
        }
    }

    pub fn renamed(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// `BIND(expr AS ?name)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionElem {
    pub name: String,
    pub expr: ValueExpr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderElem {
    pub expr: ValueExpr,
    pub ascending: bool,
}

impl OrderElem {
    pub fn asc(expr: ValueExpr) -> Self {
        Self {
            expr,
            ascending: true,
        }
    }

    pub fn desc(expr: ValueExpr) -> Self {
        Self {
            expr,
            ascending: false,
        }
    }
}

/// Aggregate function selector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AggregateKind {
    /// `COUNT(*)` when the operator has no arguments
    Count,
    Sum,
    Min,
    Max,
    Avg,
    Sample,
    GroupConcat { separator: Option<String> },
    /// Registry-provided function identified by IRI
    Custom(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateOperator {
    pub kind: AggregateKind,
    pub args: Vec<ValueExpr>,
    pub distinct: bool,
}

impl AggregateOperator {
    pub fn new(kind: AggregateKind, args: Vec<ValueExpr>) -> Self {
        Self {
            kind,
            args,
            distinct: false,
        }
    }

    pub fn count_all() -> Self {
        Self::new(AggregateKind::Count, Vec::new())
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }
}

/// `(aggregate AS ?name)` inside GROUP BY
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupElem {
    pub name: String,
    pub operator: AggregateOperator,
}

impl GroupElem {
    pub fn new(name: impl Into<String>, operator: AggregateOperator) -> Self {
        Self {
            name: name.into(),
            operator,
        }
    }
}

/// Where a variable occurs, as seen by [`TupleExpr::replace_vars_at`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarPosition {
    Subject,
    Predicate,
    Object,
    Context,
    /// Value expressions, projections, aggregates and other operator fields
    Other,
}

/// Algebra operator node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TupleExpr {
    StatementPattern {
        subject: Var,
        predicate: Var,
        object: Var,
        /// Graph to match in; `None` matches every graph
        context: Option<Var>,
    },
    Join {
        left: Arc<TupleExpr>,
        right: Arc<TupleExpr>,
    },
    LeftJoin {
        left: Arc<TupleExpr>,
        right: Arc<TupleExpr>,
        condition: Option<ValueExpr>,
    },
    Union {
        left: Arc<TupleExpr>,
        right: Arc<TupleExpr>,
    },
    /// MINUS
    Difference {
        left: Arc<TupleExpr>,
        right: Arc<TupleExpr>,
    },
    Intersection {
        left: Arc<TupleExpr>,
        right: Arc<TupleExpr>,
    },
    Filter {
        arg: Arc<TupleExpr>,
        condition: ValueExpr,
    },
    Projection {
        arg: Arc<TupleExpr>,
        elements: Vec<ProjectionElem>,
    },
    Extension {
        arg: Arc<TupleExpr>,
        elements: Vec<ExtensionElem>,
    },
    Distinct {
        arg: Arc<TupleExpr>,
    },
    Reduced {
        arg: Arc<TupleExpr>,
    },
    Order {
        arg: Arc<TupleExpr>,
        elements: Vec<OrderElem>,
        /// Only the first `limit` rows are ever consumed downstream
        limit: Option<u64>,
        distinct: bool,
    },
    Slice {
        arg: Arc<TupleExpr>,
        offset: u64,
        limit: Option<u64>,
    },
    Group {
        arg: Arc<TupleExpr>,
        group_by: Vec<String>,
        elements: Vec<GroupElem>,
    },
    /// `subject path{min_length,} object`
    ArbitraryLengthPath {
        subject: Var,
        path: Arc<TupleExpr>,
        object: Var,
        context: Option<Var>,
        min_length: u64,
    },
    ZeroLengthPath {
        subject: Var,
        object: Var,
        context: Option<Var>,
    },
    Service {
        service_ref: Var,
        arg: Arc<TupleExpr>,
        silent: bool,
    },
    /// VALUES; `None` cells are UNDEF
    BindingSetAssignment {
        names: Vec<String>,
        rows: Vec<Vec<Option<Value>>>,
    },
    SingletonSet,
    EmptySet,
}

// Builders. They return shared nodes, ready to be nested.
impl TupleExpr {
    pub fn pattern(subject: Var, predicate: Var, object: Var) -> Arc<Self> {
        Arc::new(TupleExpr::StatementPattern {
            subject,
            predicate,
            object,
            context: None,
        })
    }

    pub fn pattern_in(subject: Var, predicate: Var, object: Var, context: Var) -> Arc<Self> {
        Arc::new(TupleExpr::StatementPattern {
            subject,
            predicate,
            object,
            context: Some(context),
        })
    }

    pub fn join(left: Arc<Self>, right: Arc<Self>) -> Arc<Self> {
        Arc::new(TupleExpr::Join { left, right })
    }

    pub fn left_join(left: Arc<Self>, right: Arc<Self>, condition: Option<ValueExpr>) -> Arc<Self> {
        Arc::new(TupleExpr::LeftJoin {
            left,
            right,
            condition,
        })
    }

    pub fn union(left: Arc<Self>, right: Arc<Self>) -> Arc<Self> {
        Arc::new(TupleExpr::Union { left, right })
    }

    pub fn difference(left: Arc<Self>, right: Arc<Self>) -> Arc<Self> {
        Arc::new(TupleExpr::Difference { left, right })
    }

    pub fn intersection(left: Arc<Self>, right: Arc<Self>) -> Arc<Self> {
        Arc::new(TupleExpr::Intersection { left, right })
    }

    pub fn filter(arg: Arc<Self>, condition: ValueExpr) -> Arc<Self> {
        Arc::new(TupleExpr::Filter { arg, condition })
    }

    /// Projection keeping the given names unchanged
    pub fn project(arg: Arc<Self>, names: &[&str]) -> Arc<Self> {
        Arc::new(TupleExpr::Projection {
            arg,
            elements: names.iter().map(|n| ProjectionElem::new(*n)).collect(),
        })
    }

    pub fn extend(arg: Arc<Self>, name: impl Into<String>, expr: ValueExpr) -> Arc<Self> {
        Arc::new(TupleExpr::Extension {
            arg,
            elements: vec![ExtensionElem {
                name: name.into(),
                expr,
            }],
        })
    }

    pub fn distinct(arg: Arc<Self>) -> Arc<Self> {
        Arc::new(TupleExpr::Distinct { arg })
    }

    pub fn reduced(arg: Arc<Self>) -> Arc<Self> {
        Arc::new(TupleExpr::Reduced { arg })
    }

    pub fn order(arg: Arc<Self>, elements: Vec<OrderElem>) -> Arc<Self> {
        Arc::new(TupleExpr::Order {
            arg,
            elements,
            limit: None,
            distinct: false,
        })
    }

    pub fn slice(arg: Arc<Self>, offset: u64, limit: Option<u64>) -> Arc<Self> {
        Arc::new(TupleExpr::Slice { arg, offset, limit })
    }

    pub fn group(arg: Arc<Self>, group_by: &[&str], elements: Vec<GroupElem>) -> Arc<Self> {
        Arc::new(TupleExpr::Group {
            arg,
            group_by: group_by.iter().map(|s| s.to_string()).collect(),
            elements,
        })
    }

    pub fn path(subject: Var, path: Arc<Self>, object: Var, min_length: u64) -> Arc<Self> {
        Arc::new(TupleExpr::ArbitraryLengthPath {
            subject,
            path,
            object,
            context: None,
            min_length,
        })
    }

    pub fn zero_length_path(subject: Var, object: Var) -> Arc<Self> {
        Arc::new(TupleExpr::ZeroLengthPath {
            subject,
            object,
            context: None,
        })
    }

    pub fn service(service_ref: Var, arg: Arc<Self>, silent: bool) -> Arc<Self> {
        Arc::new(TupleExpr::Service {
            service_ref,
            arg,
            silent,
        })
    }

    pub fn values(names: &[&str], rows: Vec<Vec<Option<Value>>>) -> Arc<Self> {
        Arc::new(TupleExpr::BindingSetAssignment {
            names: names.iter().map(|s| s.to_string()).collect(),
            rows,
        })
    }
}

impl TupleExpr {
    /// Operator name for diagnostics
    pub fn node_type(&self) -> &'static str {
        match self {
            TupleExpr::StatementPattern { .. } => "StatementPattern",
            TupleExpr::Join { .. } => "Join",
            TupleExpr::LeftJoin { .. } => "LeftJoin",
            TupleExpr::Union { .. } => "Union",
            TupleExpr::Difference { .. } => "Difference",
            TupleExpr::Intersection { .. } => "Intersection",
            TupleExpr::Filter { .. } => "Filter",
            TupleExpr::Projection { .. } => "Projection",
            TupleExpr::Extension { .. } => "Extension",
            TupleExpr::Distinct { .. } => "Distinct",
            TupleExpr::Reduced { .. } => "Reduced",
            TupleExpr::Order { .. } => "Order",
            TupleExpr::Slice { .. } => "Slice",
            TupleExpr::Group { .. } => "Group",
            TupleExpr::ArbitraryLengthPath { .. } => "ArbitraryLengthPath",
            TupleExpr::ZeroLengthPath { .. } => "ZeroLengthPath",
            TupleExpr::Service { .. } => "Service",
            TupleExpr::BindingSetAssignment { .. } => "BindingSetAssignment",
            TupleExpr::SingletonSet => "SingletonSet",
            TupleExpr::EmptySet => "EmptySet",
        }
    }

    /// Variables this expression may bind in its output
    pub fn binding_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_binding_names(&mut names);
        names
    }

    fn collect_binding_names(&self, names: &mut BTreeSet<String>) {
        let mut add_var = |var: &Var| {
            if !var.is_constant() {
                names.insert(var.name.clone());
            }
        };
        match self {
            TupleExpr::StatementPattern {
                subject,
                predicate,
                object,
                context,
            } => {
                add_var(subject);
                add_var(predicate);
                add_var(object);
                if let Some(c) = context {
                    add_var(c);
                }
            }
            TupleExpr::ArbitraryLengthPath {
                subject,
                object,
                context,
                ..
            }
            | TupleExpr::ZeroLengthPath {
                subject,
                object,
                context,
            } => {
                add_var(subject);
                add_var(object);
                if let Some(c) = context {
                    add_var(c);
                }
            }
            TupleExpr::Join { left, right }
            | TupleExpr::LeftJoin { left, right, .. }
            | TupleExpr::Union { left, right } => {
                left.collect_binding_names(names);
                right.collect_binding_names(names);
            }
            TupleExpr::Difference { left, .. } | TupleExpr::Intersection { left, .. } => {
                left.collect_binding_names(names)
            }
            TupleExpr::Filter { arg, .. }
            | TupleExpr::Distinct { arg }
            | TupleExpr::Reduced { arg }
            | TupleExpr::Order { arg, .. }
            | TupleExpr::Slice { arg, .. }
            | TupleExpr::Service { arg, .. } => arg.collect_binding_names(names),
            TupleExpr::Projection { elements, .. } => {
                names.extend(elements.iter().map(|e| e.target.clone()));
            }
            TupleExpr::Extension { arg, elements } => {
                arg.collect_binding_names(names);
                names.extend(elements.iter().map(|e| e.name.clone()));
            }
            TupleExpr::Group {
                group_by, elements, ..
            } => {
                names.extend(group_by.iter().cloned());
                names.extend(elements.iter().map(|e| e.name.clone()));
            }
            TupleExpr::BindingSetAssignment { names: vars, .. } => {
                names.extend(vars.iter().cloned());
            }
            TupleExpr::SingletonSet | TupleExpr::EmptySet => {}
        }
    }

    /// True if a projection (sub-select) occurs anywhere in this subtree
    ///
    /// Such a subtree cannot see the outer bindings, so a join may evaluate
    /// it once and hash its results.
    pub fn contains_projection(&self) -> bool {
        match self {
            TupleExpr::Projection { .. } => true,
            TupleExpr::Join { left, right }
            | TupleExpr::LeftJoin { left, right, .. }
            | TupleExpr::Union { left, right }
            | TupleExpr::Difference { left, right }
            | TupleExpr::Intersection { left, right } => {
                left.contains_projection() || right.contains_projection()
            }
            TupleExpr::Filter { arg, .. }
            | TupleExpr::Extension { arg, .. }
            | TupleExpr::Distinct { arg }
            | TupleExpr::Reduced { arg }
            | TupleExpr::Order { arg, .. }
            | TupleExpr::Slice { arg, .. }
            | TupleExpr::Group { arg, .. }
            | TupleExpr::Service { arg, .. } => arg.contains_projection(),
            TupleExpr::ArbitraryLengthPath { path, .. } => path.contains_projection(),
            TupleExpr::StatementPattern { .. }
            | TupleExpr::ZeroLengthPath { .. }
            | TupleExpr::BindingSetAssignment { .. }
            | TupleExpr::SingletonSet
            | TupleExpr::EmptySet => false,
        }
    }

    /// Copy with pattern variables replaced
    ///
    /// `replace` returns the substitute for a variable, or `None` to keep it.
    /// Names read by value expressions and projections follow the same mapping.
    pub fn replace_vars<F>(&self, replace: &F) -> TupleExpr
    where
        F: Fn(&Var) -> Option<Var>,
    {
        self.replace_vars_at(&|v: &Var, _: VarPosition| replace(v))
    }

    /// Like [`TupleExpr::replace_vars`], but `replace` also sees where the
    /// variable occurs, so one name can map differently per position
    pub fn replace_vars_at<F>(&self, replace: &F) -> TupleExpr
    where
        F: Fn(&Var, VarPosition) -> Option<Var>,
    {
        let at = |v: &Var, position: VarPosition| replace(v, position).unwrap_or_else(|| v.clone());
        let var = |v: &Var| at(v, VarPosition::Other);
        let opt_var = |v: &Option<Var>| v.as_ref().map(|v| at(v, VarPosition::Context));
        let name = |n: &String| {
            replace(&Var::new(n.as_str()), VarPosition::Other).map_or_else(|| n.clone(), |v| v.name)
        };
        let rename = |n: &str| replace(&Var::new(n), VarPosition::Other).map(|v| v.name);
        let child = |c: &Arc<TupleExpr>| Arc::new(c.replace_vars_at(replace));

        match self {
            TupleExpr::StatementPattern {
                subject,
                predicate,
                object,
                context,
            } => TupleExpr::StatementPattern {
                subject: at(subject, VarPosition::Subject),
                predicate: at(predicate, VarPosition::Predicate),
                object: at(object, VarPosition::Object),
                context: opt_var(context),
            },
            TupleExpr::Join { left, right } => TupleExpr::Join {
                left: child(left),
                right: child(right),
            },
            TupleExpr::LeftJoin {
                left,
                right,
                condition,
            } => TupleExpr::LeftJoin {
                left: child(left),
                right: child(right),
                condition: condition.as_ref().map(|c| c.rename_vars(&rename)),
            },
            TupleExpr::Union { left, right } => TupleExpr::Union {
                left: child(left),
                right: child(right),
            },
            TupleExpr::Difference { left, right } => TupleExpr::Difference {
                left: child(left),
                right: child(right),
            },
            TupleExpr::Intersection { left, right } => TupleExpr::Intersection {
                left: child(left),
                right: child(right),
            },
            TupleExpr::Filter { arg, condition } => TupleExpr::Filter {
                arg: child(arg),
                condition: condition.rename_vars(&rename),
            },
            TupleExpr::Projection { arg, elements } => TupleExpr::Projection {
                arg: child(arg),
                elements: elements
                    .iter()
                    .map(|e| ProjectionElem {
                        source: name(&e.source),
                        target: name(&e.target),
                    })
                    .collect(),
            },
            TupleExpr::Extension { arg, elements } => TupleExpr::Extension {
                arg: child(arg),
                elements: elements
                    .iter()
                    .map(|e| ExtensionElem {
                        name: name(&e.name),
                        expr: e.expr.rename_vars(&rename),
                    })
                    .collect(),
            },
            TupleExpr::Distinct { arg } => TupleExpr::Distinct { arg: child(arg) },
            TupleExpr::Reduced { arg } => TupleExpr::Reduced { arg: child(arg) },
            TupleExpr::Order {
                arg,
                elements,
                limit,
                distinct,
            } => TupleExpr::Order {
                arg: child(arg),
                elements: elements
                    .iter()
                    .map(|e| OrderElem {
                        expr: e.expr.rename_vars(&rename),
                        ascending: e.ascending,
                    })
                    .collect(),
                limit: *limit,
                distinct: *distinct,
            },
            TupleExpr::Slice { arg, offset, limit } => TupleExpr::Slice {
                arg: child(arg),
                offset: *offset,
                limit: *limit,
            },
            TupleExpr::Group {
                arg,
                group_by,
                elements,
            } => TupleExpr::Group {
                arg: child(arg),
                group_by: group_by.iter().map(name).collect(),
                elements: elements
                    .iter()
                    .map(|e| GroupElem {
                        name: name(&e.name),
                        operator: AggregateOperator {
                            kind: e.operator.kind.clone(),
                            args: e
                                .operator
                                .args
                                .iter()
                                .map(|a| a.rename_vars(&rename))
                                .collect(),
                            distinct: e.operator.distinct,
                        },
                    })
                    .collect(),
            },
            TupleExpr::ArbitraryLengthPath {
                subject,
                path,
                object,
                context,
                min_length,
            } => TupleExpr::ArbitraryLengthPath {
                subject: at(subject, VarPosition::Subject),
                path: child(path),
                object: at(object, VarPosition::Object),
                context: opt_var(context),
                min_length: *min_length,
            },
            TupleExpr::ZeroLengthPath {
                subject,
                object,
                context,
            } => TupleExpr::ZeroLengthPath {
                subject: at(subject, VarPosition::Subject),
                object: at(object, VarPosition::Object),
                context: opt_var(context),
            },
            TupleExpr::Service {
                service_ref,
                arg,
                silent,
            } => TupleExpr::Service {
                service_ref: var(service_ref),
                arg: child(arg),
                silent: *silent,
            },
            TupleExpr::BindingSetAssignment { names, rows } => TupleExpr::BindingSetAssignment {
                names: names.iter().map(name).collect(),
                rows: rows.clone(),
            },
            TupleExpr::SingletonSet => TupleExpr::SingletonSet,
            TupleExpr::EmptySet => TupleExpr::EmptySet,
        }
    }
}
