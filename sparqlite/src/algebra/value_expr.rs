// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Value expressions (FILTER, BIND, ORDER BY, aggregate arguments)

use crate::model::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        };
        write!(f, "{}", symbol)
    }
}

/// Arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MathOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// Scalar expression evaluated against one binding set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueExpr {
    Var(String),
    Constant(Value),
    Bound(String),
    Not(Box<ValueExpr>),
    And(Box<ValueExpr>, Box<ValueExpr>),
    Or(Box<ValueExpr>, Box<ValueExpr>),
    Compare {
        left: Box<ValueExpr>,
        right: Box<ValueExpr>,
        op: CompareOp,
    },
    SameTerm(Box<ValueExpr>, Box<ValueExpr>),
    Math {
        left: Box<ValueExpr>,
        right: Box<ValueExpr>,
        op: MathOp,
    },
    Str(Box<ValueExpr>),
    Regex {
        arg: Box<ValueExpr>,
        pattern: Box<ValueExpr>,
        flags: Option<Box<ValueExpr>>,
    },
    IsIri(Box<ValueExpr>),
    IsBlank(Box<ValueExpr>),
    IsLiteral(Box<ValueExpr>),
}

impl ValueExpr {
    pub fn var(name: impl Into<String>) -> Self {
        ValueExpr::Var(name.into())
    }

    pub fn constant(value: impl Into<Value>) -> Self {
        ValueExpr::Constant(value.into())
    }

    pub fn bound(name: impl Into<String>) -> Self {
        ValueExpr::Bound(name.into())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(arg: ValueExpr) -> Self {
        ValueExpr::Not(Box::new(arg))
    }

    pub fn and(left: ValueExpr, right: ValueExpr) -> Self {
        ValueExpr::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: ValueExpr, right: ValueExpr) -> Self {
        ValueExpr::Or(Box::new(left), Box::new(right))
    }

    pub fn compare(left: ValueExpr, op: CompareOp, right: ValueExpr) -> Self {
        ValueExpr::Compare {
            left: Box::new(left),
            right: Box::new(right),
            op,
        }
    }

    pub fn math(left: ValueExpr, op: MathOp, right: ValueExpr) -> Self {
        ValueExpr::Math {
            left: Box::new(left),
            right: Box::new(right),
            op,
        }
    }

    pub fn regex(arg: ValueExpr, pattern: impl Into<String>) -> Self {
        ValueExpr::Regex {
            arg: Box::new(arg),
            pattern: Box::new(ValueExpr::Constant(Value::literal(pattern.into()))),
            flags: None,
        }
    }

    /// Variables read by this expression
    pub fn var_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_var_names(&mut names);
        names
    }

    fn collect_var_names(&self, names: &mut BTreeSet<String>) {
        match self {
            ValueExpr::Var(name) | ValueExpr::Bound(name) => {
                names.insert(name.clone());
            }
            ValueExpr::Constant(_) => {}
            ValueExpr::Not(arg)
            | ValueExpr::Str(arg)
            | ValueExpr::IsIri(arg)
            | ValueExpr::IsBlank(arg)
            | ValueExpr::IsLiteral(arg) => arg.collect_var_names(names),
            ValueExpr::And(l, r) | ValueExpr::Or(l, r) | ValueExpr::SameTerm(l, r) => {
                l.collect_var_names(names);
                r.collect_var_names(names);
            }
            ValueExpr::Compare { left, right, .. } | ValueExpr::Math { left, right, .. } => {
                left.collect_var_names(names);
                right.collect_var_names(names);
            }
            ValueExpr::Regex {
                arg,
                pattern,
                flags,
            } => {
                arg.collect_var_names(names);
                pattern.collect_var_names(names);
                if let Some(flags) = flags {
                    flags.collect_var_names(names);
                }
            }
        }
    }

    /// Copy with variables renamed; `rename` returns the new name or `None` to keep it
    pub fn rename_vars<F>(&self, rename: &F) -> ValueExpr
    where
        F: Fn(&str) -> Option<String>,
    {
        let boxed = |e: &Box<ValueExpr>| Box::new(e.rename_vars(rename));
        match self {
            ValueExpr::Var(name) => ValueExpr::Var(rename(name).unwrap_or_else(|| name.clone())),
            ValueExpr::Bound(name) => {
                ValueExpr::Bound(rename(name).unwrap_or_else(|| name.clone()))
            }
            ValueExpr::Constant(v) => ValueExpr::Constant(v.clone()),
            ValueExpr::Not(a) => ValueExpr::Not(boxed(a)),
            ValueExpr::Str(a) => ValueExpr::Str(boxed(a)),
            ValueExpr::IsIri(a) => ValueExpr::IsIri(boxed(a)),
            ValueExpr::IsBlank(a) => ValueExpr::IsBlank(boxed(a)),
            ValueExpr::IsLiteral(a) => ValueExpr::IsLiteral(boxed(a)),
            ValueExpr::And(l, r) => ValueExpr::And(boxed(l), boxed(r)),
            ValueExpr::Or(l, r) => ValueExpr::Or(boxed(l), boxed(r)),
            ValueExpr::SameTerm(l, r) => ValueExpr::SameTerm(boxed(l), boxed(r)),
            ValueExpr::Compare { left, right, op } => ValueExpr::Compare {
                left: boxed(left),
                right: boxed(right),
                op: *op,
            },
            ValueExpr::Math { left, right, op } => ValueExpr::Math {
                left: boxed(left),
                right: boxed(right),
                op: *op,
            },
            ValueExpr::Regex {
                arg,
                pattern,
                flags,
            } => ValueExpr::Regex {
                arg: boxed(arg),
                pattern: boxed(pattern),
                flags: flags.as_ref().map(|f| boxed(f)),
            },
        }
    }
}
