// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query algebra consumed by the evaluation strategy

pub mod tuple_expr;
pub mod value_expr;

pub use tuple_expr::{
    AggregateKind, AggregateOperator, ExtensionElem, GroupElem, OrderElem, ProjectionElem,
    TupleExpr, Var, VarPosition,
};
pub use value_expr::{CompareOp, MathOp, ValueExpr};
