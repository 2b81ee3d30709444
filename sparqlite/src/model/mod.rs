// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Graph value model: RDF terms and statements

pub mod ordering;
pub mod value;
pub mod vocab;

pub use ordering::compare_terms;
pub use value::{Literal, Numeric, NumericKind, Statement, Value};
