// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Total order over (possibly unbound) terms, as used by ORDER BY, MIN and MAX
//!
//! unbound < blank nodes < IRIs < literals. Literals order numerics first (by
//! value), then dateTimes (by instant), then everything else lexically.

use super::value::{Literal, Value};
use std::cmp::Ordering;

fn term_rank(value: Option<&Value>) -> u8 {
    match value {
        None => 0,
        Some(Value::BNode(_)) => 1,
        Some(Value::Iri(_)) => 2,
        Some(Value::Literal(_)) => 3,
    }
}

/// Compare two terms; never fails
pub fn compare_terms(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::BNode(x)), Some(Value::BNode(y))) => x.cmp(y),
        (Some(Value::Iri(x)), Some(Value::Iri(y))) => x.cmp(y),
        (Some(Value::Literal(x)), Some(Value::Literal(y))) => compare_literals(x, y),
        _ => term_rank(a).cmp(&term_rank(b)),
    }
}

fn compare_literals(a: &Literal, b: &Literal) -> Ordering {
    if let (Some(x), Some(y)) = (a.numeric(), b.numeric()) {
        return x
            .as_f64()
            .total_cmp(&y.as_f64())
            .then_with(|| lexical_order(a, b));
    }
    if let (Some(x), Some(y)) = (a.date_time(), b.date_time()) {
        return x.cmp(&y).then_with(|| lexical_order(a, b));
    }
    literal_class(a)
        .cmp(&literal_class(b))
        .then_with(|| lexical_order(a, b))
}

fn literal_class(literal: &Literal) -> u8 {
    if literal.numeric().is_some() {
        0
    } else if literal.date_time().is_some() {
        1
    } else {
        2
    }
}

fn lexical_order(a: &Literal, b: &Literal) -> Ordering {
    a.label()
        .cmp(b.label())
        .then_with(|| a.datatype().cmp(b.datatype()))
        .then_with(|| a.language().cmp(&b.language()))
}
