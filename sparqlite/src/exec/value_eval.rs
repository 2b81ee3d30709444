// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Value expression evaluation
//!
//! Type errors surface as [`EvaluationError::ValueExpression`]; callers that
//! tolerate them (FILTER, BIND, OPTIONAL conditions, aggregate arguments)
//! check with `is_value_expression_error()`.

use crate::algebra::{CompareOp, MathOp, ValueExpr};
use crate::binding::{BindingSet, Solution};
use crate::exec::error::{EvaluationError, EvaluationResult};
use crate::functions::ValueEvaluationStep;
use crate::model::{vocab, Literal, Numeric, NumericKind, Value};
use parking_lot::Mutex;
use regex::{Regex, RegexBuilder};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

/// Upper bound on cached compiled patterns before the cache is reset
const REGEX_CACHE_CAPACITY: usize = 256;

/// Evaluates [`ValueExpr`] trees against binding sets
#[derive(Debug, Default)]
pub struct ValueEvaluator {
    regex_cache: Mutex<HashMap<(String, String), Regex>>,
}

impl ValueEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile an expression into a step; type errors become `Ok(None)`
    pub fn compile(evaluator: &Arc<ValueEvaluator>, expr: ValueExpr) -> ValueEvaluationStep {
        let evaluator = Arc::clone(evaluator);
        Arc::new(move |bindings: &Solution| match evaluator.evaluate(&expr, bindings) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_value_expression_error() => Ok(None),
            Err(e) => Err(e),
        })
    }

    pub fn evaluate<B: BindingSet + ?Sized>(
        &self,
        expr: &ValueExpr,
        bindings: &B,
    ) -> EvaluationResult<Value> {
        match expr {
            ValueExpr::Var(name) => bindings
                .value(name)
                .cloned()
                .ok_or_else(|| EvaluationError::type_error(format!("unbound variable ?{}", name))),
            ValueExpr::Constant(value) => Ok(value.clone()),
            ValueExpr::Bound(name) => Ok(Value::boolean(bindings.has_binding(name))),
            ValueExpr::Not(arg) => {
                let value = self.evaluate(arg, bindings)?;
                Ok(Value::boolean(!effective_boolean_value(&value)?))
            }
            ValueExpr::And(left, right) => {
                let l = self.evaluate_condition(left, bindings);
                let r = self.evaluate_condition(right, bindings);
                match (l, r) {
                    (Ok(false), _) | (_, Ok(false)) => Ok(Value::boolean(false)),
                    (Ok(true), Ok(true)) => Ok(Value::boolean(true)),
                    (Err(e), _) | (_, Err(e)) => Err(e),
                }
            }
            ValueExpr::Or(left, right) => {
                let l = self.evaluate_condition(left, bindings);
                let r = self.evaluate_condition(right, bindings);
                match (l, r) {
                    (Ok(true), _) | (_, Ok(true)) => Ok(Value::boolean(true)),
                    (Ok(false), Ok(false)) => Ok(Value::boolean(false)),
                    (Err(e), _) | (_, Err(e)) => Err(e),
                }
            }
            ValueExpr::Compare { left, right, op } => {
                let l = self.evaluate(left, bindings)?;
                let r = self.evaluate(right, bindings)?;
                Ok(Value::boolean(compare_values(&l, &r, *op)?))
            }
            ValueExpr::SameTerm(left, right) => {
                let l = self.evaluate(left, bindings)?;
                let r = self.evaluate(right, bindings)?;
                Ok(Value::boolean(l == r))
            }
            ValueExpr::Math { left, right, op } => {
                let l = self.evaluate(left, bindings)?;
                let r = self.evaluate(right, bindings)?;
                let (ln, rn) = match (l.as_numeric(), r.as_numeric()) {
                    (Some(ln), Some(rn)) => (ln, rn),
                    _ => {
                        return Err(EvaluationError::type_error(format!(
                            "arithmetic on non-numeric operands {} and {}",
                            l, r
                        )))
                    }
                };
                Ok(compute(ln, rn, *op)?.into_value())
            }
            ValueExpr::Str(arg) => match self.evaluate(arg, bindings)? {
                Value::Iri(iri) => Ok(Value::literal(iri)),
                Value::Literal(literal) => Ok(Value::literal(literal.label())),
                Value::BNode(_) => Err(EvaluationError::type_error("STR of a blank node")),
            },
            ValueExpr::Regex {
                arg,
                pattern,
                flags,
            } => {
                let text = self.evaluate(arg, bindings)?;
                let pattern = self.evaluate(pattern, bindings)?;
                let flags = match flags {
                    Some(flags) => Some(self.evaluate(flags, bindings)?),
                    None => None,
                };
                let text = string_literal(&text, "REGEX text")?;
                let pattern = string_literal(&pattern, "REGEX pattern")?;
                let flags = match &flags {
                    Some(flags) => string_literal(flags, "REGEX flags")?,
                    None => "",
                };
                let regex = self.compiled_regex(pattern, flags)?;
                Ok(Value::boolean(regex.is_match(text)))
            }
            ValueExpr::IsIri(arg) => Ok(Value::boolean(self.evaluate(arg, bindings)?.is_iri())),
            ValueExpr::IsBlank(arg) => Ok(Value::boolean(self.evaluate(arg, bindings)?.is_bnode())),
            ValueExpr::IsLiteral(arg) => {
                Ok(Value::boolean(self.evaluate(arg, bindings)?.is_literal()))
            }
        }
    }

    /// Effective boolean value of an expression
    pub fn evaluate_condition<B: BindingSet + ?Sized>(
        &self,
        expr: &ValueExpr,
        bindings: &B,
    ) -> EvaluationResult<bool> {
        let value = self.evaluate(expr, bindings)?;
        effective_boolean_value(&value)
    }

    /// Condition where a type error counts as false
    pub fn is_true<B: BindingSet + ?Sized>(
        &self,
        expr: &ValueExpr,
        bindings: &B,
    ) -> EvaluationResult<bool> {
        match self.evaluate_condition(expr, bindings) {
            Ok(b) => Ok(b),
            Err(e) if e.is_value_expression_error() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Value of an expression, `None` on a type error
    pub fn evaluate_optional<B: BindingSet + ?Sized>(
        &self,
        expr: &ValueExpr,
        bindings: &B,
    ) -> EvaluationResult<Option<Value>> {
        match self.evaluate(expr, bindings) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_value_expression_error() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn cached_patterns(&self) -> usize {
        self.regex_cache.lock().len()
    }

    fn compiled_regex(&self, pattern: &str, flags: &str) -> EvaluationResult<Regex> {
        let key = (pattern.to_string(), flags.to_string());
        let mut cache = self.regex_cache.lock();
        if let Some(regex) = cache.get(&key) {
            return Ok(regex.clone());
        }

        let mut builder = RegexBuilder::new(pattern);
        for flag in flags.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                's' => builder.dot_matches_new_line(true),
                'm' => builder.multi_line(true),
                'x' => builder.ignore_whitespace(true),
                other => {
                    return Err(EvaluationError::type_error(format!(
                        "unsupported REGEX flag '{}'",
                        other
                    )))
                }
            };
        }
        let regex = builder
            .build()
            .map_err(|e| EvaluationError::type_error(format!("invalid REGEX pattern: {}", e)))?;

        if cache.len() >= REGEX_CACHE_CAPACITY {
            log::debug!("Regex cache full ({} patterns), clearing", cache.len());
            cache.clear();
        }
        cache.insert(key, regex.clone());
        Ok(regex)
    }
}

fn string_literal<'a>(value: &'a Value, role: &str) -> EvaluationResult<&'a str> {
    match value {
        Value::Literal(literal) if literal.is_string() => Ok(literal.label()),
        other => Err(EvaluationError::type_error(format!(
            "{} must be a string literal, got {}",
            role, other
        ))),
    }
}

/// SPARQL effective boolean value
pub fn effective_boolean_value(value: &Value) -> EvaluationResult<bool> {
    let literal = match value {
        Value::Literal(literal) => literal,
        other => {
            return Err(EvaluationError::type_error(format!(
                "no boolean value for {}",
                other.type_name()
            )))
        }
    };
    if literal.datatype() == vocab::XSD_BOOLEAN {
        return Ok(literal.boolean().unwrap_or(false));
    }
    if vocab::numeric_kind(literal.datatype()).is_some() {
        return Ok(match literal.numeric() {
            Some(n) => !n.is_zero() && !n.as_f64().is_nan(),
            None => false,
        });
    }
    if literal.is_string() {
        return Ok(!literal.label().is_empty());
    }
    Err(EvaluationError::type_error(format!(
        "no boolean value for literal of type <{}>",
        literal.datatype()
    )))
}

/// Compare two values with SPARQL operator semantics
pub fn compare_values(left: &Value, right: &Value, op: CompareOp) -> EvaluationResult<bool> {
    let ordering = match (left, right) {
        (Value::Literal(l), Value::Literal(r)) => compare_literals(l, r),
        _ => None,
    };

    match ordering {
        Some(ordering) => Ok(match op {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }),
        None => match op {
            CompareOp::Eq | CompareOp::Ne => {
                let equal = left == right;
                // Distinct literals of unknown datatypes cannot be proven unequal
                if !equal && left.is_literal() && right.is_literal() {
                    return Err(EvaluationError::type_error(format!(
                        "cannot compare {} and {}",
                        left, right
                    )));
                }
                Ok(if op == CompareOp::Eq { equal } else { !equal })
            }
            _ => Err(EvaluationError::type_error(format!(
                "cannot order {} {} {}",
                left, op, right
            ))),
        },
    }
}

/// Ordering between literals of comparable types, `None` if incomparable
fn compare_literals(left: &Literal, right: &Literal) -> Option<Ordering> {
    if let (Some(l), Some(r)) = (left.numeric(), right.numeric()) {
        return match (l, r) {
            (Numeric::Integer(a), Numeric::Integer(b)) => Some(a.cmp(&b)),
            _ => l.as_f64().partial_cmp(&r.as_f64()),
        };
    }
    if let (Some(l), Some(r)) = (left.boolean(), right.boolean()) {
        return Some(l.cmp(&r));
    }
    if let (Some(l), Some(r)) = (left.date_time(), right.date_time()) {
        return Some(l.cmp(&r));
    }
    if left.is_string() && right.is_string() && left.language() == right.language() {
        return Some(left.label().cmp(right.label()));
    }
    None
}

/// Arithmetic with integer/decimal/double promotion
///
/// Integer division yields a decimal. Division by zero is a type error
/// except for doubles, which follow IEEE semantics.
pub fn compute(left: Numeric, right: Numeric, op: MathOp) -> EvaluationResult<Numeric> {
    let mut kind = left.kind().max(right.kind());
    if op == MathOp::Divide && kind == NumericKind::Integer {
        kind = NumericKind::Decimal;
    }

    match (left.promote(kind), right.promote(kind)) {
        (Numeric::Integer(a), Numeric::Integer(b)) => {
            let result = match op {
                MathOp::Add => a.checked_add(b),
                MathOp::Subtract => a.checked_sub(b),
                MathOp::Multiply => a.checked_mul(b),
                MathOp::Divide => None,
            };
            result
                .map(Numeric::Integer)
                .ok_or_else(|| EvaluationError::type_error("integer overflow"))
        }
        (Numeric::Double(a), Numeric::Double(b)) => Ok(Numeric::Double(apply(a, b, op))),
        (a, b) => {
            if op == MathOp::Divide && b.is_zero() {
                return Err(EvaluationError::type_error("division by zero"));
            }
            Ok(Numeric::Decimal(apply(a.as_f64(), b.as_f64(), op)))
        }
    }
}

fn apply(a: f64, b: f64, op: MathOp) -> f64 {
    match op {
        MathOp::Add => a + b,
        MathOp::Subtract => a - b,
        MathOp::Multiply => a * b,
        MathOp::Divide => a / b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn row() -> Solution {
        Solution::from_pairs([
            ("n", Value::integer(4)),
            ("name", Value::literal("Alice")),
            ("who", Value::iri("http://example.org/alice")),
        ])
    }

    #[test]
    fn test_arithmetic_promotion() {
        let half = Numeric::Decimal(0.5);
        assert_eq!(
            compute(Numeric::Integer(2), Numeric::Integer(3), MathOp::Add).unwrap(),
            Numeric::Integer(5)
        );
        assert_eq!(
            compute(Numeric::Integer(1), half, MathOp::Add).unwrap(),
            Numeric::Decimal(1.5)
        );
        assert_eq!(
            compute(Numeric::Integer(3), Numeric::Integer(2), MathOp::Divide).unwrap(),
            Numeric::Decimal(1.5)
        );
        assert!(compute(Numeric::Integer(1), Numeric::Integer(0), MathOp::Divide).is_err());
        assert!(compute(Numeric::Integer(i64::MAX), Numeric::Integer(1), MathOp::Add).is_err());
        assert_eq!(
            compute(Numeric::Double(1.0), Numeric::Integer(0), MathOp::Divide).unwrap(),
            Numeric::Double(f64::INFINITY)
        );
    }

    #[test]
    fn test_comparisons() {
        let evaluator = ValueEvaluator::new();
        let gt = ValueExpr::compare(ValueExpr::var("n"), CompareOp::Gt, ValueExpr::constant(3i64));
        assert!(evaluator.evaluate_condition(&gt, &row()).unwrap());

        let decimal = Value::typed_literal("4.0", vocab::XSD_DECIMAL);
        assert!(compare_values(&Value::integer(4), &decimal, CompareOp::Eq).unwrap());
        assert!(compare_values(&Value::literal("a"), &Value::literal("b"), CompareOp::Lt).unwrap());
        assert!(!compare_values(&Value::iri("a"), &Value::iri("b"), CompareOp::Eq).unwrap());
        assert!(compare_values(&Value::iri("a"), &Value::literal("a"), CompareOp::Lt).is_err());
    }

    #[test]
    fn test_unbound_is_type_error() {
        let evaluator = ValueEvaluator::new();
        let expr = ValueExpr::compare(ValueExpr::var("missing"), CompareOp::Eq, ValueExpr::constant(1i64));
        let err = evaluator.evaluate(&expr, &row()).unwrap_err();
        assert!(err.is_value_expression_error());
        assert!(!evaluator.is_true(&expr, &row()).unwrap());
    }

    #[test]
    fn test_error_tolerant_logic() {
        let evaluator = ValueEvaluator::new();
        let error = ValueExpr::var("missing");
        let t = ValueExpr::constant(true);
        let f = ValueExpr::constant(false);

        assert!(evaluator
            .evaluate_condition(&ValueExpr::or(error.clone(), t), &row())
            .unwrap());
        assert!(!evaluator
            .evaluate_condition(&ValueExpr::and(error.clone(), f.clone()), &row())
            .unwrap());
        assert!(evaluator
            .evaluate_condition(&ValueExpr::or(error, f), &row())
            .is_err());
    }

    #[test]
    fn test_regex_and_cache() {
        let evaluator = ValueEvaluator::new();
        let expr = ValueExpr::Regex {
            arg: Box::new(ValueExpr::var("name")),
            pattern: Box::new(ValueExpr::constant("^ali")),
            flags: Some(Box::new(ValueExpr::constant("i"))),
        };
        assert!(evaluator.evaluate_condition(&expr, &row()).unwrap());
        assert!(evaluator.evaluate_condition(&expr, &row()).unwrap());
        assert_eq!(evaluator.cached_patterns(), 1);

        let on_iri = ValueExpr::regex(ValueExpr::var("who"), "alice");
        assert!(evaluator.evaluate(&on_iri, &row()).unwrap_err().is_value_expression_error());
    }

    #[test]
    fn test_term_tests_and_str() {
        let evaluator = ValueEvaluator::new();
        let is_iri = ValueExpr::IsIri(Box::new(ValueExpr::var("who")));
        assert!(evaluator.evaluate_condition(&is_iri, &row()).unwrap());

        let str_expr = ValueExpr::Str(Box::new(ValueExpr::var("who")));
        assert_eq!(
            evaluator.evaluate(&str_expr, &row()).unwrap(),
            Value::literal("http://example.org/alice")
        );

        let bound = ValueExpr::bound("missing");
        assert!(!evaluator.evaluate_condition(&bound, &row()).unwrap());
    }

    #[test]
    fn test_compiled_step_maps_type_errors() {
        let evaluator = Arc::new(ValueEvaluator::new());
        let step = ValueEvaluator::compile(
            &evaluator,
            ValueExpr::math(ValueExpr::var("name"), MathOp::Add, ValueExpr::constant(1i64)),
        );
        assert_eq!(step(&row()).unwrap(), None);

        let step = ValueEvaluator::compile(
            &evaluator,
            ValueExpr::math(ValueExpr::var("n"), MathOp::Multiply, ValueExpr::constant(2i64)),
        );
        assert_eq!(step(&row()).unwrap(), Some(Value::integer(8)));
    }

    #[test]
    fn test_effective_boolean_value() {
        assert!(effective_boolean_value(&Value::integer(2)).unwrap());
        assert!(!effective_boolean_value(&Value::literal("")).unwrap());
        assert!(effective_boolean_value(&Value::iri("http://x")).is_err());
    }
}
