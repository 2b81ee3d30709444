// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Evaluation error types

use thiserror::Error;

/// Evaluation errors
///
/// Every operator propagates these unchanged to the caller of
/// `has_next()` / `next()`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("Triple source error: {0}")]
    TripleSource(String),

    /// Type error while evaluating a value expression. Filters, BIND and
    /// aggregates tolerate it locally; everywhere else it aborts evaluation.
    #[error("Value expression error: {0}")]
    ValueExpression(String),

    #[error("Collection size limit exceeded: {used} elements in use, limit {max_size}")]
    ResourceLimitExceeded { used: usize, max_size: usize },

    #[error("No such element: iteration is exhausted")]
    NoSuchElement,

    #[error("Unknown aggregate function '{0}'")]
    UnknownAggregateFunction(String),

    #[error("Service error: {0}")]
    Service(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl EvaluationError {
    /// Shorthand for a value expression type error
    pub fn type_error(message: impl Into<String>) -> Self {
        EvaluationError::ValueExpression(message.into())
    }

    /// True for errors a FILTER or BIND may swallow
    pub fn is_value_expression_error(&self) -> bool {
        matches!(self, EvaluationError::ValueExpression(_))
    }
}

impl From<serde_json::Error> for EvaluationError {
    fn from(error: serde_json::Error) -> Self {
        EvaluationError::Configuration(error.to_string())
    }
}

/// Result alias used throughout the engine
pub type EvaluationResult<T> = Result<T, EvaluationError>;
