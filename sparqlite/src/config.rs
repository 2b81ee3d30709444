// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Evaluation configuration

use crate::collection::{CollectionFactory, ResourceBudget};
use crate::exec::error::{EvaluationError, EvaluationResult};
use serde::{Deserialize, Serialize};

/// Knobs for one evaluation strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Ceiling on elements held by blocking operators of one query (`None` = unlimited)
    pub max_collection_size: Option<usize>,

    /// Use a hash join when the right side is a sub-select
    pub hash_join_enabled: bool,

    /// Left rows sent to a federated service per request (0 = all at once)
    pub service_batch_size: usize,

    /// Keep only the best `limit` rows while buffering ORDER BY ... LIMIT
    pub order_top_k: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            max_collection_size: None,
            hash_join_enabled: true,
            service_batch_size: 0,
            order_top_k: true,
        }
    }
}

impl EvaluationConfig {
    /// Configuration for memory-constrained environments
    pub fn memory_constrained() -> Self {
        Self {
            max_collection_size: Some(100_000),
            service_batch_size: 100,
            ..Self::default()
        }
    }

    /// Parse and validate a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> EvaluationResult<Self> {
        let config: EvaluationConfig = serde_json::from_str(json)?;
        config.validate().map_err(EvaluationError::Configuration)?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_collection_size == Some(0) {
            return Err("max_collection_size must be > 0 (omit it for no limit)".to_string());
        }
        Ok(())
    }

    /// Fresh budget for one query execution
    pub fn budget(&self) -> ResourceBudget {
        match self.max_collection_size {
            Some(max) => ResourceBudget::new(max),
            None => ResourceBudget::unlimited(),
        }
    }

    pub fn collection_factory(&self) -> CollectionFactory {
        CollectionFactory::with_budget(self.budget())
    }
}
