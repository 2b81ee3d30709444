// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Shared evaluation context
//!
//! Everything an operator needs besides its own subtree: the triple source,
//! the collection factory carrying the query budget, the aggregate registry,
//! the optional service resolver and the configuration.

use crate::collection::CollectionFactory;
use crate::config::EvaluationConfig;
use crate::exec::service::ServiceResolver;
use crate::exec::value_eval::ValueEvaluator;
use crate::functions::AggregateFunctionRegistry;
use crate::store::TripleSource;
use std::fmt;
use std::sync::Arc;

pub struct EvaluationContext {
    /// Statement lookups for patterns and paths
    pub(crate) triple_source: Arc<dyn TripleSource>,
    /// Bounded collections for blocking operators
    pub(crate) collections: CollectionFactory,
    /// Custom aggregate lookup
    pub(crate) registry: Arc<AggregateFunctionRegistry>,
    /// Federated service lookup; `None` makes SERVICE fail (or yield its input when silent)
    pub(crate) service_resolver: Option<Arc<dyn ServiceResolver>>,
    pub(crate) config: EvaluationConfig,
    /// Expression evaluation with the shared regex cache
    pub(crate) values: Arc<ValueEvaluator>,
}

impl EvaluationContext {
    pub fn triple_source(&self) -> &Arc<dyn TripleSource> {
        &self.triple_source
    }

    pub fn collections(&self) -> &CollectionFactory {
        &self.collections
    }

    pub fn registry(&self) -> &Arc<AggregateFunctionRegistry> {
        &self.registry
    }

    pub fn service_resolver(&self) -> Option<&Arc<dyn ServiceResolver>> {
        self.service_resolver.as_ref()
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    pub fn values(&self) -> &Arc<ValueEvaluator> {
        &self.values
    }

    /// Same context with another collection factory (and thus budget)
    pub(crate) fn with_collections(&self, collections: CollectionFactory) -> Self {
        Self {
            triple_source: Arc::clone(&self.triple_source),
            collections,
            registry: Arc::clone(&self.registry),
            service_resolver: self.service_resolver.clone(),
            config: self.config.clone(),
            values: Arc::clone(&self.values),
        }
    }
}

impl fmt::Debug for EvaluationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("collections", &self.collections)
            .field("registry", &self.registry)
            .field("has_service_resolver", &self.service_resolver.is_some())
            .field("config", &self.config)
            .finish()
    }
}
