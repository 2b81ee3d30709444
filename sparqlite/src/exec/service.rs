// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! SERVICE evaluation
//!
//! Remote endpoints are reached through a [`ServiceResolver`]. A service
//! receives whole batches of input bindings and returns rows already joined
//! with them, so a join against a SERVICE costs one request per batch rather
//! than one per left row.

use super::error::{EvaluationError, EvaluationResult};
use super::iteration::{
    next_or_none, CloseableIteration, LookAhead, LookAheadIteration, SingletonIteration,
    SolutionIteration, VecIteration,
};
use super::strategy::EvaluationStrategy;
use crate::algebra::{TupleExpr, Var};
use crate::binding::{BindingSet, Solution};
use crate::model::Value;
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// A queryable endpoint
pub trait FederatedService: Send + Sync {
    /// Evaluate `expr` once per input binding set
    ///
    /// Every returned row must be compatible with (and include) the input
    /// row it was produced from.
    fn select(
        &self,
        expr: &Arc<TupleExpr>,
        bindings: &[Solution],
    ) -> EvaluationResult<SolutionIteration>;
}

/// Maps service IRIs to endpoints
pub trait ServiceResolver: Send + Sync {
    fn resolve(&self, service_iri: &str) -> EvaluationResult<Arc<dyn FederatedService>>;
}

/// Resolver over a fixed table of services
#[derive(Default)]
pub struct MapServiceResolver {
    services: RwLock<HashMap<String, Arc<dyn FederatedService>>>,
}

impl MapServiceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, service_iri: impl Into<String>, service: Arc<dyn FederatedService>) {
        self.services.write().insert(service_iri.into(), service);
    }

    pub fn unregister(&self, service_iri: &str) -> bool {
        self.services.write().remove(service_iri).is_some()
    }
}

impl ServiceResolver for MapServiceResolver {
    fn resolve(&self, service_iri: &str) -> EvaluationResult<Arc<dyn FederatedService>> {
        self.services
            .read()
            .get(service_iri)
            .cloned()
            .ok_or_else(|| EvaluationError::Service(format!("unknown service <{}>", service_iri)))
    }
}

/// In-process service backed by another evaluation strategy
pub struct StrategyService {
    strategy: EvaluationStrategy,
}

impl StrategyService {
    pub fn new(strategy: EvaluationStrategy) -> Self {
        Self { strategy }
    }
}

impl FederatedService for StrategyService {
    fn select(
        &self,
        expr: &Arc<TupleExpr>,
        bindings: &[Solution],
    ) -> EvaluationResult<SolutionIteration> {
        Ok(LookAheadIteration::new(PerInputEvaluation {
            strategy: self.strategy.clone(),
            expr: Arc::clone(expr),
            inputs: bindings.iter().cloned().collect(),
            current: None,
        })
        .boxed())
    }
}

/// Evaluates one expression for each queued input, one after the other
struct PerInputEvaluation {
    strategy: EvaluationStrategy,
    expr: Arc<TupleExpr>,
    inputs: VecDeque<Solution>,
    current: Option<SolutionIteration>,
}

impl LookAhead<Solution> for PerInputEvaluation {
    fn next_element(&mut self) -> EvaluationResult<Option<Solution>> {
        loop {
            if let Some(current) = self.current.as_mut() {
                if let Some(row) = next_or_none(current)? {
                    return Ok(Some(row));
                }
                close_slot(&mut self.current);
            }
            let Some(input) = self.inputs.pop_front() else {
                return Ok(None);
            };
            self.current = Some(self.strategy.evaluate(&self.expr, &input)?);
        }
    }

    fn handle_close(&mut self) {
        close_slot(&mut self.current);
        self.inputs.clear();
    }
}

fn close_slot(slot: &mut Option<SolutionIteration>) {
    if let Some(mut iter) = slot.take() {
        iter.close();
    }
}

/// Service IRI from a constant or from the input bindings
pub(crate) fn service_iri(service_ref: &Var, bindings: &Solution) -> Option<String> {
    let value = service_ref
        .value
        .as_ref()
        .or_else(|| bindings.value(&service_ref.name))?;
    match value {
        Value::Iri(iri) => Some(iri.clone()),
        _ => None,
    }
}

fn resolve_service(
    strategy: &EvaluationStrategy,
    service_ref: &Var,
    bindings: &Solution,
) -> EvaluationResult<Arc<dyn FederatedService>> {
    let iri = service_iri(service_ref, bindings).ok_or_else(|| {
        EvaluationError::InvalidQuery(format!(
            "service reference ?{} is not bound to an IRI",
            service_ref.name
        ))
    })?;
    let resolver = strategy
        .context()
        .service_resolver()
        .ok_or_else(|| EvaluationError::Service("no service resolver configured".to_string()))?;
    resolver.resolve(&iri)
}

/// Standalone SERVICE: one request for the current input
pub(crate) fn evaluate_service(
    strategy: &EvaluationStrategy,
    service_ref: &Var,
    arg: &Arc<TupleExpr>,
    silent: bool,
    bindings: &Solution,
) -> EvaluationResult<SolutionIteration> {
    let result = resolve_service(strategy, service_ref, bindings)
        .and_then(|service| service.select(arg, std::slice::from_ref(bindings)));
    match result {
        Ok(rows) if silent => Ok(LookAheadIteration::new(SilentService {
            rows: Some(rows),
            fallback: vec![bindings.clone()],
            produced: false,
        })
        .boxed()),
        Ok(rows) => Ok(rows),
        Err(e) if silent => {
            log::warn!("Silent service ?{} failed: {}", service_ref.name, e);
            Ok(SingletonIteration::new(bindings.clone()).boxed())
        }
        Err(e) => Err(e),
    }
}

/// Vectored join: left rows are buffered and sent to the service in batches
pub(crate) fn service_join(
    strategy: &EvaluationStrategy,
    left: SolutionIteration,
    service_ref: &Var,
    arg: &Arc<TupleExpr>,
    silent: bool,
    bindings: &Solution,
) -> EvaluationResult<SolutionIteration> {
    Ok(LookAheadIteration::new(ServiceJoin {
        strategy: strategy.clone(),
        service_ref: service_ref.clone(),
        arg: Arc::clone(arg),
        silent,
        bindings: bindings.clone(),
        batch_size: strategy.config().service_batch_size,
        left: Some(left),
        current: None,
    })
    .boxed())
}

struct ServiceJoin {
    strategy: EvaluationStrategy,
    service_ref: Var,
    arg: Arc<TupleExpr>,
    silent: bool,
    /// Outer input; fixes the service IRI when it is a variable
    bindings: Solution,
    /// 0 = the whole left side in one batch
    batch_size: usize,
    left: Option<SolutionIteration>,
    current: Option<SolutionIteration>,
}

impl ServiceJoin {
    /// Next batch of left rows, empty once the left side is exhausted
    fn next_batch(&mut self) -> EvaluationResult<Vec<Solution>> {
        let Some(left) = self.left.as_mut() else {
            return Ok(Vec::new());
        };
        let mut queue = self.strategy.context().collections().make_queue();
        while self.batch_size == 0 || queue.len() < self.batch_size {
            match next_or_none(left)? {
                Some(row) => queue.push_back(row)?,
                None => {
                    close_slot(&mut self.left);
                    break;
                }
            }
        }
        Ok(queue.take_all())
    }

    fn send(&self, batch: Vec<Solution>) -> EvaluationResult<SolutionIteration> {
        log::debug!(
            "Service join: sending {} bindings to ?{}",
            batch.len(),
            self.service_ref.name
        );
        let result = resolve_service(&self.strategy, &self.service_ref, &self.bindings)
            .and_then(|service| service.select(&self.arg, &batch));
        match result {
            Ok(rows) if self.silent => Ok(LookAheadIteration::new(SilentService {
                rows: Some(rows),
                fallback: batch,
                produced: false,
            })
            .boxed()),
            Ok(rows) => Ok(rows),
            Err(e) if self.silent => {
                log::warn!("Silent service ?{} failed: {}", self.service_ref.name, e);
                Ok(VecIteration::new(batch).boxed())
            }
            Err(e) => Err(e),
        }
    }
}

impl LookAhead<Solution> for ServiceJoin {
    fn next_element(&mut self) -> EvaluationResult<Option<Solution>> {
        loop {
            if let Some(current) = self.current.as_mut() {
                if let Some(row) = next_or_none(current)? {
                    return Ok(Some(row));
                }
                close_slot(&mut self.current);
            }
            let batch = self.next_batch()?;
            if batch.is_empty() {
                return Ok(None);
            }
            self.current = Some(self.send(batch)?);
        }
    }

    fn handle_close(&mut self) {
        close_slot(&mut self.current);
        close_slot(&mut self.left);
    }
}

/// Service rows; on a failure before the first row, the input rows instead
struct SilentService {
    rows: Option<SolutionIteration>,
    fallback: Vec<Solution>,
    produced: bool,
}

impl LookAhead<Solution> for SilentService {
    fn next_element(&mut self) -> EvaluationResult<Option<Solution>> {
        let Some(rows) = self.rows.as_mut() else {
            return Ok(self.fallback.pop());
        };
        match next_or_none(rows) {
            Ok(Some(row)) => {
                self.produced = true;
                Ok(Some(row))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                log::warn!("Silent service failed while streaming: {}", e);
                close_slot(&mut self.rows);
                if self.produced {
                    self.fallback.clear();
                }
                // Reversed so that `pop` yields the inputs in order
                self.fallback.reverse();
                Ok(self.fallback.pop())
            }
        }
    }

    fn handle_close(&mut self) {
        close_slot(&mut self.rows);
        self.fallback.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::iteration::{collect_all, ErrorIteration};
    use crate::store::MemoryTripleSource;

    struct Failing;

    impl FederatedService for Failing {
        fn select(
            &self,
            _expr: &Arc<TupleExpr>,
            _bindings: &[Solution],
        ) -> EvaluationResult<SolutionIteration> {
            Ok(ErrorIteration::new(EvaluationError::Service("down".to_string())).boxed())
        }
    }

    fn iri(local: &str) -> Value {
        Value::iri(format!("http://example.org/{}", local))
    }

    fn strategy_with(resolver: MapServiceResolver) -> EvaluationStrategy {
        EvaluationStrategy::builder(Arc::new(MemoryTripleSource::new()))
            .service_resolver(Arc::new(resolver))
            .build()
            .unwrap()
    }

    #[test]
    fn test_silent_service_yields_input() {
        let resolver = MapServiceResolver::new();
        resolver.register("http://example.org/sparql", Arc::new(Failing));
        let strategy = strategy_with(resolver);

        let input = Solution::from_pairs([("x", iri("a"))]);
        let silent = TupleExpr::service(
            Var::constant(iri("sparql")),
            Arc::new(TupleExpr::SingletonSet),
            true,
        );
        let rows = collect_all(strategy.evaluate(&silent, &input).unwrap()).unwrap();
        assert_eq!(rows, vec![input.clone()]);

        let loud = TupleExpr::service(
            Var::constant(iri("sparql")),
            Arc::new(TupleExpr::SingletonSet),
            false,
        );
        assert!(collect_all(strategy.evaluate(&loud, &input).unwrap()).is_err());
    }

    #[test]
    fn test_unknown_service() {
        let strategy = strategy_with(MapServiceResolver::new());
        let expr = TupleExpr::service(
            Var::constant(iri("nowhere")),
            Arc::new(TupleExpr::SingletonSet),
            false,
        );
        assert!(matches!(
            strategy.evaluate(&expr, &Solution::new()),
            Err(EvaluationError::Service(_))
        ));
    }

    #[test]
    fn test_service_iri_from_bindings() {
        let var = Var::new("endpoint");
        let bindings = Solution::from_pairs([("endpoint", iri("sparql"))]);
        assert_eq!(
            service_iri(&var, &bindings),
            Some("http://example.org/sparql".to_string())
        );
        assert_eq!(service_iri(&var, &Solution::new()), None);
    }
}
