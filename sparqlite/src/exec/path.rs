// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Property path evaluation
//!
//! `ArbitraryLengthPath` is a breadth-first frontier expansion. The path
//! expression is evaluated one hop at a time with its endpoints renamed to
//! internal variables; every `(anchor, reached)` pair is recorded in a
//! bounded visited set, so cycles and diamonds terminate and never yield a
//! pair twice.

use super::error::EvaluationResult;
use super::iteration::{
    next_or_none, BoxedIteration, CloseableIteration, EmptyIteration, LookAhead,
    LookAheadIteration, SingletonIteration, SolutionIteration,
};
use super::strategy::EvaluationStrategy;
use crate::algebra::{TupleExpr, Var, VarPosition};
use crate::binding::{BindingSet, MutableBindingSet, Solution};
use crate::collection::{BoundedQueue, BoundedSet, CollectionFactory};
use crate::model::{Statement, Value};
use std::collections::VecDeque;
use std::sync::Arc;

const PATH_START: &str = "__path_start";
const PATH_END: &str = "__path_end";

fn fixed_value(var: &Var, bindings: &Solution) -> Option<Value> {
    var.value
        .clone()
        .or_else(|| bindings.value(&var.name).cloned())
}

fn context_list(context: Option<&Var>, bindings: &Solution) -> Vec<Value> {
    context
        .and_then(|c| fixed_value(c, bindings))
        .into_iter()
        .collect()
}

/// Distinct subjects and objects of a graph scan, with their graph when requested
struct NodeScan {
    statements: Option<BoxedIteration<Statement>>,
    seen: BoundedSet<(Value, Option<Value>)>,
    pending: VecDeque<(Value, Option<Value>)>,
    /// Free context variable: skip the default graph and report the graph
    with_graph: bool,
}

impl NodeScan {
    fn open(
        strategy: &EvaluationStrategy,
        contexts: &[Value],
        with_graph: bool,
    ) -> EvaluationResult<Self> {
        let statements = strategy
            .context()
            .triple_source()
            .get_statements(None, None, None, contexts)?;
        Ok(Self {
            statements: Some(statements),
            seen: strategy.context().collections().make_set(),
            pending: VecDeque::new(),
            with_graph,
        })
    }

    fn next_node(&mut self) -> EvaluationResult<Option<(Value, Option<Value>)>> {
        loop {
            if let Some(node) = self.pending.pop_front() {
                return Ok(Some(node));
            }
            let Some(statements) = self.statements.as_mut() else {
                return Ok(None);
            };
            let Some(statement) = next_or_none(statements)? else {
                self.close();
                return Ok(None);
            };
            if self.with_graph && statement.context.is_none() {
                continue;
            }
            let graph = if self.with_graph {
                statement.context.clone()
            } else {
                None
            };
            for node in [statement.subject, statement.object] {
                let key = (node, graph.clone());
                if !self.seen.contains(&key) {
                    self.seen.insert(key.clone())?;
                    self.pending.push_back(key);
                }
            }
        }
    }

    fn close(&mut self) {
        if let Some(mut statements) = self.statements.take() {
            statements.close();
        }
        self.pending.clear();
    }
}

pub(crate) fn evaluate_zero_length_path(
    strategy: &EvaluationStrategy,
    subject: &Var,
    object: &Var,
    context: Option<&Var>,
    bindings: &Solution,
) -> EvaluationResult<SolutionIteration> {
    let start = fixed_value(subject, bindings);
    let end = fixed_value(object, bindings);

    let single = |name: &str, value: Value| {
        let mut row = bindings.clone();
        row.add_binding(name, value);
        SingletonIteration::new(row).boxed()
    };
    match (start, end) {
        (Some(s), Some(e)) if s == e => Ok(SingletonIteration::new(bindings.clone()).boxed()),
        (Some(_), Some(_)) => Ok(EmptyIteration.boxed()),
        (Some(s), None) => Ok(single(&object.name, s)),
        (None, Some(e)) => Ok(single(&subject.name, e)),
        (None, None) => {
            let free_context = context.filter(|c| fixed_value(c, bindings).is_none());
            let scan = NodeScan::open(
                strategy,
                &context_list(context, bindings),
                free_context.is_some(),
            )?;
            Ok(LookAheadIteration::new(ZeroLengthScan {
                scan,
                subject: subject.name.clone(),
                object: object.name.clone(),
                context: free_context.map(|c| c.name.clone()),
                parent: bindings.clone(),
            })
            .boxed())
        }
    }
}

/// Reflexive rows for every node of the graph
struct ZeroLengthScan {
    scan: NodeScan,
    subject: String,
    object: String,
    context: Option<String>,
    parent: Solution,
}

impl LookAhead<Solution> for ZeroLengthScan {
    fn next_element(&mut self) -> EvaluationResult<Option<Solution>> {
        let Some((node, graph)) = self.scan.next_node()? else {
            return Ok(None);
        };
        let mut row = self.parent.clone();
        row.add_binding(&self.subject, node.clone());
        row.add_binding(&self.object, node);
        if let (Some(name), Some(graph)) = (&self.context, graph) {
            row.add_binding(name, graph);
        }
        Ok(Some(row))
    }

    fn handle_close(&mut self) {
        self.scan.close();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Hops from subject towards object
    Forward,
    /// Hops from a fixed object back towards the subject
    Backward,
}

pub(crate) fn evaluate_arbitrary_length_path(
    strategy: &EvaluationStrategy,
    subject: &Var,
    path: &Arc<TupleExpr>,
    object: &Var,
    context: Option<&Var>,
    min_length: u64,
    bindings: &Solution,
) -> EvaluationResult<SolutionIteration> {
    let start = fixed_value(subject, bindings);
    let end = fixed_value(object, bindings);
    let direction = if start.is_none() && end.is_some() {
        Direction::Backward
    } else {
        Direction::Forward
    };
    if min_length > 1 {
        log::debug!("Path: min_length {} evaluated as 1", min_length);
    }
    log::debug!(
        "Path: {:?} expansion, start fixed={}, end fixed={}",
        direction,
        start.is_some(),
        end.is_some()
    );

    // With `?x p+ ?x` the hop repeats one name; its object end becomes the path end
    let subject_name = subject.name.clone();
    let object_name = object.name.clone();
    let same_endpoint = subject_name == object_name;
    let hop = Arc::new(path.replace_vars_at(&|v: &Var, position: VarPosition| {
        if v.name == object_name && (!same_endpoint || position == VarPosition::Object) {
            Some(Var::new(PATH_END))
        } else if v.name == subject_name {
            Some(Var::new(PATH_START))
        } else {
            None
        }
    }));

    let collections: &CollectionFactory = strategy.context().collections();
    let free_context = context.filter(|c| fixed_value(c, bindings).is_none());
    let contexts = context_list(context, bindings);
    let mut hop_input = bindings.clone();
    hop_input.remove_binding(&subject.name);
    hop_input.remove_binding(&object.name);

    Ok(LookAheadIteration::new(PathIteration {
        strategy: strategy.clone(),
        hop,
        hop_input,
        direction,
        include_zero_length: min_length == 0,
        anchor: match direction {
            Direction::Forward => start,
            Direction::Backward => end.clone(),
        },
        target: match direction {
            Direction::Forward => end,
            Direction::Backward => None,
        },
        contexts,
        zero_length_with_graph: free_context.is_some(),
        subject: subject.clone(),
        object: object.clone(),
        parent: bindings.clone(),
        visited: collections.make_set(),
        frontier: collections.make_queue(),
        ready: VecDeque::new(),
        scan: None,
        current: None,
        started: false,
        done: false,
    })
    .boxed())
}

struct PathIteration {
    strategy: EvaluationStrategy,
    /// Path expression with endpoints renamed to the internal variables
    hop: Arc<TupleExpr>,
    /// Outer bindings minus the endpoint names
    hop_input: Solution,
    direction: Direction,
    include_zero_length: bool,
    /// Fixed endpoint expansion starts from; `None` when both ends are free
    anchor: Option<Value>,
    /// Fixed far endpoint, only reported pairs reaching it
    target: Option<Value>,
    contexts: Vec<Value>,
    zero_length_with_graph: bool,
    subject: Var,
    object: Var,
    parent: Solution,
    visited: BoundedSet<(Value, Value)>,
    frontier: BoundedQueue<(Value, Value)>,
    ready: VecDeque<Solution>,
    /// Reflexive rows when both ends are free
    scan: Option<NodeScan>,
    /// Hop in progress: its anchor (`None` = read from each row) and rows
    current: Option<(Option<Value>, SolutionIteration)>,
    started: bool,
    done: bool,
}

impl PathIteration {
    fn start(&mut self) -> EvaluationResult<()> {
        self.started = true;
        match self.anchor.clone() {
            Some(anchor) => {
                if self.include_zero_length {
                    self.reach(anchor.clone(), anchor.clone(), false)?;
                }
                // The seed is expanded but only counts as visited for zero-length paths
                self.frontier.push_back((anchor.clone(), anchor))?;
            }
            None => {
                if self.include_zero_length {
                    self.scan = Some(NodeScan::open(
                        &self.strategy,
                        &self.contexts,
                        self.zero_length_with_graph,
                    )?);
                }
                let rows = self.strategy.evaluate(&self.hop, &self.hop_input)?;
                self.current = Some((None, rows));
            }
        }
        Ok(())
    }

    fn hop_from(&self, node: &Value) -> EvaluationResult<SolutionIteration> {
        let mut input = self.hop_input.clone();
        let name = match self.direction {
            Direction::Forward => PATH_START,
            Direction::Backward => PATH_END,
        };
        input.add_binding(name, node.clone());
        log::trace!("Path hop from {}", node);
        self.strategy.evaluate(&self.hop, &input)
    }

    /// Record a reached pair; `expand` enqueues it for further hops
    fn reach(&mut self, anchor: Value, reached: Value, expand: bool) -> EvaluationResult<()> {
        let pair = (anchor, reached);
        if self.visited.contains(&pair) {
            return Ok(());
        }
        self.visited.insert(pair.clone())?;

        if self.target.as_ref().map_or(true, |t| *t == pair.1) {
            if let Some(row) = self.to_solution(&pair.0, &pair.1) {
                self.ready.push_back(row);
                if self.anchor.is_some() && self.target.is_some() {
                    // Both ends fixed: the single answer is known
                    self.done = true;
                    return Ok(());
                }
            }
        }
        if expand {
            self.frontier.push_back(pair)?;
        }
        Ok(())
    }

    fn to_solution(&self, anchor: &Value, reached: &Value) -> Option<Solution> {
        let (start, end) = match self.direction {
            Direction::Forward => (anchor, reached),
            Direction::Backward => (reached, anchor),
        };
        if self.subject.name == self.object.name && !self.subject.is_constant() && start != end {
            return None;
        }
        let mut row = self.parent.clone();
        for (var, value) in [(&self.subject, start), (&self.object, end)] {
            if !var.is_constant() && !row.has_binding(&var.name) {
                row.add_binding(&var.name, value.clone());
            }
        }
        Some(row)
    }

    fn close_current(&mut self) {
        if let Some((_, mut rows)) = self.current.take() {
            rows.close();
        }
    }
}

impl LookAhead<Solution> for PathIteration {
    fn next_element(&mut self) -> EvaluationResult<Option<Solution>> {
        loop {
            if let Some(row) = self.ready.pop_front() {
                return Ok(Some(row));
            }
            if self.done {
                return Ok(None);
            }
            if !self.started {
                self.start()?;
                continue;
            }

            if let Some(scan) = self.scan.as_mut() {
                match scan.next_node()? {
                    Some((node, _)) => self.reach(node.clone(), node, false)?,
                    None => self.scan = None,
                }
                continue;
            }

            if let Some((anchor, rows)) = self.current.as_mut() {
                let anchor = anchor.clone();
                match next_or_none(rows)? {
                    Some(row) => {
                        let (from, to) = match self.direction {
                            Direction::Forward => (row.value(PATH_START), row.value(PATH_END)),
                            Direction::Backward => (row.value(PATH_END), row.value(PATH_START)),
                        };
                        if let (Some(from), Some(to)) = (anchor.as_ref().or(from), to) {
                            let (from, to) = (from.clone(), to.clone());
                            self.reach(from, to, true)?;
                        }
                    }
                    None => self.close_current(),
                }
                continue;
            }

            match self.frontier.pop_front() {
                Some((anchor, reached)) => {
                    let rows = self.hop_from(&reached)?;
                    self.current = Some((Some(anchor), rows));
                }
                None => return Ok(None),
            }
        }
    }

    fn handle_close(&mut self) {
        self.close_current();
        if let Some(mut scan) = self.scan.take() {
            scan.close();
        }
        self.frontier.clear();
        self.visited.clear();
        self.ready.clear();
    }
}
