// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statement pattern evaluation

use super::error::EvaluationResult;
use super::iteration::{
    next_or_none, BoxedIteration, CloseableIteration, LookAhead, LookAheadIteration,
    SolutionIteration,
};
use super::strategy::EvaluationStrategy;
use crate::algebra::Var;
use crate::binding::{ArrayBindingSet, BindingSet, MutableBindingSet, Solution};
use crate::model::{Statement, Value};
use std::sync::Arc;

/// Where a pattern position gets its value from, resolved once per call
enum Position {
    Fixed(Value),
    /// Index into the free variable names
    Free(usize),
}

impl Position {
    fn fixed(&self) -> Option<&Value> {
        match self {
            Position::Fixed(v) => Some(v),
            Position::Free(_) => None,
        }
    }

    fn slot(&self) -> Option<usize> {
        match self {
            Position::Fixed(_) => None,
            Position::Free(i) => Some(*i),
        }
    }
}

fn resolve(var: &Var, bindings: &Solution, names: &mut Vec<String>) -> Position {
    if let Some(value) = &var.value {
        return Position::Fixed(value.clone());
    }
    if let Some(value) = bindings.value(&var.name) {
        return Position::Fixed(value.clone());
    }
    match names.iter().position(|n| *n == var.name) {
        Some(i) => Position::Free(i),
        None => {
            names.push(var.name.clone());
            Position::Free(names.len() - 1)
        }
    }
}

pub(crate) fn evaluate_pattern(
    strategy: &EvaluationStrategy,
    [subject, predicate, object]: [&Var; 3],
    context: Option<&Var>,
    bindings: &Solution,
) -> EvaluationResult<SolutionIteration> {
    let mut names = Vec::new();
    let s = resolve(subject, bindings, &mut names);
    let p = resolve(predicate, bindings, &mut names);
    let o = resolve(object, bindings, &mut names);
    let c = context.map(|var| resolve(var, bindings, &mut names));

    let contexts: Vec<Value> = match c.as_ref().and_then(Position::fixed) {
        Some(graph) => vec![graph.clone()],
        None => Vec::new(),
    };
    let statements = strategy.context().triple_source().get_statements(
        s.fixed(),
        p.fixed(),
        o.fixed(),
        &contexts,
    )?;

    Ok(LookAheadIteration::new(PatternIteration {
        statements: Some(statements),
        slots: [s.slot(), p.slot(), o.slot(), c.as_ref().and_then(Position::slot)],
        require_named_graph: matches!(c, Some(Position::Free(_))),
        names: names.into(),
        parent: bindings.clone(),
    })
    .boxed())
}

struct PatternIteration {
    statements: Option<BoxedIteration<Statement>>,
    /// Free-variable slot for subject, predicate, object, context
    slots: [Option<usize>; 4],
    require_named_graph: bool,
    names: Arc<[String]>,
    parent: Solution,
}

impl PatternIteration {
    /// Values for the free variables, `None` if a repeated variable disagrees
    fn bind(&self, statement: &Statement) -> Option<Vec<Value>> {
        let parts = [
            Some(&statement.subject),
            Some(&statement.predicate),
            Some(&statement.object),
            statement.context.as_ref(),
        ];
        let mut values: Vec<Option<Value>> = vec![None; self.names.len()];
        for (slot, part) in self.slots.iter().zip(parts) {
            let (Some(index), Some(value)) = (slot, part) else {
                continue;
            };
            match &values[*index] {
                Some(existing) if existing != value => return None,
                Some(_) => {}
                None => values[*index] = Some(value.clone()),
            }
        }
        values.into_iter().collect()
    }

    fn to_solution(&self, values: Vec<Value>) -> Solution {
        if self.parent.is_empty() {
            let mut row = ArrayBindingSet::new(Arc::clone(&self.names));
            for (index, value) in values.into_iter().enumerate() {
                row.set_at(index, Some(value));
            }
            return Solution::Array(row);
        }
        let mut row = self.parent.clone();
        for (name, value) in self.names.iter().zip(values) {
            row.add_binding(name, value);
        }
        row
    }
}

impl LookAhead<Solution> for PatternIteration {
    fn next_element(&mut self) -> EvaluationResult<Option<Solution>> {
        loop {
            let Some(statements) = self.statements.as_mut() else {
                return Ok(None);
            };
            let Some(statement) = next_or_none(statements)? else {
                return Ok(None);
            };
            if self.require_named_graph && statement.context.is_none() {
                continue;
            }
            if let Some(values) = self.bind(&statement) {
                return Ok(Some(self.to_solution(values)));
            }
        }
    }

    fn handle_close(&mut self) {
        if let Some(mut statements) = self.statements.take() {
            statements.close();
        }
    }
}
