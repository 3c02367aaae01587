// src/loops.rs
//! Classificação do número de iterações de cabeçalhos `for`, `while` e `repeat`.

use crate::ast::*;
use crate::complexity::Growth;
use serde::Serialize;
use std::collections::HashSet;
use tracing::trace;

/// Como o número de iterações foi decidido; guardado para o trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum LoopRule {
    ConstantRange,
    SymbolicRange,
    AdditiveGuard { var: String },
    MultiplicativeGuard { var: String },
    Bisection { var: String },
    Indeterminate { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TripCount {
    pub growth: Growth,
    pub rule: LoopRule,
}

impl TripCount {
    fn new(growth: Growth, rule: LoopRule) -> Self {
        TripCount { growth, rule }
    }

    fn indeterminate(reason: impl Into<String>) -> Self {
        TripCount { growth: Growth::Unknown, rule: LoopRule::Indeterminate { reason: reason.into() } }
    }

    pub fn is_determinate(&self) -> bool {
        !matches!(self.rule, LoopRule::Indeterminate { .. })
    }
}

/// Crescimento de uma expressão de tamanho como `n`, `length(A)`, `n^2`, `n*m` ou `n/2`.
/// Todo identificador livre representa o tamanho da entrada.
pub fn size_of(expr: &Expr) -> Growth {
    match expr {
        Expr::Number(_) => Growth::CONSTANT,
        Expr::Identifier(_) | Expr::Index { .. } | Expr::Field { .. } | Expr::Length(_) => Growth::LINEAR,
        Expr::Unary { operand, .. } => size_of(operand),
        Expr::Binary { op, left, right } => match op {
            BinaryOperator::Add | BinaryOperator::Sub => size_of(left).plus(size_of(right)),
            BinaryOperator::Mul => size_of(left).times(size_of(right)),
            BinaryOperator::Div | BinaryOperator::IntDiv => size_of(left),
            BinaryOperator::Mod => size_of(right),
            BinaryOperator::Pow => power_size(left, right),
            _ => Growth::Unknown,
        },
        Expr::Call(call) => {
            let args: Vec<Growth> = call.args.iter().map(size_of).collect();
            let first = args.first().copied().unwrap_or(Growth::CONSTANT);
            match call.name.to_ascii_lowercase().as_str() {
                "log" | "lg" | "ln" | "log2" | "log10" => {
                    if first.is_constant() { Growth::CONSTANT } else { Growth::LOGARITHMIC }
                }
                "sqrt" => match first.as_poly() {
                    Some((degree, log_power)) => Growth::poly_log(degree / 2.0, log_power),
                    None => Growth::Unknown,
                },
                "floor" | "ceil" | "ceiling" | "abs" | "round" | "trunc" => first,
                "max" => args.iter().fold(Growth::CONSTANT, |acc, g| acc.max(*g)),
                "min" => args.iter().copied().reduce(Growth::min).unwrap_or(Growth::CONSTANT),
                _ => Growth::Unknown,
            }
        }
    }
}

fn power_size(base: &Expr, exponent: &Expr) -> Growth {
    match (base.number(), exponent.number()) {
        (Some(_), Some(_)) => Growth::CONSTANT,
        (Some(b), None) => Growth::exponential(b),
        (None, Some(k)) => match size_of(base).as_poly() {
            Some((degree, log_power)) => Growth::poly_log(degree * k, (log_power as f64 * k).round() as u32),
            None => Growth::Unknown,
        },
        (None, None) => Growth::Unknown,
    }
}

/// `for var ← start (to|downto) end (step s)?`
pub fn classify_for(start: &Expr, end: &Expr, step: Option<&Expr>) -> TripCount {
    if let Some(step) = step {
        if !size_of(step).is_constant() {
            return TripCount::indeterminate("non-constant step");
        }
        if step.number() == Some(0.0) {
            return TripCount::indeterminate("zero step");
        }
    }
    if offset_of(start, end).is_some() || offset_of(end, start).is_some() {
        return TripCount::new(Growth::CONSTANT, LoopRule::ConstantRange);
    }
    let growth = size_of(start).plus(size_of(end));
    let trip = if growth.is_unknown() {
        TripCount::indeterminate("unclassifiable bound")
    } else if growth.is_constant() {
        TripCount::new(growth, LoopRule::ConstantRange)
    } else {
        TripCount::new(growth, LoopRule::SymbolicRange)
    };
    trace!(growth = %trip.growth, rule = ?trip.rule, "classified for-loop");
    trip
}

/// `Some(c)` quando `to == from + c` para um literal `c`.
fn offset_of(from: &Expr, to: &Expr) -> Option<f64> {
    match to {
        Expr::Binary { op: BinaryOperator::Add, left, right } if **left == *from => right.number(),
        Expr::Binary { op: BinaryOperator::Sub, left, right } if **left == *from => right.number().map(|c| -c),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Update {
    Other,
    Multiplicative,
    Bisection,
    Additive,
}

/// `while (condição) do corpo` e `repeat corpo until (condição)`.
pub fn classify_guarded(condition: &Expr, body: &Block) -> TripCount {
    let guards = guard_variables(condition);
    if guards.is_empty() {
        return TripCount::indeterminate("guard has no variable");
    }
    let midpoints = midpoint_variables(body);

    let mut best: Option<(Update, String)> = None;
    visit_statements(body, &mut |stmt| {
        let Statement::Assignment { target: Expr::Identifier(var), value, .. } = stmt else {
            return;
        };
        if !guards.contains(var.as_str()) {
            return;
        }
        let update = classify_update(var, value, &midpoints);
        trace!(var = %var, ?update, "guard update");
        if update != Update::Other && best.as_ref().map_or(true, |(b, _)| update > *b) {
            best = Some((update, var.clone()));
        }
    });

    let trip = match best {
        Some((Update::Additive, var)) => {
            let bound = bound_size(condition, &var);
            let growth = if bound.is_constant() || bound.is_unknown() { Growth::LINEAR } else { bound };
            TripCount::new(growth, LoopRule::AdditiveGuard { var })
        }
        Some((Update::Multiplicative, var)) => TripCount::new(Growth::LOGARITHMIC, LoopRule::MultiplicativeGuard { var }),
        Some((Update::Bisection, var)) => TripCount::new(Growth::LOGARITHMIC, LoopRule::Bisection { var }),
        _ => {
            let mut names: Vec<&str> = guards.iter().copied().collect();
            names.sort_unstable();
            TripCount::indeterminate(format!("no recognizable update of {}", names.join(", ")))
        }
    };
    trace!(growth = %trip.growth, rule = ?trip.rule, "classified guarded loop");
    trip
}

fn guard_variables(condition: &Expr) -> HashSet<&str> {
    let mut vars = HashSet::new();
    condition.walk(&mut |e| {
        if let Expr::Identifier(name) = e {
            vars.insert(name.as_str());
        }
    });
    vars
}

/// Variáveis que recebem `(x + y) / 2` (ou `div 2`) em algum ponto do corpo.
pub(crate) fn midpoint_variables(body: &Block) -> HashSet<String> {
    let mut mids = HashSet::new();
    visit_statements(body, &mut |stmt| {
        if let Statement::Assignment { target: Expr::Identifier(var), value, .. } = stmt {
            if is_midpoint(value) {
                mids.insert(var.clone());
            }
        }
    });
    mids
}

pub(crate) fn is_midpoint(expr: &Expr) -> bool {
    match expr {
        Expr::Binary { op: BinaryOperator::Div | BinaryOperator::IntDiv, left, right } => {
            right.number() == Some(2.0) && matches!(**left, Expr::Binary { op: BinaryOperator::Add, .. })
        }
        Expr::Call(call) if matches!(call.name.to_ascii_lowercase().as_str(), "floor" | "ceil" | "ceiling") => {
            call.args.first().is_some_and(is_midpoint)
        }
        _ => false,
    }
}

fn classify_update(var: &str, value: &Expr, midpoints: &HashSet<String>) -> Update {
    let is_var = |e: &Expr| e.identifier() == Some(var);
    match value {
        Expr::Identifier(other) if midpoints.contains(other) => Update::Bisection,
        _ if is_midpoint(value) => Update::Bisection,
        Expr::Binary { op: BinaryOperator::Add | BinaryOperator::Sub, left, right } => {
            if is_var(left) && !right.mentions(var) || is_var(right) && !left.mentions(var) {
                Update::Additive
            } else if left.identifier().is_some_and(|m| midpoints.contains(m)) || is_midpoint(left) {
                Update::Bisection
            } else {
                Update::Other
            }
        }
        Expr::Binary { op: BinaryOperator::Mul, left, right } => {
            let factor = if is_var(left) { right } else if is_var(right) { left } else { return Update::Other };
            match factor.number() {
                Some(c) if c.abs() > 1.0 => Update::Multiplicative,
                Some(_) => Update::Other,
                None if !factor.mentions(var) => Update::Multiplicative,
                None => Update::Other,
            }
        }
        Expr::Binary { op: BinaryOperator::Div | BinaryOperator::IntDiv, left, right } if is_var(left) => {
            match right.number() {
                Some(c) if c.abs() > 1.0 => Update::Multiplicative,
                Some(_) => Update::Other,
                None if !right.mentions(var) => Update::Multiplicative,
                None => Update::Other,
            }
        }
        Expr::Call(call) if matches!(call.name.to_ascii_lowercase().as_str(), "floor" | "ceil" | "ceiling") => {
            call.args.first().map_or(Update::Other, |inner| classify_update(var, inner, midpoints))
        }
        _ => Update::Other,
    }
}

/// Tamanho daquilo com que a variável da guarda é comparada.
fn bound_size(condition: &Expr, var: &str) -> Growth {
    let mut size: Option<Growth> = None;
    condition.walk(&mut |e| {
        if let Expr::Binary { op, left, right } = e {
            if matches!(
                op,
                BinaryOperator::Lt | BinaryOperator::Lte | BinaryOperator::Gt | BinaryOperator::Gte | BinaryOperator::Neq | BinaryOperator::Eq
            ) {
                let other = if left.mentions(var) { right } else if right.mentions(var) { left } else { return };
                let s = size_of(other);
                size = Some(size.map_or(s, |acc| acc.max(s)));
            }
        }
    });
    size.unwrap_or(Growth::LINEAR)
}
