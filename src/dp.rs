// src/dp.rs
//! Padrões de tabulação e memoização.

use crate::ast::*;
use crate::complexity::Growth;
use crate::cost::contains_return;
use crate::loops::{self, size_of};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPattern {
    LoopFilled,
    MemoGuardedRecursive,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DpSignature {
    pub table: String,
    pub dimensions: usize,
    pub fill: FillPattern,
    pub index_variables: Vec<String>,
    /// Tamanho da tabela vezes o trabalho por célula.
    pub bound: Growth,
}

struct EnclosingLoop<'a> {
    var: &'a str,
    trip: Growth,
}

/// Escrita `T[i]` / `T[i][j]` dentro de laços `for` cujas variáveis indexam a
/// célula, com `T` declarada com dimensões ou lida pela própria recorrência.
/// `cell_work` dá o custo do lado direito da escrita.
pub fn detect_tabulation(function: &Function, cell_work: &mut dyn FnMut(&Expr) -> Growth) -> Option<DpSignature> {
    let declared: HashSet<&str> = function
        .declarations()
        .into_iter()
        .filter(|d| !d.shape.is_empty())
        .map(|d| d.name.as_str())
        .collect();

    let mut found: Option<DpSignature> = None;
    let mut stack = Vec::new();
    scan_tabulation(&function.body, &mut stack, &declared, cell_work, &mut found);
    if let Some(sig) = &found {
        debug!(function = %function.name, table = %sig.table, dims = sig.dimensions, bound = %sig.bound, "tabulation");
    }
    found
}

fn scan_tabulation<'a>(
    block: &'a Block,
    stack: &mut Vec<EnclosingLoop<'a>>,
    declared: &HashSet<&str>,
    cell_work: &mut dyn FnMut(&Expr) -> Growth,
    found: &mut Option<DpSignature>,
) {
    if block.hint.is_some() {
        return;
    }
    for stmt in &block.statements {
        match stmt {
            Statement::For { var, start, end, step, body, .. } => {
                let trip = loops::classify_for(start, end, step.as_ref()).growth;
                stack.push(EnclosingLoop { var: var.as_str(), trip });
                scan_tabulation(body, stack, declared, cell_work, found);
                stack.pop();
            }
            Statement::While { body, .. } | Statement::Repeat { body, .. } => {
                scan_tabulation(body, stack, declared, cell_work, found)
            }
            Statement::Block(inner) => scan_tabulation(inner, stack, declared, cell_work, found),
            Statement::If { then_block, else_block, .. } => {
                scan_tabulation(then_block, stack, declared, cell_work, found);
                if let Some(else_block) = else_block {
                    scan_tabulation(else_block, stack, declared, cell_work, found);
                }
            }
            Statement::Assignment { target: Expr::Index { base, indices }, value, .. } => {
                if !(1..=2).contains(&indices.len()) {
                    continue;
                }
                if !declared.contains(base.as_str()) && !value.mentions(base) {
                    continue;
                }
                let mut index_variables: Vec<String> = Vec::new();
                let mut trips = Growth::CONSTANT;
                let all_indexed = indices.iter().all(|index| {
                    let vars: Vec<&EnclosingLoop> = stack.iter().filter(|l| index.mentions(l.var)).collect();
                    for l in &vars {
                        if !index_variables.iter().any(|v| v == l.var) {
                            index_variables.push(l.var.to_string());
                            trips = trips.times(l.trip);
                        }
                    }
                    !vars.is_empty()
                });
                if !all_indexed {
                    continue;
                }
                let better = found.as_ref().map_or(true, |f| indices.len() > f.dimensions);
                if better {
                    *found = Some(DpSignature {
                        table: base.clone(),
                        dimensions: indices.len(),
                        fill: FillPattern::LoopFilled,
                        index_variables,
                        bound: trips.times(cell_work(value)),
                    });
                }
            }
            _ => {}
        }
    }
}

/// Corpo recursivo que retorna cedo quando `T[...]` já está preenchida e
/// escreve `T[...]` caso contrário. O limite é o número de entradas distintas
/// vezes `work`, o custo de uma ativação sem as chamadas recursivas.
pub fn detect_memoization(function: &Function, work: Growth) -> Option<DpSignature> {
    let mut writes: HashMap<&str, &[Expr]> = HashMap::new();
    visit_unhinted(&function.body, &mut |stmt| {
        if let Statement::Assignment { target: Expr::Index { base, indices }, .. } = stmt {
            writes.entry(base.as_str()).or_insert(indices.as_slice());
        }
    });
    if writes.is_empty() {
        return None;
    }

    let mut guarded: Option<&str> = None;
    visit_unhinted(&function.body, &mut |stmt| {
        let Statement::If { condition, then_block, .. } = stmt else {
            return;
        };
        if guarded.is_some() || !contains_return(then_block) {
            return;
        }
        condition.walk(&mut |e| {
            if let Expr::Index { base, .. } = e {
                if guarded.is_none() {
                    if let Some((name, _)) = writes.get_key_value(base.as_str()) {
                        guarded = Some(*name);
                    }
                }
            }
        });
    });

    let table = guarded?;
    let indices = writes.get(table).copied().unwrap_or_default();
    if !(1..=2).contains(&indices.len()) {
        return None;
    }

    let shape = function
        .declarations()
        .into_iter()
        .find(|d| d.name == table && d.shape.len() == indices.len())
        .map(|d| d.shape.clone());
    let entries = match &shape {
        Some(extents) => extents.iter().fold(Growth::CONSTANT, |acc, e| acc.times(size_of(e))),
        None => (0..indices.len()).fold(Growth::CONSTANT, |acc, _| acc.times(Growth::LINEAR)),
    };

    let mut index_variables: Vec<String> = Vec::new();
    for index in indices {
        index.walk(&mut |e| {
            if let Expr::Identifier(name) = e {
                if !index_variables.contains(name) {
                    index_variables.push(name.clone());
                }
            }
        });
    }

    let signature = DpSignature {
        table: table.to_string(),
        dimensions: indices.len(),
        fill: FillPattern::MemoGuardedRecursive,
        index_variables,
        bound: entries.times(work),
    };
    debug!(function = %function.name, table = %signature.table, bound = %signature.bound, "memoization");
    Some(signature)
}
