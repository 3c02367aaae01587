// src/cost.rs
//! Composição de custos de baixo para cima sobre o corpo de uma função.

use crate::ast::*;
use crate::complexity::{CostExpr, Growth};
use crate::config::AnalyzerConfig;
use crate::loops::{self, TripCount};
use crate::token::Span;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{trace, warn};

/// Construções reconhecidas mas não classificadas. Nunca abortam a
/// análise; a subárvore afetada sai como desconhecida ou com
/// confiança reduzida.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemanticWarning {
    pub function: String,
    pub kind: WarningKind,
    pub span: Span,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    IndeterminateLoop,
    UnresolvedShrink,
    MixedShrink,
}

impl fmt::Display for SemanticWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            WarningKind::IndeterminateLoop => "indeterminate loop",
            WarningKind::UnresolvedShrink => "unresolved recursion shrink",
            WarningKind::MixedShrink => "mixed recursion shrink",
        };
        write!(f, "{} in `{}` at {}: {}", kind, self.function, self.span, self.detail)
    }
}

/// Pior, melhor e justo custo de um nó da AST, cada um com seu registro de composição.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeCost {
    pub worst: CostExpr,
    pub best: CostExpr,
    pub tight: CostExpr,
}

impl NodeCost {
    pub fn constant() -> Self {
        Self::uniform(CostExpr::constant())
    }

    pub fn uniform(expr: CostExpr) -> Self {
        NodeCost { worst: expr.clone(), best: expr.clone(), tight: expr }
    }

    pub fn sequence(costs: impl IntoIterator<Item = NodeCost>) -> Self {
        let (mut worst, mut best, mut tight) = (Vec::new(), Vec::new(), Vec::new());
        for cost in costs {
            worst.push(cost.worst);
            best.push(cost.best);
            tight.push(cost.tight);
        }
        NodeCost { worst: CostExpr::sum(worst), best: CostExpr::sum(best), tight: CostExpr::sum(tight) }
    }

    /// `iterações × corpo` por caso; o caso justo segue as iterações do pior caso.
    pub fn repeated(self, worst_trip: Growth, best_trip: Growth) -> Self {
        NodeCost {
            worst: CostExpr::product([CostExpr::atom(worst_trip), self.worst]),
            best: CostExpr::product([CostExpr::atom(best_trip), self.best]),
            tight: CostExpr::product([CostExpr::atom(worst_trip), self.tight]),
        }
    }

    /// Pior caso fica com o ramo mais caro, melhor caso com o mais barato.
    pub fn branch(then_cost: NodeCost, else_cost: NodeCost) -> Self {
        let pick = |a: CostExpr, b: CostExpr, larger: bool| {
            let a_wins = if larger { a.collapse() >= b.collapse() } else { a.collapse() <= b.collapse() };
            if a_wins { a } else { b }
        };
        NodeCost {
            worst: pick(then_cost.worst, else_cost.worst, true),
            best: pick(then_cost.best, else_cost.best, false),
            tight: pick(then_cost.tight, else_cost.tight, true),
        }
    }

    pub fn collapse(&self) -> CostTrio {
        CostTrio { worst: self.worst.collapse(), best: self.best.collapse(), tight: self.tight.collapse() }
    }
}

/// Classes de pior/melhor/justo já colapsadas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostTrio {
    pub worst: Growth,
    pub best: Growth,
    pub tight: Growth,
}

impl CostTrio {
    pub fn uniform(growth: Growth) -> Self {
        CostTrio { worst: growth, best: growth, tight: growth }
    }
}

pub struct CostComposer<'a> {
    config: &'a AnalyzerConfig,
    function: &'a str,
    /// Custos de funções já analisadas (chamadas vêm antes).
    known: &'a HashMap<String, CostTrio>,
    /// Membros do componente recursivo atual; aqui suas chamadas contam como constantes.
    recursive: &'a HashSet<String>,
    /// Tabelas escritas pela função; presente quando guardas de tamanho seguem o ramo recursivo.
    size_guards: Option<HashSet<String>>,
    warnings: Vec<SemanticWarning>,
}

impl<'a> CostComposer<'a> {
    pub fn new(
        config: &'a AnalyzerConfig,
        function: &'a str,
        known: &'a HashMap<String, CostTrio>,
        recursive: &'a HashSet<String>,
    ) -> Self {
        CostComposer { config, function, known, recursive, size_guards: None, warnings: Vec::new() }
    }

    /// O melhor caso de um `if` guardado por tamanho segue o ramo que recorre, como
    /// fazem entradas grandes. Guardas que leem tabela fora de `written` seguem o ramo mais barato.
    pub fn with_size_guards(mut self, written: HashSet<String>) -> Self {
        self.size_guards = Some(written);
        self
    }

    pub fn into_warnings(self) -> Vec<SemanticWarning> {
        self.warnings
    }

    pub fn compose_block(&mut self, block: &Block) -> NodeCost {
        if let Some(hint) = block.hint {
            trace!(function = self.function, hint = %hint, "block cost fixed by hint");
            return NodeCost::uniform(CostExpr::atom(hint));
        }
        let costs: Vec<NodeCost> = block.statements.iter().map(|stmt| self.compose_statement(stmt)).collect();
        NodeCost::sequence(costs)
    }

    fn compose_statement(&mut self, stmt: &Statement) -> NodeCost {
        match stmt {
            Statement::Block(block) => self.compose_block(block),
            Statement::For { start, end, step, body, span, .. } => {
                let header = NodeCost::sequence([self.expr_cost(start), self.expr_cost(end)]);
                let trip = loops::classify_for(start, end, step.as_ref());
                self.loop_cost(header, trip, body, *span)
            }
            Statement::While { condition, body, span } | Statement::Repeat { body, condition, span } => {
                let header = self.expr_cost(condition);
                let trip = loops::classify_guarded(condition, body);
                self.loop_cost(header, trip, body, *span)
            }
            Statement::If { condition, then_block, else_block, .. } => {
                let guard = self.expr_cost(condition);
                let then_cost = self.compose_block(then_block);
                let else_cost = match else_block {
                    Some(block) => self.compose_block(block),
                    None => NodeCost::constant(),
                };
                let taken = self
                    .recursing_branch(condition, then_block, else_block.as_ref())
                    .map(|then| if then { then_cost.best.clone() } else { else_cost.best.clone() });
                let mut merged = NodeCost::branch(then_cost, else_cost);
                if let Some(best) = taken {
                    merged.best = best;
                }
                NodeCost::sequence([guard, merged])
            }
            Statement::Assignment { target, value, .. } => {
                NodeCost::sequence([self.expr_cost(target), self.expr_cost(value)])
            }
            Statement::Return { value, .. } => match value {
                Some(expr) => self.expr_cost(expr),
                None => NodeCost::constant(),
            },
            Statement::Call(call) => self.call_cost(call),
            Statement::Declaration(_) => NodeCost::constant(),
        }
    }

    fn loop_cost(&mut self, header: NodeCost, trip: TripCount, body: &Block, span: Span) -> NodeCost {
        if !trip.is_determinate() {
            let detail = match &trip.rule {
                loops::LoopRule::Indeterminate { reason } => reason.clone(),
                other => format!("{:?}", other),
            };
            warn!(function = self.function, %span, %detail, "indeterminate loop");
            self.warnings.push(SemanticWarning {
                function: self.function.to_string(),
                kind: WarningKind::IndeterminateLoop,
                span,
                detail,
            });
        }
        let best_trip = if self.config.early_exit && contains_return(body) { Growth::CONSTANT } else { trip.growth };
        let body_cost = NodeCost::sequence([header, self.compose_block(body)]);
        body_cost.repeated(trip.growth, best_trip)
    }

    /// `Some(true)` quando só o ramo `then` recorre, `Some(false)` quando só o `else` recorre.
    fn recursing_branch(&self, condition: &Expr, then_block: &Block, else_block: Option<&Block>) -> Option<bool> {
        let written = self.size_guards.as_ref()?;
        if reads_unwritten_table(condition, written) {
            return None;
        }
        let recurses =
            |block: &Block| collect_unhinted_calls(block).iter().any(|call| self.recursive.contains(&call.name));
        match (recurses(then_block), else_block.is_some_and(recurses)) {
            (true, false) => Some(true),
            (false, true) => Some(false),
            _ => None,
        }
    }

    /// Custo de avaliar uma expressão: constante, a menos que contenha chamadas.
    pub fn expr_cost(&mut self, expr: &Expr) -> NodeCost {
        match expr {
            Expr::Number(_) | Expr::Identifier(_) => NodeCost::constant(),
            Expr::Binary { left, right, .. } => NodeCost::sequence([self.expr_cost(left), self.expr_cost(right)]),
            Expr::Unary { operand, .. } => self.expr_cost(operand),
            Expr::Index { indices, .. } => {
                let costs: Vec<NodeCost> = indices.iter().map(|e| self.expr_cost(e)).collect();
                NodeCost::sequence(costs)
            }
            Expr::Field { base, .. } => self.expr_cost(base),
            Expr::Length(inner) => self.expr_cost(inner),
            Expr::Call(call) => self.call_cost(call),
        }
    }

    fn call_cost(&mut self, call: &CallExpr) -> NodeCost {
        let args: Vec<NodeCost> = call.args.iter().map(|e| self.expr_cost(e)).collect();
        let own = if self.recursive.contains(&call.name) {
            NodeCost::constant()
        } else if let Some(trio) = self.known.get(&call.name) {
            NodeCost {
                worst: CostExpr::atom(trio.worst),
                best: CostExpr::atom(trio.best),
                tight: CostExpr::atom(trio.tight),
            }
        } else {
            NodeCost::uniform(CostExpr::atom(self.config.subroutine_cost(&call.name).unwrap_or(Growth::CONSTANT)))
        };
        NodeCost::sequence(args.into_iter().chain(std::iter::once(own)))
    }
}

/// Verdadeiro quando um `return` é alcançável dentro do bloco.
pub fn contains_return(block: &Block) -> bool {
    let mut found = false;
    visit_statements(block, &mut |stmt| {
        if matches!(stmt, Statement::Return { .. }) {
            found = true;
        }
    });
    found
}

/// Tabelas em que a função escreve.
pub(crate) fn written_tables(function: &Function) -> HashSet<String> {
    let mut written = HashSet::new();
    visit_statements(&function.body, &mut |stmt| {
        if let Statement::Assignment { target: Expr::Index { base, .. }, .. } = stmt {
            written.insert(base.clone());
        }
    });
    written
}

/// Guarda que lê dados de entrada (tabela que a função nunca escreve) em vez
/// de comparar tamanhos.
pub(crate) fn reads_unwritten_table(condition: &Expr, written: &HashSet<String>) -> bool {
    let mut found = false;
    condition.walk(&mut |e| {
        if let Expr::Index { base, .. } = e {
            if !written.contains(base) {
                found = true;
            }
        }
    });
    found
}
