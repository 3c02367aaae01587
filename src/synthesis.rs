// src/synthesis.rs
//! Conduz a análise por função na ordem do grafo de chamadas e junta os
//! resultados na resposta do programa.

use crate::ast::{Function, Program};
use crate::complexity::Growth;
use crate::config::AnalyzerConfig;
use crate::cost::{written_tables, CostComposer, CostTrio, NodeCost, SemanticWarning};
use crate::dp::{self, DpSignature};
use crate::recursion::{self, CallGraph, Component, RecursionOutcome, SolveMethod};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Rótulos `O(..)`, `Ω(..)` e `Θ(..)` de um trio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Labels {
    pub worst: String,
    pub best: String,
    pub tight: String,
}

impl Labels {
    pub fn new(trio: &CostTrio) -> Self {
        Labels {
            worst: format!("O({})", trio.worst),
            best: format!("Ω({})", trio.best),
            tight: format!("Θ({})", trio.tight),
        }
    }
}

/// Resultados intermediários guardados por função.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionTrace {
    pub worst: Growth,
    pub best: Growth,
    pub tight: Growth,
    pub labels: Labels,
    /// Registro de composição do pior caso, antes de colapsar.
    pub formula: String,
    pub best_formula: String,
    pub recursive: bool,
    pub recurrence: Option<String>,
    pub method: Option<SolveMethod>,
    pub dp: Option<DpSignature>,
    pub hinted: bool,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub entry: String,
    pub worst: Growth,
    pub best: Growth,
    pub tight: Growth,
    pub labels: Labels,
    pub confidence: Confidence,
    pub warnings: Vec<SemanticWarning>,
    pub trace: BTreeMap<String, FunctionTrace>,
}

pub struct Synthesizer<'a> {
    program: &'a Program,
    config: &'a AnalyzerConfig,
    graph: CallGraph,
    known: HashMap<String, CostTrio>,
    traces: BTreeMap<String, FunctionTrace>,
    warnings: Vec<SemanticWarning>,
}

impl<'a> Synthesizer<'a> {
    pub fn new(program: &'a Program, config: &'a AnalyzerConfig) -> Self {
        Synthesizer {
            program,
            config,
            graph: CallGraph::build(program),
            known: HashMap::new(),
            traces: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Analisa todas as funções, chamadas primeiro, e reporta o custo da função de entrada.
    pub fn run(mut self) -> AnalysisResult {
        for component in self.graph.components() {
            self.analyze_component(&component);
        }

        let entry = select_entry(self.program, &self.graph, self.config);
        let trio = self.known.get(&entry).copied().unwrap_or(CostTrio::uniform(Growth::Unknown));
        let confidence = self
            .graph
            .reachable_from(&entry)
            .iter()
            .filter_map(|name| self.traces.get(name))
            .map(|t| t.confidence)
            .min()
            .unwrap_or(Confidence::High);

        let mut warnings = self.warnings;
        warnings.sort_by_key(|w| w.span.start);
        debug!(entry = %entry, worst = %trio.worst, best = %trio.best, ?confidence, "analysis finished");

        AnalysisResult {
            entry,
            worst: trio.worst,
            best: trio.best,
            tight: trio.tight,
            labels: Labels::new(&trio),
            confidence,
            warnings,
            trace: self.traces,
        }
    }

    /// Compõe o corpo de cada membro, resolve as recorrências do componente
    /// inteiro de uma vez e só então registra os resultados.
    fn analyze_component(&mut self, component: &Component) {
        let program = self.program;
        let members: HashSet<String> =
            if component.recursive { component.members.iter().cloned().collect() } else { HashSet::new() };
        let functions: Vec<&Function> = component.members.iter().filter_map(|name| program.function(name)).collect();
        let composed: Vec<ComposedBody> = functions.iter().map(|f| self.compose(f, &members)).collect();

        let outcomes: Vec<Option<RecursionOutcome>> = if component.recursive {
            let works: Vec<(&Function, CostTrio)> =
                functions.iter().zip(&composed).map(|(f, c)| (*f, c.body.collapse())).collect();
            recursion::analyze_component(&works, self.config).into_iter().map(Some).collect()
        } else {
            vec![None; functions.len()]
        };

        for ((function, body), outcome) in functions.into_iter().zip(composed).zip(outcomes) {
            self.record(function, body, outcome);
        }
    }

    fn compose(&self, function: &Function, members: &HashSet<String>) -> ComposedBody {
        let mut composer = CostComposer::new(self.config, &function.name, &self.known, members);
        if !members.is_empty() {
            composer = composer.with_size_guards(written_tables(function));
        }
        let body = composer.compose_block(&function.body);
        let tabulation = if members.is_empty() {
            dp::detect_tabulation(function, &mut |e| composer.expr_cost(e).worst.collapse())
        } else {
            None
        };
        ComposedBody { body, tabulation, warnings: composer.into_warnings() }
    }

    fn record(&mut self, function: &Function, composed: ComposedBody, outcome: Option<RecursionOutcome>) {
        let ComposedBody { body, tabulation, mut warnings } = composed;
        let recursive = outcome.is_some();
        let hinted = function.body.hint.is_some();
        let mut trio = body.collapse();
        let mut confidence = Confidence::High;
        let mut recurrence = None;
        let mut method = None;
        let mut signature = None;

        // Corpo anotado vale pela função inteira, recursão incluída.
        if let Some(outcome) = outcome.filter(|_| !hinted) {
            let mut worst = outcome.worst.growth;
            let mut best = outcome.best.growth;
            confidence = confidence.min(outcome.worst.confidence).min(outcome.best.confidence);
            if let Some(memo) = dp::detect_memoization(function, trio.worst) {
                worst = worst.min(memo.bound);
                best = best.min(memo.bound);
                signature = Some(memo);
            }
            trio = CostTrio { worst, best, tight: worst };
            recurrence = Some(outcome.recurrence.to_string());
            method = Some(outcome.worst.method);
            warnings.extend(outcome.warnings);
        } else if let Some(table) = tabulation.filter(|_| !hinted) {
            trio = CostTrio {
                worst: trio.worst.max(table.bound),
                best: trio.best.max(table.bound),
                tight: trio.tight.max(table.bound),
            };
            signature = Some(table);
        }

        if !warnings.is_empty() || trio.worst.is_unknown() {
            confidence = Confidence::Low;
        }
        debug!(function = %function.name, worst = %trio.worst, best = %trio.best, ?confidence, "analyzed function");

        self.traces.insert(
            function.name.clone(),
            FunctionTrace {
                worst: trio.worst,
                best: trio.best,
                tight: trio.tight,
                labels: Labels::new(&trio),
                formula: body.worst.to_string(),
                best_formula: body.best.to_string(),
                recursive,
                recurrence,
                method,
                dp: signature,
                hinted,
                confidence,
            },
        );
        self.known.insert(function.name.clone(), trio);
        self.warnings.extend(warnings);
    }
}

/// Custo do corpo antes da análise de recursão.
struct ComposedBody {
    body: NodeCost,
    tabulation: Option<DpSignature>,
    warnings: Vec<SemanticWarning>,
}

/// A entrada configurada, se o programa a define; senão `main`; senão a
/// primeira função que ninguém chama; senão a primeira função.
pub fn select_entry(program: &Program, graph: &CallGraph, config: &AnalyzerConfig) -> String {
    let configured = config.entry.as_deref().filter(|name| program.function(name).is_some());
    let chosen = configured
        .or_else(|| program.function("main").map(|f| f.name.as_str()))
        .or_else(|| program.functions.iter().find(|f| !graph.is_called(&f.name)).map(|f| f.name.as_str()))
        .or_else(|| program.functions.first().map(|f| f.name.as_str()));
    chosen.unwrap_or_default().to_string()
}
