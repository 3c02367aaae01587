// src/recursion.rs
//! Grafo de chamadas, extração e resolução de recorrências.

use crate::ast::*;
use crate::complexity::Growth;
use crate::config::AnalyzerConfig;
use crate::cost::{reads_unwritten_table, written_tables, CostTrio, SemanticWarning, WarningKind};
use crate::loops::{self, is_midpoint, midpoint_variables};
use crate::synthesis::Confidence;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use petgraph::Direction;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, trace, warn};

const EPSILON: f64 = 1e-9;
/// Laços literais com mais iterações que isso contam como dependentes da entrada.
const MAX_LITERAL_TRIPS: usize = 64;
/// Limite de chamadas ao substituir recursão mútua.
const MAX_FOLDED_SITES: usize = 256;

// ---------------------------------------------------------------------------
// Grafo de chamadas
// ---------------------------------------------------------------------------

/// Uma componente fortemente conexa do grafo de chamadas.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// Nomes dos membros na ordem de declaração.
    pub members: Vec<String>,
    pub recursive: bool,
}

pub struct CallGraph {
    graph: DiGraph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
}

impl CallGraph {
    /// Arestas vão de quem chama para quem é chamado. Chamadas a nomes não
    /// definidos ficam de fora; o custo delas vem da tabela de sub-rotinas.
    pub fn build(program: &Program) -> Self {
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();
        for function in &program.functions {
            let idx = graph.add_node(function.name.clone());
            nodes.insert(function.name.clone(), idx);
        }
        for function in &program.functions {
            let from = nodes[&function.name];
            for call in collect_calls(&function.body) {
                if let Some(&to) = nodes.get(&call.name) {
                    if !graph.contains_edge(from, to) {
                        graph.add_edge(from, to, ());
                    }
                }
            }
        }
        CallGraph { graph, nodes }
    }

    /// Componentes em pós-ordem: quem é chamado vem antes de quem chama.
    pub fn components(&self) -> Vec<Component> {
        tarjan_scc(&self.graph)
            .into_iter()
            .map(|mut scc| {
                scc.sort();
                let recursive = scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]);
                Component { members: scc.iter().map(|idx| self.graph[*idx].clone()).collect(), recursive }
            })
            .collect()
    }

    pub fn calls(&self, caller: &str, callee: &str) -> bool {
        match (self.nodes.get(caller), self.nodes.get(callee)) {
            (Some(&a), Some(&b)) => self.graph.contains_edge(a, b),
            _ => false,
        }
    }

    /// Verdadeiro quando outra função chama `name`.
    pub fn is_called(&self, name: &str) -> bool {
        self.nodes.get(name).is_some_and(|&idx| {
            self.graph.neighbors_directed(idx, Direction::Incoming).any(|caller| caller != idx)
        })
    }

    /// `name` e todas as funções alcançáveis a partir dela.
    pub fn reachable_from(&self, name: &str) -> Vec<String> {
        let Some(&start) = self.nodes.get(name) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(idx) = dfs.next(&self.graph) {
            out.push(self.graph[idx].clone());
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Extração de recorrências
// ---------------------------------------------------------------------------

/// Como o argumento de uma chamada recursiva se relaciona com a entrada de quem chama.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "shape", content = "by", rename_all = "snake_case")]
pub enum Shrink {
    Divide(f64),
    Decrease(f64),
    Irregular,
}

impl fmt::Display for Shrink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shrink::Divide(c) => write!(f, "n/{}", trim_number(*c)),
            Shrink::Decrease(c) => write!(f, "n-{}", trim_number(*c)),
            Shrink::Irregular => write!(f, "?"),
        }
    }
}

impl Shrink {
    /// Encolhimento de uma chamada feita com o argumento já encolhido por `self`.
    fn then(self, next: Shrink) -> Shrink {
        match (self, next) {
            (Shrink::Decrease(a), Shrink::Decrease(b)) => Shrink::Decrease(a + b),
            (Shrink::Divide(a), Shrink::Divide(b)) => Shrink::Divide(a * b),
            // n/2 - 1 e n/2 pertencem à mesma classe
            (Shrink::Divide(c), Shrink::Decrease(_)) | (Shrink::Decrease(_), Shrink::Divide(c)) => Shrink::Divide(c),
            _ => Shrink::Irregular,
        }
    }
}

fn trim_number(value: f64) -> String {
    if (value - value.round()).abs() < EPSILON {
        format!("{}", value.round() as i64)
    } else {
        format!("{:.2}", value)
    }
}

/// `T(n) = Σ T(shrink_i(n)) + f(n)` para o pior e o melhor caso.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recurrence {
    pub shrinks: Vec<Shrink>,
    pub best_shrinks: Vec<Shrink>,
    /// Há chamada recursiva dentro de um laço cujas iterações crescem com a entrada.
    pub loop_scaled: bool,
    pub work: Growth,
    pub best_work: Growth,
}

impl Recurrence {
    /// Número de chamadas recursivas por ativação, `a`.
    pub fn calls(&self) -> usize {
        self.shrinks.len()
    }

    fn render(shrinks: &[Shrink], loop_scaled: bool, work: Growth) -> String {
        let mut terms: Vec<(Shrink, usize)> = Vec::new();
        for shrink in shrinks {
            match terms.iter_mut().find(|(s, _)| s == shrink) {
                Some((_, count)) => *count += 1,
                None => terms.push((*shrink, 1)),
            }
        }
        let scale = if loop_scaled { "n·" } else { "" };
        let mut parts: Vec<String> = terms
            .iter()
            .map(|(shrink, count)| match count {
                1 => format!("{}T({})", scale, shrink),
                k => format!("{}{}T({})", scale, k, shrink),
            })
            .collect();
        parts.push(work.to_string());
        format!("T(n) = {}", parts.join(" + "))
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Recurrence::render(&self.shrinks, self.loop_scaled, self.work))
    }
}

/// Uma chamada recursiva: o membro chamado (posição no componente) e o encolhimento do argumento.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Site {
    callee: usize,
    shrink: Shrink,
}

/// Chamadas recursivas alcançáveis pelos caminhos de um comando.
#[derive(Debug, Clone, Default)]
struct SiteCount {
    /// Caminho mais caro, ignorando saídas.
    worst: Vec<Site>,
    /// Caminho mais barato que segue para o próximo comando.
    fall_best: Option<Vec<Site>>,
    /// Caminho mais barato que sai da função por um `return`.
    exit_best: Option<Vec<Site>>,
    loop_scaled: bool,
}

impl SiteCount {
    fn straight(sites: Vec<Site>) -> Self {
        SiteCount { worst: sites.clone(), fall_best: Some(sites), exit_best: None, loop_scaled: false }
    }

    fn exit(sites: Vec<Site>) -> Self {
        SiteCount { worst: sites.clone(), fall_best: None, exit_best: Some(sites), loop_scaled: false }
    }

    fn then(self, next: SiteCount) -> Self {
        let mut worst = self.worst;
        worst.extend(next.worst);
        let prefix = self.fall_best;
        let reached_exit = match (&prefix, next.exit_best) {
            (Some(p), Some(e)) => Some(concat(p, &e)),
            _ => None,
        };
        SiteCount {
            worst,
            fall_best: match (&prefix, next.fall_best) {
                (Some(p), Some(f)) => Some(concat(p, &f)),
                _ => None,
            },
            exit_best: shorter(self.exit_best, reached_exit),
            loop_scaled: self.loop_scaled || next.loop_scaled,
        }
    }

    fn repeated(self, trips: usize) -> Self {
        let times = |sites: &[Site]| -> Vec<Site> {
            std::iter::repeat(sites).take(trips).flatten().copied().collect()
        };
        SiteCount {
            worst: times(&self.worst),
            fall_best: self.fall_best.as_deref().map(times),
            exit_best: self.exit_best,
            loop_scaled: self.loop_scaled,
        }
    }

    fn best(&self) -> Vec<Site> {
        shorter(self.fall_best.clone(), self.exit_best.clone()).unwrap_or_default()
    }
}

fn concat(a: &[Site], b: &[Site]) -> Vec<Site> {
    a.iter().chain(b).copied().collect()
}

fn shorter(a: Option<Vec<Site>>, b: Option<Vec<Site>>) -> Option<Vec<Site>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if b.len() < a.len() { b } else { a }),
        (a, None) => a,
        (None, b) => b,
    }
}

struct SiteCounter<'a> {
    /// Membros do componente, na ordem usada por `Site::callee`.
    members: &'a [String],
    params: &'a [String],
    midpoints: HashSet<String>,
    /// Tabelas escritas pela função; lê-las não torna a guarda dependente de dados.
    written: HashSet<String>,
    spans: Vec<(Shrink, crate::token::Span)>,
}

impl<'a> SiteCounter<'a> {
    fn block(&mut self, block: &Block) -> SiteCount {
        if block.hint.is_some() {
            return SiteCount::straight(Vec::new());
        }
        let mut acc = SiteCount::straight(Vec::new());
        for stmt in &block.statements {
            acc = acc.then(self.statement(stmt));
            if acc.fall_best.is_none() {
                break;
            }
        }
        acc
    }

    fn statement(&mut self, stmt: &Statement) -> SiteCount {
        match stmt {
            Statement::Block(block) => self.block(block),
            Statement::For { start, end, step, body, .. } => {
                let header = SiteCount::straight(self.sites_in(&[start, end]));
                let inner = self.block(body);
                let trip = loops::classify_for(start, end, step.as_ref());
                header.then(self.looped(inner, trip.growth, literal_trips(start, end, step.as_ref())))
            }
            Statement::While { condition, body, .. } | Statement::Repeat { body, condition, .. } => {
                let header = SiteCount::straight(self.sites_in(&[condition]));
                let inner = self.block(body);
                let trip = loops::classify_guarded(condition, body);
                header.then(self.looped(inner, trip.growth, None))
            }
            Statement::If { condition, then_block, else_block, .. } => {
                let guard = SiteCount::straight(self.sites_in(&[condition]));
                let then_count = self.block(then_block);
                let else_count = match else_block {
                    Some(block) => self.block(block),
                    None => SiteCount::straight(Vec::new()),
                };
                let branches = if self.is_data_dependent(condition) {
                    either(then_count, else_count)
                } else {
                    dominant(then_count, else_count)
                };
                guard.then(branches)
            }
            Statement::Return { value, .. } => {
                let sites = value.as_ref().map(|v| self.sites_in(&[v])).unwrap_or_default();
                SiteCount::exit(sites)
            }
            Statement::Call(call) => {
                let args: Vec<&Expr> = call.args.iter().collect();
                let mut sites = self.sites_in(&args);
                if let Some(callee) = member_index(self.members, &call.name) {
                    let shrink = site_shrink(call, self.params, &self.midpoints);
                    self.spans.push((shrink, call.span));
                    sites.push(Site { callee, shrink });
                }
                SiteCount::straight(sites)
            }
            other => SiteCount::straight(self.sites_in(&statement_exprs(other))),
        }
    }

    fn looped(&mut self, inner: SiteCount, trip: Growth, literal: Option<usize>) -> SiteCount {
        if inner.worst.is_empty() {
            return inner;
        }
        match literal {
            Some(k) if trip.is_constant() => inner.repeated(k),
            _ if trip.is_constant() => inner,
            _ => SiteCount { loop_scaled: true, ..inner },
        }
    }

    /// Chamadas recursivas dentro das expressões dadas.
    fn sites_in(&mut self, exprs: &[&Expr]) -> Vec<Site> {
        let mut sites = Vec::new();
        for expr in exprs {
            expr.walk(&mut |e| {
                if let Expr::Call(call) = e {
                    if let Some(callee) = member_index(self.members, &call.name) {
                        let shrink = site_shrink(call, self.params, &self.midpoints);
                        self.spans.push((shrink, call.span));
                        sites.push(Site { callee, shrink });
                    }
                }
            });
        }
        sites
    }

    fn is_data_dependent(&self, condition: &Expr) -> bool {
        reads_unwritten_table(condition, &self.written)
    }
}

fn member_index(members: &[String], name: &str) -> Option<usize> {
    members.iter().position(|m| m == name)
}

/// Junção de ramos para guardas dependentes de dados: pior caso no caminho mais longo, melhor no mais curto.
fn either(a: SiteCount, b: SiteCount) -> SiteCount {
    let worst = if b.worst.len() > a.worst.len() { b.worst } else { a.worst };
    SiteCount {
        worst,
        fall_best: shorter(a.fall_best, b.fall_best),
        exit_best: shorter(a.exit_best, b.exit_best),
        loop_scaled: a.loop_scaled || b.loop_scaled,
    }
}

/// Junção de ramos para guardas de tamanho como `n <= 1`: para entradas grandes
/// o ramo com as chamadas recursivas é o executado.
fn dominant(a: SiteCount, b: SiteCount) -> SiteCount {
    let a_wins = match a.worst.len().cmp(&b.worst.len()) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => a.fall_best.is_some() || b.fall_best.is_none(),
    };
    let loop_scaled = a.loop_scaled || b.loop_scaled;
    let chosen = if a_wins { a } else { b };
    SiteCount { loop_scaled, ..chosen }
}

fn literal_trips(start: &Expr, end: &Expr, step: Option<&Expr>) -> Option<usize> {
    let step = step.map_or(Some(1.0), Expr::number)?.abs();
    if step < EPSILON {
        return None;
    }
    let span = match (start.number(), end.number()) {
        (Some(a), Some(b)) => (b - a).abs(),
        _ => return None,
    };
    let trips = (span / step).floor() as usize + 1;
    Some(trips.min(MAX_LITERAL_TRIPS))
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ArgShrink {
    Unchanged,
    Constant,
    Divide(f64),
    Decrease(f64),
    Irregular,
}

fn arg_shrink(arg: &Expr, params: &[String], midpoints: &HashSet<String>) -> ArgShrink {
    let is_param = |e: &Expr| e.identifier().is_some_and(|id| params.iter().any(|p| p == id));
    let is_mid = |e: &Expr| e.identifier().is_some_and(|id| midpoints.contains(id)) || is_midpoint(e);

    if arg.number().is_some() {
        return ArgShrink::Constant;
    }
    if is_param(arg) {
        return ArgShrink::Unchanged;
    }
    if is_mid(arg) {
        return ArgShrink::Divide(2.0);
    }
    match arg {
        Expr::Binary { op: BinaryOperator::Div | BinaryOperator::IntDiv, left, right } if is_param(left) => {
            match right.number() {
                Some(c) if c > 1.0 => ArgShrink::Divide(c),
                _ => ArgShrink::Irregular,
            }
        }
        Expr::Binary { op: BinaryOperator::Sub, left, right } if is_param(left) => match right.number() {
            Some(c) if c > 0.0 => ArgShrink::Decrease(c),
            _ => ArgShrink::Irregular,
        },
        // Índice avançando até o limite.
        Expr::Binary { op: BinaryOperator::Add, left, right } if is_param(left) || is_param(right) => {
            match right.number().or_else(|| left.number()) {
                Some(c) if c > 0.0 => ArgShrink::Decrease(c),
                _ => ArgShrink::Irregular,
            }
        }
        Expr::Binary { op: BinaryOperator::Add | BinaryOperator::Sub, left, right } if is_mid(left) => {
            if right.number().is_some() { ArgShrink::Divide(2.0) } else { ArgShrink::Irregular }
        }
        Expr::Call(call) if matches!(call.name.to_ascii_lowercase().as_str(), "floor" | "ceil" | "ceiling") => {
            call.args.first().map_or(ArgShrink::Irregular, |inner| arg_shrink(inner, params, midpoints))
        }
        _ => ArgShrink::Irregular,
    }
}

/// Divide vence Decrease, que vence Irregular; argumentos que só repassam
/// dados não contam.
fn site_shrink(call: &CallExpr, params: &[String], midpoints: &HashSet<String>) -> Shrink {
    let shapes: Vec<ArgShrink> = call.args.iter().map(|a| arg_shrink(a, params, midpoints)).collect();
    if let Some(c) = shapes.iter().find_map(|s| match s {
        ArgShrink::Divide(c) => Some(*c),
        _ => None,
    }) {
        return Shrink::Divide(c);
    }
    let decrease = shapes
        .iter()
        .filter_map(|s| match s {
            ArgShrink::Decrease(c) => Some(*c),
            _ => None,
        })
        .fold(None, |acc: Option<f64>, c| Some(acc.map_or(c, |m| m.min(c))));
    match decrease {
        Some(c) => Shrink::Decrease(c),
        None => Shrink::Irregular,
    }
}

// ---------------------------------------------------------------------------
// Resolução
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveMethod {
    /// Todo caminho chega a um caso base sem recorrer.
    NoRecursiveCall,
    MasterCase1,
    MasterCase2,
    MasterCase3,
    /// Uma chamada `n - c` por ativação.
    LinearRecursion,
    /// Várias chamadas `n - c_i`; a base é a raiz característica dominante.
    MultipleRecursion,
    /// Chamadas recursivas repetidas por um laço do tamanho da entrada.
    LoopScaledBranching,
    Heuristic,
    /// Melhor caso limitado pela profundidade da recursão sob uma guarda de poda.
    Pruning,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Solution {
    pub growth: Growth,
    pub method: SolveMethod,
    pub confidence: Confidence,
}

impl Solution {
    fn exact(growth: Growth, method: SolveMethod) -> Self {
        Solution { growth, method, confidence: Confidence::High }
    }
}

/// Por que a recorrência foi para o estimador heurístico.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fallback {
    Irregular,
    Mixed,
    /// Ciclo entre membros que a substituição não fecha.
    Unfolded,
}

/// Solução fechada quando existe; senão, a estimativa numérica.
pub fn solve(shrinks: &[Shrink], loop_scaled: bool, work: Growth, sizes: &[u64]) -> Solution {
    solve_with_reason(shrinks, loop_scaled, work, sizes, false).0
}

fn solve_with_reason(
    shrinks: &[Shrink],
    loop_scaled: bool,
    work: Growth,
    sizes: &[u64],
    best_case: bool,
) -> (Solution, Option<Fallback>) {
    if shrinks.is_empty() {
        return (Solution::exact(work, SolveMethod::NoRecursiveCall), None);
    }
    if work.is_unknown() {
        return (Solution { growth: Growth::Unknown, method: SolveMethod::Heuristic, confidence: Confidence::Low }, None);
    }

    let all_decrease = shrinks.iter().all(|s| matches!(s, Shrink::Decrease(_)));
    let divisors: Vec<f64> = shrinks
        .iter()
        .filter_map(|s| match s {
            Shrink::Divide(c) => Some(*c),
            _ => None,
        })
        .collect();
    let uniform_divide = divisors.len() == shrinks.len() && divisors.iter().all(|c| (c - divisors[0]).abs() < EPSILON);

    if loop_scaled && all_decrease {
        return (Solution::exact(Growth::Factorial, SolveMethod::LoopScaledBranching), None);
    }
    if !loop_scaled && uniform_divide {
        return (master_theorem(shrinks.len(), divisors[0], work), None);
    }
    if !loop_scaled && all_decrease {
        return (decrease_rule(shrinks, work), None);
    }

    let reason = if shrinks.iter().any(|s| matches!(s, Shrink::Irregular)) { Fallback::Irregular } else { Fallback::Mixed };
    let growth = estimate(shrinks, loop_scaled, work, sizes, best_case);
    trace!(?reason, growth = %growth, "heuristic recurrence estimate");
    (Solution { growth, method: SolveMethod::Heuristic, confidence: Confidence::Low }, Some(reason))
}

/// `T(n) = a T(n/b) + f(n)`.
fn master_theorem(a: usize, b: f64, work: Growth) -> Solution {
    let critical = (a as f64).ln() / b.ln();
    let Some((degree, log_power)) = work.as_poly() else {
        return Solution::exact(work, SolveMethod::MasterCase3);
    };
    let solution = if (degree - critical).abs() < EPSILON {
        Solution::exact(Growth::poly_log(critical, log_power + 1), SolveMethod::MasterCase2)
    } else if degree < critical {
        Solution::exact(Growth::polynomial(critical), SolveMethod::MasterCase1)
    } else {
        Solution::exact(work, SolveMethod::MasterCase3)
    };
    trace!(a, b, critical, method = ?solution.method, growth = %solution.growth, "master theorem");
    solution
}

/// `T(n) = Σ T(n - c_i) + f(n)`.
fn decrease_rule(shrinks: &[Shrink], work: Growth) -> Solution {
    if shrinks.len() == 1 {
        return Solution::exact(Growth::LINEAR.times(work), SolveMethod::LinearRecursion);
    }
    let steps: Vec<f64> = shrinks
        .iter()
        .filter_map(|s| match s {
            Shrink::Decrease(c) => Some(*c),
            _ => None,
        })
        .collect();
    let base = characteristic_root(&steps);
    let rounded = (base * 1000.0).round() / 1000.0;
    Solution::exact(Growth::exponential(rounded).times(work), SolveMethod::MultipleRecursion)
}

/// Raiz dominante de `x^cmax = Σ x^(cmax - c_i)`, isto é, o `x > 1` com `Σ x^(-c_i) = 1`.
fn characteristic_root(steps: &[f64]) -> f64 {
    let g = |x: f64| steps.iter().map(|c| x.powf(-c)).sum::<f64>() - 1.0;
    let (mut lo, mut hi) = (1.0_f64, steps.len() as f64);
    for _ in 0..200 {
        let mid = (lo + hi) / 2.0;
        if g(mid) > 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    (lo + hi) / 2.0
}

/// Avalia a recorrência de baixo para cima em escala log e escolhe a classe cuja
/// curva melhor se ajusta às amostras (mínimos quadrados nos logs, fator constante livre).
fn estimate(shrinks: &[Shrink], loop_scaled: bool, work: Growth, sizes: &[u64], best_case: bool) -> Growth {
    match work {
        Growth::Unknown => return Growth::Unknown,
        Growth::Factorial => return Growth::Factorial,
        _ => {}
    }
    let Some(&largest) = sizes.iter().max() else {
        return Growth::Unknown;
    };
    let largest = largest as usize;
    let irregular = shrinks.iter().filter(|s| matches!(s, Shrink::Irregular)).count();

    let mut ln_t = vec![0.0_f64; largest + 1];
    for n in 2..=largest {
        let mut terms = vec![ln_growth(work, n as f64)];
        let mut irregular_seen = 0;
        for shrink in shrinks {
            let child = match shrink {
                Shrink::Divide(c) => ((n as f64) / c).floor() as usize,
                Shrink::Decrease(c) => n.saturating_sub(c.round().max(1.0) as usize),
                Shrink::Irregular if best_case => n / irregular.max(1),
                Shrink::Irregular => {
                    irregular_seen += 1;
                    if irregular_seen == 1 { n - 1 } else { 0 }
                }
            };
            let scale = if loop_scaled { (n as f64).ln() } else { 0.0 };
            terms.push(ln_t[child.min(n - 1)] + scale);
        }
        ln_t[n] = log_sum_exp(&terms);
    }

    let samples: Vec<(f64, f64)> = sizes.iter().map(|&s| (s as f64, ln_t[s as usize])).collect();
    best_fit(&samples)
}

fn ln_growth(growth: Growth, n: f64) -> f64 {
    match growth {
        Growth::Polynomial { degree, log_power } => degree * n.ln() + log_power as f64 * n.log2().max(1.0).ln(),
        Growth::Exponential { base } => n * base.ln(),
        Growth::Factorial => ln_factorial(n),
        Growth::Unknown => f64::NAN,
    }
}

/// Aproximação de Stirling para `ln n!`.
fn ln_factorial(n: f64) -> f64 {
    if n < 2.0 {
        0.0
    } else {
        n * n.ln() - n + 0.5 * (2.0 * std::f64::consts::PI * n).ln()
    }
}

fn log_sum_exp(terms: &[f64]) -> f64 {
    let max = terms.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + terms.iter().map(|t| (t - max).exp()).sum::<f64>().ln()
}

fn best_fit(samples: &[(f64, f64)]) -> Growth {
    let mut candidates: Vec<Growth> = Vec::new();
    for degree in [0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 4.0] {
        for log_power in 0..=2 {
            candidates.push(Growth::poly_log(degree, log_power));
        }
    }
    if let [.., (s1, y1), (s2, y2)] = samples {
        let slope = (y2 - y1) / (s2 - s1);
        if slope > 1.05_f64.ln() {
            candidates.push(Growth::exponential((slope.exp() * 1000.0).round() / 1000.0));
        }
    }
    candidates.push(Growth::Factorial);

    let mut best: Option<(f64, Growth)> = None;
    for candidate in candidates {
        let residuals: Vec<f64> = samples.iter().map(|(s, y)| y - ln_growth(candidate, *s)).collect();
        let mean = residuals.iter().sum::<f64>() / residuals.len() as f64;
        let score: f64 = residuals.iter().map(|r| (r - mean).powi(2)).sum();
        if !score.is_finite() {
            continue;
        }
        let better = match best {
            None => true,
            Some((current, _)) => score < current - EPSILON,
        };
        if better {
            best = Some((score, candidate));
        }
    }
    best.map_or(Growth::Unknown, |(_, g)| g)
}

// ---------------------------------------------------------------------------
// Análise por componente
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RecursionOutcome {
    pub recurrence: Recurrence,
    pub worst: Solution,
    pub best: Solution,
    pub pruned: bool,
    pub warnings: Vec<SemanticWarning>,
}

/// Chamadas de um membro antes da substituição pelos demais membros.
struct MemberSites {
    count: SiteCount,
    spans: Vec<(Shrink, crate::token::Span)>,
    work: CostTrio,
}

/// Recorrência de um membro depois de substituir as chamadas aos outros membros.
struct Folded {
    shrinks: Vec<Shrink>,
    work: Growth,
    loop_scaled: bool,
    /// Toda chamada restante volta ao próprio membro.
    complete: bool,
}

/// Substitui cada chamada a outro membro pelas chamadas que ele faz, compondo
/// os encolhimentos, até restarem só chamadas a `own`. Ciclos que não passam
/// por `own` deixam o resultado incompleto.
fn fold(own: usize, sites: &[Site], table: &[MemberSites], best_case: bool) -> Folded {
    let peer_sites = |m: &MemberSites| if best_case { m.count.best() } else { m.count.worst.clone() };
    let peer_work = |m: &MemberSites| if best_case { m.work.best } else { m.work.worst };

    let mut current = sites.to_vec();
    let mut work = peer_work(&table[own]);
    let mut loop_scaled = table[own].count.loop_scaled;
    for _ in 0..table.len() {
        if current.iter().all(|s| s.callee == own) {
            break;
        }
        let mut next = Vec::new();
        for site in current {
            if site.callee == own {
                next.push(site);
                continue;
            }
            let peer = &table[site.callee];
            work = work.plus(peer_work(peer));
            loop_scaled |= peer.count.loop_scaled;
            next.extend(
                peer_sites(peer).into_iter().map(|s| Site { callee: s.callee, shrink: site.shrink.then(s.shrink) }),
            );
        }
        if next.len() > MAX_FOLDED_SITES {
            return Folded { shrinks: next.iter().map(|s| s.shrink).collect(), work, loop_scaled, complete: false };
        }
        current = next;
    }
    let complete = current.iter().all(|s| s.callee == own);
    Folded { shrinks: current.iter().map(|s| s.shrink).collect(), work, loop_scaled, complete }
}

/// Extrai e resolve a recorrência de cada membro de um componente recursivo.
/// `functions` traz cada membro com o custo do corpo em que as chamadas
/// recursivas contam como constantes. Os resultados saem na mesma ordem.
pub fn analyze_component(functions: &[(&Function, CostTrio)], config: &AnalyzerConfig) -> Vec<RecursionOutcome> {
    let members: Vec<String> = functions.iter().map(|(f, _)| f.name.clone()).collect();
    let table: Vec<MemberSites> = functions
        .iter()
        .map(|(function, work)| {
            let mut counter = SiteCounter {
                members: &members,
                params: &function.params,
                midpoints: midpoint_variables(&function.body),
                written: written_tables(function),
                spans: Vec::new(),
            };
            let count = counter.block(&function.body);
            MemberSites { count, spans: counter.spans, work: *work }
        })
        .collect();

    functions
        .iter()
        .enumerate()
        .map(|(own, (function, _))| solve_member(function, own, &table, config))
        .collect()
}

fn solve_member(function: &Function, own: usize, table: &[MemberSites], config: &AnalyzerConfig) -> RecursionOutcome {
    let entry = &table[own];
    let worst_fold = fold(own, &entry.count.worst, table, false);
    let best_fold = fold(own, &entry.count.best(), table, true);
    let recurrence = Recurrence {
        shrinks: worst_fold.shrinks,
        best_shrinks: best_fold.shrinks,
        loop_scaled: worst_fold.loop_scaled,
        work: worst_fold.work,
        best_work: best_fold.work,
    };
    debug!(function = %function.name, recurrence = %recurrence, folded = worst_fold.complete, "extracted recurrence");

    let sizes = &config.heuristic_sizes;
    let (worst, fallback) = if worst_fold.complete {
        solve_with_reason(&recurrence.shrinks, recurrence.loop_scaled, recurrence.work, sizes, false)
    } else {
        let growth = estimate(&recurrence.shrinks, recurrence.loop_scaled, recurrence.work, sizes, false);
        (Solution { growth, method: SolveMethod::Heuristic, confidence: Confidence::Low }, Some(Fallback::Unfolded))
    };
    let (mut best, _) = if best_fold.complete {
        solve_with_reason(&recurrence.best_shrinks, best_fold.loop_scaled, recurrence.best_work, sizes, true)
    } else {
        let growth = estimate(&recurrence.best_shrinks, best_fold.loop_scaled, recurrence.best_work, sizes, true);
        (Solution { growth, method: SolveMethod::Heuristic, confidence: Confidence::Low }, Some(Fallback::Unfolded))
    };

    let mut warnings = Vec::new();
    if let Some(reason) = fallback {
        let (kind, detail) = match reason {
            Fallback::Irregular => (WarningKind::UnresolvedShrink, "argument shrink not recognized; estimated numerically"),
            Fallback::Mixed => (WarningKind::MixedShrink, "call sites do not share one shrink shape; estimated numerically"),
            Fallback::Unfolded => {
                (WarningKind::UnresolvedShrink, "mutual recursion does not reduce to one recurrence; estimated numerically")
            }
        };
        let span = entry
            .spans
            .iter()
            .find(|(s, _)| reason != Fallback::Irregular || matches!(s, Shrink::Irregular))
            .map_or(function.span, |(_, span)| *span);
        warn!(function = %function.name, %span, detail, "recurrence fallback");
        warnings.push(SemanticWarning { function: function.name.clone(), kind, span, detail: detail.to_string() });
    }

    let pruned = has_pruning_guard(function, config);
    if pruned {
        let depth = if recurrence.shrinks.iter().any(|s| matches!(s, Shrink::Divide(_))) {
            Growth::LOGARITHMIC
        } else {
            Growth::LINEAR
        };
        best = Solution { growth: depth.times(recurrence.best_work), method: SolveMethod::Pruning, confidence: Confidence::Medium };
    }
    if best.growth > worst.growth {
        best.growth = worst.growth;
    }
    trace!(function = %function.name, worst = %worst.growth, best = %best.growth, pruned, "solved recurrence");

    RecursionOutcome { recurrence, worst, best, pruned, warnings }
}

/// Um `if` cujo ramo é um `return` solto e cuja condição cita uma palavra de limite.
pub fn has_pruning_guard(function: &Function, config: &AnalyzerConfig) -> bool {
    let mut found = false;
    visit_statements(&function.body, &mut |stmt| {
        let Statement::If { condition, then_block, .. } = stmt else {
            return;
        };
        let bare_return = matches!(then_block.statements.as_slice(), [Statement::Return { value: None, .. }]);
        if !bare_return {
            return;
        }
        condition.walk(&mut |e| match e {
            Expr::Identifier(name) if config.is_bound_keyword(name) => found = true,
            Expr::Field { field, .. } if config.is_bound_keyword(field) => found = true,
            _ => {}
        });
    });
    found
}
