// src/complexity.rs
//! Vocabulário de taxas de crescimento usado pelo lexer (literais de anotação),
//! pelo compositor de custos e pelos resolvedores de recorrência.

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

const EPSILON: f64 = 1e-9;

/// Uma classe assintótica já colapsada.
///
/// Classes polinomiais ficam na forma canônica
/// `n^degree · log^log_power(n)`; constante é `degree = 0, log_power = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum Growth {
    Polynomial { degree: f64, log_power: u32 },
    Exponential { base: f64 },
    Factorial,
    /// Indeterminado. Domina todas as outras classes, então nenhuma soma o esconde.
    Unknown,
}

/// Classificação grosseira de um [`Growth`], para quem só precisa da etiqueta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthTag {
    Constant,
    Logarithmic,
    Linear,
    Linearithmic,
    Polynomial,
    Exponential,
    Factorial,
    Unknown,
}

impl Growth {
    pub const CONSTANT: Growth = Growth::Polynomial { degree: 0.0, log_power: 0 };
    pub const LOGARITHMIC: Growth = Growth::Polynomial { degree: 0.0, log_power: 1 };
    pub const LINEAR: Growth = Growth::Polynomial { degree: 1.0, log_power: 0 };
    pub const LINEARITHMIC: Growth = Growth::Polynomial { degree: 1.0, log_power: 1 };

    pub fn polynomial(degree: f64) -> Self {
        Self::poly_log(degree, 0)
    }

    pub fn poly_log(degree: f64, log_power: u32) -> Self {
        Growth::Polynomial { degree: snap(degree.max(0.0)), log_power }
    }

    /// `base^n`. Base que não passa de um não é crescimento exponencial.
    pub fn exponential(base: f64) -> Self {
        if base <= 1.0 + EPSILON {
            Growth::CONSTANT
        } else {
            Growth::Exponential { base: snap(base) }
        }
    }

    pub fn tag(&self) -> GrowthTag {
        match *self {
            Growth::Polynomial { degree, log_power } => {
                let d = degree;
                if d.abs() < EPSILON {
                    if log_power == 0 { GrowthTag::Constant } else { GrowthTag::Logarithmic }
                } else if (d - 1.0).abs() < EPSILON && log_power <= 1 {
                    if log_power == 0 { GrowthTag::Linear } else { GrowthTag::Linearithmic }
                } else {
                    GrowthTag::Polynomial
                }
            }
            Growth::Exponential { .. } => GrowthTag::Exponential,
            Growth::Factorial => GrowthTag::Factorial,
            Growth::Unknown => GrowthTag::Unknown,
        }
    }

    pub fn is_constant(&self) -> bool {
        self.tag() == GrowthTag::Constant
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Growth::Unknown)
    }

    /// `(degree, log_power)` das classes polinomiais.
    pub fn as_poly(&self) -> Option<(f64, u32)> {
        match *self {
            Growth::Polynomial { degree, log_power } => Some((degree, log_power)),
            _ => None,
        }
    }

    fn family(&self) -> u8 {
        match self {
            Growth::Polynomial { .. } => 0,
            Growth::Exponential { .. } => 1,
            Growth::Factorial => 2,
            Growth::Unknown => 3,
        }
    }

    /// Ordem assintótica. Desconhecido conta como a maior classe.
    pub fn compare(&self, other: &Growth) -> Ordering {
        match self.family().cmp(&other.family()) {
            Ordering::Equal => {}
            ord => return ord,
        }
        match (*self, *other) {
            (
                Growth::Polynomial { degree: d1, log_power: l1 },
                Growth::Polynomial { degree: d2, log_power: l2 },
            ) => cmp_f64(d1, d2).then(l1.cmp(&l2)),
            (Growth::Exponential { base: b1 }, Growth::Exponential { base: b2 }) => cmp_f64(b1, b2),
            _ => Ordering::Equal,
        }
    }

    pub fn max(self, other: Growth) -> Growth {
        if self.compare(&other) == Ordering::Less { other } else { self }
    }

    pub fn min(self, other: Growth) -> Growth {
        if self.compare(&other) == Ordering::Greater { other } else { self }
    }

    /// Soma assintótica: sobrevive o termo dominante.
    pub fn plus(self, other: Growth) -> Growth {
        self.max(other)
    }

    /// Produto assintótico.
    pub fn times(self, other: Growth) -> Growth {
        match (self, other) {
            (Growth::Unknown, _) | (_, Growth::Unknown) => Growth::Unknown,
            (Growth::Factorial, _) | (_, Growth::Factorial) => Growth::Factorial,
            (Growth::Exponential { base: a }, Growth::Exponential { base: b }) => Growth::exponential(a * b),
            (exp @ Growth::Exponential { .. }, _) | (_, exp @ Growth::Exponential { .. }) => exp,
            (
                Growth::Polynomial { degree: d1, log_power: l1 },
                Growth::Polynomial { degree: d2, log_power: l2 },
            ) => Growth::poly_log(d1 + d2, l1 + l2),
        }
    }

    /// Interpreta o corpo de um literal Big-O como `n^2`, `log n`, `n log n`,
    /// `2^n`, `n!`, `n*m` ou `V + E`. Cada identificador inteiro é uma
    /// variável de tamanho; numa soma fica o termo dominante.
    pub fn parse_hint(text: &str) -> Option<Growth> {
        let lower = text.to_lowercase();
        split_terms(&lower)?.into_iter().try_fold(None, |acc: Option<Growth>, term| {
            let growth = parse_term(term)?;
            Some(Some(acc.map_or(growth, |a| a.max(growth))))
        })?
    }
}

/// Parte o literal nos `+`/`-` de nível zero.
fn split_terms(text: &str) -> Option<Vec<&str>> {
    let mut terms = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (idx, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            '+' | '-' if depth == 0 => {
                terms.push(&text[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    terms.push(&text[start..]);
    if terms.iter().any(|t| t.trim().is_empty()) { None } else { Some(terms) }
}

fn parse_term(term: &str) -> Option<Growth> {
    let mut scan = HintScanner { chars: term.chars().collect(), pos: 0 };
    let mut degree = 0.0;
    let mut log_power = 0u32;
    let mut exp_base: Option<f64> = None;
    let mut factorial = false;
    let mut seen = false;

    while let Some(c) = scan.peek() {
        if c.is_whitespace() || matches!(c, '*' | '·' | '×' | '(' | ')') {
            scan.pos += 1;
            continue;
        }
        seen = true;
        if c.is_ascii_digit() {
            let value = scan.number()?;
            if scan.eat('^') {
                scan.word()?;
                exp_base = Some(exp_base.unwrap_or(1.0) * value);
            }
        } else if c.is_ascii_alphabetic() || c == '_' {
            let word = scan.word()?;
            if word == "sqrt" {
                scan.operand()?;
                degree += 0.5;
            } else if let Some(at) = word.find("log").or_else(|| matches!(word.as_str(), "lg" | "ln").then_some(0)) {
                // `nlogn` escrito sem espaços
                if at > 0 {
                    degree += 1.0;
                }
                let rest = word.get(at + 3..).unwrap_or("");
                // log_2 n, log2n: a base não importa assintoticamente.
                let operand = rest.trim_start_matches('_').trim_start_matches(|c: char| c.is_ascii_digit());
                let power = if scan.eat('^') { scan.number()? as u32 } else { 1 };
                if operand.is_empty() {
                    if scan.eat('_') {
                        scan.number()?;
                    }
                    scan.operand()?;
                }
                log_power += power;
            } else if scan.eat('^') {
                degree += scan.number()?;
            } else if scan.eat('!') {
                factorial = true;
            } else {
                degree += 1.0;
            }
        } else {
            return None;
        }
    }
    if !seen {
        return None;
    }

    Some(if factorial {
        Growth::Factorial
    } else if let Some(base) = exp_base {
        Growth::exponential(base)
    } else {
        Growth::poly_log(degree, log_power)
    })
}

struct HintScanner {
    chars: Vec<char>,
    pos: usize,
}

impl HintScanner {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn number(&mut self) -> Option<f64> {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>().ok()
    }

    /// Um identificador `[a-z_][a-z0-9_]*`.
    fn word(&mut self) -> Option<String> {
        self.skip_whitespace();
        let start = self.pos;
        if !self.peek().is_some_and(|c| c.is_ascii_alphabetic() || c == '_') {
            return None;
        }
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        Some(self.chars[start..self.pos].iter().collect())
    }

    /// Argumento de `log`/`sqrt`: `n` ou `(n)`.
    fn operand(&mut self) -> Option<()> {
        self.skip_whitespace();
        if self.peek() == Some('(') {
            let close = self.chars[self.pos..].iter().position(|c| *c == ')')? + self.pos;
            if close == self.pos + 1 {
                return None;
            }
            self.pos = close + 1;
            Some(())
        } else {
            self.word().map(|_| ())
        }
    }
}

fn snap(value: f64) -> f64 {
    let rounded = value.round();
    if (value - rounded).abs() < 1e-6 { rounded } else { value }
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    if (a - b).abs() < EPSILON {
        Ordering::Equal
    } else if a < b {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

fn format_number(value: f64) -> String {
    if (value - value.round()).abs() < EPSILON {
        format!("{}", value.round() as i64)
    } else {
        let text = format!("{:.3}", value);
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

impl PartialOrd for Growth {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl fmt::Display for Growth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Growth::Polynomial { degree, log_power } => {
                let n_term = if degree.abs() < EPSILON {
                    None
                } else if (degree - 1.0).abs() < EPSILON {
                    Some("n".to_string())
                } else {
                    Some(format!("n^{}", format_number(degree)))
                };
                let log_term = match log_power {
                    0 => None,
                    1 => Some("log n".to_string()),
                    k => Some(format!("log^{} n", k)),
                };
                match (n_term, log_term) {
                    (None, None) => write!(f, "1"),
                    (Some(n), None) => write!(f, "{}", n),
                    (None, Some(l)) => write!(f, "{}", l),
                    (Some(n), Some(l)) => write!(f, "{} {}", n, l),
                }
            }
            Growth::Exponential { base } => write!(f, "{}^n", format_number(base)),
            Growth::Factorial => write!(f, "n!"),
            Growth::Unknown => write!(f, "?"),
        }
    }
}

/// Registro da composição guardado junto do custo, para o trace mostrar
/// como a classe foi obtida antes de colapsar.
#[derive(Debug, Clone, PartialEq)]
pub enum CostExpr {
    Atom(Growth),
    Sum(Vec<CostExpr>),
    Product(Vec<CostExpr>),
}

impl CostExpr {
    pub fn constant() -> Self {
        CostExpr::Atom(Growth::CONSTANT)
    }

    pub fn atom(growth: Growth) -> Self {
        CostExpr::Atom(growth)
    }

    /// Monta uma soma achatando somas aninhadas. Termos constantes somem
    /// quando há qualquer outro termo.
    pub fn sum(terms: impl IntoIterator<Item = CostExpr>) -> Self {
        let mut flat = Vec::new();
        for term in terms {
            match term {
                CostExpr::Sum(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.iter().any(|t| !t.is_constant_atom()) {
            flat.retain(|t| !t.is_constant_atom());
        } else {
            flat.truncate(1);
        }
        match flat.len() {
            0 => CostExpr::constant(),
            1 => flat.remove(0),
            _ => CostExpr::Sum(flat),
        }
    }

    /// Monta um produto achatando produtos aninhados e descartando fatores constantes.
    pub fn product(factors: impl IntoIterator<Item = CostExpr>) -> Self {
        let mut flat = Vec::new();
        for factor in factors {
            match factor {
                CostExpr::Product(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        flat.retain(|t| !t.is_constant_atom());
        match flat.len() {
            0 => CostExpr::constant(),
            1 => flat.remove(0),
            _ => CostExpr::Product(flat),
        }
    }

    fn is_constant_atom(&self) -> bool {
        matches!(self, CostExpr::Atom(g) if g.is_constant())
    }

    pub fn collapse(&self) -> Growth {
        match self {
            CostExpr::Atom(g) => *g,
            CostExpr::Sum(terms) => terms.iter().fold(Growth::CONSTANT, |acc, t| acc.plus(t.collapse())),
            CostExpr::Product(factors) => factors.iter().fold(Growth::CONSTANT, |acc, t| acc.times(t.collapse())),
        }
    }
}

impl fmt::Display for CostExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostExpr::Atom(g) => write!(f, "{}", g),
            CostExpr::Sum(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " + ")?;
                    }
                    write!(f, "{}", term)?;
                }
                Ok(())
            }
            CostExpr::Product(factors) => {
                for (i, factor) in factors.iter().enumerate() {
                    if i > 0 {
                        write!(f, " · ")?;
                    }
                    match factor {
                        CostExpr::Sum(_) => write!(f, "({})", factor)?,
                        _ => write!(f, "{}", factor)?,
                    }
                }
                Ok(())
            }
        }
    }
}
