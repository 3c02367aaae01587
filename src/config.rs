// src/config.rs
use crate::complexity::Growth;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const DEFAULT_SUBROUTINES: &[(&str, Growth)] = &[
    ("combinar", Growth::LINEAR),
    ("busqueda_lineal", Growth::LINEAR),
    ("merge", Growth::LINEAR),
    ("linear_search", Growth::LINEAR),
    ("swap", Growth::CONSTANT),
    ("imprimir", Growth::CONSTANT),
    ("print", Growth::CONSTANT),
];

const DEFAULT_SIZES: &[u64] = &[8, 16, 32, 64, 128, 256];
const DEFAULT_BOUND_KEYWORDS: &[&str] = &["bound", "best", "cota", "upper", "lower", "mejor"];
const MAX_SAMPLE_SIZE: u64 = 4096;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid cost `{text}` for subroutine `{name}`")]
    InvalidCost { name: String, text: String },
    #[error("Invalid heuristic sizes: {0}")]
    InvalidSizes(String),
}

/// Parâmetros do analisador. `Default` reproduz o comportamento embutido.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// Função cujo custo é reportado; a ordem de escolha alternativa está em `synthesis::select_entry`.
    pub entry: Option<String>,
    /// Custo de chamadas a funções não definidas no programa. Chaves em minúsculas.
    pub subroutines: BTreeMap<String, Growth>,
    /// Tamanhos de entrada amostrados pelo estimador heurístico de recorrências.
    pub heuristic_sizes: Vec<u64>,
    /// Identificadores que marcam uma guarda de poda de branch-and-bound.
    pub bound_keywords: Vec<String>,
    /// Laços com `return` no corpo passam a ter melhor caso constante. Desligado por padrão.
    pub early_exit: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            entry: None,
            subroutines: DEFAULT_SUBROUTINES.iter().map(|(name, g)| (name.to_string(), *g)).collect(),
            heuristic_sizes: DEFAULT_SIZES.to_vec(),
            bound_keywords: DEFAULT_BOUND_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            early_exit: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    entry: Option<String>,
    subroutines: BTreeMap<String, String>,
    heuristic_sizes: Option<Vec<u64>>,
    bound_keywords: Option<Vec<String>>,
    early_exit: Option<bool>,
}

impl AnalyzerConfig {
    /// Lê um documento TOML como
    ///
    /// ```toml
    /// entry = "ordenar"
    /// early_exit = true
    ///
    /// [subroutines]
    /// partition = "O(n)"
    /// heapify = "log n"
    /// ```
    ///
    /// As sub-rotinas são mescladas sobre a tabela embutida.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text)?;
        let mut config = AnalyzerConfig::default();

        config.entry = raw.entry;
        for (name, text) in raw.subroutines {
            let growth = parse_cost(&text).ok_or_else(|| ConfigError::InvalidCost { name: name.clone(), text })?;
            config.subroutines.insert(name.to_lowercase(), growth);
        }
        if let Some(sizes) = raw.heuristic_sizes {
            validate_sizes(&sizes)?;
            config.heuristic_sizes = sizes;
        }
        if let Some(keywords) = raw.bound_keywords {
            config.bound_keywords = keywords.into_iter().map(|k| k.to_lowercase()).collect();
        }
        if let Some(early_exit) = raw.early_exit {
            config.early_exit = early_exit;
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = Some(entry.into());
        self
    }

    pub fn subroutine_cost(&self, name: &str) -> Option<Growth> {
        self.subroutines.get(&name.to_lowercase()).copied()
    }

    pub fn is_bound_keyword(&self, ident: &str) -> bool {
        self.bound_keywords.iter().any(|k| k.eq_ignore_ascii_case(ident))
    }
}

/// Aceita tanto `"O(n log n)"` quanto `"n log n"` sem o `O`.
fn parse_cost(text: &str) -> Option<Growth> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix("O(")
        .or_else(|| trimmed.strip_prefix("o("))
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(trimmed);
    Growth::parse_hint(inner)
}

fn validate_sizes(sizes: &[u64]) -> Result<(), ConfigError> {
    if sizes.len() < 2 {
        return Err(ConfigError::InvalidSizes("at least two sizes are needed".into()));
    }
    if sizes.windows(2).any(|w| w[0] >= w[1]) {
        return Err(ConfigError::InvalidSizes("sizes must be strictly increasing".into()));
    }
    if sizes[0] < 4 || sizes[sizes.len() - 1] > MAX_SAMPLE_SIZE {
        return Err(ConfigError::InvalidSizes(format!("sizes must lie within 4..={}", MAX_SAMPLE_SIZE)));
    }
    Ok(())
}
