// src/lib.rs
pub mod token;
pub mod ast;
pub mod lexer;
pub mod parser;
pub mod complexity;
pub mod loops;
pub mod cost;
pub mod recursion;
pub mod dp;
pub mod synthesis;
pub mod config;
pub mod utils;

// Reexportar tipos principais para serem acessíveis aos usuários da biblioteca
pub use token::LexicalError;
pub use parser::ParseError;
pub use config::{AnalyzerConfig, ConfigError};
pub use complexity::Growth;
pub use cost::{SemanticWarning, WarningKind};
pub use synthesis::{AnalysisResult, Confidence, FunctionTrace};

use ast::Program;
use std::sync::Once;
use tracing::debug;

static TRACING_INIT: Once = Once::new();

/// Instala um subscriber do `tracing` em stderr, filtrado por `RUST_LOG`.
/// Não faz nada sem `RUST_LOG` definido ou em chamadas repetidas.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr).with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Lexical Error: {0}")]
    Lex(#[from] LexicalError),
    #[error("Parse Error: {0}")]
    Parse(#[from] ParseError),
    #[error("Config Error: {0}")]
    Config(#[from] ConfigError),
    #[error("Entry function `{0}` is not defined")]
    UnknownEntry(String),
}

/// Faz a análise léxica e sintática do pseudocódigo, gerando as ASTs das funções.
pub fn parse_program(source: &str) -> Result<Program, AnalysisError> {
    let tokens = lexer::lex_source(source)?;
    debug!(tokens = tokens.len(), "lexed source");
    let mut parser = parser::Parser::new(&tokens);
    Ok(parser.parse_program()?)
}

/// Analisa `source` com a configuração padrão.
pub fn analyze(source: &str) -> Result<AnalysisResult, AnalysisError> {
    analyze_with_config(source, &AnalyzerConfig::default())
}

pub fn analyze_with_config(source: &str, config: &AnalyzerConfig) -> Result<AnalysisResult, AnalysisError> {
    let program = parse_program(source)?;
    analyze_program(&program, config)
}

/// Roda a análise de custo sobre um programa já analisado.
pub fn analyze_program(program: &Program, config: &AnalyzerConfig) -> Result<AnalysisResult, AnalysisError> {
    if let Some(entry) = &config.entry {
        if program.function(entry).is_none() {
            return Err(AnalysisError::UnknownEntry(entry.clone()));
        }
    }
    debug!(functions = program.functions.len(), "analyzing program");
    Ok(synthesis::Synthesizer::new(program, config).run())
}
