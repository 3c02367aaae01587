// tests/common.rs
use asymptote::ast::Program;
use asymptote::{AnalysisResult, AnalyzerConfig};

#[allow(dead_code)]
pub fn parse_ok(source: &str) -> Program {
    asymptote::parse_program(source).unwrap_or_else(|e| panic!("parsing failed: {}\n{}", e, source))
}

#[allow(dead_code)]
pub fn analyze_ok(source: &str) -> AnalysisResult {
    analyze_with(source, &AnalyzerConfig::default())
}

#[allow(dead_code)]
pub fn analyze_with(source: &str, config: &AnalyzerConfig) -> AnalysisResult {
    asymptote::analyze_with_config(source, config).unwrap_or_else(|e| panic!("analysis failed: {}\n{}", e, source))
}

/// Rótulos `(worst, best, tight)` da função de entrada.
#[allow(dead_code)]
pub fn labels(source: &str) -> (String, String, String) {
    let result = analyze_ok(source);
    (result.labels.worst, result.labels.best, result.labels.tight)
}
