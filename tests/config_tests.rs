// tests/config_tests.rs
mod common;

use asymptote::complexity::Growth;
use asymptote::{AnalysisError, AnalyzerConfig, ConfigError};
use common::analyze_with;
use pretty_assertions::assert_eq;
use std::fs;

#[test]
fn test_default_config() {
    let config = AnalyzerConfig::default();
    assert_eq!(config.entry, None);
    assert_eq!(config.heuristic_sizes, vec![8, 16, 32, 64, 128, 256]);
    assert_eq!(config.subroutine_cost("Combinar"), Some(Growth::LINEAR));
    assert_eq!(config.subroutine_cost("swap"), Some(Growth::CONSTANT));
    assert_eq!(config.subroutine_cost("nada"), None);
    assert!(config.is_bound_keyword("Mejor"));
    assert!(!config.early_exit);
}

#[test]
fn test_from_toml_merges_over_defaults() {
    let text = r#"
entry = "ordenar"
early_exit = true
heuristic_sizes = [16, 64, 512]
bound_keywords = ["limite"]

[subroutines]
Partition = "O(n)"
heapify = "log n"
"#;
    let config = AnalyzerConfig::from_toml_str(text).expect("config should load");
    assert_eq!(config.entry.as_deref(), Some("ordenar"));
    assert!(config.early_exit);
    assert_eq!(config.heuristic_sizes, vec![16, 64, 512]);
    assert_eq!(config.subroutine_cost("partition"), Some(Growth::LINEAR));
    assert_eq!(config.subroutine_cost("HEAPIFY"), Some(Growth::LOGARITHMIC));
    assert_eq!(config.subroutine_cost("combinar"), Some(Growth::LINEAR));
    assert!(config.is_bound_keyword("LIMITE"));
    assert!(!config.is_bound_keyword("best"));
}

#[test]
fn test_invalid_subroutine_cost() {
    let err = AnalyzerConfig::from_toml_str("[subroutines]\nf = \"n $ 2\"\n").expect_err("cost should be rejected");
    match err {
        ConfigError::InvalidCost { name, text } => {
            assert_eq!(name, "f");
            assert_eq!(text, "n $ 2");
        }
        other => panic!("Expected InvalidCost, got {:?}", other),
    }
}

#[test]
fn test_invalid_heuristic_sizes() {
    for sizes in ["[8]", "[16, 8, 32]", "[2, 8]", "[8, 100000]"] {
        let text = format!("heuristic_sizes = {}\n", sizes);
        assert!(
            matches!(AnalyzerConfig::from_toml_str(&text), Err(ConfigError::InvalidSizes(_))),
            "sizes {} should be rejected",
            sizes
        );
    }
}

#[test]
fn test_unknown_key_is_rejected() {
    assert!(matches!(AnalyzerConfig::from_toml_str("verbose = true\n"), Err(ConfigError::Toml(_))));
}

#[test]
fn test_load_from_file() {
    let path = std::env::temp_dir().join(format!("asymptote_config_{}.toml", std::process::id()));
    fs::write(&path, "[subroutines]\nheapify = \"O(log n)\"\n").expect("write temp config");
    let config = AnalyzerConfig::load(&path);
    let _ = fs::remove_file(&path);
    assert_eq!(config.expect("config should load").subroutine_cost("heapify"), Some(Growth::LOGARITHMIC));

    let missing = AnalyzerConfig::load(std::env::temp_dir().join("asymptote_no_such_config.toml"));
    assert!(matches!(missing, Err(ConfigError::Io(_))));
}

#[test]
fn test_configured_subroutine_costs_are_used() {
    let config = AnalyzerConfig::from_toml_str("[subroutines]\nheapify = \"log n\"\n").expect("config should load");
    let source = "begin\n  for i 🡨 1 to n do CALL heapify(A, i)\nend";
    assert_eq!(analyze_with(source, &config).labels.worst, "O(n log n)");
}

#[test]
fn test_configured_entry() {
    let source = r#"
principal(n)
begin
  CALL ayudante(n)
end
ayudante(n)
begin
  for i 🡨 1 to n do x 🡨 1
end
"#;
    let config = AnalyzerConfig::default().with_entry("ayudante");
    let result = analyze_with(source, &config);
    assert_eq!(result.entry, "ayudante");

    let default_entry = analyze_with(source, &AnalyzerConfig::default());
    assert_eq!(default_entry.entry, "principal");
}

#[test]
fn test_unknown_entry_is_an_error() {
    let config = AnalyzerConfig::default().with_entry("inexistente");
    match asymptote::analyze_with_config("begin\n  x 🡨 1\nend", &config) {
        Err(AnalysisError::UnknownEntry(name)) => assert_eq!(name, "inexistente"),
        other => panic!("Expected UnknownEntry, got {:?}", other),
    }
}

#[test]
fn test_custom_bound_keywords_enable_pruning() {
    let source = r#"
buscar(idx, n, costo, limite)
begin
  if (costo > limite) then return end
  if (idx = n) then return end
  CALL buscar(idx + 1, n, costo + 1, limite)
  CALL buscar(idx + 1, n, costo, limite)
end
"#;
    let default_result = analyze_with(source, &AnalyzerConfig::default());
    assert_eq!(default_result.labels.best, "Ω(2^n)");

    let config = AnalyzerConfig::from_toml_str("bound_keywords = [\"limite\"]\n").expect("config should load");
    assert_eq!(analyze_with(source, &config).labels.best, "Ω(n)");
}
