// tests/recursion_tests.rs
mod common;

use asymptote::complexity::Growth;
use asymptote::recursion::{solve, CallGraph, Component, Shrink, SolveMethod};
use asymptote::{AnalyzerConfig, Confidence, WarningKind};
use common::{analyze_ok, analyze_with, labels, parse_ok};
use pretty_assertions::assert_eq;

const SIZES: &[u64] = &[8, 16, 32, 64, 128, 256];

fn owned(worst: &str, best: &str, tight: &str) -> (String, String, String) {
    (worst.to_string(), best.to_string(), tight.to_string())
}

#[test]
fn test_master_theorem_cases() {
    let halves = [Shrink::Divide(2.0), Shrink::Divide(2.0)];

    let s = solve(&halves, false, Growth::LINEAR, SIZES);
    assert_eq!((s.growth, s.method), (Growth::LINEARITHMIC, SolveMethod::MasterCase2));

    let s = solve(&halves, false, Growth::CONSTANT, SIZES);
    assert_eq!((s.growth, s.method), (Growth::LINEAR, SolveMethod::MasterCase1));

    let s = solve(&[Shrink::Divide(2.0); 4], false, Growth::LINEAR, SIZES);
    assert_eq!((s.growth, s.method), (Growth::polynomial(2.0), SolveMethod::MasterCase1));

    let s = solve(&halves, false, Growth::polynomial(2.0), SIZES);
    assert_eq!((s.growth, s.method), (Growth::polynomial(2.0), SolveMethod::MasterCase3));

    let s = solve(&[Shrink::Divide(2.0)], false, Growth::CONSTANT, SIZES);
    assert_eq!((s.growth, s.method), (Growth::LOGARITHMIC, SolveMethod::MasterCase2));
    assert_eq!(s.confidence, Confidence::High);
}

#[test]
fn test_decrease_recurrences() {
    let s = solve(&[Shrink::Decrease(1.0)], false, Growth::LINEAR, SIZES);
    assert_eq!((s.growth, s.method), (Growth::polynomial(2.0), SolveMethod::LinearRecursion));

    let s = solve(&[Shrink::Decrease(1.0), Shrink::Decrease(1.0)], false, Growth::CONSTANT, SIZES);
    assert_eq!((s.growth, s.method), (Growth::exponential(2.0), SolveMethod::MultipleRecursion));

    let s = solve(&[Shrink::Decrease(1.0), Shrink::Decrease(2.0)], false, Growth::CONSTANT, SIZES);
    assert_eq!(s.growth.to_string(), "1.618^n");

    let s = solve(&[Shrink::Decrease(1.0)], true, Growth::CONSTANT, SIZES);
    assert_eq!((s.growth, s.method), (Growth::Factorial, SolveMethod::LoopScaledBranching));
}

#[test]
fn test_no_recursive_call_is_the_work() {
    let s = solve(&[], false, Growth::LINEAR, SIZES);
    assert_eq!((s.growth, s.method), (Growth::LINEAR, SolveMethod::NoRecursiveCall));
}

#[test]
fn test_heuristic_is_low_confidence() {
    let s = solve(&[Shrink::Irregular, Shrink::Irregular], false, Growth::LINEAR, SIZES);
    assert_eq!(s.method, SolveMethod::Heuristic);
    assert_eq!(s.confidence, Confidence::Low);
    assert_eq!(s.growth, Growth::polynomial(2.0));

    let s = solve(&[Shrink::Irregular], false, Growth::CONSTANT, SIZES);
    assert_eq!(s.growth, Growth::LINEAR);
}

#[test]
fn test_merge_sort() {
    let source = r#"
mergesort(A, n)
begin
  if (n < 2) then return end
  CALL mergesort(A, n/2)
  CALL mergesort(A, n/2)
  CALL combinar(A, n) ► Trabajo extra O(n)
end
"#;
    let result = analyze_ok(source);
    assert_eq!(
        (result.labels.worst.as_str(), result.labels.best.as_str(), result.labels.tight.as_str()),
        ("O(n log n)", "Ω(n log n)", "Θ(n log n)")
    );
    let trace = &result.trace["mergesort"];
    assert!(trace.recursive);
    assert_eq!(trace.recurrence.as_deref(), Some("T(n) = 2T(n/2) + n"));
    assert_eq!(trace.method, Some(SolveMethod::MasterCase2));
    assert_eq!(result.confidence, Confidence::High);
}

#[test]
fn test_recursive_binary_search() {
    let source = r#"
bs(A, lo, hi, x)
begin
  if (lo > hi) then return -1 end
  mid 🡨 (lo + hi) / 2
  if (A[mid] = x) then return mid end
  if (A[mid] < x) then
    return CALL bs(A, mid + 1, hi, x)
  else
    return CALL bs(A, lo, mid - 1, x)
  end
end
"#;
    assert_eq!(labels(source), owned("O(log n)", "Ω(1)", "Θ(log n)"));
}

#[test]
fn test_fibonacci_uses_golden_ratio() {
    let source = r#"
fib(n)
begin
  if (n <= 1) then return n end
  return CALL fib(n - 1) + CALL fib(n - 2)
end
"#;
    let result = analyze_ok(source);
    assert_eq!(result.labels.worst, "O(1.618^n)");
    assert_eq!(result.trace["fib"].method, Some(SolveMethod::MultipleRecursion));
}

#[test]
fn test_two_decreasing_calls_are_exponential() {
    let source = r#"
hanoi(n)
begin
  if (n = 0) then return end
  CALL hanoi(n - 1)
  CALL hanoi(n - 1)
end
"#;
    assert_eq!(labels(source), owned("O(2^n)", "Ω(2^n)", "Θ(2^n)"));
}

#[test]
fn test_linear_recursion_with_index() {
    let source = r#"
suma(A, i, n)
begin
  if (i > n) then return 0 end
  return A[i] + CALL suma(A, i + 1, n)
end
"#;
    assert_eq!(labels(source).0, "O(n)");
}

#[test]
fn test_mutual_recursion_forms_one_component() {
    let source = r#"
par(n)
begin
  if (n = 0) then return 1 end
  return CALL impar(n - 1)
end
impar(n)
begin
  if (n = 0) then return 0 end
  return CALL par(n - 1)
end
"#;
    let program = parse_ok(source);
    let graph = CallGraph::build(&program);
    assert_eq!(
        graph.components(),
        vec![Component { members: vec!["par".to_string(), "impar".to_string()], recursive: true }]
    );
    assert!(graph.calls("par", "impar"));
    assert!(graph.is_called("par"));

    let result = analyze_ok(source);
    assert_eq!(result.entry, "par");
    assert_eq!(result.labels.worst, "O(n)");
    assert!(result.trace["impar"].recursive);
}

#[test]
fn test_mutual_recursion_folds_peer_branching() {
    let source = r#"
f(n)
begin
  if (n <= 0) then return 1 end
  CALL g(n - 1)
  CALL g(n - 1)
end
g(n)
begin
  if (n <= 0) then return 1 end
  CALL f(n - 1)
end
"#;
    let result = analyze_with(source, &AnalyzerConfig::default().with_entry("g"));
    assert_eq!(result.entry, "g");
    assert_eq!(result.labels.worst, "O(1.414^n)");
    assert_eq!(result.confidence, Confidence::High);
    assert_eq!(result.trace["g"].method, Some(SolveMethod::MultipleRecursion));
    assert_eq!(result.trace["g"].recurrence.as_deref(), Some("T(n) = 2T(n-2) + 1"));
    assert_eq!(result.trace["f"].labels.worst, "O(1.414^n)");
}

#[test]
fn test_unfoldable_mutual_recursion_is_low_confidence() {
    let source = r#"
f(n)
begin
  if (n <= 0) then return 1 end
  CALL g(n - 1)
end
g(n)
begin
  if (n <= 0) then return 1 end
  CALL g(n - 1)
  CALL f(n - 1)
end
"#;
    let result = analyze_ok(source);
    assert_eq!(result.entry, "f");
    assert_eq!(result.confidence, Confidence::Low);
    assert_eq!(result.trace["f"].method, Some(SolveMethod::Heuristic));
    assert!(result.warnings.iter().any(|w| w.function == "f" && w.kind == WarningKind::UnresolvedShrink));
    // g fecha em T(n) = T(n-1) + T(n-2) + 1
    assert_eq!(result.trace["g"].labels.worst, "O(1.618^n)");
    assert_eq!(result.trace["g"].confidence, Confidence::High);
}

#[test]
fn test_components_come_callees_first() {
    let source = r#"
main()
begin
  CALL a(n)
end
a(n)
begin
  CALL b(n)
end
b(n)
begin
  x 🡨 1
end
"#;
    let graph = CallGraph::build(&parse_ok(source));
    let order: Vec<Vec<String>> = graph.components().into_iter().map(|c| c.members).collect();
    assert_eq!(order, vec![vec!["b".to_string()], vec!["a".to_string()], vec!["main".to_string()]]);
    assert!(graph.components().iter().all(|c| !c.recursive));
    assert_eq!(graph.reachable_from("a"), vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn test_quicksort_goes_to_heuristic() {
    let source = r#"
quicksort(A, lo, hi)
begin
  if (lo < hi) then
  begin
    p 🡨 CALL particionar(A, lo, hi)
    CALL quicksort(A, lo, p - 1)
    CALL quicksort(A, p + 1, hi)
  end
end
particionar(A, lo, hi)
begin
  for j 🡨 lo to hi do x 🡨 A[j]
end
"#;
    let result = analyze_ok(source);
    assert_eq!(result.entry, "quicksort");
    assert_eq!(result.labels.worst, "O(n^2)");
    assert_eq!(result.labels.best, "Ω(n log n)");
    assert_eq!(result.confidence, Confidence::Low);
    assert_eq!(result.trace["quicksort"].method, Some(SolveMethod::Heuristic));
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].kind, WarningKind::UnresolvedShrink);
}

#[test]
fn test_mixed_shapes_warn() {
    let source = r#"
raro(n)
begin
  if (n <= 1) then return end
  CALL raro(n / 2)
  CALL raro(n - 1)
end
"#;
    let result = analyze_ok(source);
    assert_eq!(result.confidence, Confidence::Low);
    assert!(result.warnings.iter().any(|w| w.kind == WarningKind::MixedShrink));
}

#[test]
fn test_branch_and_bound_subsets() {
    let source = r#"
subconjuntos(idx, n, costo, best)
begin
  if (costo >= best) then return end
  if (idx = n) then
  begin
    best 🡨 costo
    return
  end
  CALL subconjuntos(idx + 1, n, costo + w[idx], best)
  CALL subconjuntos(idx + 1, n, costo, best)
end
"#;
    let result = analyze_ok(source);
    assert_eq!(result.labels.worst, "O(2^n)");
    assert_eq!(result.labels.best, "Ω(n)");
    assert_eq!(result.confidence, Confidence::Medium);
}

#[test]
fn test_branch_and_bound_tsp_is_factorial() {
    let source = r#"
tsp(ciudad, visitados, n, costo, mejor)
begin
  if (costo >= mejor) then return end
  for sig 🡨 1 to n do
  begin
    if (visitados[sig] = 0) then
    begin
      visitados[sig] 🡨 1
      CALL tsp(sig, visitados, n - 1, costo + d[ciudad][sig], mejor)
      visitados[sig] 🡨 0
    end
  end
end
"#;
    let result = analyze_ok(source);
    assert_eq!(result.labels.worst, "O(n!)");
    assert_eq!(result.labels.best, "Ω(n^2)");
    assert_eq!(result.trace["tsp"].method, Some(SolveMethod::LoopScaledBranching));
    assert_eq!(result.trace["tsp"].recurrence.as_deref(), Some("T(n) = n·T(n-1) + n"));
}

#[test]
fn test_hint_on_recursive_function_wins() {
    let source = r#"
► O(n log n)
raro(n)
begin
  CALL raro(n / 2)
  CALL raro(n - 1)
end
"#;
    let result = analyze_ok(source);
    assert_eq!(result.labels.worst, "O(n log n)");
    assert!(result.warnings.is_empty());
    assert!(result.trace["raro"].hinted);
}
