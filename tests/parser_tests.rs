// tests/parser_tests.rs
use asymptote::ast::*;
use asymptote::complexity::Growth;
use asymptote::{AnalysisError, ParseError};
use pretty_assertions::assert_eq;

fn parse_test_source(source: &str) -> Result<Program, String> {
    asymptote::parse_program(source).map_err(|e| format!("{:?}", e))
}

fn parse_error(source: &str) -> ParseError {
    match asymptote::parse_program(source) {
        Err(AnalysisError::Parse(err)) => err,
        other => panic!("Expected a parse error, got {:?}", other),
    }
}

fn ident(name: &str) -> Expr {
    Expr::Identifier(name.to_string())
}

#[test]
fn test_anonymous_block_is_main() {
    let program = parse_test_source("begin\n  x 🡨 1\nend").expect("parsing failed");
    assert_eq!(program.functions.len(), 1);
    let main = &program.functions[0];
    assert_eq!(main.name, "main");
    assert!(main.params.is_empty());
    match &main.body.statements[..] {
        [Statement::Assignment { target, value, .. }] => {
            assert_eq!(target, &ident("x"));
            assert_eq!(value, &Expr::Number(1.0));
        }
        other => panic!("Expected one assignment, got {:?}", other),
    }
}

#[test]
fn test_second_anonymous_block_gets_suffix() {
    let program = parse_test_source("begin x 🡨 1 end\nbegin y 🡨 2 end").expect("parsing failed");
    let names: Vec<&str> = program.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["main", "main_2"]);
}

#[test]
fn test_function_header_and_prelude() {
    let source = r#"
busqueda(A[1..n], n, x)
datos[10]
Casa mi_casa
i
begin
  i 🡨 0
end
"#;
    let program = parse_test_source(source).expect("parsing failed");
    let f = &program.functions[0];
    assert_eq!(f.name, "busqueda");
    assert_eq!(f.params, vec!["A", "n", "x"]);

    let prelude: Vec<(&str, Option<&str>, usize)> =
        f.prelude.iter().map(|d| (d.name.as_str(), d.type_name.as_deref(), d.shape.len())).collect();
    assert_eq!(prelude, vec![("datos", None, 1), ("mi_casa", Some("Casa"), 0), ("i", None, 0)]);
    assert_eq!(f.prelude[0].shape, vec![Expr::Number(10.0)]);
}

#[test]
fn test_for_downto_with_step() {
    let program = parse_test_source("begin\n  for i 🡨 n downto 1 step 2 do x 🡨 x + 1\nend").expect("parsing failed");
    match &program.functions[0].body.statements[0] {
        Statement::For { var, start, end, direction, step, body, .. } => {
            assert_eq!(var, "i");
            assert_eq!(start, &ident("n"));
            assert_eq!(end, &Expr::Number(1.0));
            assert_eq!(*direction, LoopDirection::Down);
            assert_eq!(step, &Some(Expr::Number(2.0)));
            assert_eq!(body.statements.len(), 1);
        }
        other => panic!("Expected for loop, got {:?}", other),
    }
}

#[test]
fn test_index_forms_and_precedence() {
    let program = parse_test_source("begin\n  x 🡨 dp[i][j] + M[i, j] * 2\nend").expect("parsing failed");
    let Statement::Assignment { value, .. } = &program.functions[0].body.statements[0] else {
        panic!("Expected assignment");
    };
    let cell = |base: &str| Expr::Index { base: base.to_string(), indices: vec![ident("i"), ident("j")] };
    assert_eq!(
        value,
        &Expr::Binary {
            op: BinaryOperator::Add,
            left: Box::new(cell("dp")),
            right: Box::new(Expr::Binary {
                op: BinaryOperator::Mul,
                left: Box::new(cell("M")),
                right: Box::new(Expr::Number(2.0)),
            }),
        }
    );
}

#[test]
fn test_bare_if_else_and_begin_blocks() {
    let source = r#"
begin
  if (x > 1) then y 🡨 1 else y 🡨 2 end
  if (A[i] = v) then
  begin
    encontrado 🡨 1
    return i
  end
  else
  begin
    encontrado 🡨 0
  end
  if (c) then return x end
end
"#;
    let program = parse_test_source(source).expect("parsing failed");
    let statements = &program.functions[0].body.statements;
    assert_eq!(statements.len(), 3);
    match &statements[0] {
        Statement::If { then_block, else_block: Some(else_block), .. } => {
            assert_eq!(then_block.statements.len(), 1);
            assert_eq!(else_block.statements.len(), 1);
        }
        other => panic!("Expected if/else, got {:?}", other),
    }
    match &statements[1] {
        Statement::If { then_block, else_block: Some(_), .. } => assert_eq!(then_block.statements.len(), 2),
        other => panic!("Expected if/else with blocks, got {:?}", other),
    }
    match &statements[2] {
        Statement::If { then_block, else_block: None, .. } => match &then_block.statements[..] {
            [Statement::Return { value: Some(v), .. }] => assert_eq!(v, &ident("x")),
            other => panic!("Expected `return x`, got {:?}", other),
        },
        other => panic!("Expected bare if, got {:?}", other),
    }
}

#[test]
fn test_else_if_chain() {
    let source = "begin\n  if (a) then x 🡨 1\n  else if (b) then x 🡨 2\n  else x 🡨 3 end\nend";
    let program = parse_test_source(source).expect("parsing failed");
    let Statement::If { else_block: Some(else_block), .. } = &program.functions[0].body.statements[0] else {
        panic!("Expected if/else");
    };
    assert!(matches!(&else_block.statements[..], [Statement::If { else_block: Some(_), .. }]));
}

#[test]
fn test_bare_repeat_and_while() {
    let source = "begin\n  repeat i 🡨 i * 2 until (i >= n)\n  while (j > 0) do j 🡨 j - 1\nend";
    let program = parse_test_source(source).expect("parsing failed");
    let statements = &program.functions[0].body.statements;
    assert!(matches!(&statements[0], Statement::Repeat { body, .. } if body.statements.len() == 1));
    assert!(matches!(&statements[1], Statement::While { .. }));
}

#[test]
fn test_return_without_value_before_end() {
    let program = parse_test_source("f(n)\nbegin\n  if (n = 0) then return end\n  return\nend").expect("parsing failed");
    let statements = &program.functions[0].body.statements;
    assert!(matches!(&statements[1], Statement::Return { value: None, .. }));
}

#[test]
fn test_calls_and_fields() {
    let source = "begin\n  CALL ordenar(A, n/2)\n  imprimir(x)\n  total 🡨 casa.area + length(A)\nend";
    let program = parse_test_source(source).expect("parsing failed");
    let statements = &program.functions[0].body.statements;
    match &statements[0] {
        Statement::Call(call) => {
            assert_eq!(call.name, "ordenar");
            assert_eq!(call.args.len(), 2);
        }
        other => panic!("Expected CALL, got {:?}", other),
    }
    assert!(matches!(&statements[1], Statement::Call(call) if call.name == "imprimir"));
    let Statement::Assignment { value, .. } = &statements[2] else {
        panic!("Expected assignment");
    };
    assert_eq!(
        value,
        &Expr::Binary {
            op: BinaryOperator::Add,
            left: Box::new(Expr::Field { base: Box::new(ident("casa")), field: "area".to_string() }),
            right: Box::new(Expr::Length(Box::new(ident("A")))),
        }
    );
}

#[test]
fn test_hint_before_statement_wraps_it() {
    let source = "begin\n  ► O(n^2)\n  for i 🡨 1 to n do x 🡨 1\nend";
    let program = parse_test_source(source).expect("parsing failed");
    match &program.functions[0].body.statements[0] {
        Statement::Block(block) => {
            assert_eq!(block.hint, Some(Growth::polynomial(2.0)));
            assert!(matches!(&block.statements[..], [Statement::For { .. }]));
        }
        other => panic!("Expected hinted block, got {:?}", other),
    }
}

#[test]
fn test_trailing_hint_annotates_statement() {
    let program = parse_test_source("begin\n  CALL f(n) ► O(n)\n  x 🡨 1\nend").expect("parsing failed");
    let statements = &program.functions[0].body.statements;
    assert_eq!(statements.len(), 2);
    match &statements[0] {
        Statement::Block(block) => assert_eq!(block.hint, Some(Growth::LINEAR)),
        other => panic!("Expected hinted block, got {:?}", other),
    }
}

#[test]
fn test_hint_before_begin_annotates_function() {
    let program = parse_test_source("► O(n log n)\nordenar(A, n)\nbegin\n  x 🡨 1\nend").expect("parsing failed");
    assert_eq!(program.functions[0].body.hint, Some(Growth::LINEARITHMIC));
}

#[test]
fn test_missing_end_reports_opening_begin() {
    let source = "begin\n  for i 🡨 1 to n do\n  begin\n    x 🡨 1\n  end\n";
    match parse_error(source) {
        ParseError::UnclosedBlock { opened_at } => assert_eq!((opened_at.line, opened_at.column), (1, 1)),
        other => panic!("Expected UnclosedBlock, got {:?}", other),
    }
}

#[test]
fn test_extra_end_is_unmatched() {
    match parse_error("begin\n  x 🡨 1\nend\nend") {
        ParseError::UnmatchedEnd { span } => assert_eq!(span.line, 4),
        other => panic!("Expected UnmatchedEnd, got {:?}", other),
    }
}

#[test]
fn test_condition_needs_parentheses() {
    match parse_error("begin\n  while x < n do x 🡨 x + 1\nend") {
        ParseError::UnexpectedToken { expected, span, .. } => {
            assert!(expected.contains("condition"), "{}", expected);
            assert_eq!(span.line, 2);
        }
        other => panic!("Expected UnexpectedToken, got {:?}", other),
    }
}

#[test]
fn test_unsupported_construct() {
    match parse_error("begin\n  goto fin\nend") {
        ParseError::Unsupported { construct, .. } => assert_eq!(construct, "goto"),
        other => panic!("Expected Unsupported, got {:?}", other),
    }
}

#[test]
fn test_duplicate_function() {
    match parse_error("f(n)\nbegin\n  return\nend\nf(m)\nbegin\n  return\nend") {
        ParseError::DuplicateFunction { name, span } => {
            assert_eq!(name, "f");
            assert_eq!(span.line, 5);
        }
        other => panic!("Expected DuplicateFunction, got {:?}", other),
    }
}

#[test]
fn test_hint_without_statement() {
    let err = parse_error("begin\n  x 🡨 1\n  ► O(n)\nend");
    assert!(matches!(err, ParseError::UnexpectedToken { .. }), "got {:?}", err);
}

#[test]
fn test_empty_source_is_an_error() {
    assert!(matches!(parse_error("  # nada\n"), ParseError::UnexpectedEof { .. }));
}
