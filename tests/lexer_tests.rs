// tests/lexer_tests.rs
use asymptote::complexity::Growth;
use asymptote::lexer::lex_source;
use asymptote::token::{LexicalError, Token};
use logos::Logos;
use pretty_assertions::assert_eq;

fn lex_source_unwrap<'source>(source: &'source str) -> Vec<Token<'source>> {
    Token::lexer(source)
        .map(|res| res.unwrap_or_else(|_| panic!("Lexing failed for: {}", source)))
        .collect()
}

#[test]
fn test_keywords_ignore_case() {
    let source = "begin END For to DOWNTO step Do while REPEAT until If then ELSE return call Length and OR not mod div";
    let tokens = lex_source_unwrap(source);
    assert_eq!(tokens, vec![
        Token::KwBegin, Token::KwEnd, Token::KwFor, Token::KwTo, Token::KwDownto, Token::KwStep,
        Token::KwDo, Token::KwWhile, Token::KwRepeat, Token::KwUntil, Token::KwIf, Token::KwThen,
        Token::KwElse, Token::KwReturn, Token::KwCall, Token::KwLength, Token::KwAnd, Token::KwOr,
        Token::KwNot, Token::KwMod, Token::KwDiv,
    ]);
}

#[test]
fn test_identifiers_and_numbers() {
    let tokens = lex_source_unwrap("x _tmp A1 doit 42 3.5");
    assert_eq!(tokens, vec![
        Token::Identifier("x"),
        Token::Identifier("_tmp"),
        Token::Identifier("A1"),
        Token::Identifier("doit"),
        Token::IntegerLiteral(42),
        Token::DecimalLiteral(3.5),
    ]);
}

#[test]
fn test_assignment_arrow_spellings() {
    for source in ["i 🡨 1", "i ← 1", "i <- 1", "i := 1"] {
        assert_eq!(
            lex_source_unwrap(source),
            vec![Token::Identifier("i"), Token::Arrow, Token::IntegerLiteral(1)],
            "arrow spelling in `{}`",
            source
        );
    }
}

#[test]
fn test_operators_and_punctuation() {
    let source = "+ - * / % ^ = == != <> ≠ < <= ≤ > >= ≥ ( ) [ ] , . ;";
    let tokens = lex_source_unwrap(source);
    assert_eq!(tokens, vec![
        Token::Plus, Token::Minus, Token::Star, Token::Slash, Token::Percent, Token::Caret,
        Token::Equal, Token::Equal, Token::NotEqual, Token::NotEqual, Token::NotEqual,
        Token::LessThan, Token::LessThanEqual, Token::LessThanEqual,
        Token::GreaterThan, Token::GreaterThanEqual, Token::GreaterThanEqual,
        Token::LParen, Token::RParen, Token::LBracket, Token::RBracket,
        Token::Comma, Token::Dot, Token::Semicolon,
    ]);
}

#[test]
fn test_complexity_hints() {
    let tokens = lex_source_unwrap("► O(n^2)\n►O(log n)\n► O(n log n)\n► O(2^n)\n► o(1)\n► O(n!)");
    assert_eq!(tokens, vec![
        Token::Hint(Growth::polynomial(2.0)),
        Token::Hint(Growth::LOGARITHMIC),
        Token::Hint(Growth::LINEARITHMIC),
        Token::Hint(Growth::exponential(2.0)),
        Token::Hint(Growth::CONSTANT),
        Token::Hint(Growth::Factorial),
    ]);
}

#[test]
fn test_hint_ends_at_its_closing_paren() {
    let tokens = lex_source_unwrap("begin CALL f(n) ► O(n) end end\n► O(n (log n)) else x");
    assert_eq!(tokens, vec![
        Token::KwBegin,
        Token::KwCall,
        Token::Identifier("f"),
        Token::LParen,
        Token::Identifier("n"),
        Token::RParen,
        Token::Hint(Growth::LINEAR),
        Token::KwEnd,
        Token::KwEnd,
        Token::Hint(Growth::LINEARITHMIC),
        Token::KwElse,
        Token::Identifier("x"),
    ]);
}

#[test]
fn test_hint_variables_are_whole_identifiers() {
    let cases = [
        ("► O(size)", Growth::LINEAR),
        ("► O(len)", Growth::LINEAR),
        ("► O(n + m)", Growth::LINEAR),
        ("► O(V+E)", Growth::LINEAR),
        ("► O(n^2 + n)", Growth::polynomial(2.0)),
        ("► O(V * E)", Growth::polynomial(2.0)),
        ("► O(nlogn)", Growth::LINEARITHMIC),
        ("► O(log_2 n)", Growth::LOGARITHMIC),
        ("► O(sqrt(n))", Growth::polynomial(0.5)),
    ];
    for (source, expected) in cases {
        assert_eq!(lex_source_unwrap(source), vec![Token::Hint(expected)], "hint `{}`", source);
    }
}

#[test]
fn test_remarks_and_comments_are_skipped() {
    let source = "x 🡨 1 ► asignación simple\n► Ordenar primero\n# comentario\n// otro comentario\nCALL combinar(A, n) ► Trabajo extra O(n)";
    let tokens = lex_source_unwrap(source);
    assert_eq!(tokens, vec![
        Token::Identifier("x"),
        Token::Arrow,
        Token::IntegerLiteral(1),
        Token::KwCall,
        Token::Identifier("combinar"),
        Token::LParen,
        Token::Identifier("A"),
        Token::Comma,
        Token::Identifier("n"),
        Token::RParen,
    ]);
}

#[test]
fn test_unsupported_words_are_lexed() {
    let tokens = lex_source_unwrap("goto Break caseta");
    assert_eq!(tokens, vec![
        Token::Unsupported("goto"),
        Token::Unsupported("Break"),
        Token::Identifier("caseta"),
    ]);
}

#[test]
fn test_spans_are_one_based_lines_and_columns() {
    let tokens = lex_source("begin\n  x 🡨 1\nend").expect("lexing failed");
    let (token, span) = tokens[1];
    assert_eq!(token, Token::Identifier("x"));
    assert_eq!((span.line, span.column), (2, 3));
    let (token, span) = tokens[4];
    assert_eq!(token, Token::KwEnd);
    assert_eq!((span.line, span.column), (3, 1));
}

#[test]
fn test_unrecognized_character() {
    let err = lex_source("x 🡨 @").expect_err("`@` should not lex");
    match err {
        LexicalError::UnrecognizedToken { position, unexpected, .. } => {
            assert_eq!(unexpected, '@');
            assert_eq!((position.line, position.column), (1, 5));
        }
        other => panic!("Expected UnrecognizedToken, got {:?}", other),
    }
}

#[test]
fn test_malformed_hint() {
    let err = lex_source("begin\n► O(n $ 2)\nend").expect_err("hint should be rejected");
    match err {
        LexicalError::MalformedHint { position, text } => {
            assert_eq!(position.line, 2);
            assert!(text.starts_with("► O("), "unexpected text {:?}", text);
        }
        other => panic!("Expected MalformedHint, got {:?}", other),
    }
}

#[test]
fn test_unclosed_hint_is_malformed() {
    let err = lex_source("► O(n log n\nend").expect_err("hint without `)` should be rejected");
    match err {
        LexicalError::MalformedHint { position, text } => {
            assert_eq!(position.line, 1);
            assert_eq!(text, "► O(n log n");
        }
        other => panic!("Expected MalformedHint, got {:?}", other),
    }
}
