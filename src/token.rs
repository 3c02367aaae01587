// src/token.rs
use crate::complexity::Growth;
use logos::Logos;
use serde::Serialize;
use std::fmt;

#[derive(Logos, Debug, PartialEq, Clone, Copy)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"#[^\n]*")]
pub enum Token<'source> {
    // Block structure
    #[token("begin", ignore(ascii_case))] KwBegin,
    #[token("end", ignore(ascii_case))] KwEnd,

    // Loops
    #[token("for", ignore(ascii_case))] KwFor,
    #[token("to", ignore(ascii_case))] KwTo,
    #[token("downto", ignore(ascii_case))] KwDownto,
    #[token("step", ignore(ascii_case))] KwStep,
    #[token("do", ignore(ascii_case))] KwDo,
    #[token("while", ignore(ascii_case))] KwWhile,
    #[token("repeat", ignore(ascii_case))] KwRepeat,
    #[token("until", ignore(ascii_case))] KwUntil,

    // Conditionals
    #[token("if", ignore(ascii_case))] KwIf,
    #[token("then", ignore(ascii_case))] KwThen,
    #[token("else", ignore(ascii_case))] KwElse,

    #[token("return", ignore(ascii_case))] KwReturn,
    #[token("CALL", ignore(ascii_case))] KwCall,
    #[token("length", ignore(ascii_case))] KwLength,

    // Word operators
    #[token("and", ignore(ascii_case))] KwAnd,
    #[token("or", ignore(ascii_case))] KwOr,
    #[token("not", ignore(ascii_case))] KwNot,
    #[token("mod", ignore(ascii_case))] KwMod,
    #[token("div", ignore(ascii_case))] KwDiv,

    /// Palavras-chave de linguagens de uso geral que o dialeto não modela.
    #[regex("(?i:goto|break|continue|switch|case)", |lex| lex.slice())]
    Unsupported(&'source str),

    #[regex("[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice())]
    Identifier(&'source str),

    // Literals
    #[regex("[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    IntegerLiteral(i64),
    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    DecimalLiteral(f64),

    /// `► O(...)`: anotação de complexidade escrita pelo autor. O token vai
    /// só até o `)` correspondente; o resto da linha continua sendo lexado.
    #[regex(r"►[ \t]*[Oo]\(", lex_hint)]
    Hint(Growth),
    /// `►` seguido de prosa é um comentário.
    #[regex(r"►[ \t]*([^Oo \t\n][^\n]*|[Oo]([^(\n][^\n]*)?)?", logos::skip)]
    Remark,

    // Assignment
    #[token("🡨")]
    #[token("←")]
    #[token("<-")]
    #[token(":=")]
    Arrow,

    // Operators
    #[token("+")] Plus,
    #[token("-")] Minus,
    #[token("*")] Star,
    #[token("/")] Slash,
    #[token("%")] Percent,
    #[token("^")] Caret,
    #[token("=")]
    #[token("==")]
    Equal,
    #[token("!=")]
    #[token("<>")]
    #[token("≠")]
    NotEqual,
    #[token("<")] LessThan,
    #[token("<=")]
    #[token("≤")]
    LessThanEqual,
    #[token(">")] GreaterThan,
    #[token(">=")]
    #[token("≥")]
    GreaterThanEqual,

    // Punctuation
    #[token("(")] LParen,
    #[token(")")] RParen,
    #[token("[")] LBracket,
    #[token("]")] RBracket,
    #[token(",")] Comma,
    #[token(".")] Dot,
    #[token(";")] Semicolon,
}

/// Consome o texto até o `)` que fecha o `O(` e interpreta o literal.
/// Sem fechamento na mesma linha, o token cobre a linha e vira erro.
fn lex_hint<'source>(lex: &mut logos::Lexer<'source, Token<'source>>) -> Option<Growth> {
    let rest = lex.remainder();
    let line = rest.find('\n').map_or(rest, |end| &rest[..end]);
    let mut depth = 1usize;
    for (idx, ch) in line.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    lex.bump(idx + 1);
                    return Growth::parse_hint(&line[..idx]);
                }
            }
            _ => {}
        }
    }
    lex.bump(line.len());
    None
}

impl<'source> fmt::Display for Token<'source> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Identifier(name) => write!(f, "identifier `{}`", name),
            Token::IntegerLiteral(v) => write!(f, "number `{}`", v),
            Token::DecimalLiteral(v) => write!(f, "number `{}`", v),
            Token::Unsupported(word) => write!(f, "`{}`", word),
            Token::Hint(g) => write!(f, "hint `O({})`", g),
            Token::Arrow => write!(f, "`🡨`"),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Posição de um token no fonte: faixa de bytes mais linha e coluna a partir de 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

pub type Spanned<'source> = (Token<'source>, Span);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexicalError {
    #[error("Unrecognized character {unexpected:?} at {position} (near `{context}`)")]
    UnrecognizedToken { position: Span, unexpected: char, context: String },
    #[error("Malformed complexity hint `{text}` at {position}")]
    MalformedHint { position: Span, text: String },
}

impl LexicalError {
    pub fn position(&self) -> Span {
        match self {
            LexicalError::UnrecognizedToken { position, .. } | LexicalError::MalformedHint { position, .. } => *position,
        }
    }
}
