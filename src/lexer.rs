// src/lexer.rs
use crate::token::{LexicalError, Spanned, Token};
use crate::utils::LineIndex;
use logos::Logos;

pub fn lex_source<'source>(source: &'source str) -> Result<Vec<Spanned<'source>>, LexicalError> {
    let index = LineIndex::new(source);
    Token::lexer(source)
        .spanned()
        .map(|(tok_res, range)| {
            let span = index.span(range.clone());
            match tok_res {
                Ok(token) => Ok((token, span)),
                Err(_) => {
                    let slice = &source[range];
                    if slice.starts_with('►') {
                        Err(LexicalError::MalformedHint { position: span, text: slice.trim().to_string() })
                    } else {
                        Err(LexicalError::UnrecognizedToken {
                            position: span,
                            unexpected: slice.chars().next().unwrap_or('\0'),
                            context: index.excerpt(span, 10),
                        })
                    }
                }
            }
        })
        .collect()
}
