// src/parser.rs
use crate::ast::*;
use crate::complexity::Growth;
use crate::token::{Span, Spanned, Token};
use std::mem::discriminant;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("Unexpected token: expected {expected} but found {found} at {span}")]
    UnexpectedToken { expected: String, found: String, span: Span },
    #[error("Unexpected end of input while expecting {expected} (after {span})")]
    UnexpectedEof { expected: String, span: Span },
    #[error("Block opened at {opened_at} is never closed")]
    UnclosedBlock { opened_at: Span },
    #[error("`end` at {span} does not close any open block")]
    UnmatchedEnd { span: Span },
    #[error("Function `{name}` defined twice (second definition at {span})")]
    DuplicateFunction { name: String, span: Span },
    #[error("Unsupported construct `{construct}` at {span}")]
    Unsupported { construct: String, span: Span },
}

impl ParseError {
    pub fn position(&self) -> Span {
        match self {
            ParseError::UnexpectedToken { span, .. }
            | ParseError::UnexpectedEof { span, .. }
            | ParseError::UnmatchedEnd { span }
            | ParseError::DuplicateFunction { span, .. }
            | ParseError::Unsupported { span, .. } => *span,
            ParseError::UnclosedBlock { opened_at } => *opened_at,
        }
    }
}

type ParseResult<T> = Result<T, ParseError>;

pub struct Parser<'a, 'source> {
    tokens: &'a [Spanned<'source>],
    pos: usize,
    /// Posições de cada `begin` (ou corpo solto de `if`/`repeat`) ainda não fechado.
    open_scopes: Vec<Span>,
    current_span: Span, // span of the last consumed token
}

impl<'a, 'source> Parser<'a, 'source> {
    pub fn new(tokens: &'a [Spanned<'source>]) -> Self {
        Parser { tokens, pos: 0, open_scopes: Vec::new(), current_span: Span::default() }
    }

    fn peek(&self) -> Option<&Token<'source>> {
        self.tokens.get(self.pos).map(|(tok, _)| tok)
    }

    fn peek_nth(&self, n: usize) -> Option<&Token<'source>> {
        self.tokens.get(self.pos + n).map(|(tok, _)| tok)
    }

    fn peek_span(&self) -> Span {
        self.tokens.get(self.pos).map(|(_, span)| *span).unwrap_or(self.current_span)
    }

    fn at(&self, expected: &Token<'_>) -> bool {
        self.peek().is_some_and(|tok| discriminant(tok) == discriminant(expected))
    }

    /// Verdadeiro quando o próximo token existe e está na linha do último consumido.
    fn next_on_same_line(&self) -> bool {
        self.tokens.get(self.pos).is_some_and(|(_, span)| span.line == self.current_span.line)
    }

    fn advance(&mut self) -> Option<Spanned<'source>> {
        let item = self.tokens.get(self.pos).copied();
        if let Some((_, span)) = item {
            self.current_span = span;
            self.pos += 1;
        }
        item
    }

    fn consume_token_if(&mut self, p: impl FnOnce(&Token<'source>) -> bool) -> Option<Spanned<'source>> {
        if self.peek().is_some_and(p) {
            self.advance()
        } else {
            None
        }
    }

    fn unexpected<T>(&self, expected: &str) -> ParseResult<T> {
        match self.tokens.get(self.pos) {
            Some((Token::Unsupported(word), span)) => {
                Err(ParseError::Unsupported { construct: word.to_string(), span: *span })
            }
            Some((tok, span)) => Err(ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: tok.to_string(),
                span: *span,
            }),
            None => match self.open_scopes.last() {
                Some(opened_at) => Err(ParseError::UnclosedBlock { opened_at: *opened_at }),
                None => Err(ParseError::UnexpectedEof { expected: expected.to_string(), span: self.current_span }),
            },
        }
    }

    fn expect(&mut self, expected: &Token<'_>, expected_desc: &str) -> ParseResult<Span> {
        if self.at(expected) {
            Ok(self.advance().map(|(_, span)| span).unwrap_or(self.current_span))
        } else {
            self.unexpected(expected_desc)
        }
    }

    fn expect_identifier(&mut self, expected_desc: &str) -> ParseResult<(String, Span)> {
        match self.peek() {
            Some(Token::Identifier(name)) => {
                let name = name.to_string();
                let span = self.peek_span();
                self.advance();
                Ok((name, span))
            }
            _ => self.unexpected(expected_desc),
        }
    }

    pub fn parse_program(&mut self) -> ParseResult<Program> {
        let mut functions: Vec<Function> = Vec::new();
        let mut anonymous = 0;
        while self.peek().is_some() {
            let function = self.parse_function(&mut anonymous)?;
            if functions.iter().any(|f| f.name == function.name) {
                return Err(ParseError::DuplicateFunction { name: function.name, span: function.span });
            }
            trace!(name = %function.name, params = ?function.params, "parsed function");
            functions.push(function);
        }
        if functions.is_empty() {
            return Err(ParseError::UnexpectedEof { expected: "function body (`begin`)".to_string(), span: self.current_span });
        }
        Ok(Program { functions })
    }

    /// `hint? prelude* header? prelude* block`
    fn parse_function(&mut self, anonymous: &mut usize) -> ParseResult<Function> {
        let span = self.peek_span();
        let mut hint: Option<Growth> = None;
        let mut header: Option<(String, Vec<String>)> = None;
        let mut prelude = Vec::new();

        loop {
            match self.peek() {
                Some(Token::KwBegin) => break,
                Some(Token::KwEnd) => return Err(ParseError::UnmatchedEnd { span: self.peek_span() }),
                Some(Token::Semicolon) => {
                    self.advance();
                }
                Some(Token::Hint(growth)) => {
                    hint = Some(*growth);
                    self.advance();
                }
                Some(Token::Identifier(_)) if header.is_none() && self.peek_nth(1) == Some(&Token::LParen) => {
                    header = Some(self.parse_header()?);
                }
                Some(Token::Identifier(_)) => prelude.push(self.parse_declaration()?),
                _ => return self.unexpected("function header, declaration or `begin`"),
            }
        }

        let mut body = self.parse_block()?;
        if body.hint.is_none() {
            body.hint = hint;
        }

        let (name, params) = header.unwrap_or_else(|| {
            *anonymous += 1;
            let name = if *anonymous == 1 { "main".to_string() } else { format!("main_{}", anonymous) };
            (name, Vec::new())
        });
        Ok(Function { name, params, prelude, body, span })
    }

    fn parse_header(&mut self) -> ParseResult<(String, Vec<String>)> {
        let (name, _) = self.expect_identifier("function name")?;
        self.expect(&Token::LParen, "`(`")?;
        let mut params = Vec::new();
        while !self.at(&Token::RParen) {
            let (param, _) = self.expect_identifier("parameter name")?;
            // Anotações no estilo `A[1..n]` em parâmetros não trazem informação de custo.
            if self.at(&Token::LBracket) {
                self.skip_brackets()?;
            }
            params.push(param);
            if self.consume_token_if(|t| *t == Token::Comma).is_none() {
                break;
            }
        }
        self.expect(&Token::RParen, "`)`")?;
        Ok((name, params))
    }

    fn skip_brackets(&mut self) -> ParseResult<()> {
        let mut depth = 0usize;
        loop {
            match self.advance() {
                Some((Token::LBracket, _)) => depth += 1,
                Some((Token::RBracket, _)) => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some(_) => {}
                None => return self.unexpected("`]`"),
            }
        }
    }

    /// `ident ("[" expr ("," expr)* "]")*`, `Tipo ident` ou um `ident` solto.
    fn parse_declaration(&mut self) -> ParseResult<Declaration> {
        let (first, span) = self.expect_identifier("declaration")?;
        let mut shape = Vec::new();
        while self.at(&Token::LBracket) {
            self.advance();
            if !self.at(&Token::RBracket) {
                shape.push(self.parse_expression()?);
                while self.consume_token_if(|t| *t == Token::Comma).is_some() {
                    shape.push(self.parse_expression()?);
                }
            }
            self.expect(&Token::RBracket, "`]`")?;
        }
        if shape.is_empty() && self.next_on_same_line() {
            if let Some(Token::Identifier(second)) = self.peek() {
                let second = second.to_string();
                self.advance();
                return Ok(Declaration { name: second, type_name: Some(first), shape, span });
            }
        }
        Ok(Declaration { name: first, type_name: None, shape, span })
    }

    fn parse_block(&mut self) -> ParseResult<Block> {
        let span = self.expect(&Token::KwBegin, "`begin`")?;
        self.open_scopes.push(span);
        let mut statements = Vec::new();
        while !self.at(&Token::KwEnd) {
            if self.peek().is_none() {
                return Err(ParseError::UnclosedBlock { opened_at: span });
            }
            if self.consume_token_if(|t| *t == Token::Semicolon).is_some() {
                continue;
            }
            statements.push(self.parse_statement()?);
        }
        self.advance();
        self.open_scopes.pop();
        Ok(Block::new(statements, span))
    }

    /// Um bloco `begin … end`, ou um comando único embrulhado num bloco.
    fn parse_body(&mut self) -> ParseResult<Block> {
        if self.at(&Token::KwBegin) {
            self.parse_block()
        } else {
            let span = self.peek_span();
            let stmt = self.parse_statement()?;
            Ok(Block::new(vec![stmt], span))
        }
    }

    /// Comandos até (sem incluir) um dos `terminators`; os corpos soltos
    /// de `if … then … end` e `repeat … until`.
    fn parse_bare_statements(&mut self, opened_at: Span, terminators: &[Token<'_>]) -> ParseResult<Block> {
        self.open_scopes.push(opened_at);
        let mut statements = Vec::new();
        loop {
            match self.peek() {
                None => return Err(ParseError::UnclosedBlock { opened_at }),
                Some(tok) if terminators.iter().any(|t| discriminant(t) == discriminant(tok)) => break,
                Some(Token::KwEnd) => {
                    let expected: Vec<String> = terminators.iter().map(|t| t.to_string()).collect();
                    return self.unexpected(&expected.join(" or "));
                }
                Some(Token::Semicolon) => {
                    self.advance();
                }
                Some(_) => statements.push(self.parse_statement()?),
            }
        }
        self.open_scopes.pop();
        Ok(Block::new(statements, opened_at))
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        let span = self.peek_span();
        let stmt = match self.peek() {
            Some(Token::Hint(growth)) => {
                let growth = *growth;
                self.advance();
                if self.peek().is_none() || self.at(&Token::KwEnd) || self.at(&Token::KwUntil) || self.at(&Token::KwElse) {
                    return self.unexpected("statement after complexity hint");
                }
                let stmt = self.parse_statement()?;
                return Ok(attach_hint(stmt, growth));
            }
            Some(Token::KwBegin) => Statement::Block(self.parse_block()?),
            Some(Token::KwFor) => self.parse_for()?,
            Some(Token::KwWhile) => self.parse_while()?,
            Some(Token::KwRepeat) => self.parse_repeat()?,
            Some(Token::KwIf) => self.parse_if()?,
            Some(Token::KwReturn) => self.parse_return()?,
            Some(Token::KwCall) => {
                self.advance();
                Statement::Call(self.parse_call_tail(span)?)
            }
            Some(Token::Identifier(_)) => self.parse_identifier_statement()?,
            Some(Token::KwEnd) => return Err(ParseError::UnmatchedEnd { span }),
            _ => return self.unexpected("statement"),
        };

        // `CALL f(n) ► O(n)`: anotação na mesma linha vale para o comando anterior.
        if let Some(Token::Hint(growth)) = self.peek() {
            if self.next_on_same_line() {
                let growth = *growth;
                self.advance();
                return Ok(attach_hint(stmt, growth));
            }
        }
        Ok(stmt)
    }

    fn parse_for(&mut self) -> ParseResult<Statement> {
        let span = self.expect(&Token::KwFor, "`for`")?;
        let (var, _) = self.expect_identifier("loop variable")?;
        self.expect(&Token::Arrow, "`🡨`")?;
        let start = self.parse_expression()?;
        let direction = match self.peek() {
            Some(Token::KwTo) => LoopDirection::Up,
            Some(Token::KwDownto) => LoopDirection::Down,
            _ => return self.unexpected("`to` or `downto`"),
        };
        self.advance();
        let end = self.parse_expression()?;
        let step = if self.consume_token_if(|t| *t == Token::KwStep).is_some() {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(&Token::KwDo, "`do`")?;
        let body = self.parse_body()?;
        Ok(Statement::For { var, start, end, direction, step, body, span })
    }

    fn parse_while(&mut self) -> ParseResult<Statement> {
        let span = self.expect(&Token::KwWhile, "`while`")?;
        let condition = self.parse_condition()?;
        self.expect(&Token::KwDo, "`do`")?;
        let body = self.parse_body()?;
        Ok(Statement::While { condition, body, span })
    }

    fn parse_repeat(&mut self) -> ParseResult<Statement> {
        let span = self.expect(&Token::KwRepeat, "`repeat`")?;
        let body = if self.at(&Token::KwBegin) {
            self.parse_block()?
        } else {
            self.parse_bare_statements(span, &[Token::KwUntil])?
        };
        self.expect(&Token::KwUntil, "`until`")?;
        let condition = self.parse_condition()?;
        Ok(Statement::Repeat { body, condition, span })
    }

    fn parse_if(&mut self) -> ParseResult<Statement> {
        let span = self.expect(&Token::KwIf, "`if`")?;
        let condition = self.parse_condition()?;
        self.expect(&Token::KwThen, "`then`")?;

        let then_block = if self.at(&Token::KwBegin) {
            self.parse_block()?
        } else {
            let block = self.parse_bare_statements(span, &[Token::KwElse, Token::KwEnd])?;
            if self.at(&Token::KwEnd) {
                self.advance();
            }
            block
        };

        let else_block = if self.at(&Token::KwElse) {
            let else_span = self.expect(&Token::KwElse, "`else`")?;
            Some(if self.at(&Token::KwBegin) {
                self.parse_block()?
            } else if self.at(&Token::KwIf) {
                let nested = self.parse_if()?;
                Block::new(vec![nested], else_span)
            } else {
                let block = self.parse_bare_statements(else_span, &[Token::KwEnd])?;
                self.expect(&Token::KwEnd, "`end`")?;
                block
            })
        } else {
            None
        };
        Ok(Statement::If { condition, then_block, else_block, span })
    }

    fn parse_return(&mut self) -> ParseResult<Statement> {
        let span = self.expect(&Token::KwReturn, "`return`")?;
        let starts_expression = matches!(
            self.peek(),
            Some(
                Token::Identifier(_)
                    | Token::IntegerLiteral(_)
                    | Token::DecimalLiteral(_)
                    | Token::LParen
                    | Token::Minus
                    | Token::KwNot
                    | Token::KwLength
                    | Token::KwCall
            )
        );
        let value = if starts_expression && self.next_on_same_line() {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(Statement::Return { value, span })
    }

    /// `nome "(" args ")"` depois de um `CALL` opcional.
    fn parse_call_tail(&mut self, span: Span) -> ParseResult<CallExpr> {
        let (name, _) = self.expect_identifier("function name")?;
        self.expect(&Token::LParen, "`(`")?;
        let mut args = Vec::new();
        if !self.at(&Token::RParen) {
            args.push(self.parse_expression()?);
            while self.consume_token_if(|t| *t == Token::Comma).is_some() {
                args.push(self.parse_expression()?);
            }
        }
        self.expect(&Token::RParen, "`)`")?;
        Ok(CallExpr { name, args, span })
    }

    /// Atribuição, chamada sem `CALL` ou declaração; todas começam com um nome.
    fn parse_identifier_statement(&mut self) -> ParseResult<Statement> {
        let span = self.peek_span();
        match self.peek_nth(1) {
            Some(Token::LParen) => return Ok(Statement::Call(self.parse_call_tail(span)?)),
            Some(Token::Arrow) | Some(Token::LBracket) | Some(Token::Dot) => {}
            _ => return Ok(Statement::Declaration(self.parse_declaration()?)),
        }

        let target = self.parse_postfix_expression()?;
        if self.consume_token_if(|t| *t == Token::Arrow).is_some() {
            let value = self.parse_expression()?;
            return Ok(Statement::Assignment { target, value, span });
        }
        match target {
            Expr::Index { base, indices } => {
                Ok(Statement::Declaration(Declaration { name: base, type_name: None, shape: indices, span }))
            }
            _ => self.unexpected("`🡨`"),
        }
    }

    fn parse_condition(&mut self) -> ParseResult<Expr> {
        if !self.at(&Token::LParen) {
            return self.unexpected("`(` opening the condition");
        }
        self.parse_expression()
    }

    pub fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.consume_token_if(|t| *t == Token::KwOr).is_some() {
            let rhs = self.parse_and()?;
            lhs = binary(BinaryOperator::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_not()?;
        while self.consume_token_if(|t| *t == Token::KwAnd).is_some() {
            let rhs = self.parse_not()?;
            lhs = binary(BinaryOperator::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> ParseResult<Expr> {
        if self.consume_token_if(|t| *t == Token::KwNot).is_some() {
            let operand = self.parse_not()?;
            return Ok(Expr::Unary { op: UnaryOperator::Not, operand: Box::new(operand) });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let lhs = self.parse_additive()?;
        let op = match self.peek() {
            Some(Token::Equal) => BinaryOperator::Eq,
            Some(Token::NotEqual) => BinaryOperator::Neq,
            Some(Token::LessThan) => BinaryOperator::Lt,
            Some(Token::LessThanEqual) => BinaryOperator::Lte,
            Some(Token::GreaterThan) => BinaryOperator::Gt,
            Some(Token::GreaterThanEqual) => BinaryOperator::Gte,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.parse_additive()?;
        Ok(binary(op, lhs, rhs))
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOperator::Add,
                Some(Token::Minus) => BinaryOperator::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOperator::Mul,
                Some(Token::Slash) => BinaryOperator::Div,
                Some(Token::KwDiv) => BinaryOperator::IntDiv,
                Some(Token::Percent) | Some(Token::KwMod) => BinaryOperator::Mod,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        if self.consume_token_if(|t| *t == Token::Minus).is_some() {
            let operand = self.parse_unary()?;
            return Ok(match operand {
                Expr::Number(v) => Expr::Number(-v),
                other => Expr::Unary { op: UnaryOperator::Neg, operand: Box::new(other) },
            });
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> ParseResult<Expr> {
        let base = self.parse_postfix_expression()?;
        if self.consume_token_if(|t| *t == Token::Caret).is_some() {
            let exponent = self.parse_unary()?;
            return Ok(binary(BinaryOperator::Pow, base, exponent));
        }
        Ok(base)
    }

    fn parse_postfix_expression(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary_expression()?;
        loop {
            if self.at(&Token::LBracket) {
                let bracket_span = self.peek_span();
                self.advance();
                let mut new_indices = vec![self.parse_expression()?];
                while self.consume_token_if(|t| *t == Token::Comma).is_some() {
                    new_indices.push(self.parse_expression()?);
                }
                self.expect(&Token::RBracket, "`]`")?;
                expr = match expr {
                    Expr::Identifier(base) => Expr::Index { base, indices: new_indices },
                    Expr::Index { base, mut indices } => {
                        indices.extend(new_indices);
                        Expr::Index { base, indices }
                    }
                    _ => {
                        return Err(ParseError::UnexpectedToken {
                            expected: "an array name before `[`".to_string(),
                            found: "`[`".to_string(),
                            span: bracket_span,
                        })
                    }
                };
            } else if self.consume_token_if(|t| *t == Token::Dot).is_some() {
                let (field, _) = self.expect_identifier("field name")?;
                expr = Expr::Field { base: Box::new(expr), field };
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary_expression(&mut self) -> ParseResult<Expr> {
        let span = self.peek_span();
        match self.peek() {
            Some(Token::IntegerLiteral(v)) => {
                let v = *v as f64;
                self.advance();
                Ok(Expr::Number(v))
            }
            Some(Token::DecimalLiteral(v)) => {
                let v = *v;
                self.advance();
                Ok(Expr::Number(v))
            }
            Some(Token::Identifier(_)) if self.peek_nth(1) == Some(&Token::LParen) => {
                Ok(Expr::Call(self.parse_call_tail(span)?))
            }
            Some(Token::Identifier(name)) => {
                let name = name.to_string();
                self.advance();
                Ok(Expr::Identifier(name))
            }
            Some(Token::KwCall) => {
                self.advance();
                Ok(Expr::Call(self.parse_call_tail(span)?))
            }
            Some(Token::KwLength) => {
                self.advance();
                self.expect(&Token::LParen, "`(` after `length`")?;
                let inner = self.parse_expression()?;
                self.expect(&Token::RParen, "`)`")?;
                Ok(Expr::Length(Box::new(inner)))
            }
            Some(Token::LParen) => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&Token::RParen, "`)`")?;
                Ok(inner)
            }
            _ => self.unexpected("expression"),
        }
    }
}

fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Expr {
    Expr::Binary { op, left: Box::new(left), right: Box::new(right) }
}

fn attach_hint(stmt: Statement, growth: Growth) -> Statement {
    match stmt {
        Statement::Block(mut block) if block.hint.is_none() => {
            block.hint = Some(growth);
            Statement::Block(block)
        }
        other => {
            let span = other.span();
            let mut block = Block::new(vec![other], span);
            block.hint = Some(growth);
            Statement::Block(block)
        }
    }
}
