// src/ast.rs
use crate::complexity::Growth;
use crate::token::Span;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BinaryOperator {
    Add, Sub, Mul, Div, IntDiv, Mod, Pow,
    Eq, Neq, Lt, Gt, Lte, Gte,
    And, Or,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum UnaryOperator {
    Neg,
    Not,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Expr {
    Number(f64),
    Identifier(String),
    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    /// `A[i]`, `A[i][j]` ou `A[i, j]`.
    Index {
        base: String,
        indices: Vec<Expr>,
    },
    /// `obj.field`
    Field {
        base: Box<Expr>,
        field: String,
    },
    /// A função embutida `length(...)`.
    Length(Box<Expr>),
    Call(CallExpr),
}

impl Expr {
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Expr::Identifier(name) => Some(name),
            _ => None,
        }
    }

    pub fn number(&self) -> Option<f64> {
        match self {
            Expr::Number(v) => Some(*v),
            Expr::Unary { op: UnaryOperator::Neg, operand } => operand.number().map(|v| -v),
            _ => None,
        }
    }

    /// Visita esta expressão e todas as subexpressões, pais primeiro.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Expr)) {
        visit(self);
        match self {
            Expr::Number(_) | Expr::Identifier(_) => {}
            Expr::Binary { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Expr::Unary { operand, .. } => operand.walk(visit),
            Expr::Index { indices, .. } => {
                for index in indices {
                    index.walk(visit);
                }
            }
            Expr::Field { base, .. } => base.walk(visit),
            Expr::Length(inner) => inner.walk(visit),
            Expr::Call(call) => {
                for arg in &call.args {
                    arg.walk(visit);
                }
            }
        }
    }

    pub fn mentions(&self, name: &str) -> bool {
        let mut found = false;
        self.walk(&mut |e| match e {
            Expr::Identifier(id) if id == name => found = true,
            Expr::Index { base, .. } if base == name => found = true,
            _ => {}
        });
        found
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct CallExpr {
    pub name: String,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum LoopDirection {
    Up,
    Down,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Block {
    pub statements: Vec<Statement>,
    /// Anotação de complexidade que substitui o que for inferido para este bloco.
    pub hint: Option<Growth>,
    pub span: Span,
}

impl Block {
    pub fn new(statements: Vec<Statement>, span: Span) -> Self {
        Block { statements, hint: None, span }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Statement {
    Block(Block),
    For {
        var: String,
        start: Expr,
        end: Expr,
        direction: LoopDirection,
        step: Option<Expr>,
        body: Block,
        span: Span,
    },
    While {
        condition: Expr,
        body: Block,
        span: Span,
    },
    Repeat {
        body: Block,
        condition: Expr,
        span: Span,
    },
    If {
        condition: Expr,
        then_block: Block,
        else_block: Option<Block>,
        span: Span,
    },
    Assignment {
        target: Expr,
        value: Expr,
        span: Span,
    },
    Return {
        value: Option<Expr>,
        span: Span,
    },
    Call(CallExpr),
    Declaration(Declaration),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Block(block) => block.span,
            Statement::For { span, .. }
            | Statement::While { span, .. }
            | Statement::Repeat { span, .. }
            | Statement::If { span, .. }
            | Statement::Assignment { span, .. }
            | Statement::Return { span, .. } => *span,
            Statement::Call(call) => call.span,
            Statement::Declaration(decl) => decl.span,
        }
    }
}

/// `datos[10]`, `Casa mi_casa` ou um `i` solto.
#[derive(Debug, PartialEq, Clone)]
pub struct Declaration {
    pub name: String,
    pub type_name: Option<String>,
    /// Uma extensão por dimensão; vazio para escalares.
    pub shape: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    /// Declarações escritas antes do `begin`.
    pub prelude: Vec<Declaration>,
    pub body: Block,
    pub span: Span,
}

impl Function {
    /// Tabelas declaradas, no prelúdio ou em qualquer ponto do corpo.
    pub fn declarations(&self) -> Vec<&Declaration> {
        let mut out: Vec<&Declaration> = self.prelude.iter().collect();
        visit_statements(&self.body, &mut |stmt| {
            if let Statement::Declaration(decl) = stmt {
                out.push(decl);
            }
        });
        out
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Program {
    pub functions: Vec<Function>,
}

impl Program {
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// Percorre em pré-ordem todos os comandos de um bloco, aninhados inclusive.
pub fn visit_statements<'a>(block: &'a Block, visit: &mut dyn FnMut(&'a Statement)) {
    walk_statements(block, false, visit);
}

/// Como `visit_statements`, mas sem entrar em blocos anotados: o custo deles
/// é o da anotação e o conteúdo não conta para nenhuma análise.
pub fn visit_unhinted<'a>(block: &'a Block, visit: &mut dyn FnMut(&'a Statement)) {
    walk_statements(block, true, visit);
}

fn walk_statements<'a>(block: &'a Block, skip_hinted: bool, visit: &mut dyn FnMut(&'a Statement)) {
    if skip_hinted && block.hint.is_some() {
        return;
    }
    for stmt in &block.statements {
        visit(stmt);
        match stmt {
            Statement::Block(inner) => walk_statements(inner, skip_hinted, visit),
            Statement::For { body, .. } | Statement::While { body, .. } | Statement::Repeat { body, .. } => {
                walk_statements(body, skip_hinted, visit)
            }
            Statement::If { then_block, else_block, .. } => {
                walk_statements(then_block, skip_hinted, visit);
                if let Some(else_block) = else_block {
                    walk_statements(else_block, skip_hinted, visit);
                }
            }
            Statement::Assignment { .. } | Statement::Return { .. } | Statement::Call(_) | Statement::Declaration(_) => {}
        }
    }
}

/// Expressões que aparecem diretamente num comando (fora de blocos aninhados).
pub fn statement_exprs(stmt: &Statement) -> Vec<&Expr> {
    match stmt {
        Statement::Block(_) => vec![],
        Statement::For { start, end, step, .. } => {
            let mut exprs = vec![start, end];
            exprs.extend(step.iter());
            exprs
        }
        Statement::While { condition, .. } | Statement::Repeat { condition, .. } | Statement::If { condition, .. } => {
            vec![condition]
        }
        Statement::Assignment { target, value, .. } => vec![target, value],
        Statement::Return { value, .. } => value.iter().collect(),
        Statement::Call(call) => call.args.iter().collect(),
        Statement::Declaration(decl) => decl.shape.iter().collect(),
    }
}

/// Todas as chamadas alcançáveis a partir de um bloco, como comando ou dentro de expressões.
pub fn collect_calls(block: &Block) -> Vec<&CallExpr> {
    calls_in(block, false)
}

/// Chamadas fora de blocos anotados.
pub fn collect_unhinted_calls(block: &Block) -> Vec<&CallExpr> {
    calls_in(block, true)
}

fn calls_in(block: &Block, skip_hinted: bool) -> Vec<&CallExpr> {
    let mut calls = Vec::new();
    walk_statements(block, skip_hinted, &mut |stmt| {
        if let Statement::Call(call) = stmt {
            calls.push(call);
        }
        for expr in statement_exprs(stmt) {
            expr.walk(&mut |e| {
                if let Expr::Call(call) = e {
                    calls.push(call);
                }
            });
        }
    });
    calls
}
