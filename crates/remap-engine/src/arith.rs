//! Arithmetic equation parser and evaluator.
//!
//! Deliberately minimal grammar: `+ - * /`, parentheses, unary minus,
//! f64 literals, and field identifiers. An identifier may contain
//! alphanumerics, `_`, `.`, and `!`, so `destination!subtotal` routes
//! through the field router like any other field reference.
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := NUMBER | IDENT | '-' factor | '(' expr ')'
//! ```
//!
//! Equations parse once at program compilation; evaluation binds
//! identifiers through a lookup closure supplied per row.

use std::collections::BTreeSet;

use crate::error::{ConfigError, RuleError};

/// A compiled arithmetic equation.
#[derive(Debug, Clone)]
pub struct Equation {
    text: String,
    root: Expr,
}

#[derive(Debug, Clone)]
enum Expr {
    Number(f64),
    Field(String),
    Negate(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl Equation {
    /// Parse an equation, rejecting anything outside the restricted
    /// grammar.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let tokens = tokenize(text).map_err(|message| ConfigError::InvalidEquation {
            equation: text.to_string(),
            message,
        })?;

        let mut parser = Parser { tokens, pos: 0 };
        let root = parser
            .expr()
            .and_then(|expr| {
                if parser.pos == parser.tokens.len() {
                    Ok(expr)
                } else {
                    Err("unexpected trailing input".to_string())
                }
            })
            .map_err(|message| ConfigError::InvalidEquation {
                equation: text.to_string(),
                message,
            })?;

        Ok(Self {
            text: text.to_string(),
            root,
        })
    }

    /// The equation text as written.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Field identifiers referenced by the equation, deduplicated.
    pub fn identifiers(&self) -> BTreeSet<&str> {
        let mut fields = BTreeSet::new();
        collect_fields(&self.root, &mut fields);
        fields
    }

    /// Evaluate against a per-row binding of identifiers to numbers.
    ///
    /// The lookup reports its own failures (missing field, non-numeric
    /// value); division by zero surfaces as an expression error naming
    /// the equation.
    pub fn evaluate<F>(&self, lookup: &F) -> Result<f64, RuleError>
    where
        F: Fn(&str) -> Result<f64, RuleError>,
    {
        self.eval_node(&self.root, lookup)
    }

    fn eval_node<F>(&self, node: &Expr, lookup: &F) -> Result<f64, RuleError>
    where
        F: Fn(&str) -> Result<f64, RuleError>,
    {
        match node {
            Expr::Number(n) => Ok(*n),
            Expr::Field(name) => lookup(name),
            Expr::Negate(inner) => Ok(-self.eval_node(inner, lookup)?),
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval_node(lhs, lookup)?;
                let rhs = self.eval_node(rhs, lookup)?;
                match op {
                    BinOp::Add => Ok(lhs + rhs),
                    BinOp::Sub => Ok(lhs - rhs),
                    BinOp::Mul => Ok(lhs * rhs),
                    BinOp::Div => {
                        if rhs == 0.0 {
                            Err(RuleError::Expression {
                                expression: self.text.clone(),
                                reason: "division by zero".into(),
                            })
                        } else {
                            Ok(lhs / rhs)
                        }
                    }
                }
            }
        }
    }
}

fn collect_fields<'a>(node: &'a Expr, fields: &mut BTreeSet<&'a str>) {
    match node {
        Expr::Number(_) => {}
        Expr::Field(name) => {
            fields.insert(name.as_str());
        }
        Expr::Negate(inner) => collect_fields(inner, fields),
        Expr::Binary { lhs, rhs, .. } => {
            collect_fields(lhs, fields);
            collect_fields(rhs, fields);
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '!')
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let number = literal
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number literal '{literal}'"))?;
                tokens.push(Token::Number(number));
            }
            c if is_ident_start(c) => {
                let start = i;
                while i < chars.len() && is_ident_char(chars[i]) {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expr(&mut self) -> Result<Expr, String> {
        let mut lhs = self.term()?;
        while let Some(op) = match self.peek() {
            Some(Token::Plus) => Some(BinOp::Add),
            Some(Token::Minus) => Some(BinOp::Sub),
            _ => None,
        } {
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, String> {
        let mut lhs = self.factor()?;
        while let Some(op) = match self.peek() {
            Some(Token::Star) => Some(BinOp::Mul),
            Some(Token::Slash) => Some(BinOp::Div),
            _ => None,
        } {
            self.pos += 1;
            let rhs = self.factor()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn factor(&mut self) -> Result<Expr, String> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Ident(name)) => Ok(Expr::Field(name)),
            Some(Token::Minus) => Ok(Expr::Negate(Box::new(self.factor()?))),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err("expected ')'".to_string()),
                }
            }
            Some(other) => Err(format!("unexpected token {other:?}")),
            None => Err("unexpected end of equation".to_string()),
        }
    }
}
