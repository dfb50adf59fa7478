//! Arithmetic and boolean conditions over named numeric variables.
//!
//! Quarterly effects and endings are authored as strings such as
//! `score >= 70` or `trust < 20 || stakeholder < 15`. They are checked
//! against a character whitelist, parsed into an [`Expr`] tree once, and
//! evaluated against a variable lookup. Nothing is ever executed as code.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("character {0:?} is not allowed in conditions")]
    ForbiddenCharacter(char),
    #[error("malformed number {0:?}")]
    BadNumber(String),
    #[error("unexpected token {0}")]
    Unexpected(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unknown variable {0:?}")]
    UnknownVariable(String),
    #[error("expression nests deeper than {MAX_DEPTH} levels")]
    TooDeep,
    #[error("expression has more than {MAX_TOKENS} tokens")]
    TooLong,
}

/// Deepest allowed nesting of parentheses and unary operators.
pub const MAX_DEPTH: usize = 64;
/// Longest allowed expression, in tokens. Bounds the depth of left-leaning
/// operator chains as well.
pub const MAX_TOKENS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Var(String),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(BinaryOp),
    Not,
    LParen,
    RParen,
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || c.is_ascii_whitespace()
        || matches!(
            c,
            '_' | '.' | '+' | '-' | '*' | '/' | '%' | '(' | ')' | '<' | '>' | '=' | '!' | '&' | '|'
        )
}

fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    if let Some(bad) = source.chars().find(|c| !is_allowed(*c)) {
        return Err(ExprError::ForbiddenCharacter(bad));
    }

    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if tokens.len() > MAX_TOKENS {
            return Err(ExprError::TooLong);
        }
        let c = chars[i];
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit()))
        {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let value = text.parse().map_err(|_| ExprError::BadNumber(text))?;
            tokens.push(Token::Number(value));
            continue;
        }
        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len()
                && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.')
            {
                i += 1;
            }
            let ident: String = chars[start..i].iter().collect();
            // `state.company.morale` and `company.morale` name the same variable.
            let ident = ident.strip_prefix("state.").unwrap_or(&ident).to_string();
            tokens.push(Token::Ident(ident));
            continue;
        }

        let next = chars.get(i + 1).copied();
        let third = chars.get(i + 2).copied();
        let (token, width) = match (c, next) {
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('+', _) => (Token::Op(BinaryOp::Add), 1),
            ('-', _) => (Token::Op(BinaryOp::Sub), 1),
            ('*', _) => (Token::Op(BinaryOp::Mul), 1),
            ('/', _) => (Token::Op(BinaryOp::Div), 1),
            ('%', _) => (Token::Op(BinaryOp::Rem), 1),
            ('<', Some('=')) => (Token::Op(BinaryOp::Le), 2),
            ('<', _) => (Token::Op(BinaryOp::Lt), 1),
            ('>', Some('=')) => (Token::Op(BinaryOp::Ge), 2),
            ('>', _) => (Token::Op(BinaryOp::Gt), 1),
            ('=', Some('=')) if third == Some('=') => (Token::Op(BinaryOp::Eq), 3),
            ('=', Some('=')) => (Token::Op(BinaryOp::Eq), 2),
            ('!', Some('=')) if third == Some('=') => (Token::Op(BinaryOp::Ne), 3),
            ('!', Some('=')) => (Token::Op(BinaryOp::Ne), 2),
            ('!', _) => (Token::Not, 1),
            ('&', Some('&')) => (Token::Op(BinaryOp::And), 2),
            ('|', Some('|')) => (Token::Op(BinaryOp::Or), 2),
            _ => return Err(ExprError::Unexpected(c.to_string())),
        };
        tokens.push(token);
        i += width;
    }
    if tokens.len() > MAX_TOKENS {
        return Err(ExprError::TooLong);
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Expr, ExprError>,
    ) -> Result<Expr, ExprError> {
        if self.depth >= MAX_DEPTH {
            return Err(ExprError::TooDeep);
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn binary_level(
        &mut self,
        ops: &[BinaryOp],
        operand: fn(&mut Self) -> Result<Expr, ExprError>,
    ) -> Result<Expr, ExprError> {
        let mut left = operand(self)?;
        while let Some(Token::Op(op)) = self.peek() {
            let op = *op;
            if !ops.contains(&op) {
                break;
            }
            self.pos += 1;
            let right = operand(self)?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn or(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(&[BinaryOp::Or], Self::and)
    }

    fn and(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(&[BinaryOp::And], Self::equality)
    }

    fn equality(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(&[BinaryOp::Eq, BinaryOp::Ne], Self::comparison)
    }

    fn comparison(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(
            &[BinaryOp::Lt, BinaryOp::Le, BinaryOp::Gt, BinaryOp::Ge],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(&[BinaryOp::Add, BinaryOp::Sub], Self::multiplicative)
    }

    fn multiplicative(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(&[BinaryOp::Mul, BinaryOp::Div, BinaryOp::Rem], Self::unary)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        match self.peek() {
            Some(Token::Op(BinaryOp::Sub)) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.nested(Self::unary)?)))
            }
            Some(Token::Op(BinaryOp::Add)) => {
                self.pos += 1;
                self.nested(Self::unary)
            }
            Some(Token::Not) => {
                self.pos += 1;
                Ok(Expr::Not(Box::new(self.nested(Self::unary)?)))
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        match self.next() {
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::Ident(name)) => Ok(Expr::Var(name)),
            Some(Token::LParen) => {
                let inner = self.nested(Self::or)?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(ExprError::Unexpected(format!("{:?}", other))),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            Some(other) => Err(ExprError::Unexpected(format!("{:?}", other))),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}

/// Parse a condition string into an expression tree.
pub fn parse(source: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.or()?;
    match parser.next() {
        None => Ok(expr),
        Some(extra) => Err(ExprError::Unexpected(format!("{:?}", extra))),
    }
}

fn truth(value: f64) -> bool {
    value != 0.0 && !value.is_nan()
}

fn bool_value(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

impl Expr {
    /// Evaluate against `lookup`. Booleans are represented as 1.0 / 0.0.
    pub fn eval(&self, lookup: &dyn Fn(&str) -> Option<f64>) -> Result<f64, ExprError> {
        match self {
            Expr::Number(value) => Ok(*value),
            Expr::Var(name) => lookup(name).ok_or_else(|| ExprError::UnknownVariable(name.clone())),
            Expr::Neg(inner) => Ok(-inner.eval(lookup)?),
            Expr::Not(inner) => Ok(bool_value(!truth(inner.eval(lookup)?))),
            Expr::Binary(BinaryOp::And, left, right) => {
                if !truth(left.eval(lookup)?) {
                    return Ok(0.0);
                }
                Ok(bool_value(truth(right.eval(lookup)?)))
            }
            Expr::Binary(BinaryOp::Or, left, right) => {
                if truth(left.eval(lookup)?) {
                    return Ok(1.0);
                }
                Ok(bool_value(truth(right.eval(lookup)?)))
            }
            Expr::Binary(op, left, right) => {
                let l = left.eval(lookup)?;
                let r = right.eval(lookup)?;
                Ok(match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div => l / r,
                    BinaryOp::Rem => l % r,
                    BinaryOp::Lt => bool_value(l < r),
                    BinaryOp::Le => bool_value(l <= r),
                    BinaryOp::Gt => bool_value(l > r),
                    BinaryOp::Ge => bool_value(l >= r),
                    BinaryOp::Eq => bool_value(l == r),
                    BinaryOp::Ne => bool_value(l != r),
                    BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
                })
            }
        }
    }
}

/// A configured condition. Sources that fail to parse never fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Condition {
    source: String,
    expr: Option<Expr>,
}

impl Condition {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let expr = match parse(&source) {
            Ok(expr) => Some(expr),
            Err(err) => {
                tracing::warn!(
                    target: "leadsim::config",
                    condition = %source,
                    error = %err,
                    "condition.rejected"
                );
                None
            }
        };
        Self { source, expr }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_valid(&self) -> bool {
        self.expr.is_some()
    }

    /// True only if the condition parsed and evaluates truthy. Evaluation
    /// errors (unknown variables) count as false.
    pub fn is_met(&self, lookup: &dyn Fn(&str) -> Option<f64>) -> bool {
        let Some(expr) = &self.expr else {
            return false;
        };
        match expr.eval(lookup) {
            Ok(value) => truth(value),
            Err(err) => {
                tracing::warn!(
                    target: "leadsim::progression",
                    condition = %self.source,
                    error = %err,
                    "condition.eval_failed"
                );
                false
            }
        }
    }
}

impl From<String> for Condition {
    fn from(source: String) -> Self {
        Condition::new(source)
    }
}

impl From<Condition> for String {
    fn from(condition: Condition) -> Self {
        condition.source
    }
}
