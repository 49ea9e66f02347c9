//! Recursive-descent parser producing an expression tree.
//!
//! Precedence, lowest first: `or`, `and`, `not`, comparisons, `+ -`,
//! `* / // %`, unary `- +`, `**` (right associative), then calls,
//! subscripts and dotted function names.

use crate::error::EvalError;
use crate::value::Value;

use super::lexer::{lex, syntax, Spanned, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Subscript {
    At(Expr),
    Range {
        start: Option<Expr>,
        end: Option<Expr>,
        step: Option<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Value),
    Name(String),
    List(Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Call { function: String, args: Vec<Expr> },
    Index { target: Box<Expr>, items: Vec<Subscript> },
}

impl Expr {
    /// Free variable names in order of first appearance.
    pub(crate) fn identifiers(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names(&self, names: &mut Vec<String>) {
        match self {
            Self::Literal(_) => {}
            Self::Name(name) => {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
            Self::List(items) => items.iter().for_each(|e| e.collect_names(names)),
            Self::Unary(_, e) => e.collect_names(names),
            Self::Binary(_, l, r) | Self::And(l, r) | Self::Or(l, r) => {
                l.collect_names(names);
                r.collect_names(names);
            }
            Self::Call { args, .. } => args.iter().for_each(|e| e.collect_names(names)),
            Self::Index { target, items } => {
                target.collect_names(names);
                for item in items {
                    match item {
                        Subscript::At(e) => e.collect_names(names),
                        Subscript::Range { start, end, step } => {
                            for e in [start, end, step].into_iter().flatten() {
                                e.collect_names(names);
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Parse a complete expression.
pub(crate) fn parse(input: &str) -> Result<Expr, EvalError> {
    let tokens = lex(input)?;
    if tokens.is_empty() {
        return Err(syntax(0, "empty expression"));
    }
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        end: input.len(),
    };
    let expr = parser.parse_or()?;
    if parser.pos != tokens.len() {
        return Err(syntax(parser.offset(), "unexpected tokens after expression"));
    }
    Ok(expr)
}

/// Constants reachable as `np.<name>`.
fn module_constant(name: &str) -> Option<f64> {
    let short = name
        .strip_prefix("np.")
        .or_else(|| name.strip_prefix("numpy."))?;
    match short {
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        "nan" => Some(f64::NAN),
        "inf" => Some(f64::INFINITY),
        _ => None,
    }
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    end: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |(p, _)| *p)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Name(n)) if n == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<(), EvalError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(syntax(self.offset(), &format!("expected {what}")))
        }
    }

    fn parse_or(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("or") {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_not()?;
        while self.eat_keyword("and") {
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, EvalError> {
        if self.eat_keyword("not") {
            let operand = self.parse_not()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                Some(Token::EqEq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::Ne,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// Parse addition/subtraction level.
    fn parse_additive(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// Parse multiplication/division/modulo level.
    fn parse_term(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::SlashSlash) => BinaryOp::FloorDiv,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        if self.eat(&Token::Minus) {
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(operand)));
        }
        if self.eat(&Token::Plus) {
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary(UnaryOp::Pos, Box::new(operand)));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Expr, EvalError> {
        let base = self.parse_postfix()?;
        if self.eat(&Token::StarStar) {
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.eat(&Token::LBracket) {
                let items = self.parse_subscripts()?;
                expr = Expr::Index {
                    target: Box::new(expr),
                    items,
                };
            } else if self.peek() == Some(&Token::Dot) || self.peek() == Some(&Token::LParen) {
                let Expr::Name(mut function) = expr else {
                    return Err(syntax(self.offset(), "only named functions can be called"));
                };
                while self.eat(&Token::Dot) {
                    match self.tokens.get(self.pos) {
                        Some((_, Token::Name(part))) => {
                            function.push('.');
                            function.push_str(part);
                            self.pos += 1;
                        }
                        _ => return Err(syntax(self.offset(), "expected attribute name")),
                    }
                }
                if !self.eat(&Token::LParen) {
                    expr = module_constant(&function)
                        .map(|v| Expr::Literal(Value::float(v)))
                        .ok_or_else(|| syntax(self.offset(), &format!("unknown attribute '{function}'")))?;
                    continue;
                }
                let args = self.parse_arguments(&Token::RParen)?;
                expr = Expr::Call { function, args };
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_arguments(&mut self, close: &Token) -> Result<Vec<Expr>, EvalError> {
        let mut args = Vec::new();
        if self.eat(close) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_or()?);
            if self.eat(close) {
                return Ok(args);
            }
            self.expect(&Token::Comma, "',' between arguments")?;
            if self.eat(close) {
                return Ok(args);
            }
        }
    }

    fn parse_subscripts(&mut self) -> Result<Vec<Subscript>, EvalError> {
        let mut items = Vec::new();
        loop {
            items.push(self.parse_subscript()?);
            if self.eat(&Token::RBracket) {
                return Ok(items);
            }
            self.expect(&Token::Comma, "',' or ']' in subscript")?;
        }
    }

    fn parse_subscript(&mut self) -> Result<Subscript, EvalError> {
        let start = self.parse_optional()?;
        if !self.eat(&Token::Colon) {
            return start
                .map(Subscript::At)
                .ok_or_else(|| syntax(self.offset(), "empty subscript"));
        }
        let end = self.parse_optional()?;
        let step = if self.eat(&Token::Colon) {
            self.parse_optional()?
        } else {
            None
        };
        Ok(Subscript::Range { start, end, step })
    }

    fn parse_optional(&mut self) -> Result<Option<Expr>, EvalError> {
        match self.peek() {
            Some(Token::Colon | Token::Comma | Token::RBracket) => Ok(None),
            _ => self.parse_or().map(Some),
        }
    }

    fn parse_atom(&mut self) -> Result<Expr, EvalError> {
        let offset = self.offset();
        let Some((_, token)) = self.tokens.get(self.pos) else {
            return Err(syntax(offset, "unexpected end of expression"));
        };
        self.pos += 1;
        match token {
            Token::Int(v) => Ok(Expr::Literal(Value::int(*v))),
            Token::Float(v) => Ok(Expr::Literal(Value::float(*v))),
            Token::Str(s) => Ok(Expr::Literal(Value::text(s.clone()))),
            Token::Name(name) => Ok(match name.as_str() {
                "True" => Expr::Literal(Value::bool(true)),
                "False" => Expr::Literal(Value::bool(false)),
                "and" | "or" | "not" => {
                    return Err(syntax(offset, &format!("unexpected keyword '{name}'")));
                }
                _ => Expr::Name(name.clone()),
            }),
            Token::LParen => {
                let expr = self.parse_or()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(expr)
            }
            Token::LBracket => Ok(Expr::List(self.parse_arguments(&Token::RBracket)?)),
            other => Err(syntax(offset, &format!("unexpected token {other:?}"))),
        }
    }
}
