//! Formula parser for R-style formulas
//!
//! This parser implements R-style formula syntax with support for:
//! - Response variables: y ~ x1 + x2
//! - Intercept control: y ~ 0 + x1, y ~ x1 - 1
//! - Term removal: y ~ a*b - a:b
//! - Interactions and crossing: x1:x2, x1*x2
//! - Power expansion: (x1 + x2 + x3)^2
//! - Wildcard: y ~ .
//! - Escaped arithmetic: I(x^2), I(a + b)
//! - Transform calls: log(x), poly(x, 2), bs(x, df = 5)
//!
//! Operator precedence from lowest to highest is `+`/`-`, `*`, `:`, `^`.
//! The parser produces an unbound [`Expr`] tree; names are resolved later by
//! the term expander against a schema.

use crate::formula::arith::{ArithExpr, ArithOp, ElementwiseFn};
use crate::formula::error::{FormulaError, FormulaResult};
use crate::formula::term::{ArgValue, CallArg, TransformCall};
use std::iter::Peekable;
use std::str::Chars;

/// One operand of a `+`/`-` chain
#[derive(Debug, Clone, PartialEq)]
pub struct Summand {
    /// Whether the operand was subtracted
    pub remove: bool,
    pub expr: Expr,
}

/// Unbound term-expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference
    Var(String),
    /// `.`, every schema column except the response
    Dot,
    /// Literal `1` (true) or `0` (false)
    Intercept(bool),
    /// Transform call
    Call(TransformCall),
    /// `I(...)`
    Identity(ArithExpr),
    /// `a + b - c`
    Sum(Vec<Summand>),
    /// `a * b`
    Cross(Box<Expr>, Box<Expr>),
    /// `a : b`
    Interact(Box<Expr>, Box<Expr>),
    /// `(a + b)^n`
    Power(Box<Expr>, u32),
}

/// Result of parsing, before binding against a schema
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFormula {
    pub response: String,
    pub rhs: Expr,
    pub original: String,
}

/// Formula parser
pub struct FormulaParser<'a> {
    chars: Peekable<Chars<'a>>,
    original: String,
    position: usize,
}

impl<'a> FormulaParser<'a> {
    /// Create a new parser
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            original: input.to_string(),
            position: 0,
        }
    }

    /// Parse a formula
    pub fn parse(formula: &str) -> FormulaResult<ParsedFormula> {
        let mut parser = FormulaParser::new(formula);
        parser.parse_formula()
    }

    /// Parse the entire formula
    fn parse_formula(&mut self) -> FormulaResult<ParsedFormula> {
        self.skip_whitespace();

        if self.chars.peek().is_none() {
            return Err(FormulaError::syntax(self.position, "Empty formula"));
        }

        if self.peek_char() == Some('~') {
            return Err(FormulaError::MissingResponse);
        }

        let response = self.parse_identifier()?;
        self.expect_char('~')?;

        self.skip_whitespace();
        if self.chars.peek().is_none() {
            return Err(FormulaError::syntax(
                self.position,
                "Expected terms after '~'",
            ));
        }

        let rhs = self.parse_sum()?;

        self.skip_whitespace();
        if self.chars.peek().is_some() {
            let remaining: String = self.chars.clone().collect();
            return Err(FormulaError::syntax_with_context(
                self.position,
                "Trailing characters after formula",
                format!("Unexpected: '{}'", remaining),
            ));
        }

        Ok(ParsedFormula {
            response,
            rhs,
            original: self.original.clone(),
        })
    }

    /// Parse a `+`/`-` chain
    fn parse_sum(&mut self) -> FormulaResult<Expr> {
        let mut summands = Vec::new();

        self.skip_whitespace();
        let mut remove = false;
        if self.peek_char() == Some('-') {
            self.advance();
            remove = true;
        }

        loop {
            let expr = self.parse_cross()?;
            summands.push(Summand { remove, expr });

            self.skip_whitespace();
            match self.peek_char() {
                Some('+') => remove = false,
                Some('-') => remove = true,
                _ => break,
            }
            self.advance();
        }

        if summands.len() == 1 && !summands[0].remove {
            Ok(summands.remove(0).expr)
        } else {
            Ok(Expr::Sum(summands))
        }
    }

    /// Parse a `*` chain
    fn parse_cross(&mut self) -> FormulaResult<Expr> {
        let mut lhs = self.parse_interact()?;

        loop {
            self.skip_whitespace();
            if self.peek_char() != Some('*') {
                return Ok(lhs);
            }
            self.advance();
            let rhs = self.parse_interact()?;
            lhs = Expr::Cross(Box::new(lhs), Box::new(rhs));
        }
    }

    /// Parse a `:` chain
    fn parse_interact(&mut self) -> FormulaResult<Expr> {
        let mut lhs = self.parse_power()?;

        loop {
            self.skip_whitespace();
            if self.peek_char() != Some(':') {
                return Ok(lhs);
            }
            self.advance();
            let rhs = self.parse_power()?;
            lhs = Expr::Interact(Box::new(lhs), Box::new(rhs));
        }
    }

    /// Parse an atom with an optional `^n`
    fn parse_power(&mut self) -> FormulaResult<Expr> {
        let base = self.parse_atom()?;

        self.skip_whitespace();
        if self.peek_char() != Some('^') {
            return Ok(base);
        }
        self.advance();
        self.skip_whitespace();

        let start = self.position;
        let digits = self.take_while(|c| c.is_ascii_digit());
        match digits.parse::<u32>() {
            Ok(n) if n >= 1 => Ok(Expr::Power(Box::new(base), n)),
            _ => Err(FormulaError::syntax(
                start,
                "Expected a positive integer after '^'",
            )),
        }
    }

    /// Parse a variable, literal, wildcard, call or parenthesized expression
    fn parse_atom(&mut self) -> FormulaResult<Expr> {
        self.skip_whitespace();

        match self.peek_char() {
            Some('(') => {
                self.advance();
                let inner = self.parse_sum()?;
                self.expect_char(')')?;
                Ok(inner)
            }
            Some('.') if !self.next_is_identifier_char() => {
                self.advance();
                Ok(Expr::Dot)
            }
            Some(c) if c.is_ascii_digit() => {
                let start = self.position;
                let literal = self.take_while(|c| c.is_ascii_digit() || c == '.');
                match literal.as_str() {
                    "0" => Ok(Expr::Intercept(false)),
                    "1" => Ok(Expr::Intercept(true)),
                    _ => Err(FormulaError::syntax(
                        start,
                        format!("Numeric literal '{}' is not a valid term", literal),
                    )),
                }
            }
            Some(c) if c.is_alphabetic() || c == '_' => {
                let ident = self.parse_identifier()?;
                self.skip_whitespace();
                if self.peek_char() != Some('(') {
                    return Ok(Expr::Var(ident));
                }
                self.advance();
                if ident == "I" {
                    let expr = self.parse_arith_sum()?;
                    self.expect_char(')')?;
                    Ok(Expr::Identity(expr))
                } else {
                    self.parse_call(ident)
                }
            }
            Some(c) => Err(FormulaError::syntax(
                self.position,
                format!("Unexpected character '{}'", c),
            )),
            None => Err(FormulaError::syntax(
                self.position,
                "Unexpected end of input, expected a term",
            )),
        }
    }

    /// Parse a transform call after its opening parenthesis
    fn parse_call(&mut self, function: String) -> FormulaResult<Expr> {
        self.skip_whitespace();
        if self.peek_char() == Some(')') {
            return Err(FormulaError::syntax(
                self.position,
                format!("Function '{}' requires at least one argument", function),
            ));
        }

        let input = self.parse_arith_sum()?;
        let mut args = Vec::new();

        loop {
            self.skip_whitespace();
            match self.peek_char() {
                Some(',') => {
                    self.advance();
                    args.push(self.parse_call_arg()?);
                }
                Some(')') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    return Err(FormulaError::syntax(
                        self.position,
                        format!("Expected ',' or ')', found '{}'", c),
                    ));
                }
                None => {
                    return Err(FormulaError::syntax(
                        self.position,
                        "Unexpected end of input, expected ')'",
                    ));
                }
            }
        }

        Ok(Expr::Call(TransformCall {
            function,
            input,
            args,
        }))
    }

    /// Parse `literal` or `name = literal`
    fn parse_call_arg(&mut self) -> FormulaResult<CallArg> {
        self.skip_whitespace();
        let start = self.position;

        if matches!(self.peek_char(), Some(c) if c.is_alphabetic()) {
            let ident = self.parse_identifier()?;
            self.skip_whitespace();
            if self.peek_char() == Some('=') {
                self.advance();
                let value = self.parse_literal()?;
                return Ok(CallArg {
                    name: Some(ident),
                    value,
                });
            }
            return match bool_literal(&ident) {
                Some(b) => Ok(CallArg {
                    name: None,
                    value: ArgValue::Bool(b),
                }),
                None => Err(FormulaError::syntax(
                    start,
                    format!("Expected a literal argument, found '{}'", ident),
                )),
            };
        }

        Ok(CallArg {
            name: None,
            value: self.parse_literal()?,
        })
    }

    /// Parse a number or boolean literal
    fn parse_literal(&mut self) -> FormulaResult<ArgValue> {
        self.skip_whitespace();
        let start = self.position;

        match self.peek_char() {
            Some(c) if c.is_alphabetic() => {
                let ident = self.parse_identifier()?;
                bool_literal(&ident).map(ArgValue::Bool).ok_or_else(|| {
                    FormulaError::syntax(start, format!("Expected a literal, found '{}'", ident))
                })
            }
            Some('-') => {
                self.advance();
                Ok(ArgValue::Number(-self.parse_number()?))
            }
            _ => Ok(ArgValue::Number(self.parse_number()?)),
        }
    }

    fn parse_arith_sum(&mut self) -> FormulaResult<ArithExpr> {
        let mut lhs = self.parse_arith_product()?;

        loop {
            self.skip_whitespace();
            let op = match self.peek_char() {
                Some('+') => ArithOp::Add,
                Some('-') => ArithOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_arith_product()?;
            lhs = ArithExpr::binary(op, lhs, rhs);
        }
    }

    fn parse_arith_product(&mut self) -> FormulaResult<ArithExpr> {
        let mut lhs = self.parse_arith_unary()?;

        loop {
            self.skip_whitespace();
            let op = match self.peek_char() {
                Some('*') => ArithOp::Mul,
                Some('/') => ArithOp::Div,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_arith_unary()?;
            lhs = ArithExpr::binary(op, lhs, rhs);
        }
    }

    fn parse_arith_unary(&mut self) -> FormulaResult<ArithExpr> {
        self.skip_whitespace();
        match self.peek_char() {
            Some('-') => {
                self.advance();
                Ok(ArithExpr::Neg(Box::new(self.parse_arith_unary()?)))
            }
            Some('+') => {
                self.advance();
                self.parse_arith_unary()
            }
            _ => self.parse_arith_power(),
        }
    }

    fn parse_arith_power(&mut self) -> FormulaResult<ArithExpr> {
        let base = self.parse_arith_atom()?;

        self.skip_whitespace();
        if self.peek_char() != Some('^') {
            return Ok(base);
        }
        self.advance();
        let exponent = self.parse_arith_unary()?;
        Ok(ArithExpr::binary(ArithOp::Pow, base, exponent))
    }

    fn parse_arith_atom(&mut self) -> FormulaResult<ArithExpr> {
        self.skip_whitespace();

        match self.peek_char() {
            Some('(') => {
                self.advance();
                let inner = self.parse_arith_sum()?;
                self.expect_char(')')?;
                Ok(inner)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => Ok(ArithExpr::Number(self.parse_number()?)),
            Some(c) if c.is_alphabetic() || c == '_' => {
                let start = self.position;
                let ident = self.parse_identifier()?;
                self.skip_whitespace();
                if self.peek_char() != Some('(') {
                    return Ok(ArithExpr::Column(ident));
                }
                let function = ElementwiseFn::from_name(&ident).ok_or_else(|| {
                    FormulaError::syntax(
                        start,
                        format!("Unknown function '{}' in arithmetic expression", ident),
                    )
                })?;
                self.advance();
                let arg = self.parse_arith_sum()?;
                self.expect_char(')')?;
                Ok(ArithExpr::Call {
                    function,
                    arg: Box::new(arg),
                })
            }
            Some(c) => Err(FormulaError::syntax(
                self.position,
                format!("Unexpected character '{}' in expression", c),
            )),
            None => Err(FormulaError::syntax(
                self.position,
                "Unexpected end of input, expected an expression",
            )),
        }
    }

    /// Parse an unsigned decimal number with optional exponent
    fn parse_number(&mut self) -> FormulaResult<f64> {
        self.skip_whitespace();
        let start = self.position;
        let mut literal = self.take_while(|c| c.is_ascii_digit() || c == '.');

        if matches!(self.peek_char(), Some('e') | Some('E')) {
            literal.push('e');
            self.advance();
            if let Some(sign @ ('+' | '-')) = self.peek_char() {
                literal.push(sign);
                self.advance();
            }
            literal.push_str(&self.take_while(|c| c.is_ascii_digit()));
        }

        literal.parse::<f64>().map_err(|_| {
            FormulaError::syntax(start, format!("Invalid numeric literal '{}'", literal))
        })
    }

    /// Parse an identifier
    fn parse_identifier(&mut self) -> FormulaResult<String> {
        self.skip_whitespace();
        let start_pos = self.position;

        match self.peek_char() {
            Some(c) if c.is_alphabetic() || c == '_' => {}
            Some(c) => {
                return Err(FormulaError::syntax(
                    start_pos,
                    format!("Identifier must start with a letter, found '{}'", c),
                ));
            }
            None => {
                return Err(FormulaError::syntax(
                    start_pos,
                    "Unexpected end of input, expected identifier",
                ));
            }
        }

        Ok(self.take_while(|c| c.is_alphanumeric() || c == '_' || c == '.'))
    }

    /// Consume an expected character after optional whitespace
    fn expect_char(&mut self, expected: char) -> FormulaResult<()> {
        self.skip_whitespace();

        match self.peek_char() {
            Some(c) if c == expected => {
                self.advance();
                Ok(())
            }
            Some(c) => Err(FormulaError::syntax(
                self.position,
                format!("Expected '{}', found '{}'", expected, c),
            )),
            None => Err(FormulaError::syntax(
                self.position,
                format!("Unexpected end of input, expected '{}'", expected),
            )),
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(&c) = self.chars.peek() {
            if !pred(c) {
                break;
            }
            out.push(c);
            self.advance();
        }
        out
    }

    /// Whether the character after the current one continues an identifier
    fn next_is_identifier_char(&self) -> bool {
        let mut ahead = self.chars.clone();
        ahead.next();
        matches!(ahead.peek(), Some(c) if c.is_alphanumeric() || *c == '_')
    }

    fn advance(&mut self) {
        if self.chars.next().is_some() {
            self.position += 1;
        }
    }

    /// Skip whitespace
    fn skip_whitespace(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Peek at next character
    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }
}

fn bool_literal(ident: &str) -> Option<bool> {
    match ident {
        "TRUE" | "T" => Some(true),
        "FALSE" | "F" => Some(false),
        _ => None,
    }
}
