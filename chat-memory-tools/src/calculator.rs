//! Arithmetic expression calculator
//!
//! Evaluates `+ - * / // % **`, parentheses, the constants `pi`, `e`, `tau`
//! and `inf`, and a set of math functions (`sqrt(16)`, `log(8, 2)`,
//! `max(1, 2, 3)`). Nothing outside that grammar is executed.

use crate::base::{string_arg, Result, Tool};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::f64::consts;
use thiserror::Error;

/// Longest expression accepted, in bytes
const MAX_EXPRESSION_LEN: usize = 1024;
/// Deepest parenthesis/call nesting accepted
const MAX_DEPTH: usize = 64;

/// Why an expression could not be evaluated
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected '{0}'")]
    Unexpected(String),

    #[error("name '{0}' is not defined")]
    UnknownName(String),

    #[error("{0}() {1}")]
    Arity(String, &'static str),

    #[error("division by zero")]
    DivisionByZero,

    #[error("math domain error")]
    Domain,

    #[error("expression is too long or too deeply nested")]
    TooComplex,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    Percent,
    Power,
    LParen,
    RParen,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format_number(*n),
            Token::Ident(name) => name.clone(),
            Token::Plus => "+".to_string(),
            Token::Minus => "-".to_string(),
            Token::Star => "*".to_string(),
            Token::Slash => "/".to_string(),
            Token::DoubleSlash => "//".to_string(),
            Token::Percent => "%".to_string(),
            Token::Power => "**".to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::Comma => ",".to_string(),
        }
    }
}

fn tokenize(input: &str) -> std::result::Result<Vec<Token>, CalcError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        let token = match c {
            c if c.is_whitespace() => continue,
            '0'..='9' | '.' => {
                let mut end = start + c.len_utf8();
                let mut prev = c;
                while let Some(&(i, next)) = chars.peek() {
                    let exponent_sign = matches!(next, '+' | '-') && matches!(prev, 'e' | 'E');
                    let digit_part = next.is_ascii_digit() || matches!(next, '.' | '_' | 'e' | 'E');
                    if digit_part || exponent_sign {
                        end = i + next.len_utf8();
                        prev = next;
                        chars.next();
                    } else {
                        break;
                    }
                }
                let literal = input[start..end].replace('_', "");
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| CalcError::Unexpected(input[start..end].to_string()))?;
                Token::Number(value)
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, next)) = chars.peek() {
                    if next.is_alphanumeric() || next == '_' {
                        end = i + next.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                Token::Ident(input[start..end].to_string())
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => {
                if chars.next_if(|&(_, n)| n == '*').is_some() {
                    Token::Power
                } else {
                    Token::Star
                }
            }
            '/' => {
                if chars.next_if(|&(_, n)| n == '/').is_some() {
                    Token::DoubleSlash
                } else {
                    Token::Slash
                }
            }
            '%' => Token::Percent,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            other => return Err(CalcError::Unexpected(other.to_string())),
        };
        tokens.push(token);
    }

    Ok(tokens)
}

/// Recursive-descent evaluator over the token list
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> std::result::Result<(), CalcError> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(CalcError::Unexpected(token.describe())),
            None => Err(CalcError::UnexpectedEnd),
        }
    }

    fn descend(&mut self) -> std::result::Result<(), CalcError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CalcError::TooComplex);
        }
        Ok(())
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> std::result::Result<f64, CalcError> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    // term := unary (('*' | '/' | '//' | '%') unary)*
    fn term(&mut self) -> std::result::Result<f64, CalcError> {
        let mut value = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(op @ (Token::Star | Token::Slash | Token::DoubleSlash | Token::Percent)) => {
                    op.clone()
                }
                _ => return Ok(value),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                Token::Star => value * rhs,
                _ if rhs == 0.0 => return Err(CalcError::DivisionByZero),
                Token::Slash => value / rhs,
                Token::DoubleSlash => (value / rhs).floor(),
                // Result takes the sign of the divisor
                _ => value - rhs * (value / rhs).floor(),
            };
        }
    }

    // unary := ('-' | '+') unary | power
    fn unary(&mut self) -> std::result::Result<f64, CalcError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                self.descend()?;
                let value = -self.unary()?;
                self.depth -= 1;
                Ok(value)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.descend()?;
                let value = self.unary()?;
                self.depth -= 1;
                Ok(value)
            }
            _ => self.power(),
        }
    }

    // power := atom ('**' unary)?, so -2 ** 2 is -4 and 2 ** 3 ** 2 is 512
    fn power(&mut self) -> std::result::Result<f64, CalcError> {
        let base = self.atom()?;
        if self.peek() != Some(&Token::Power) {
            return Ok(base);
        }
        self.pos += 1;
        self.descend()?;
        let exponent = self.unary()?;
        self.depth -= 1;
        if base == 0.0 && exponent < 0.0 {
            return Err(CalcError::DivisionByZero);
        }
        checked(base.powf(exponent))
    }

    // atom := number | name | name '(' args ')' | '(' expr ')'
    fn atom(&mut self) -> std::result::Result<f64, CalcError> {
        match self.next() {
            Some(Token::Number(value)) => Ok(value),
            Some(Token::LParen) => {
                self.descend()?;
                let value = self.expr()?;
                self.expect(Token::RParen)?;
                self.depth -= 1;
                Ok(value)
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    self.descend()?;
                    let args = self.args()?;
                    self.depth -= 1;
                    call(&name, &args)
                } else {
                    constant(&name)
                }
            }
            Some(token) => Err(CalcError::Unexpected(token.describe())),
            None => Err(CalcError::UnexpectedEnd),
        }
    }

    fn args(&mut self) -> std::result::Result<Vec<f64>, CalcError> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(args),
                Some(token) => return Err(CalcError::Unexpected(token.describe())),
                None => return Err(CalcError::UnexpectedEnd),
            }
        }
    }
}

fn constant(name: &str) -> std::result::Result<f64, CalcError> {
    match name {
        "pi" => Ok(consts::PI),
        "e" => Ok(consts::E),
        "tau" => Ok(consts::TAU),
        "inf" => Ok(f64::INFINITY),
        _ => Err(CalcError::UnknownName(name.to_string())),
    }
}

fn checked(value: f64) -> std::result::Result<f64, CalcError> {
    if value.is_nan() {
        Err(CalcError::Domain)
    } else {
        Ok(value)
    }
}

fn one(name: &str, args: &[f64]) -> std::result::Result<f64, CalcError> {
    match args {
        [x] => Ok(*x),
        _ => Err(CalcError::Arity(name.to_string(), "takes exactly one argument")),
    }
}

fn two(name: &str, args: &[f64]) -> std::result::Result<(f64, f64), CalcError> {
    match args {
        [x, y] => Ok((*x, *y)),
        _ => Err(CalcError::Arity(name.to_string(), "takes exactly two arguments")),
    }
}

fn call(name: &str, args: &[f64]) -> std::result::Result<f64, CalcError> {
    let value = match name {
        "sqrt" => {
            let x = one(name, args)?;
            if x < 0.0 {
                return Err(CalcError::Domain);
            }
            x.sqrt()
        }
        "log" => {
            let (x, base) = match args {
                [x] => (*x, consts::E),
                [x, base] => (*x, *base),
                _ => return Err(CalcError::Arity(name.to_string(), "takes one or two arguments")),
            };
            if x <= 0.0 || base <= 0.0 || base == 1.0 {
                return Err(CalcError::Domain);
            }
            x.ln() / base.ln()
        }
        "log10" | "log2" => {
            let x = one(name, args)?;
            if x <= 0.0 {
                return Err(CalcError::Domain);
            }
            if name == "log10" {
                x.log10()
            } else {
                x.log2()
            }
        }
        "exp" => one(name, args)?.exp(),
        "sin" => one(name, args)?.sin(),
        "cos" => one(name, args)?.cos(),
        "tan" => one(name, args)?.tan(),
        "asin" => one(name, args)?.asin(),
        "acos" => one(name, args)?.acos(),
        "atan" => one(name, args)?.atan(),
        "sinh" => one(name, args)?.sinh(),
        "cosh" => one(name, args)?.cosh(),
        "tanh" => one(name, args)?.tanh(),
        "degrees" => one(name, args)?.to_degrees(),
        "radians" => one(name, args)?.to_radians(),
        "abs" | "fabs" => one(name, args)?.abs(),
        "floor" => one(name, args)?.floor(),
        "ceil" => one(name, args)?.ceil(),
        "round" => match args {
            [x] => x.round_ties_even(),
            [x, digits] => {
                let scale = 10f64.powi(*digits as i32);
                (x * scale).round_ties_even() / scale
            }
            _ => return Err(CalcError::Arity(name.to_string(), "takes one or two arguments")),
        },
        "factorial" => {
            let x = one(name, args)?;
            if x < 0.0 || x.fract() != 0.0 {
                return Err(CalcError::Domain);
            }
            if x > 170.0 {
                f64::INFINITY
            } else {
                (1..=x as u64).map(|n| n as f64).product()
            }
        }
        "pow" => {
            let (x, y) = two(name, args)?;
            if x == 0.0 && y < 0.0 {
                return Err(CalcError::DivisionByZero);
            }
            x.powf(y)
        }
        "hypot" => {
            let (x, y) = two(name, args)?;
            x.hypot(y)
        }
        "min" | "max" => {
            let Some((first, rest)) = args.split_first() else {
                return Err(CalcError::Arity(name.to_string(), "expects at least one argument"));
            };
            rest.iter().fold(*first, |acc, x| {
                if name == "min" {
                    acc.min(*x)
                } else {
                    acc.max(*x)
                }
            })
        }
        _ => return Err(CalcError::UnknownName(name.to_string())),
    };
    checked(value)
}

/// Evaluate an arithmetic expression
pub fn evaluate(expression: &str) -> std::result::Result<f64, CalcError> {
    if expression.len() > MAX_EXPRESSION_LEN {
        return Err(CalcError::TooComplex);
    }
    let mut parser = Parser {
        tokens: tokenize(expression)?,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    match parser.next() {
        None => Ok(value),
        Some(token) => Err(CalcError::Unexpected(token.describe())),
    }
}

/// Whole numbers print without a fractional part
pub fn format_number(value: f64) -> String {
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Calculator exposed to the model
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Perform mathematical calculations. Supports +, -, *, /, //, %, **, \
         parentheses and functions such as sqrt, sin, cos, tan, log, exp, abs, \
         round, min and max. Examples: \"2 + 3 * 4\", \"sqrt(16)\", \"sin(pi/2)\""
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "The expression to evaluate"
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let expression = string_arg(&args, "expression")?;
        match evaluate(expression) {
            Ok(value) => Ok(format!("Result: {}", format_number(value))),
            // Bad input is an answer for the model, not a tool failure
            Err(e) => Ok(format!("Error in calculation: {}", e)),
        }
    }
}
