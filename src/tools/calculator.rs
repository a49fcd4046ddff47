//! Arithmetic evaluation for the agent's calculator tool.
//!
//! Evaluates a single expression with `+ - * / % ^`, parentheses, unary
//! minus, the constants `pi` and `e`, and a handful of functions. Unary
//! minus binds looser than `^`, so `-2^2` is `-4`.

use super::{required_str, Tool, ToolContext, ToolError};
use crate::relay::ToolId;
use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected '{0}'")]
    UnexpectedToken(String),

    #[error("unknown name '{0}'")]
    UnknownName(String),

    #[error("{0}() takes {1} argument(s), got {2}")]
    Arity(String, &'static str, usize),

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite real number")]
    NotFinite,

    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),
}

/// Bound on nested parentheses, unary signs and exponents.
const MAX_DEPTH: usize = 256;

/// Evaluate an arithmetic expression.
pub fn evaluate(expression: &str) -> Result<f64, CalcError> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if let Some(token) = parser.peek() {
        return Err(CalcError::UnexpectedToken(token.to_string()));
    }
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CalcError::NotFinite)
    }
}

/// Render a result without float noise for whole numbers.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// The calculator tool.
pub struct Calculator;

#[async_trait]
impl Tool for Calculator {
    fn id(&self) -> ToolId {
        ToolId::Calculator
    }

    fn description(&self) -> &str {
        "Evaluate a mathematical expression exactly. Input only the expression, e.g. \
        '(5 - 2) + (7 - 3) + 12 + 2 * 25' or 'pi * 4^2'. Supports + - * / % ^, parentheses, \
        pi, e, sqrt, abs, ln, log, log2, exp, sin, cos, tan, asin, acos, atan, floor, ceil, \
        round, min, max."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "The arithmetic expression to evaluate"
                }
            },
            "required": ["expression"]
        })
    }

    async fn invoke(&self, args: Value, _ctx: &ToolContext<'_>) -> Result<String, ToolError> {
        let expression = required_str(&args, "expression")?;
        let value = evaluate(expression)
            .map_err(|e| ToolError::InvalidInput(format!("cannot evaluate '{}': {}", expression, e)))?;
        debug!("calculator: {} = {}", expression, value);
        Ok(format!("Answer: {}", format_number(value)))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
    Comma,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Ident(name) => write!(f, "{}", name),
            Token::Op(op) => write!(f, "{}", op),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, CalcError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // Scientific notation: 1e3, 2.5E-4
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        while j < chars.len() && chars[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let number = text
                    .parse::<f64>()
                    .map_err(|_| CalcError::UnexpectedToken(text.clone()))?;
                tokens.push(Token::Number(number));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect::<String>().to_lowercase()));
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Op('^'));
                i += 2;
            }
            '+' | '-' | '*' | '/' | '%' | '^' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '×' | '·' => {
                tokens.push(Token::Op('*'));
                i += 1;
            }
            '÷' => {
                tokens.push(Token::Op('/'));
                i += 1;
            }
            '−' => {
                tokens.push(Token::Op('-'));
                i += 1;
            }
            '(' | '[' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' | ']' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            other => return Err(CalcError::UnexpectedChar(other, i)),
        }
    }

    Ok(tokens)
}

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

    fn eat_op(&mut self, ops: &[char]) -> Option<char> {
        match self.peek() {
            Some(Token::Op(op)) if ops.contains(op) => {
                let op = *op;
                self.pos += 1;
                Some(op)
            }
            _ => None,
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), CalcError> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(CalcError::UnexpectedToken(token.to_string())),
            None => Err(CalcError::UnexpectedEnd),
        }
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64, CalcError> {
        let mut value = self.term()?;
        while let Some(op) = self.eat_op(&['+', '-']) {
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    // term := unary (('*' | '/' | '%') unary)*
    fn term(&mut self) -> Result<f64, CalcError> {
        let mut value = self.unary()?;
        while let Some(op) = self.eat_op(&['*', '/', '%']) {
            let rhs = self.unary()?;
            value = match op {
                '*' => value * rhs,
                _ if rhs == 0.0 => return Err(CalcError::DivisionByZero),
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    // unary := ('-' | '+') unary | power
    // Every recursive path passes through here, so this is where depth is counted.
    fn unary(&mut self) -> Result<f64, CalcError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CalcError::TooDeep(MAX_DEPTH));
        }
        let value = match self.eat_op(&['-', '+']) {
            Some('-') => self.unary().map(|v| -v),
            Some(_) => self.unary(),
            None => self.power(),
        };
        self.depth -= 1;
        value
    }

    // power := primary ('^' unary)?   (right associative)
    fn power(&mut self) -> Result<f64, CalcError> {
        let base = self.primary()?;
        if self.eat_op(&['^']).is_some() {
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64, CalcError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(value)
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    let args = self.arguments()?;
                    call(&name, &args)
                } else {
                    constant(&name)
                }
            }
            Some(token) => Err(CalcError::UnexpectedToken(token.to_string())),
            None => Err(CalcError::UnexpectedEnd),
        }
    }

    fn arguments(&mut self) -> Result<Vec<f64>, CalcError> {
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
                Some(token) => return Err(CalcError::UnexpectedToken(token.to_string())),
                None => return Err(CalcError::UnexpectedEnd),
            }
        }
    }
}

fn constant(name: &str) -> Result<f64, CalcError> {
    match name {
        "pi" | "π" => Ok(std::f64::consts::PI),
        "e" => Ok(std::f64::consts::E),
        "tau" => Ok(std::f64::consts::TAU),
        _ => Err(CalcError::UnknownName(name.to_string())),
    }
}

fn call(name: &str, args: &[f64]) -> Result<f64, CalcError> {
    let unary = |f: fn(f64) -> f64| match args {
        [x] => Ok(f(*x)),
        _ => Err(CalcError::Arity(name.to_string(), "1", args.len())),
    };

    match name {
        "sqrt" => unary(f64::sqrt),
        "abs" => unary(f64::abs),
        "ln" => unary(f64::ln),
        "log" | "log10" => match args {
            [x] => Ok(x.log10()),
            [x, base] => Ok(x.log(*base)),
            _ => Err(CalcError::Arity(name.to_string(), "1 or 2", args.len())),
        },
        "log2" => unary(f64::log2),
        "exp" => unary(f64::exp),
        "sin" => unary(f64::sin),
        "cos" => unary(f64::cos),
        "tan" => unary(f64::tan),
        "asin" => unary(f64::asin),
        "acos" => unary(f64::acos),
        "atan" => unary(f64::atan),
        "floor" => unary(f64::floor),
        "ceil" => unary(f64::ceil),
        "round" => unary(f64::round),
        "min" | "max" if args.is_empty() => {
            Err(CalcError::Arity(name.to_string(), "at least 1", 0))
        }
        "min" => Ok(args.iter().copied().fold(f64::INFINITY, f64::min)),
        "max" => Ok(args.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
        _ => Err(CalcError::UnknownName(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{tool_context, ScriptedModel};

    fn approx(expression: &str, expected: f64) {
        let value = evaluate(expression).unwrap();
        assert!(
            (value - expected).abs() < 1e-9,
            "{} = {}, expected {}",
            expression,
            value,
            expected
        );
    }

    #[test]
    fn test_precedence() {
        approx("2 + 3 * 4", 14.0);
        approx("(2 + 3) * 4", 20.0);
        approx("10 - 4 - 3", 3.0);
        approx("2 ^ 3 ^ 2", 512.0);
        approx("-2^2", -4.0);
        approx("2 ** 10", 1024.0);
        approx("17 % 5", 2.0);
    }

    #[test]
    fn test_nesting_is_bounded() {
        let deep = format!("{}1{}", "(".repeat(50_000), ")".repeat(50_000));
        assert_eq!(evaluate(&deep), Err(CalcError::TooDeep(MAX_DEPTH)));

        let signs = format!("{}1", "-".repeat(50_000));
        assert_eq!(evaluate(&signs), Err(CalcError::TooDeep(MAX_DEPTH)));

        let towers = format!("{}2", "2^".repeat(50_000));
        assert_eq!(evaluate(&towers), Err(CalcError::TooDeep(MAX_DEPTH)));

        approx(&format!("{}7{}", "(".repeat(100), ")".repeat(100)), 7.0);
        approx(&format!("{}3", "-".repeat(100)), 3.0);
    }

    #[test]
    fn test_fruit_word_problem() {
        approx("(5 - 2) + (7 - 3) + 12 + 2 * 25", 69.0);
    }

    #[test]
    fn test_functions_and_constants() {
        approx("pi * 4^2", std::f64::consts::PI * 16.0);
        approx("sqrt(144)", 12.0);
        approx("log(1000)", 3.0);
        approx("log(8, 2)", 3.0);
        approx("max(3, 9, 4)", 9.0);
        approx("round(2.5)", 3.0);
        approx("1.5e3 / 3", 500.0);
        approx("6 × 7", 42.0);
    }

    #[test]
    fn test_errors() {
        assert_eq!(evaluate("1 / 0"), Err(CalcError::DivisionByZero));
        assert_eq!(evaluate("5 % 0"), Err(CalcError::DivisionByZero));
        assert_eq!(evaluate("2 +"), Err(CalcError::UnexpectedEnd));
        assert_eq!(evaluate("(1 + 2"), Err(CalcError::UnexpectedEnd));
        assert_eq!(evaluate("foo + 1"), Err(CalcError::UnknownName("foo".to_string())));
        assert_eq!(evaluate("sqrt(-1)"), Err(CalcError::NotFinite));
        assert_eq!(evaluate("1 $ 2"), Err(CalcError::UnexpectedChar('$', 2)));
        assert_eq!(evaluate("2 3"), Err(CalcError::UnexpectedToken("3".to_string())));
        assert!(matches!(evaluate("sqrt(1, 2)"), Err(CalcError::Arity(..))));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(69.0), "69");
        assert_eq!(format_number(-4.0), "-4");
        assert_eq!(format_number(2.5), "2.5");
    }

    #[tokio::test]
    async fn test_tool_invocation() {
        let model = ScriptedModel::new(vec![]);
        let ctx = tool_context(&model);

        let output = Calculator
            .invoke(json!({"expression": "60 * 3"}), &ctx.as_ctx())
            .await
            .unwrap();
        assert_eq!(output, "Answer: 180");

        let err = Calculator
            .invoke(json!({"expression": "1/0"}), &ctx.as_ctx())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("division by zero"));
        assert_eq!(model.calls(), 0);
    }
}
