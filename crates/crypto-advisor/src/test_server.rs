//! Test MCP server
//!
//! Three trivial tools used to check that the MCP plumbing works end to end.

use std::fmt;

use agent_core::tool::{ParameterSchema, ToolSchema};
use agent_mcp::{
    ToolHandler,
    protocol::{CallToolResult, Implementation},
};
use async_trait::async_trait;
use serde_json::{Map, Value};

pub const SERVER_NAME: &str = "pumppie-test-server";

/// Characters `calculate` accepts
const ALLOWED_CHARS: &str = "0123456789+-*/.() ";

/// Deepest nesting of parentheses, signs and exponents
const MAX_DEPTH: usize = 256;

#[derive(Default)]
pub struct TestServer;

#[async_trait]
impl ToolHandler for TestServer {
    fn info(&self) -> Implementation {
        Implementation {
            name: SERVER_NAME.into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }

    fn tools(&self) -> Vec<ToolSchema> {
        vec![
            ToolSchema {
                name: "echo".into(),
                description: "Echo back the input message".into(),
                parameters: vec![ParameterSchema::required(
                    "message",
                    "string",
                    "Message to echo back",
                )],
            },
            ToolSchema {
                name: "get_time".into(),
                description: "Get current timestamp".into(),
                parameters: Vec::new(),
            },
            ToolSchema {
                name: "calculate".into(),
                description: "Perform basic arithmetic calculation".into(),
                parameters: vec![ParameterSchema::required(
                    "expression",
                    "string",
                    "Mathematical expression to evaluate (e.g., '2 + 2')",
                )],
            },
        ]
    }

    async fn call(&self, name: &str, arguments: &Map<String, Value>) -> CallToolResult {
        let text_arg = |key: &str| arguments.get(key).and_then(Value::as_str).unwrap_or_default();

        let text = match name {
            "echo" => format!("Echo: {}", text_arg("message")),
            "get_time" => format!(
                "Current time: {}",
                chrono::Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S%.6f")
            ),
            "calculate" => calculate(text_arg("expression")),
            other => format!("Unknown tool: {other}"),
        };

        CallToolResult::text(text)
    }
}

/// Evaluate an arithmetic expression into the reply text
pub fn calculate(expression: &str) -> String {
    if !expression.chars().all(|c| ALLOWED_CHARS.contains(c)) {
        return format!("Error: Invalid characters in expression: {expression}");
    }

    match evaluate(expression) {
        Ok(value) => format!("Result: {expression} = {value}"),
        Err(e) => format!("Error calculating {expression}: {e}"),
    }
}

// ============================================================================
// Evaluator
// ============================================================================

/// Integers stay exact; `/` and decimal literals produce floats
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    #[allow(clippy::cast_precision_loss)]
    fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Self::Int(i) => i == 0,
            Self::Float(f) => f == 0.0,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            // Debug keeps the trailing ".0" on whole floats
            Self::Float(x) => write!(f, "{x:?}"),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum CalcError {
    InvalidSyntax,
    DivisionByZero,
    TooDeep,
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSyntax => f.write_str("invalid syntax"),
            Self::DivisionByZero => f.write_str("division by zero"),
            Self::TooDeep => write!(f, "expression nested deeper than {MAX_DEPTH} levels"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Token {
    Num(Number),
    Plus,
    Minus,
    Star,
    Power,
    Slash,
    FloorDiv,
    Open,
    Close,
}

fn tokenize(input: &str) -> Result<Vec<Token>, CalcError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        let (token, width) = match c {
            ' ' => {
                i += 1;
                continue;
            }
            '+' => (Token::Plus, 1),
            '-' => (Token::Minus, 1),
            '*' if next == Some('*') => (Token::Power, 2),
            '*' => (Token::Star, 1),
            '/' if next == Some('/') => (Token::FloorDiv, 2),
            '/' => (Token::Slash, 1),
            '(' => (Token::Open, 1),
            ')' => (Token::Close, 1),
            _ => {
                let len = chars[i..]
                    .iter()
                    .take_while(|c| c.is_ascii_digit() || **c == '.')
                    .count();
                let literal: String = chars[i..i + len].iter().collect();
                (Token::Num(parse_number(&literal)?), len)
            }
        };
        tokens.push(token);
        i += width;
    }

    Ok(tokens)
}

fn parse_number(literal: &str) -> Result<Number, CalcError> {
    if literal.is_empty() || literal == "." {
        return Err(CalcError::InvalidSyntax);
    }
    if literal.contains('.') {
        literal
            .parse::<f64>()
            .map(Number::Float)
            .map_err(|_| CalcError::InvalidSyntax)
    } else {
        literal
            .parse::<i64>()
            .map(Number::Int)
            .or_else(|_| literal.parse::<f64>().map(Number::Float))
            .map_err(|_| CalcError::InvalidSyntax)
    }
}

/// Evaluate `+ - * / // **` with parentheses and unary signs
pub fn evaluate(expression: &str) -> Result<Number, CalcError> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if parser.pos == tokens.len() {
        Ok(value)
    } else {
        Err(CalcError::InvalidSyntax)
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    /// Run a recursive step one level deeper
    fn nested(
        &mut self,
        step: impl FnOnce(&mut Self) -> Result<Number, CalcError>,
    ) -> Result<Number, CalcError> {
        if self.depth >= MAX_DEPTH {
            return Err(CalcError::TooDeep);
        }
        self.depth += 1;
        let value = step(self);
        self.depth -= 1;
        value
    }

    fn expr(&mut self) -> Result<Number, CalcError> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = apply(op, value, rhs)?;
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<Number, CalcError> {
        let mut value = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash | Token::FloorDiv)) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = apply(op, value, rhs)?;
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<Number, CalcError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                let operand = self.nested(Self::unary)?;
                apply(Token::Minus, Number::Int(0), operand)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.nested(Self::unary)
            }
            _ => self.power(),
        }
    }

    // Right-associative and binds tighter than a unary sign on its left
    fn power(&mut self) -> Result<Number, CalcError> {
        let base = self.atom()?;
        if self.peek() == Some(Token::Power) {
            self.pos += 1;
            let exponent = self.nested(Self::unary)?;
            return apply(Token::Power, base, exponent);
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Number, CalcError> {
        match self.bump() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::Open) => {
                let value = self.nested(Self::expr)?;
                match self.bump() {
                    Some(Token::Close) => Ok(value),
                    _ => Err(CalcError::InvalidSyntax),
                }
            }
            _ => Err(CalcError::InvalidSyntax),
        }
    }
}

fn apply(op: Token, lhs: Number, rhs: Number) -> Result<Number, CalcError> {
    use Number::{Float, Int};

    if matches!(op, Token::Slash | Token::FloorDiv) && rhs.is_zero() {
        return Err(CalcError::DivisionByZero);
    }
    if op == Token::Power && lhs.is_zero() && rhs.as_f64() < 0.0 {
        return Err(CalcError::DivisionByZero);
    }

    let exact = match (op, lhs, rhs) {
        (Token::Plus, Int(a), Int(b)) => a.checked_add(b),
        (Token::Minus, Int(a), Int(b)) => a.checked_sub(b),
        (Token::Star, Int(a), Int(b)) => a.checked_mul(b),
        (Token::FloorDiv, Int(a), Int(b)) => {
            let q = a.checked_div(b);
            q.map(|q| if (a % b != 0) && ((a < 0) != (b < 0)) { q - 1 } else { q })
        }
        (Token::Power, Int(a), Int(b)) => u32::try_from(b).ok().and_then(|b| a.checked_pow(b)),
        _ => None,
    };
    if let Some(value) = exact {
        return Ok(Int(value));
    }

    let (a, b) = (lhs.as_f64(), rhs.as_f64());
    let value = match op {
        Token::Plus => a + b,
        Token::Minus => a - b,
        Token::Star => a * b,
        Token::Slash => a / b,
        Token::FloorDiv => (a / b).floor(),
        Token::Power => a.powf(b),
        _ => return Err(CalcError::InvalidSyntax),
    };
    Ok(Float(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_messages() {
        assert_eq!(calculate("2 + 2"), "Result: 2 + 2 = 4");
        assert_eq!(calculate("7/2"), "Result: 7/2 = 3.5");
        assert_eq!(calculate("4/2"), "Result: 4/2 = 2.0");
        assert_eq!(calculate("(1.5 + 0.5) * 3"), "Result: (1.5 + 0.5) * 3 = 6.0");
        assert_eq!(
            calculate("__import__('os')"),
            "Error: Invalid characters in expression: __import__('os')"
        );
        assert_eq!(calculate("1/0"), "Error calculating 1/0: division by zero");
        assert_eq!(calculate("2 +"), "Error calculating 2 +: invalid syntax");
    }

    #[test]
    fn test_operator_precedence() {
        assert_eq!(evaluate("2 + 3 * 4"), Ok(Number::Int(14)));
        assert_eq!(evaluate("(2 + 3) * 4"), Ok(Number::Int(20)));
        assert_eq!(evaluate("-2**2"), Ok(Number::Int(-4)));
        assert_eq!(evaluate("2**3**2"), Ok(Number::Int(512)));
        assert_eq!(evaluate("-7//2"), Ok(Number::Int(-4)));
        assert_eq!(evaluate("10 - 2 - 3"), Ok(Number::Int(5)));
        assert_eq!(evaluate("2**-1"), Ok(Number::Float(0.5)));
    }

    #[test]
    fn test_malformed_input() {
        assert_eq!(evaluate(""), Err(CalcError::InvalidSyntax));
        assert_eq!(evaluate("1 2"), Err(CalcError::InvalidSyntax));
        assert_eq!(evaluate("(1 + 2"), Err(CalcError::InvalidSyntax));
        assert_eq!(evaluate("1.2.3"), Err(CalcError::InvalidSyntax));
        assert_eq!(evaluate("5 // 0"), Err(CalcError::DivisionByZero));
    }

    #[test]
    fn test_zero_to_negative_power() {
        assert_eq!(evaluate("0**-1"), Err(CalcError::DivisionByZero));
        assert_eq!(evaluate("0.0**-2"), Err(CalcError::DivisionByZero));
        assert_eq!(evaluate("0**0"), Ok(Number::Int(1)));
        assert_eq!(calculate("0**-1"), "Error calculating 0**-1: division by zero");
    }

    #[test]
    fn test_nesting_limit() {
        let within = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(evaluate(&within), Ok(Number::Int(1)));
        assert_eq!(evaluate(&format!("{}1", "-".repeat(200))), Ok(Number::Int(1)));

        let parens = format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000));
        assert_eq!(evaluate(&parens), Err(CalcError::TooDeep));

        let signs = format!("{}1", "-".repeat(20_000));
        assert_eq!(evaluate(&signs), Err(CalcError::TooDeep));

        let powers = format!("2{}", "**1".repeat(20_000));
        assert_eq!(evaluate(&powers), Err(CalcError::TooDeep));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_deep_expression_is_an_error_reply() {
        let expression = format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000));
        let mut args = Map::new();
        args.insert("expression".into(), Value::from(expression));

        let reply = TestServer.call("calculate", &args).await.joined_text();
        assert!(reply.starts_with("Error calculating ("), "{}", &reply[..40]);
        assert!(reply.ends_with("expression nested deeper than 256 levels"));
    }

    #[tokio::test]
    async fn test_tools() {
        let server = TestServer;
        let args = |v: Value| v.as_object().cloned().unwrap_or_default();

        let echo = server.call("echo", &args(serde_json::json!({"message": "hi"}))).await;
        assert_eq!(echo.joined_text(), "Echo: hi");

        let time = server.call("get_time", &Map::new()).await;
        assert!(time.joined_text().starts_with("Current time: "));

        let unknown = server.call("sleep", &Map::new()).await;
        assert_eq!(unknown.joined_text(), "Unknown tool: sleep");
        assert_eq!(server.tools().len(), 3);
    }
}
