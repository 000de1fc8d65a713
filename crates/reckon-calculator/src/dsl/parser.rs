//! Parser for formula bodies
//!
//! Implements a recursive descent parser with one function per precedence
//! level, turning formula source into a [`Program`] of statements.

use crate::dsl::ast::{BinaryOperator, Binding, Expression, Program, Statement, UnaryOperator};
use crate::limits::ExpressionLimits;
use anyhow::{Result, anyhow};
use std::fmt;

/// Token types recognized by the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Number(f64),
    String(String),

    // Identifiers and keywords
    Identifier(String),
    Let,
    If,
    Then,
    Else,
    Cond,
    When,
    Default,
    True,
    False,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Power,
    Assign,
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    And,
    Or,
    Not,

    // Delimiters
    LeftParen,
    RightParen,
    Comma,
    Semicolon,

    // Special
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{n}"),
            Token::String(s) => write!(f, "\"{s}\""),
            Token::Identifier(name) => write!(f, "{name}"),
            Token::Let => write!(f, "let"),
            Token::If => write!(f, "if"),
            Token::Then => write!(f, "then"),
            Token::Else => write!(f, "else"),
            Token::Cond => write!(f, "cond"),
            Token::When => write!(f, "when"),
            Token::Default => write!(f, "default"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Power => write!(f, "**"),
            Token::Assign => write!(f, "="),
            Token::Equal => write!(f, "=="),
            Token::NotEqual => write!(f, "!="),
            Token::LessThan => write!(f, "<"),
            Token::LessThanEqual => write!(f, "<="),
            Token::GreaterThan => write!(f, ">"),
            Token::GreaterThanEqual => write!(f, ">="),
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::Not => write!(f, "!"),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
            Token::Eof => write!(f, "end of formula"),
        }
    }
}

/// Lexer for tokenizing formula source
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    current_char: Option<char>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self { input: chars, position: 0, current_char }
    }

    fn advance(&mut self) {
        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    /// Skips whitespace and `#` line comments
    fn skip_trivia(&mut self) {
        while let Some(ch) = self.current_char {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '#' {
                while let Some(c) = self.current_char {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> Result<Token> {
        let mut number = String::new();
        let mut seen_dot = false;

        while let Some(ch) = self.current_char {
            if ch.is_ascii_digit() || ch == '_' {
                if ch != '_' {
                    number.push(ch);
                }
                self.advance();
            } else if ch == '.' && !seen_dot {
                seen_dot = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // Exponent is only consumed when digits follow, so `2e` stays an error at parse time
        if matches!(self.current_char, Some('e' | 'E')) {
            let sign = self.peek();
            let digit_at = if matches!(sign, Some('+' | '-')) { 2 } else { 1 };
            if self.input.get(self.position + digit_at).is_some_and(char::is_ascii_digit) {
                number.push('e');
                self.advance();
                if digit_at == 2 {
                    if let Some(s) = self.current_char {
                        number.push(s);
                    }
                    self.advance();
                }
                while let Some(ch) = self.current_char.filter(char::is_ascii_digit) {
                    number.push(ch);
                    self.advance();
                }
            }
        }

        let value =
            number.parse::<f64>().map_err(|e| anyhow!("Invalid number '{}': {}", number, e))?;
        Ok(Token::Number(value))
    }

    fn read_string(&mut self) -> Result<Token> {
        let mut string = String::new();
        self.advance(); // Skip opening quote

        while let Some(ch) = self.current_char {
            if ch == '"' {
                self.advance(); // Skip closing quote
                return Ok(Token::String(string));
            } else if ch == '\\' {
                self.advance();
                match self.current_char {
                    Some('\\') => string.push('\\'),
                    Some('"') => string.push('"'),
                    Some(other) => {
                        string.push('\\');
                        string.push(other);
                    }
                    None => return Err(anyhow!("Unterminated string literal")),
                }
                self.advance();
            } else {
                string.push(ch);
                self.advance();
            }
        }

        Err(anyhow!("Unterminated string literal"))
    }

    fn read_identifier(&mut self) -> Token {
        let mut identifier = String::new();

        while let Some(ch) = self.current_char {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                identifier.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match identifier.as_str() {
            "let" => Token::Let,
            "if" => Token::If,
            "then" => Token::Then,
            "else" => Token::Else,
            "cond" => Token::Cond,
            "when" => Token::When,
            "default" => Token::Default,
            "true" => Token::True,
            "false" => Token::False,
            _ => Token::Identifier(identifier),
        }
    }

    /// Consume `second` if it follows the current char, producing `double`; else `single`
    fn one_or_two(&mut self, second: char, double: Token, single: Token) -> Token {
        if self.peek() == Some(second) {
            self.advance();
            self.advance();
            double
        } else {
            self.advance();
            single
        }
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_trivia();

        let Some(ch) = self.current_char else {
            return Ok(Token::Eof);
        };

        let token = match ch {
            '0'..='9' | '.' => return self.read_number(),
            '"' => return self.read_string(),
            'a'..='z' | 'A'..='Z' | '_' => self.read_identifier(),
            '+' => self.single(Token::Plus),
            '-' => self.single(Token::Minus),
            '*' => self.one_or_two('*', Token::Power, Token::Star),
            '/' => self.single(Token::Slash),
            '%' => self.single(Token::Percent),
            '=' => self.one_or_two('=', Token::Equal, Token::Assign),
            '!' => self.one_or_two('=', Token::NotEqual, Token::Not),
            '<' => self.one_or_two('=', Token::LessThanEqual, Token::LessThan),
            '>' => self.one_or_two('=', Token::GreaterThanEqual, Token::GreaterThan),
            '&' if self.peek() == Some('&') => {
                self.advance();
                self.single(Token::And)
            }
            '|' if self.peek() == Some('|') => {
                self.advance();
                self.single(Token::Or)
            }
            '&' => return Err(anyhow!("Unexpected character '&'. Did you mean '&&'?")),
            '|' => return Err(anyhow!("Unexpected character '|'. Did you mean '||'?")),
            '(' => self.single(Token::LeftParen),
            ')' => self.single(Token::RightParen),
            ',' => self.single(Token::Comma),
            ';' => self.single(Token::Semicolon),
            _ => return Err(anyhow!("Unexpected character '{}'", ch)),
        };
        Ok(token)
    }
}

/// Parser for formula bodies
pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    /// Current nesting of expressions, unary operators and exponents
    depth: usize,
    max_depth: usize,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Result<Self> {
        Self::with_max_depth(lexer, ExpressionLimits::default().max_expression_depth)
    }

    /// Parser that refuses input nested deeper than `max_depth`
    pub fn with_max_depth(mut lexer: Lexer, max_depth: usize) -> Result<Self> {
        let current_token = lexer.next_token()?;
        Ok(Self { lexer, current_token, depth: 0, max_depth })
    }

    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= self.max_depth {
            return Err(anyhow!("Expression nesting exceeds {}", self.max_depth));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn advance(&mut self) -> Result<()> {
        self.current_token = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        if std::mem::discriminant(&self.current_token) == std::mem::discriminant(&expected) {
            self.advance()
        } else {
            Err(anyhow!("Expected {}, found {}", expected, self.current_token))
        }
    }

    /// Parse `statement (';' statement)* ';'?` until end of input
    pub fn parse_program(&mut self) -> Result<Program> {
        let mut statements = Vec::new();

        while !matches!(self.current_token, Token::Eof) {
            statements.push(self.parse_statement()?);

            match self.current_token {
                Token::Semicolon => self.advance()?,
                Token::Eof => break,
                _ => {
                    return Err(anyhow!(
                        "Expected ';' after statement, found {}",
                        self.current_token
                    ));
                }
            }
        }

        Ok(Program { statements })
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        let binding = if matches!(self.current_token, Token::Let) {
            self.advance()?;
            Binding::Local
        } else {
            Binding::Output
        };

        let target = match &self.current_token {
            Token::Identifier(name) => name.clone(),
            other => return Err(anyhow!("Expected assignment target, found {}", other)),
        };
        self.advance()?;
        self.expect(Token::Assign)?;
        let expr = self.parse_expression()?;

        Ok(Statement { target, binding, expr })
    }

    pub fn parse_expression(&mut self) -> Result<Expression> {
        self.nested(Self::parse_or_expression)
    }

    fn parse_or_expression(&mut self) -> Result<Expression> {
        let mut left = self.parse_and_expression()?;

        while matches!(self.current_token, Token::Or) {
            self.advance()?;
            let right = self.parse_and_expression()?;
            left = Expression::binary(left, BinaryOperator::Or, right);
        }

        Ok(left)
    }

    fn parse_and_expression(&mut self) -> Result<Expression> {
        let mut left = self.parse_equality_expression()?;

        while matches!(self.current_token, Token::And) {
            self.advance()?;
            let right = self.parse_equality_expression()?;
            left = Expression::binary(left, BinaryOperator::And, right);
        }

        Ok(left)
    }

    fn parse_equality_expression(&mut self) -> Result<Expression> {
        let mut left = self.parse_comparison_expression()?;

        loop {
            let op = match self.current_token {
                Token::Equal => BinaryOperator::Equal,
                Token::NotEqual => BinaryOperator::NotEqual,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_comparison_expression()?;
            left = Expression::binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_comparison_expression(&mut self) -> Result<Expression> {
        let mut left = self.parse_additive_expression()?;

        loop {
            let op = match self.current_token {
                Token::LessThan => BinaryOperator::LessThan,
                Token::LessThanEqual => BinaryOperator::LessThanOrEqual,
                Token::GreaterThan => BinaryOperator::GreaterThan,
                Token::GreaterThanEqual => BinaryOperator::GreaterThanOrEqual,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_additive_expression()?;
            left = Expression::binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_additive_expression(&mut self) -> Result<Expression> {
        let mut left = self.parse_multiplicative_expression()?;

        loop {
            let op = match self.current_token {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_multiplicative_expression()?;
            left = Expression::binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_multiplicative_expression(&mut self) -> Result<Expression> {
        let mut left = self.parse_unary_expression()?;

        loop {
            let op = match self.current_token {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                Token::Percent => BinaryOperator::Modulo,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_unary_expression()?;
            left = Expression::binary(left, op, right);
        }

        Ok(left)
    }

    // Unary binds looser than `**`, so `-x ** 2` is `-(x ** 2)`
    fn parse_unary_expression(&mut self) -> Result<Expression> {
        match self.current_token {
            Token::Minus => {
                self.advance()?;
                let operand = self.nested(Self::parse_unary_expression)?;
                Ok(Expression::unary(UnaryOperator::Negate, operand))
            }
            Token::Not => {
                self.advance()?;
                let operand = self.nested(Self::parse_unary_expression)?;
                Ok(Expression::unary(UnaryOperator::Not, operand))
            }
            _ => self.parse_power_expression(),
        }
    }

    fn parse_power_expression(&mut self) -> Result<Expression> {
        let base = self.parse_call_expression()?;

        // Power is right-associative
        if matches!(self.current_token, Token::Power) {
            self.advance()?;
            let exponent = self.nested(Self::parse_unary_expression)?;
            return Ok(Expression::binary(base, BinaryOperator::Power, exponent));
        }

        Ok(base)
    }

    fn parse_call_expression(&mut self) -> Result<Expression> {
        let expr = self.parse_primary_expression()?;

        if matches!(self.current_token, Token::LeftParen) {
            let Expression::Variable(name) = expr else {
                return Err(anyhow!("Only identifiers can be called as functions"));
            };
            self.advance()?; // consume '('
            let mut args = Vec::new();

            if !matches!(self.current_token, Token::RightParen) {
                args.push(self.parse_expression()?);

                while matches!(self.current_token, Token::Comma) {
                    self.advance()?;
                    args.push(self.parse_expression()?);
                }
            }

            self.expect(Token::RightParen)?;
            return Ok(Expression::call(&name, args));
        }

        Ok(expr)
    }

    fn parse_primary_expression(&mut self) -> Result<Expression> {
        match &self.current_token {
            Token::Number(value) => {
                let val = *value;
                self.advance()?;
                Ok(Expression::number(val))
            }
            Token::String(value) => {
                let val = value.clone();
                self.advance()?;
                Ok(Expression::string(&val))
            }
            Token::True => {
                self.advance()?;
                Ok(Expression::bool(true))
            }
            Token::False => {
                self.advance()?;
                Ok(Expression::bool(false))
            }
            Token::Identifier(name) => {
                let var_name = name.clone();
                self.advance()?;
                Ok(Expression::var(&var_name))
            }
            Token::LeftParen => {
                self.advance()?;
                let expr = self.parse_expression()?;
                self.expect(Token::RightParen)?;
                Ok(expr)
            }
            Token::If => {
                self.advance()?;
                let condition = self.parse_expression()?;
                self.expect(Token::Then)?;
                let then_expr = self.parse_expression()?;
                self.expect(Token::Else)?;
                let else_expr = self.parse_expression()?;
                Ok(Expression::conditional(condition, then_expr, else_expr))
            }
            Token::Cond => {
                self.advance()?;
                let mut conditions = Vec::new();
                let mut default_value = None;

                while matches!(self.current_token, Token::When) {
                    self.advance()?; // consume 'when'
                    let condition = self.parse_expression()?;
                    self.expect(Token::Then)?;
                    let value = self.parse_expression()?;
                    conditions.push((condition, value));
                }

                if conditions.is_empty() {
                    return Err(anyhow!("'cond' requires at least one 'when' branch"));
                }

                if matches!(self.current_token, Token::Default) {
                    self.advance()?; // consume 'default'
                    default_value = Some(self.parse_expression()?);
                }

                Ok(Expression::conditional_set(conditions, default_value))
            }
            _ => Err(anyhow!("Unexpected token: {}", self.current_token)),
        }
    }
}

/// Parse a single expression string into an AST
pub fn parse_expression(input: &str) -> Result<Expression> {
    let lexer = Lexer::new(input);
    let mut parser = Parser::new(lexer)?;
    let expr = parser.parse_expression()?;

    if !matches!(parser.current_token, Token::Eof) {
        return Err(anyhow!("Unexpected trailing input: {}", parser.current_token));
    }

    Ok(expr)
}

/// Parse a formula body into a program of statements
pub fn parse_program(input: &str) -> Result<Program> {
    parse_program_with_limits(input, &ExpressionLimits::default())
}

/// Parse a formula body, failing once nesting passes `limits.max_expression_depth`
pub fn parse_program_with_limits(input: &str, limits: &ExpressionLimits) -> Result<Program> {
    let lexer = Lexer::new(input);
    let mut parser = Parser::with_max_depth(lexer, limits.max_expression_depth)?;
    parser.parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            if token == Token::Eof {
                break;
            }
            out.push(token);
        }
        out
    }

    #[test]
    fn test_lexer_basic() {
        assert_eq!(
            tokens("let r = rate / 100; # monthly\npayment = r ** 2"),
            vec![
                Token::Let,
                Token::Identifier("r".to_string()),
                Token::Assign,
                Token::Identifier("rate".to_string()),
                Token::Slash,
                Token::Number(100.0),
                Token::Semicolon,
                Token::Identifier("payment".to_string()),
                Token::Assign,
                Token::Identifier("r".to_string()),
                Token::Power,
                Token::Number(2.0),
            ]
        );
    }

    #[test]
    fn test_lexer_numbers() {
        assert_eq!(tokens("1e3 2.5E-2 .5 10_000"), vec![
            Token::Number(1000.0),
            Token::Number(0.025),
            Token::Number(0.5),
            Token::Number(10000.0),
        ]);
    }

    #[test]
    fn test_lexer_rejects_single_ampersand() {
        let mut lexer = Lexer::new("a & b");
        lexer.next_token().unwrap();
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn test_parser_arithmetic_precedence() {
        let expr = parse_expression("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expression::binary(
                Expression::number(1.0),
                BinaryOperator::Add,
                Expression::binary(
                    Expression::number(2.0),
                    BinaryOperator::Multiply,
                    Expression::number(3.0)
                ),
            )
        );
    }

    #[test]
    fn test_parser_power_is_right_associative_and_binds_tighter_than_negation() {
        let expr = parse_expression("-2 ** 3 ** 2").unwrap();
        assert_eq!(
            expr,
            Expression::unary(
                UnaryOperator::Negate,
                Expression::binary(
                    Expression::number(2.0),
                    BinaryOperator::Power,
                    Expression::binary(
                        Expression::number(3.0),
                        BinaryOperator::Power,
                        Expression::number(2.0)
                    ),
                ),
            )
        );
    }

    #[test]
    fn test_parser_function_call() {
        let expr = parse_expression("max(a, 0)").unwrap();
        assert_eq!(expr, Expression::call("max", vec![Expression::var("a"), Expression::number(0.0)]));
    }

    #[test]
    fn test_parser_conditional_set() {
        let expr = parse_expression(
            r#"cond when bmi < 18.5 then "underweight" when bmi < 25 then "normal" default "overweight""#,
        )
        .unwrap();

        match expr {
            Expression::ConditionalSet { conditions, default_value } => {
                assert_eq!(conditions.len(), 2);
                assert_eq!(conditions[0].1, Expression::string("underweight"));
                assert_eq!(default_value.as_deref(), Some(&Expression::string("overweight")));
            }
            _ => panic!("Expected conditional set"),
        }
    }

    #[test]
    fn test_parse_program_statements() {
        let program = parse_program("let n = years * 12;\ntotal = n * 2;").unwrap();
        assert_eq!(program.statements.len(), 2);
        assert_eq!(program.statements[0].binding, Binding::Local);
        assert_eq!(program.statements[0].target, "n");
        assert_eq!(program.statements[1].binding, Binding::Output);
        assert_eq!(program.outputs().collect::<Vec<_>>(), vec!["total"]);
    }

    #[test]
    fn test_parse_program_requires_separator() {
        let err = parse_program("a = 1 b = 2").unwrap_err();
        assert!(err.to_string().contains("Expected ';'"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_expression("(1 + 2").is_err());
        assert!(parse_expression("\"open").is_err());
        assert!(parse_expression("1 + 2 3").is_err());
        assert!(parse_expression("cond default 1").is_err());
        assert!(parse_expression("1(2)").is_err());
    }

    #[test]
    fn test_nesting_is_bounded() {
        let limits = ExpressionLimits { max_expression_depth: 5, ..ExpressionLimits::default() };
        assert!(parse_program_with_limits("out = ((x))", &limits).is_ok());

        let err = parse_program_with_limits("out = (((((x)))))", &limits).unwrap_err();
        assert!(err.to_string().contains("nesting exceeds 5"));

        let err = parse_program_with_limits("out = - - - - - x", &limits).unwrap_err();
        assert!(err.to_string().contains("nesting exceeds"));

        let err = parse_program_with_limits("out = 2 ** 2 ** 2 ** 2 ** 2 ** 2", &limits).unwrap_err();
        assert!(err.to_string().contains("nesting exceeds"));
    }

    #[test]
    fn test_deep_parentheses_fail_without_overflowing() {
        let input = format!("out = {}x{}", "(".repeat(10_000), ")".repeat(10_000));
        let err = parse_program(&input).unwrap_err();
        assert!(err.to_string().contains("nesting exceeds"));

        let input = format!("out = {}x", "-".repeat(10_000));
        assert!(parse_program(&input).is_err());
    }
}
