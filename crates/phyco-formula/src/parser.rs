//! Expression parser
//!
//! A recursive descent parser for the internal formula form, where column
//! variables are written `[key.val]` or `[key.stat]`.

use phyco_core::NodeKey;

use crate::ast::{BinaryOperator, Expr, UnaryOperator, Variable, VariableAttribute};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::function_registry;
use crate::statistics::StatisticKind;

/// Parse an internal-form expression into an AST
///
/// # Example
/// ```rust
/// use phyco_formula::parse_expression;
///
/// let ast = parse_expression("1 + 2 * 3").unwrap();
/// let ast = parse_expression("[c0.val] / [c0.sum]").unwrap();
/// let ast = parse_expression("max(0, sqrt([c1.val]))").unwrap();
/// ```
pub fn parse_expression(expression: &str) -> FormulaResult<Expr> {
    let mut parser = ExpressionParser::new(expression)?;
    let expr = parser.parse_additive()?;

    if parser.current_token() != &Token::Eof {
        return Err(FormulaError::Syntax(format!(
            "Unexpected {} after expression",
            parser.current_token().describe()
        )));
    }

    Ok(expr)
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Identifier(String),
    Variable(String),

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Comma,
    LeftParen,
    RightParen,

    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::Identifier(name) => format!("identifier '{}'", name),
            Token::Variable(var) => format!("variable [{}]", var),
            Token::Plus => "'+'".into(),
            Token::Minus => "'-'".into(),
            Token::Star => "'*'".into(),
            Token::Slash => "'/'".into(),
            Token::Percent => "'%'".into(),
            Token::Caret => "'^'".into(),
            Token::Comma => "','".into(),
            Token::LeftParen => "'('".into(),
            Token::RightParen => "')'".into(),
            Token::Eof => "end of formula".into(),
        }
    }
}

/// Expression parser
struct ExpressionParser<'a> {
    input: &'a str,
    pos: usize,
    current_token: Token,
}

impl<'a> ExpressionParser<'a> {
    fn new(input: &'a str) -> FormulaResult<Self> {
        let mut parser = Self {
            input,
            pos: 0,
            current_token: Token::Eof,
        };
        parser.advance_token()?;
        Ok(parser)
    }

    // === Token scanning ===

    fn advance_token(&mut self) -> FormulaResult<()> {
        self.current_token = self.scan_token()?;
        Ok(())
    }

    fn scan_token(&mut self) -> FormulaResult<Token> {
        self.skip_whitespace();

        let c = match self.peek_char() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '%' => Some(Token::Percent),
            '^' => Some(Token::Caret),
            ',' => Some(Token::Comma),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return Ok(token);
        }

        if c == '[' {
            return self.scan_variable();
        }

        if c.is_ascii_digit()
            || (c == '.' && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit()))
        {
            return self.scan_number();
        }

        if c.is_ascii_alphabetic() || c == '_' {
            return Ok(self.scan_identifier());
        }

        Err(FormulaError::Syntax(format!(
            "Unexpected character '{}' at position {}",
            c, self.pos
        )))
    }

    fn scan_variable(&mut self) -> FormulaResult<Token> {
        self.advance(); // Skip '['
        let start = self.pos;

        while let Some(c) = self.peek_char() {
            match c {
                ']' => {
                    let inner = self.input[start..self.pos].to_string();
                    self.advance();
                    return Ok(Token::Variable(inner));
                }
                '[' => break,
                _ => self.advance(),
            }
        }

        Err(FormulaError::Syntax(format!(
            "Unterminated variable starting at position {}",
            start - 1
        )))
    }

    fn scan_number(&mut self) -> FormulaResult<Token> {
        let start = self.pos;

        // Integer part
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }

        // Decimal part
        if self.peek_char() == Some('.') {
            self.advance();
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        // Exponent part, only when digits follow
        if self.peek_char().map_or(false, |c| c == 'e' || c == 'E') {
            let sign = self.peek_char_at(1).map_or(false, |c| c == '+' || c == '-');
            let digit_offset = if sign { 2 } else { 1 };
            if self
                .peek_char_at(digit_offset)
                .map_or(false, |c| c.is_ascii_digit())
            {
                for _ in 0..digit_offset {
                    self.advance();
                }
                while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let text = &self.input[start..self.pos];
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| FormulaError::Syntax(format!("Invalid number '{}'", text)))
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek_char()
            .map_or(false, |c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }
        Token::Identifier(self.input[start..self.pos].to_string())
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn current_token(&self) -> &Token {
        &self.current_token
    }

    fn consume(&mut self) -> FormulaResult<Token> {
        let token = std::mem::replace(&mut self.current_token, Token::Eof);
        self.advance_token()?;
        Ok(token)
    }

    fn expect(&mut self, expected: &Token) -> FormulaResult<()> {
        if self.current_token() == expected {
            self.consume()?;
            Ok(())
        } else {
            Err(FormulaError::Syntax(format!(
                "Expected {}, got {}",
                expected.describe(),
                self.current_token().describe()
            )))
        }
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Addition/Subtraction: +, -
    // 2. Multiplication/Division/Modulo: *, /, %
    // 3. Unary: -, +
    // 4. Exponentiation: ^ (right associative)
    // 5. Primary: numbers, variables, constants, function calls, parentheses

    fn parse_additive(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_token() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };

            self.consume()?;
            let right = self.parse_multiplicative()?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current_token() {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                Token::Percent => BinaryOperator::Modulo,
                _ => break,
            };

            self.consume()?;
            let right = self.parse_unary()?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> FormulaResult<Expr> {
        match self.current_token() {
            Token::Minus => {
                self.consume()?;
                let operand = self.parse_unary()?;
                Ok(Expr::UnaryOp {
                    op: UnaryOperator::Negate,
                    operand: Box::new(operand),
                })
            }
            // Prefix plus (no-op)
            Token::Plus => {
                self.consume()?;
                self.parse_unary()
            }
            _ => self.parse_exponent(),
        }
    }

    fn parse_exponent(&mut self) -> FormulaResult<Expr> {
        let left = self.parse_primary()?;

        if matches!(self.current_token(), Token::Caret) {
            self.consume()?;
            let right = self.parse_unary()?; // Right associative, allows 2^-1
            return Ok(Expr::BinaryOp {
                op: BinaryOperator::Power,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn parse_primary(&mut self) -> FormulaResult<Expr> {
        match self.current_token().clone() {
            Token::Number(n) => {
                self.consume()?;
                Ok(Expr::Number(n))
            }

            Token::Variable(inner) => {
                self.consume()?;
                parse_variable(&inner).map(Expr::Variable)
            }

            Token::LeftParen => {
                self.consume()?;
                let expr = self.parse_additive()?;
                self.expect(&Token::RightParen)?;
                Ok(expr)
            }

            Token::Identifier(name) => {
                self.consume()?;
                if matches!(self.current_token(), Token::LeftParen) {
                    self.parse_function_call(name)
                } else {
                    parse_constant(&name)
                }
            }

            other => Err(FormulaError::Syntax(format!(
                "Unexpected {}",
                other.describe()
            ))),
        }
    }

    fn parse_function_call(&mut self, name: String) -> FormulaResult<Expr> {
        self.expect(&Token::LeftParen)?;

        let mut args = Vec::new();

        if !matches!(self.current_token(), Token::RightParen) {
            args.push(self.parse_additive()?);

            while matches!(self.current_token(), Token::Comma) {
                self.consume()?;
                args.push(self.parse_additive()?);
            }
        }

        self.expect(&Token::RightParen)?;

        let name = name.to_lowercase();
        let def = function_registry()
            .get(&name)
            .ok_or_else(|| FormulaError::UnknownFunction(name.clone()))?;
        def.check_arity(args.len())?;

        Ok(Expr::Function { name, args })
    }
}

/// Parse the inside of an internal `[key.attribute]` variable
fn parse_variable(inner: &str) -> FormulaResult<Variable> {
    let (key, attribute) = inner
        .rsplit_once('.')
        .ok_or_else(|| FormulaError::Syntax(format!("Variable [{}] has no attribute", inner)))?;

    if key.is_empty() {
        return Err(FormulaError::Syntax(format!("Variable [{}] has no key", inner)));
    }

    let attribute = if attribute == "val" {
        VariableAttribute::Value
    } else {
        let kind = attribute.parse::<StatisticKind>().map_err(|_| {
            FormulaError::Syntax(format!("Unknown variable attribute in [{}]", inner))
        })?;
        VariableAttribute::Statistic(kind)
    };

    Ok(Variable {
        key: NodeKey::from(key),
        attribute,
    })
}

fn parse_constant(name: &str) -> FormulaResult<Expr> {
    match name.to_uppercase().as_str() {
        "PI" => Ok(Expr::Number(std::f64::consts::PI)),
        "E" => Ok(Expr::Number(std::f64::consts::E)),
        _ => Err(FormulaError::Syntax(format!("Unknown identifier '{}'", name))),
    }
}
