// ABOUTME: Recursive descent parser turning tokens into the syntax tree

use crate::ast::{BinaryOp, ElseIf, Expression, Program, Statement, UnaryOp};
use crate::error::ParseError;
use crate::lexer::tokenize;
use crate::token::{Token, TokenKind};

/// Parses a whole source string. Convenience wrapper over lex + parse.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    Parser::new(tokenize(source)).parse_program()
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    pub fn parse_program(mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        while !self.check(TokenKind::Eof) {
            statements.push(self.parse_statement()?);
        }
        Ok(Program { statements })
    }

    // ------------------------------------------------------------------
    // Cursor primitives
    // ------------------------------------------------------------------

    fn peek(&self) -> &Token {
        // The token vector always ends with Eof, so pos stays in range.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        Err(self.error_here(format!("expected {}", kind.describe())))
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        let token = self.peek();
        // Lexer diagnostics take precedence over whatever the parser wanted.
        if token.kind == TokenKind::Error {
            return ParseError::new(token.lexeme.clone(), token.line);
        }
        ParseError::new(message, token.line)
    }

    /// A plain variable name.
    fn parse_identifier(&mut self) -> Result<String, ParseError> {
        let token = self.expect(TokenKind::Identifier)?;
        Ok(token.lexeme)
    }

    /// A function name. Builtins like `swap` and `print` are keywords, so a
    /// name position accepts any word token, lowercasing keywords to match
    /// the builtin table.
    fn parse_function_name(&mut self) -> Result<String, ParseError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Identifier => {
                self.advance();
                Ok(token.lexeme)
            }
            kind if kind != TokenKind::Eof
                && kind != TokenKind::String
                && kind != TokenKind::Error
                && !token.lexeme.is_empty()
                && token.lexeme.chars().all(|c| c.is_ascii_alphabetic()) =>
            {
                self.advance();
                Ok(token.lexeme.to_lowercase())
            }
            _ => Err(self.error_here("expected a function name")),
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Declare => self.parse_declare(),
            TokenKind::Set => self.parse_set(),
            TokenKind::Print => self.parse_print(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Call => self.parse_call_statement(),
            TokenKind::Toggle => self.parse_toggle(),
            TokenKind::If => self.parse_if(),
            TokenKind::Repeat => self.parse_repeat(),
            TokenKind::For => self.parse_for_each(),
            TokenKind::Break => self.parse_break(),
            TokenKind::Error => Err(self.error_here("")),
            kind if kind.is_reserved() => Err(self.error_here(format!(
                "{} is reserved and not yet supported",
                kind.describe()
            ))),
            kind => Err(self.error_here(format!("unexpected {}", kind.describe()))),
        }
    }

    fn parse_declare(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::Declare)?;
        if self.check(TokenKind::Function) {
            return self.parse_function_decl();
        }
        let name = self.parse_identifier()?;
        self.expect(TokenKind::To)?;
        let constant = self.matches(TokenKind::Always);
        self.expect(TokenKind::Be)?;
        let value = self.parse_expression()?;
        self.expect(TokenKind::Period)?;
        Ok(Statement::VariableDecl {
            name,
            constant,
            value,
        })
    }

    fn parse_function_decl(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::Function)?;
        let name = self.parse_function_name()?;
        self.expect(TokenKind::That)?;

        let mut params = Vec::new();
        if self.matches(TokenKind::Takes) {
            loop {
                params.push(self.parse_identifier()?);
                if self.matches(TokenKind::And) {
                    if self.check(TokenKind::Does) {
                        break;
                    }
                } else {
                    break;
                }
            }
        }

        self.expect(TokenKind::Does)?;
        self.expect(TokenKind::The)?;
        self.expect(TokenKind::Following)?;
        self.expect(TokenKind::Colon)?;
        let body = self.parse_block()?;
        self.expect_block_end()?;
        Ok(Statement::FunctionDecl { name, params, body })
    }

    fn parse_set(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::Set)?;
        let name = self.parse_identifier()?;
        if self.matches(TokenKind::At) {
            self.expect(TokenKind::Position)?;
            let index = self.parse_expression()?;
            self.expect(TokenKind::To)?;
            self.expect(TokenKind::Be)?;
            let value = self.parse_expression()?;
            self.expect(TokenKind::Period)?;
            return Ok(Statement::IndexAssignment { name, index, value });
        }
        self.expect(TokenKind::To)?;
        self.expect(TokenKind::Be)?;
        let value = self.parse_expression()?;
        self.expect(TokenKind::Period)?;
        Ok(Statement::Assignment { name, value })
    }

    fn parse_print(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::Print)?;
        let value = self.parse_expression()?;
        self.expect(TokenKind::Period)?;
        Ok(Statement::Output(value))
    }

    fn parse_return(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::Return)?;
        let value = self.parse_expression()?;
        self.expect(TokenKind::Period)?;
        Ok(Statement::Return(value))
    }

    fn parse_call_statement(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::Call)?;
        let name = self.parse_function_name()?;
        let args = if self.matches(TokenKind::With) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        self.expect(TokenKind::Period)?;
        Ok(Statement::Call(Expression::FunctionCall { name, args }))
    }

    fn parse_toggle(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::Toggle)?;
        let name = self.parse_identifier()?;
        self.expect(TokenKind::Period)?;
        Ok(Statement::Toggle(name))
    }

    fn parse_if(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::If)?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::Comma)?;
        self.expect(TokenKind::Then)?;
        let then_body = self.parse_block()?;

        let mut else_ifs = Vec::new();
        let mut else_body = Vec::new();
        while self.matches(TokenKind::Otherwise) {
            if self.matches(TokenKind::If) {
                let condition = self.parse_expression()?;
                self.expect(TokenKind::Comma)?;
                self.expect(TokenKind::Then)?;
                let body = self.parse_block()?;
                else_ifs.push(ElseIf { condition, body });
            } else {
                self.matches(TokenKind::Comma);
                else_body = self.parse_block()?;
                break;
            }
        }

        self.expect_block_end()?;
        Ok(Statement::If {
            condition,
            then_body,
            else_ifs,
            else_body,
        })
    }

    fn parse_repeat(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::Repeat)?;
        self.expect(TokenKind::The)?;
        self.expect(TokenKind::Following)?;

        if self.matches(TokenKind::While) {
            let condition = self.parse_expression()?;
            self.expect(TokenKind::Colon)?;
            let body = self.parse_block()?;
            self.expect_block_end()?;
            return Ok(Statement::While { condition, body });
        }

        if self.matches(TokenKind::Forever) {
            self.expect(TokenKind::Colon)?;
            let body = self.parse_block()?;
            self.expect_block_end()?;
            // An endless loop is a while over a literal true.
            return Ok(Statement::While {
                condition: Expression::BoolLiteral(true),
                body,
            });
        }

        let count = self.parse_expression()?;
        self.expect(TokenKind::Times)?;
        self.expect(TokenKind::Colon)?;
        let body = self.parse_block()?;
        self.expect_block_end()?;
        Ok(Statement::For { count, body })
    }

    fn parse_for_each(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::For)?;
        self.expect(TokenKind::Each)?;
        let name = self.parse_identifier()?;
        self.expect(TokenKind::In)?;
        let list = self.parse_expression()?;
        self.expect(TokenKind::Comma)?;
        self.expect(TokenKind::Do)?;
        self.expect(TokenKind::The)?;
        self.expect(TokenKind::Following)?;
        self.expect(TokenKind::Colon)?;
        let body = self.parse_block()?;
        self.expect_block_end()?;
        Ok(Statement::ForEach { name, list, body })
    }

    fn parse_break(&mut self) -> Result<Statement, ParseError> {
        self.expect(TokenKind::Break)?;
        self.expect(TokenKind::Out)?;
        self.expect(TokenKind::Of)?;
        self.expect(TokenKind::The)?;
        self.expect(TokenKind::Loop)?;
        self.expect(TokenKind::Period)?;
        Ok(Statement::Break)
    }

    /// Statements up to the enclosing block's terminator (`thats it.` or an
    /// `otherwise` arm).
    fn parse_block(&mut self) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();
        while !self.check(TokenKind::Thats)
            && !self.check(TokenKind::Otherwise)
            && !self.check(TokenKind::Eof)
        {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    /// The literal phrase `thats it.` closing every compound statement.
    fn expect_block_end(&mut self) -> Result<(), ParseError> {
        self.expect(TokenKind::Thats)?;
        self.expect(TokenKind::It)?;
        self.expect(TokenKind::Period)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Expressions, by decreasing precedence
    // ------------------------------------------------------------------

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_comparison()?;
        while self.matches(TokenKind::And) {
            let right = self.parse_comparison()?;
            left = Expression::Binary {
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// Comparison level. Call arguments parse at this level so the English
    /// `and` separator never collides with the logical operator.
    fn parse_comparison(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::IsEqualTo | TokenKind::Equals => BinaryOp::Equal,
                TokenKind::IsNotEqualTo => BinaryOp::NotEqual,
                TokenKind::IsLessThan => BinaryOp::Less,
                TokenKind::IsGreaterThan => BinaryOp::Greater,
                TokenKind::IsLessThanOrEqualTo => BinaryOp::LessEqual,
                TokenKind::IsGreaterThanOrEqualTo => BinaryOp::GreaterEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Multiply,
                TokenKind::Slash => BinaryOp::Divide,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        if self.matches(TokenKind::Minus) {
            let operand = self.parse_unary()?;
            return Ok(Expression::Unary {
                op: UnaryOp::Negate,
                operand: Box::new(operand),
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number => {
                self.advance();
                let value: f64 = token
                    .lexeme
                    .parse()
                    .map_err(|_| ParseError::new("invalid number literal", token.line))?;
                Ok(Expression::NumberLiteral(value))
            }
            TokenKind::String => {
                self.advance();
                Ok(Expression::StringLiteral(token.lexeme))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::BoolLiteral(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::BoolLiteral(false))
            }
            TokenKind::LeftBracket => self.parse_list_literal(),
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RightParen)?;
                Ok(inner)
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(Expression::Identifier(token.lexeme))
            }
            TokenKind::The => {
                self.advance();
                self.parse_the_phrase()
            }
            TokenKind::Error => Err(self.error_here("")),
            kind => Err(self.error_here(format!("unexpected {} in expression", kind.describe()))),
        }
    }

    fn parse_list_literal(&mut self) -> Result<Expression, ParseError> {
        self.expect(TokenKind::LeftBracket)?;
        let mut elements = Vec::new();
        if !self.check(TokenKind::RightBracket) {
            loop {
                elements.push(self.parse_expression()?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightBracket)?;
        Ok(Expression::ListLiteral(elements))
    }

    /// The English noun phrases: `the value of`, `the result of calling`,
    /// `the item at position`, `the length of`, `the location of`,
    /// `the remainder of … divided by …`. The leading `the` is consumed.
    fn parse_the_phrase(&mut self) -> Result<Expression, ParseError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Value => {
                self.advance();
                self.expect(TokenKind::Of)?;
                // Transparent wrapper: `the value of x` is just x.
                self.parse_comparison()
            }
            TokenKind::Identifier if token.lexeme.eq_ignore_ascii_case("result") => {
                self.advance();
                self.expect(TokenKind::Of)?;
                self.expect(TokenKind::Calling)?;
                let name = self.parse_function_name()?;
                let args = if self.matches(TokenKind::With) {
                    self.parse_arguments()?
                } else {
                    Vec::new()
                };
                Ok(Expression::FunctionCall { name, args })
            }
            TokenKind::Item => {
                self.advance();
                self.expect(TokenKind::At)?;
                self.expect(TokenKind::Position)?;
                let index = self.parse_comparison()?;
                self.expect(TokenKind::In)?;
                let list = self.parse_primary()?;
                Ok(Expression::Index {
                    list: Box::new(list),
                    index: Box::new(index),
                })
            }
            TokenKind::Length => {
                self.advance();
                self.expect(TokenKind::Of)?;
                let inner = self.parse_comparison()?;
                Ok(Expression::Length(Box::new(inner)))
            }
            TokenKind::Location => {
                self.advance();
                self.expect(TokenKind::Of)?;
                let name = self.parse_identifier()?;
                Ok(Expression::Location(name))
            }
            TokenKind::Remainder => {
                self.advance();
                self.expect(TokenKind::Of)?;
                let left = self.parse_additive()?;
                self.expect(TokenKind::Divided)?;
                self.expect(TokenKind::By)?;
                let right = self.parse_additive()?;
                Ok(Expression::Binary {
                    op: BinaryOp::Remainder,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            _ => Err(self.error_here("expected a phrase after 'the'")),
        }
    }

    /// Call arguments separated by the English `and`.
    fn parse_arguments(&mut self) -> Result<Vec<Expression>, ParseError> {
        let mut args = vec![self.parse_comparison()?];
        while self.matches(TokenKind::And) {
            args.push(self.parse_comparison()?);
        }
        Ok(args)
    }
}
