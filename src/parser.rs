use crate::{
    ast::{BinaryExpr, Expr, LiteralExpr, LogicalExpr, Stmt, UnaryExpr},
    scanner::{Literal, Token, TokenKind},
};

use log::debug;
use thiserror::Error;

type StmtResult = Result<Stmt, ParseError>;
type ExprResult = Result<Expr, ParseError>;

/// Recursive descent parser over a scanned token slice.
///
/// Syntax errors are collected rather than returned: a failed declaration is
/// dropped and the parser resynchronizes at the next statement boundary.
struct Parser<'t> {
    tokens: &'t [Token],
    current: usize,
    eof: Token,
    errors: Vec<ParseError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub statements: Vec<Stmt>,
    pub errors: Vec<ParseError>,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {}] Error {}: {}", .token.line, location(.token), .message)]
pub struct ParseError {
    pub token: Token,
    pub message: &'static str,
}

impl ParseError {
    pub fn line(&self) -> u32 {
        self.token.line
    }
}

fn location(token: &Token) -> String {
    match token.kind {
        TokenKind::Eof => "at end".into(),
        _ => format!("at '{}'", token.lexeme),
    }
}

pub fn parse(tokens: &[Token]) -> Parsed {
    let mut parser = Parser::new(tokens);
    let mut statements = vec![];

    while !parser.is_at_end() {
        if let Some(statement) = parser.declaration() {
            statements.push(statement);
        }
    }

    debug!(
        "parsed {} statements with {} parse errors",
        statements.len(),
        parser.errors.len()
    );
    Parsed {
        statements,
        errors: parser.errors,
    }
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        let eof = Token {
            kind: TokenKind::Eof,
            lexeme: String::new(),
            literal: None,
            line: tokens.last().map_or(1, |token| token.line),
        };
        Parser {
            tokens,
            current: 0,
            eof,
            errors: vec![],
        }
    }

    fn declaration(&mut self) -> Option<Stmt> {
        let result = if self.advance_on_match(&[TokenKind::Var]).is_some() {
            self.var_decl()
        } else {
            self.statement()
        };

        match result {
            Ok(statement) => Some(statement),
            Err(error) => {
                self.errors.push(error);
                self.synchronize();
                None
            }
        }
    }

    fn var_decl(&mut self) -> StmtResult {
        let name = self.ensure_next_token(TokenKind::Identifier, "Expect variable name.")?;
        let initializer = if self.advance_on_match(&[TokenKind::Equal]).is_some() {
            Some(self.expression()?)
        } else {
            None
        };

        self.ensure_next_token(
            TokenKind::Semicolon,
            "Expect ';' after variable declaration.",
        )?;
        Ok(Stmt::Var { name, initializer })
    }

    fn statement(&mut self) -> StmtResult {
        let matched = self
            .advance_on_match(&[TokenKind::If, TokenKind::Print, TokenKind::LeftBrace])
            .map(|token| token.kind);

        match matched {
            Some(TokenKind::If) => self.if_statement(),
            Some(TokenKind::Print) => {
                let value = self.expression()?;
                self.ensure_next_token(TokenKind::Semicolon, "Expect ';' after value.")?;
                Ok(Stmt::Print(value))
            }
            Some(TokenKind::LeftBrace) => Ok(Stmt::Block(self.block_statement()?)),
            _ => {
                let expr = self.expression()?;
                self.ensure_next_token(TokenKind::Semicolon, "Expect ';' after expression.")?;
                Ok(Stmt::Expression(expr))
            }
        }
    }

    fn if_statement(&mut self) -> StmtResult {
        self.ensure_next_token(TokenKind::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.ensure_next_token(TokenKind::RightParen, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.advance_on_match(&[TokenKind::Else]).is_some() {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn block_statement(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = vec![];

        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            if let Some(statement) = self.declaration() {
                statements.push(statement);
            }
        }

        self.ensure_next_token(TokenKind::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    fn expression(&mut self) -> ExprResult {
        self.assignment()
    }

    fn assignment(&mut self) -> ExprResult {
        let expr = self.or()?;

        let Some(equals) = self.advance_on_match(&[TokenKind::Equal]) else {
            return Ok(expr);
        };
        let value = self.assignment()?;

        match expr {
            Expr::Variable(name) => Ok(Expr::Assign {
                name,
                value: Box::new(value),
            }),
            // Reported without unwinding; the statement still parses.
            target => {
                self.errors.push(ParseError {
                    token: equals,
                    message: "Invalid assignment target.",
                });
                Ok(target)
            }
        }
    }

    fn or(&mut self) -> ExprResult {
        let mut expr = self.and()?;
        while let Some(operator) = self.advance_on_match(&[TokenKind::Or]) {
            let right = self.and()?;
            expr = Expr::Logical(Box::new(LogicalExpr {
                left: expr,
                operator,
                right,
            }))
        }

        Ok(expr)
    }

    fn and(&mut self) -> ExprResult {
        let mut expr = self.equality()?;
        while let Some(operator) = self.advance_on_match(&[TokenKind::And]) {
            let right = self.equality()?;
            expr = Expr::Logical(Box::new(LogicalExpr {
                left: expr,
                operator,
                right,
            }))
        }

        Ok(expr)
    }

    fn equality(&mut self) -> ExprResult {
        self.binary(&[TokenKind::BangEqual, TokenKind::EqualEqual], Self::comparison)
    }

    fn comparison(&mut self) -> ExprResult {
        self.binary(
            &[
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
            ],
            Self::term,
        )
    }

    fn term(&mut self) -> ExprResult {
        self.binary(&[TokenKind::Minus, TokenKind::Plus], Self::factor)
    }

    fn factor(&mut self) -> ExprResult {
        self.binary(&[TokenKind::Slash, TokenKind::Star], Self::unary)
    }

    /// One left-associative precedence level: `operand (op operand)*`.
    fn binary(
        &mut self,
        operators: &[TokenKind],
        operand: fn(&mut Self) -> ExprResult,
    ) -> ExprResult {
        let mut expr = operand(self)?;
        while let Some(operator) = self.advance_on_match(operators) {
            let right = operand(self)?;
            expr = Expr::Binary(Box::new(BinaryExpr {
                left: expr,
                operator,
                right,
            }))
        }

        Ok(expr)
    }

    fn unary(&mut self) -> ExprResult {
        if let Some(operator) = self.advance_on_match(&[TokenKind::Bang, TokenKind::Minus]) {
            let right = self.unary()?;
            Ok(Expr::Unary(Box::new(UnaryExpr { operator, right })))
        } else {
            self.primary()
        }
    }

    fn primary(&mut self) -> ExprResult {
        let token = self.peek().clone();
        let expr = match token.kind {
            TokenKind::False => Expr::Literal(LiteralExpr::Boolean(false)),
            TokenKind::True => Expr::Literal(LiteralExpr::Boolean(true)),
            TokenKind::Nil => Expr::Literal(LiteralExpr::Nil),
            TokenKind::Number | TokenKind::String => match token.literal.clone() {
                Some(Literal::Number(n)) => Expr::Literal(LiteralExpr::Number(n)),
                Some(Literal::String(s)) => Expr::Literal(LiteralExpr::String(s)),
                None => {
                    return Err(ParseError {
                        token,
                        message: "Expect expression.",
                    })
                }
            },
            TokenKind::Identifier => Expr::Variable(token),
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.ensure_next_token(TokenKind::RightParen, "Expect ')' after expression.")?;
                return Ok(Expr::Grouping(Box::new(expr)));
            }
            _ => {
                return Err(ParseError {
                    token,
                    message: "Expect expression.",
                })
            }
        };

        self.advance();
        Ok(expr)
    }

    /// Discards tokens until the start of what is probably the next statement.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self
                .previous()
                .is_some_and(|token| token.kind == TokenKind::Semicolon)
            {
                return;
            }

            match self.peek().kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => {}
            }

            self.advance();
        }
    }

    fn ensure_next_token(
        &mut self,
        token_kind: TokenKind,
        message: &'static str,
    ) -> Result<Token, ParseError> {
        if self.check(token_kind) {
            Ok(self.advance())
        } else {
            Err(ParseError {
                token: self.peek().clone(),
                message,
            })
        }
    }

    fn advance_on_match(&mut self, token_kinds: &[TokenKind]) -> Option<Token> {
        if token_kinds.contains(&self.peek().kind) && !self.is_at_end() {
            Some(self.advance())
        } else {
            None
        }
    }

    fn check(&self, token_kind: TokenKind) -> bool {
        self.peek().kind == token_kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.current).unwrap_or(&self.eof)
    }

    fn previous(&self) -> Option<&Token> {
        self.current
            .checked_sub(1)
            .and_then(|index| self.tokens.get(index))
    }
}
