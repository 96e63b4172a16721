use std::io::{self, Write};

use log::{debug, trace};
use thiserror::Error;

use crate::{
    ast::{BinaryExpr, Expr, LiteralExpr, LogicalExpr, Stmt, UnaryExpr},
    environment::{Environment, ScopeId},
    scanner::{Token, TokenKind},
};

const OPERAND_MUST_BE_NUMBER: &str = "Operand must be a number.";
const OPERANDS_MUST_BE_NUMBERS: &str = "Operands must be numbers.";
const OPERANDS_MUST_BE_ADDABLE: &str = "Operands must be two numbers or two strings.";

#[derive(Clone, Debug, PartialEq)]
pub enum LoxValue {
    Nil,
    Boolean(bool),
    Number(f64),
    String(String),
}

impl LoxValue {
    /// `nil` and `false` are falsy, everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, LoxValue::Nil | LoxValue::Boolean(false))
    }

    pub fn is_equal(&self, other: &LoxValue) -> bool {
        match (self, other) {
            (LoxValue::Nil, LoxValue::Nil) => true,
            (LoxValue::Boolean(a), LoxValue::Boolean(b)) => a == b,
            (LoxValue::Number(a), LoxValue::Number(b)) => a == b,
            (LoxValue::String(a), LoxValue::String(b)) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Display for LoxValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self {
            LoxValue::String(s) => write!(f, "{s}"),
            LoxValue::Number(n) => write!(f, "{n}"),
            LoxValue::Boolean(b) => write!(f, "{b}"),
            LoxValue::Nil => write!(f, "nil"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}\n[line {}]", .kind, .token.line)]
pub struct RuntimeError {
    pub token: Token,
    pub kind: RuntimeErrorKind,
}

impl RuntimeError {
    pub fn line(&self) -> u32 {
        self.token.line
    }

    fn type_error(operator: &Token, message: &'static str) -> Self {
        RuntimeError {
            token: operator.clone(),
            kind: RuntimeErrorKind::TypeError(message),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeErrorKind {
    #[error("{0}")]
    TypeError(&'static str),
    #[error("Undefined variable '{0}'")]
    UndefinedVariable(String),
}

#[derive(Error, Debug)]
pub enum InterpretError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error("failed to write program output: {0}")]
    Output(#[from] io::Error),
}

pub type RunResult = Result<(), InterpretError>;
pub type EvaluationResult = Result<LoxValue, InterpretError>;

/// Tree-walking evaluator; `print` writes to `W`.
pub struct Interpreter<W: Write> {
    environment: Environment,
    scope: ScopeId,
    output: W,
}

impl<W: Write> Interpreter<W> {
    pub fn new(output: W) -> Self {
        let environment = Environment::default();
        let scope = environment.global();
        Interpreter {
            environment,
            scope,
            output,
        }
    }

    /// Runs `statements` in order, stopping at the first runtime error.
    /// Output already written stays written.
    pub fn interpret(&mut self, statements: &[Stmt]) -> RunResult {
        let result = statements
            .iter()
            .try_for_each(|statement| statement.evaluate(self));

        if let Err(error) = &result {
            debug!("interpretation aborted: {error}");
        }
        result
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Runs `statements` in a fresh child scope. The previous scope is
    /// restored on every exit path.
    fn execute_block(&mut self, statements: &[Stmt]) -> RunResult {
        let previous = self.scope;
        self.scope = self.environment.push(previous);

        let result = statements
            .iter()
            .try_for_each(|statement| statement.evaluate(self));

        self.environment.pop(self.scope);
        self.scope = previous;
        result
    }
}

pub trait Evaluate<T = LoxValue> {
    fn evaluate<W: Write>(&self, interpreter: &mut Interpreter<W>) -> Result<T, InterpretError>;
}

impl Evaluate<()> for Stmt {
    fn evaluate<W: Write>(&self, interpreter: &mut Interpreter<W>) -> RunResult {
        trace!("executing {self:?}");
        match self {
            Stmt::Block(statements) => interpreter.execute_block(statements),
            Stmt::Print(expr) => {
                let value = expr.evaluate(interpreter)?;
                writeln!(interpreter.output, "{value}")?;
                Ok(())
            }
            Stmt::Expression(expr) => expr.evaluate(interpreter).map(|_| ()),
            Stmt::Var { name, initializer } => {
                let value = if let Some(expr) = initializer {
                    expr.evaluate(interpreter)?
                } else {
                    LoxValue::Nil
                };
                interpreter
                    .environment
                    .define(interpreter.scope, name.lexeme.clone(), value);
                Ok(())
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if condition.evaluate(interpreter)?.is_truthy() {
                    then_branch.evaluate(interpreter)
                } else if let Some(else_branch) = else_branch {
                    else_branch.evaluate(interpreter)
                } else {
                    Ok(())
                }
            }
        }
    }
}

impl Evaluate for Expr {
    fn evaluate<W: Write>(&self, interpreter: &mut Interpreter<W>) -> EvaluationResult {
        match self {
            Expr::Literal(l) => l.evaluate(interpreter),
            Expr::Unary(u) => u.evaluate(interpreter),
            Expr::Binary(b) => b.evaluate(interpreter),
            Expr::Grouping(inner) => inner.evaluate(interpreter),
            Expr::Logical(l) => l.evaluate(interpreter),
            Expr::Variable(name) => Ok(interpreter.environment.get(interpreter.scope, name)?),
            Expr::Assign { name, value } => {
                let value = value.evaluate(interpreter)?;
                interpreter
                    .environment
                    .assign(interpreter.scope, name, value.clone())?;
                Ok(value)
            }
        }
    }
}

impl Evaluate for LiteralExpr {
    fn evaluate<W: Write>(&self, _interpreter: &mut Interpreter<W>) -> EvaluationResult {
        Ok(match self {
            LiteralExpr::Boolean(b) => LoxValue::Boolean(*b),
            LiteralExpr::Number(n) => LoxValue::Number(*n),
            LiteralExpr::String(s) => LoxValue::String(s.clone()),
            LiteralExpr::Nil => LoxValue::Nil,
        })
    }
}

impl Evaluate for UnaryExpr {
    fn evaluate<W: Write>(&self, interpreter: &mut Interpreter<W>) -> EvaluationResult {
        let right = self.right.evaluate(interpreter)?;
        match (self.operator.kind, right) {
            (TokenKind::Minus, LoxValue::Number(n)) => Ok(LoxValue::Number(-n)),
            (TokenKind::Minus, _) => {
                Err(RuntimeError::type_error(&self.operator, OPERANDS_MUST_BE_NUMBERS).into())
            }
            (TokenKind::Bang, right) => Ok(LoxValue::Boolean(!right.is_truthy())),
            _ => unreachable!(),
        }
    }
}

impl Evaluate for BinaryExpr {
    fn evaluate<W: Write>(&self, interpreter: &mut Interpreter<W>) -> EvaluationResult {
        let left = self.left.evaluate(interpreter)?;
        let right = self.right.evaluate(interpreter)?;
        let operator = &self.operator;

        let value = match operator.kind {
            TokenKind::Plus => match (left, right) {
                (LoxValue::Number(a), LoxValue::Number(b)) => LoxValue::Number(a + b),
                (LoxValue::String(mut a), LoxValue::String(b)) => {
                    a.push_str(&b);
                    LoxValue::String(a)
                }
                _ => {
                    return Err(RuntimeError::type_error(operator, OPERANDS_MUST_BE_ADDABLE).into())
                }
            },
            TokenKind::Minus => {
                let (a, b) = number_operands(operator, &left, &right, OPERANDS_MUST_BE_NUMBERS)?;
                LoxValue::Number(a - b)
            }
            TokenKind::Star => {
                let (a, b) = number_operands(operator, &left, &right, OPERAND_MUST_BE_NUMBER)?;
                LoxValue::Number(a * b)
            }
            TokenKind::Slash => {
                let (a, b) = number_operands(operator, &left, &right, OPERAND_MUST_BE_NUMBER)?;
                LoxValue::Number(a / b)
            }
            TokenKind::Greater => {
                let (a, b) = number_operands(operator, &left, &right, OPERAND_MUST_BE_NUMBER)?;
                LoxValue::Boolean(a > b)
            }
            TokenKind::GreaterEqual => {
                let (a, b) = number_operands(operator, &left, &right, OPERAND_MUST_BE_NUMBER)?;
                LoxValue::Boolean(a >= b)
            }
            TokenKind::Less => {
                let (a, b) = number_operands(operator, &left, &right, OPERAND_MUST_BE_NUMBER)?;
                LoxValue::Boolean(a < b)
            }
            TokenKind::LessEqual => {
                let (a, b) = number_operands(operator, &left, &right, OPERAND_MUST_BE_NUMBER)?;
                LoxValue::Boolean(a <= b)
            }
            // Both equality operators yield the negated comparison, so `==`
            // currently behaves exactly like `!=`.
            TokenKind::BangEqual | TokenKind::EqualEqual => {
                LoxValue::Boolean(!left.is_equal(&right))
            }
            _ => unreachable!(),
        };

        Ok(value)
    }
}

impl Evaluate for LogicalExpr {
    fn evaluate<W: Write>(&self, interpreter: &mut Interpreter<W>) -> EvaluationResult {
        let left = self.left.evaluate(interpreter)?;
        match self.operator.kind {
            TokenKind::And if !left.is_truthy() => Ok(left),
            TokenKind::Or if left.is_truthy() => Ok(left),
            TokenKind::And | TokenKind::Or => self.right.evaluate(interpreter),
            _ => unreachable!(),
        }
    }
}

fn number_operands(
    operator: &Token,
    left: &LoxValue,
    right: &LoxValue,
    message: &'static str,
) -> Result<(f64, f64), RuntimeError> {
    match (left, right) {
        (LoxValue::Number(a), LoxValue::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::type_error(operator, message)),
    }
}
