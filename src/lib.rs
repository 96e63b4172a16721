//! Front-end and tree-walking evaluator for the Lox scripting language.
//!
//! Source text flows through [`scan`], [`parse`] and
//! [`Interpreter::interpret`]; each stage hands its diagnostics back as
//! values. [`run`] strings the three together the way a driver would.

pub mod ast;
pub mod environment;
pub mod interpreter;
pub mod parser;
pub mod scanner;

use std::io::Write;

use thiserror::Error;

pub use interpreter::{
    InterpretError, Interpreter, LoxValue, RunResult, RuntimeError, RuntimeErrorKind,
};
pub use parser::{parse, ParseError, Parsed};
pub use scanner::{scan, LexError, Scanned, Token, TokenKind};

/// A diagnostic from the static stages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl SyntaxError {
    pub fn line(&self) -> u32 {
        match self {
            SyntaxError::Lex(error) => error.line,
            SyntaxError::Parse(error) => error.line(),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{}", render(.0))]
    Syntax(Vec<SyntaxError>),
    #[error(transparent)]
    Interpret(#[from] InterpretError),
}

fn render(errors: &[SyntaxError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Scans, parses and executes `source` against `interpreter`.
///
/// Any lex or parse diagnostic suppresses execution; all of them are
/// returned, lex errors first.
pub fn run<W: Write>(source: &str, interpreter: &mut Interpreter<W>) -> Result<(), Error> {
    let Scanned {
        tokens,
        errors: lex_errors,
    } = scan(source);
    let Parsed {
        statements,
        errors: parse_errors,
    } = parse(&tokens);

    let diagnostics: Vec<SyntaxError> = lex_errors
        .into_iter()
        .map(SyntaxError::Lex)
        .chain(parse_errors.into_iter().map(SyntaxError::Parse))
        .collect();
    if !diagnostics.is_empty() {
        return Err(Error::Syntax(diagnostics));
    }

    interpreter.interpret(&statements)?;
    Ok(())
}
