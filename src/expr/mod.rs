//! Boolean conditions over counter values
//!
//! Used by the evaluate modes to gate a build on counter values
//! (`NumIRInsts < 1_000_000`) or on counter deltas between two runs
//! (`NumLLVMBytesOutput <= 0 && NumIRInsts == 0`).

mod ast;
mod eval;
mod lexer;
mod parser;

pub use ast::{BinaryOp, CmpOp, Expr};
pub use eval::{eval, Environment, Value};

use crate::compare::ComparisonRow;
use crate::counter::{is_timer, last_identifier};
use crate::Snapshot;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ExprError {
    #[error("unexpected character '{ch}' at column {col}")]
    UnexpectedChar { col: usize, ch: char },

    #[error("invalid number '{text}' at column {col}")]
    InvalidNumber { col: usize, text: String },

    #[error("expected {expected} at column {col}, found {found}")]
    UnexpectedToken {
        col: usize,
        found: String,
        expected: String,
    },

    #[error("expression nested too deeply at column {col}")]
    TooDeep { col: usize },

    #[error("name '{0}' is not defined")]
    UnknownVariable(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow in {lhs} {op} {rhs}")]
    Overflow { op: &'static str, lhs: i64, rhs: i64 },

    #[error("{0}")]
    Type(String),
}

/// Parse an expression
pub fn parse(source: &str) -> Result<Expr, ExprError> {
    parser::Parser::new(lexer::tokenize(source)?).parse()
}

/// Parse and evaluate a condition; the result is its truthiness
pub fn evaluate(source: &str, env: &Environment) -> Result<bool, ExprError> {
    let expr = parse(source)?;
    Ok(eval(&expr, env)?.is_truthy())
}

/// Bind each non-timer counter to its trailing identifier
///
/// `Sema.NumTypesValidated` is visible as `NumTypesValidated`; when two
/// counters share an identifier the one sorting last wins.
pub fn stats_environment(stats: &Snapshot) -> Environment {
    bind_counters(stats.iter().map(|(name, value)| (name.as_str(), *value)))
}

/// Bind each non-timer counter's delta to its trailing identifier
pub fn delta_environment(rows: &[ComparisonRow]) -> Environment {
    bind_counters(rows.iter().map(|row| (row.name.as_str(), row.delta)))
}

fn bind_counters<'a>(counters: impl Iterator<Item = (&'a str, i64)>) -> Environment {
    let mut env = Environment::new();
    for (name, value) in counters {
        if is_timer(name) {
            continue;
        }
        if let Some(ident) = last_identifier(name) {
            tracing::debug!("{} => {}", ident, value);
            env.insert(ident, value);
        }
    }
    env
}
