// Error types
// Driver-level failures and the errors surfaced by query execution and the
// data-access managers

use crate::query::args::ArgumentKind;
use std::io;
use thiserror::Error;

/// Errors raised by a driver: connections, statements and cursors
#[derive(Error, Debug)]
pub enum DriverError {
    /// The SQL text could not be parsed
    #[error("Syntax error: {0}")]
    Syntax(String),

    /// A bind targeted a placeholder the statement does not have
    #[error("Parameter index {index} is out of range (statement has {count} parameter(s))")]
    ParameterIndex { index: usize, count: usize },

    /// A placeholder was left unbound when the statement ran
    #[error("No value specified for parameter {0}")]
    ParameterUnset(usize),

    /// The handle has already been closed
    #[error("Operation on closed {0}")]
    Closed(&'static str),

    /// Commit/rollback misuse
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// A result row has no column with this label
    #[error("Column not found: {0}")]
    Column(String),

    /// A column value could not be read as the requested type
    #[error("Column '{column}' cannot be read as {expected}")]
    Type {
        column: String,
        expected: &'static str,
    },

    /// The call is not allowed in the handle's current state
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    /// Reading a bound stream failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Failure inside the database engine (constraint, unknown table, ...)
    #[error(transparent)]
    Engine(#[from] anyhow::Error),
}

/// Errors surfaced to callers of the query executor and the managers
#[derive(Error, Debug)]
pub enum DalError {
    /// An argument carries a type the binder does not handle
    /// Raised before any connection is requested
    #[error("Unknown argument type: {0}")]
    UnsupportedArgumentType(ArgumentKind),

    /// The driver failed while preparing, binding or executing
    #[error("Statement execution failed: {0}")]
    StatementExecutionFailed(#[from] DriverError),

    /// Data read from or handed to a manager is malformed
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl DalError {
    /// The driver error behind a failed statement, if that is what this is
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            DalError::StatementExecutionFailed(e) => Some(e),
            _ => None,
        }
    }
}
