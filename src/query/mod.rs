// Query module - parameterized query execution
// Typed arguments, the single-use query runner and transactions on top of
// the driver interface

pub mod args;
pub mod executor;
pub mod transaction;

pub use args::{ArgumentKind, ArgumentList, ParseArgumentError, TypedArgument};
pub use executor::QueryExecution;
pub use transaction::Transaction;
