// Driver interface
// The seams between query execution and whatever database sits behind it.
// A provider hands out connections; a connection prepares statements; an
// executed statement may expose a cursor over its result rows.

pub mod row;
#[cfg(test)]
pub(crate) mod stub;

pub use row::{FromValue, ResultRow};

use crate::error::DriverError;
use chrono::{NaiveDate, NaiveTime};
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

/// Shared handle to an open connection
pub type ConnectionHandle = Arc<dyn Connection>;

/// Supplies a ready-to-use connection on request
///
/// Implementations may cache a connection and re-open it when it has gone
/// stale; callers should not assume two requests return the same handle.
pub trait ConnectionProvider: Send + Sync {
    fn connection(&self) -> Result<ConnectionHandle, DriverError>;

    /// A connection no other caller of this provider will be handed
    /// Transactions switch it to manual commit, so it must not be shared.
    /// Providers that already scope their connection to one unit of work
    /// return it unchanged.
    fn open_dedicated(&self) -> Result<ConnectionHandle, DriverError> {
        self.connection()
    }
}

/// An open session with the database
///
/// A fresh connection runs in auto-commit mode: every statement is committed
/// as soon as it succeeds. With auto-commit off, changes accumulate until
/// `commit` or `rollback`.
pub trait Connection: Send + Sync {
    /// Parse and prepare a statement containing `?` placeholders
    fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>, DriverError>;

    fn is_closed(&self) -> bool;

    /// Check the connection can still serve requests, waiting at most `timeout`
    fn is_valid(&self, timeout: Duration) -> bool;

    fn auto_commit(&self) -> bool;

    /// Switch auto-commit mode; switching it back on commits pending work
    fn set_auto_commit(&self, enabled: bool) -> Result<(), DriverError>;

    fn commit(&self) -> Result<(), DriverError>;

    fn rollback(&self) -> Result<(), DriverError>;

    /// Close the connection, rolling back uncommitted work
    fn close(&self) -> Result<(), DriverError>;
}

/// A prepared statement
///
/// Parameter indices are 1-based, left to right in the SQL text.
pub trait Statement: Send {
    fn parameter_count(&self) -> usize;

    /// Bind the full contents of a byte stream
    fn bind_binary_stream(&mut self, index: usize, reader: &mut dyn Read) -> Result<(), DriverError>;

    fn bind_int(&mut self, index: usize, value: i32) -> Result<(), DriverError>;

    fn bind_string(&mut self, index: usize, value: &str) -> Result<(), DriverError>;

    fn bind_time(&mut self, index: usize, value: NaiveTime) -> Result<(), DriverError>;

    fn bind_date(&mut self, index: usize, value: NaiveDate) -> Result<(), DriverError>;

    fn bind_null(&mut self, index: usize) -> Result<(), DriverError>;

    fn clear_parameters(&mut self);

    /// Run the statement
    /// Returns true when it produced a result set, false for an update count
    fn execute(&mut self) -> Result<bool, DriverError>;

    /// Take the cursor produced by the last execution, if any
    fn take_result_set(&mut self) -> Option<Box<dyn Cursor>>;

    /// Rows affected by the last execution; None when it returned rows
    fn update_count(&self) -> Option<u64>;

    /// Key generated by the last execution's insert, if any
    fn generated_key(&self) -> Option<i64>;

    fn close(&mut self) -> Result<(), DriverError>;
}

/// Forward-only cursor over result rows
pub trait Cursor: Send {
    fn columns(&self) -> &[String];

    fn next_row(&mut self) -> Result<Option<ResultRow>, DriverError>;

    fn close(&mut self) -> Result<(), DriverError>;
}
