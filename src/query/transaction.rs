// Transactions
// Groups several statements on one connection so they commit or roll back
// together

use crate::driver::{ConnectionHandle, ConnectionProvider, Statement};
use crate::error::{DalError, DriverError};
use std::sync::Arc;
use tracing::{debug, warn};

/// A unit of work on a single connection
///
/// `begin` takes a dedicated connection from the provider and switches it to
/// manual commit, so writes made through the provider itself stay outside
/// the transaction. Queries run inside the
/// transaction by using it as their `ConnectionProvider`. A transaction that
/// is dropped without `commit` is rolled back, so an early return or a `?`
/// never leaves half-written data behind.
pub struct Transaction {
    connection: ConnectionHandle,
    finished: bool,
}

impl Transaction {
    pub fn begin(provider: &dyn ConnectionProvider) -> Result<Self, DalError> {
        let connection = provider.open_dedicated()?;
        if !connection.auto_commit() {
            return Err(DriverError::Transaction("a transaction is already open on this connection".to_string()).into());
        }
        connection.set_auto_commit(false)?;
        debug!("Transaction started");

        Ok(Self {
            connection,
            finished: false,
        })
    }

    /// Prepare a statement on the transaction's connection
    /// For loops that rebind and re-run one statement
    pub fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>, DalError> {
        Ok(self.connection.prepare(sql)?)
    }

    /// Commit the transaction
    /// Once the commit succeeds this returns Ok, even if the connection
    /// cannot be switched back to auto-commit afterwards.
    pub fn commit(mut self) -> Result<(), DalError> {
        // A failed commit is left for Drop to roll back
        self.connection.commit()?;
        self.finished = true;
        if let Err(e) = self.connection.set_auto_commit(true) {
            warn!(error = %e, "Failed to restore auto-commit after commit");
        }
        debug!("Transaction committed");
        Ok(())
    }

    pub fn rollback(mut self) -> Result<(), DalError> {
        self.finished = true;
        self.undo()?;
        debug!("Transaction rolled back");
        Ok(())
    }

    fn undo(&self) -> Result<(), DriverError> {
        self.connection.rollback()?;
        self.connection.set_auto_commit(true)
    }
}

impl ConnectionProvider for Transaction {
    fn connection(&self) -> Result<ConnectionHandle, DriverError> {
        if self.connection.is_closed() {
            return Err(DriverError::Closed("connection"));
        }
        Ok(Arc::clone(&self.connection))
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.finished || self.connection.is_closed() {
            return;
        }

        warn!("Transaction dropped without commit; rolling back");
        if let Err(e) = self.undo() {
            warn!(error = %e, "Rollback failed");
        }
    }
}
