// Engine module - the embedded SQL database
// Parses SQL, executes it against the in-memory catalog and exposes the
// result through the driver interface

pub mod catalog;
pub mod connection;
pub mod parser;
pub mod procedure;

use crate::driver::{ConnectionHandle, ConnectionProvider};
use crate::error::DriverError;
use catalog::Catalog;
use connection::EmbeddedConnection;
use parking_lot::Mutex;
use parser::QueryParser;
use procedure::Procedure;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// An in-process database shared by all of its connections
pub struct Database {
    name: String,
    catalog: Arc<Mutex<Catalog>>,
    shut_down: Arc<AtomicBool>,
    next_connection: AtomicU64,
}

impl Database {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            catalog: Arc::new(Mutex::new(Catalog::new())),
            shut_down: Arc::new(AtomicBool::new(false)),
            next_connection: AtomicU64::new(1),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Open a new connection in auto-commit mode
    pub fn open_connection(&self) -> Result<EmbeddedConnection, DriverError> {
        if self.is_shut_down() {
            return Err(DriverError::Closed("database"));
        }

        let id = self.next_connection.fetch_add(1, Ordering::Relaxed);
        debug!(database = %self.name, connection = id, "Opened connection");
        Ok(EmbeddedConnection::new(
            id,
            Arc::clone(&self.catalog),
            Arc::clone(&self.shut_down),
        ))
    }

    /// Execute a `;`-separated script, one auto-committed statement at a time
    /// Stops at the first failing statement. Returns the number executed.
    pub fn run_script(&self, script: &str) -> Result<usize, DriverError> {
        let statements =
            QueryParser::parse_script(script).map_err(|e| DriverError::Syntax(e.to_string()))?;

        for (n, statement) in statements.iter().enumerate() {
            if statement.parameter_count > 0 {
                return Err(DriverError::ParameterUnset(1));
            }

            let mut catalog = self.catalog.lock();
            let mut journal = Vec::new();
            if let Err(e) = catalog.execute(statement, &[], &mut journal) {
                catalog.undo(journal);
                return Err(DriverError::Engine(e.context(format!("script statement {}", n + 1))));
            }
        }

        info!(database = %self.name, statements = statements.len(), "Ran script");
        Ok(statements.len())
    }

    /// Register a stored procedure; its body may use `?` placeholders
    pub fn define_procedure(&self, name: &str, body_sql: &str) -> Result<(), DriverError> {
        let procedure = Procedure::new(name, body_sql)?;
        debug!(database = %self.name, procedure = name, arity = procedure.arity(), "Defined procedure");
        self.catalog.lock().define_procedure(procedure);
        Ok(())
    }

    pub fn table_names(&self) -> Vec<String> {
        self.catalog.lock().list_tables()
    }

    pub fn procedure_names(&self) -> Vec<String> {
        self.catalog.lock().list_procedures()
    }

    /// Number of live rows in a table, None if the table does not exist
    pub fn row_count(&self, table: &str) -> Option<usize> {
        self.catalog.lock().get_table(table).map(|t| t.row_count())
    }

    /// Close the database; every open connection becomes invalid
    pub fn shutdown(&self) {
        if !self.shut_down.swap(true, Ordering::AcqRel) {
            info!(database = %self.name, "Database shut down");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

/// Connection provider over an embedded database
///
/// Caches one connection and re-validates it on every request; a closed or
/// unresponsive connection is replaced with a fresh one. Transactions get an
/// uncached connection of their own from `open_dedicated`.
pub struct EmbeddedProvider {
    database: Arc<Database>,
    validation_timeout: Duration,
    cached: Mutex<Option<ConnectionHandle>>,
}

impl EmbeddedProvider {
    pub fn new(database: Arc<Database>, validation_timeout: Duration) -> Self {
        Self {
            database,
            validation_timeout,
            cached: Mutex::new(None),
        }
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }
}

impl ConnectionProvider for EmbeddedProvider {
    fn connection(&self) -> Result<ConnectionHandle, DriverError> {
        let mut cached = self.cached.lock();

        if let Some(conn) = cached.as_ref() {
            if !conn.is_closed() && conn.is_valid(self.validation_timeout) {
                return Ok(Arc::clone(conn));
            }
            debug!(database = %self.database.name(), "Cached connection is not valid; reopening");
        }

        let conn: ConnectionHandle = Arc::new(self.database.open_connection()?);
        *cached = Some(Arc::clone(&conn));
        Ok(conn)
    }

    /// A fresh connection that bypasses the cache
    fn open_dedicated(&self) -> Result<ConnectionHandle, DriverError> {
        let conn: ConnectionHandle = Arc::new(self.database.open_connection()?);
        Ok(conn)
    }
}
