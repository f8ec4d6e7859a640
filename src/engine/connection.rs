// Embedded connections
// Connections, prepared statements and cursors for the in-process database.
//
// Every statement runs against the shared catalog under its mutex. Changes
// are journaled per statement: a failing statement is undone on the spot,
// and with auto-commit off the journal keeps growing until commit (discard)
// or rollback (replay backwards).

use super::catalog::{Catalog, Outcome, UndoEntry};
use super::parser::{ParsedStatement, QueryParser};
use crate::driver::{Connection, Cursor, ResultRow, Statement};
use crate::error::DriverError;
use crate::storage::{Row, Value};
use chrono::{NaiveDate, NaiveTime};
use parking_lot::Mutex;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-connection transaction state
struct Session {
    auto_commit: bool,
    /// Uncommitted changes, oldest first
    journal: Vec<UndoEntry>,
    closed: bool,
}

/// A connection to an embedded database
pub struct EmbeddedConnection {
    id: u64,
    catalog: Arc<Mutex<Catalog>>,
    /// Set when the owning database shuts down
    shut_down: Arc<AtomicBool>,
    session: Arc<Mutex<Session>>,
}

impl EmbeddedConnection {
    pub(crate) fn new(id: u64, catalog: Arc<Mutex<Catalog>>, shut_down: Arc<AtomicBool>) -> Self {
        Self {
            id,
            catalog,
            shut_down,
            session: Arc::new(Mutex::new(Session {
                auto_commit: true,
                journal: Vec::new(),
                closed: false,
            })),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.is_closed() {
            return Err(DriverError::Closed("connection"));
        }
        Ok(())
    }

    fn undo_pending(&self, session: &mut Session) {
        let journal = std::mem::take(&mut session.journal);
        if !journal.is_empty() {
            debug!(connection = self.id, changes = journal.len(), "Rolling back");
            self.catalog.lock().undo(journal);
        }
    }
}

impl Connection for EmbeddedConnection {
    fn prepare(&self, sql: &str) -> Result<Box<dyn Statement>, DriverError> {
        self.ensure_open()?;

        let parsed = QueryParser::parse(sql).map_err(|e| DriverError::Syntax(e.to_string()))?;
        debug!(
            connection = self.id,
            parameters = parsed.parameter_count,
            sql,
            "Prepared statement"
        );

        Ok(Box::new(EmbeddedStatement {
            params: vec![None; parsed.parameter_count],
            parsed,
            catalog: Arc::clone(&self.catalog),
            shut_down: Arc::clone(&self.shut_down),
            session: Arc::clone(&self.session),
            result: None,
            update_count: None,
            generated_key: None,
            closed: false,
        }))
    }

    fn is_closed(&self) -> bool {
        self.session.lock().closed || self.shut_down.load(Ordering::Acquire)
    }

    fn is_valid(&self, timeout: Duration) -> bool {
        // Valid when open and the catalog can be reached within the timeout
        !self.is_closed() && self.catalog.try_lock_for(timeout).is_some()
    }

    fn auto_commit(&self) -> bool {
        self.session.lock().auto_commit
    }

    fn set_auto_commit(&self, enabled: bool) -> Result<(), DriverError> {
        self.ensure_open()?;
        let mut session = self.session.lock();
        if enabled && !session.auto_commit {
            session.journal.clear();
        }
        session.auto_commit = enabled;
        Ok(())
    }

    fn commit(&self) -> Result<(), DriverError> {
        self.ensure_open()?;
        let mut session = self.session.lock();
        if session.auto_commit {
            return Err(DriverError::Transaction(
                "cannot commit while auto-commit is enabled".to_string(),
            ));
        }
        debug!(connection = self.id, changes = session.journal.len(), "Committing");
        session.journal.clear();
        Ok(())
    }

    fn rollback(&self) -> Result<(), DriverError> {
        self.ensure_open()?;
        let mut session = self.session.lock();
        if session.auto_commit {
            return Err(DriverError::Transaction(
                "cannot roll back while auto-commit is enabled".to_string(),
            ));
        }
        self.undo_pending(&mut session);
        Ok(())
    }

    fn close(&self) -> Result<(), DriverError> {
        let mut session = self.session.lock();
        if session.closed {
            return Ok(());
        }

        if !session.journal.is_empty() {
            warn!(
                connection = self.id,
                changes = session.journal.len(),
                "Closing connection with uncommitted changes; rolling back"
            );
            self.undo_pending(&mut session);
        }
        session.closed = true;
        debug!(connection = self.id, "Connection closed");
        Ok(())
    }
}

/// A prepared statement on an embedded connection
pub struct EmbeddedStatement {
    parsed: ParsedStatement,
    /// Bound values by 0-based position; None until bound
    params: Vec<Option<Value>>,
    catalog: Arc<Mutex<Catalog>>,
    shut_down: Arc<AtomicBool>,
    session: Arc<Mutex<Session>>,
    result: Option<EmbeddedCursor>,
    update_count: Option<u64>,
    generated_key: Option<i64>,
    closed: bool,
}

impl EmbeddedStatement {
    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.closed {
            return Err(DriverError::Closed("statement"));
        }
        if self.shut_down.load(Ordering::Acquire) || self.session.lock().closed {
            return Err(DriverError::Closed("connection"));
        }
        Ok(())
    }

    fn set(&mut self, index: usize, value: Value) -> Result<(), DriverError> {
        self.ensure_open()?;
        let count = self.params.len();
        match index.checked_sub(1).and_then(|i| self.params.get_mut(i)) {
            Some(slot) => {
                *slot = Some(value);
                Ok(())
            }
            None => Err(DriverError::ParameterIndex { index, count }),
        }
    }
}

impl Statement for EmbeddedStatement {
    fn parameter_count(&self) -> usize {
        self.params.len()
    }

    fn bind_binary_stream(&mut self, index: usize, reader: &mut dyn Read) -> Result<(), DriverError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        self.set(index, Value::Blob(bytes))
    }

    fn bind_int(&mut self, index: usize, value: i32) -> Result<(), DriverError> {
        self.set(index, Value::Integer(i64::from(value)))
    }

    fn bind_string(&mut self, index: usize, value: &str) -> Result<(), DriverError> {
        self.set(index, Value::Text(value.to_string()))
    }

    fn bind_time(&mut self, index: usize, value: NaiveTime) -> Result<(), DriverError> {
        self.set(index, Value::Time(value))
    }

    fn bind_date(&mut self, index: usize, value: NaiveDate) -> Result<(), DriverError> {
        self.set(index, Value::Date(value))
    }

    fn bind_null(&mut self, index: usize) -> Result<(), DriverError> {
        self.set(index, Value::Null)
    }

    fn clear_parameters(&mut self) {
        self.params.iter_mut().for_each(|p| *p = None);
    }

    fn execute(&mut self) -> Result<bool, DriverError> {
        self.ensure_open()?;

        let params = self
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| p.clone().ok_or(DriverError::ParameterUnset(i + 1)))
            .collect::<Result<Vec<_>, _>>()?;

        self.result = None;
        self.update_count = None;
        self.generated_key = None;

        // Lock order: session, then catalog
        let mut session = self.session.lock();
        let mut catalog = self.catalog.lock();
        let mut journal = Vec::new();

        match catalog.execute(&self.parsed, &params, &mut journal) {
            Ok(outcome) => {
                if !session.auto_commit {
                    session.journal.append(&mut journal);
                }

                match outcome {
                    Outcome::Rows { columns, rows } => {
                        self.result = Some(EmbeddedCursor::new(columns, rows));
                        Ok(true)
                    }
                    Outcome::Count {
                        affected,
                        generated_key,
                    } => {
                        self.update_count = Some(affected);
                        self.generated_key = generated_key;
                        Ok(false)
                    }
                }
            }
            Err(e) => {
                // Statement-level atomicity: a partial multi-row write is reverted
                catalog.undo(journal);
                Err(DriverError::Engine(e))
            }
        }
    }

    fn take_result_set(&mut self) -> Option<Box<dyn Cursor>> {
        self.result
            .take()
            .map(|cursor| Box::new(cursor) as Box<dyn Cursor>)
    }

    fn update_count(&self) -> Option<u64> {
        self.update_count
    }

    fn generated_key(&self) -> Option<i64> {
        self.generated_key
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.closed = true;
        self.result = None;
        Ok(())
    }
}

/// Cursor over a materialized result
pub struct EmbeddedCursor {
    columns: Arc<[String]>,
    rows: std::vec::IntoIter<Row>,
    closed: bool,
}

impl EmbeddedCursor {
    fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            columns: Arc::from(columns),
            rows: rows.into_iter(),
            closed: false,
        }
    }
}

impl Cursor for EmbeddedCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<ResultRow>, DriverError> {
        if self.closed {
            return Err(DriverError::Closed("result set"));
        }
        Ok(self
            .rows
            .next()
            .map(|row| ResultRow::new(Arc::clone(&self.columns), row.values)))
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.closed = true;
        Ok(())
    }
}
