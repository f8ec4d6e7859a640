// Query execution
// Runs one SQL template with positional, type-tagged arguments and owns the
// statement and cursor it creates until it is closed

use super::args::{ArgumentList, TypedArgument};
use crate::driver::{ConnectionHandle, ConnectionProvider, Cursor, ResultRow, Statement};
use crate::error::{DalError, DriverError};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Pending,
    Executed,
    Failed,
    Closed,
}

/// A single parameterized query run
///
/// Constructing one touches no database. `execute` acquires a connection
/// from the provider, prepares the template, binds every argument to the
/// next 1-based placeholder and runs it. The statement and its cursor stay
/// open until `close` (or drop), so the caller can walk the result set.
///
/// ```no_run
/// # use weatherdal::{ArgumentList, ConnectionProvider, QueryExecution};
/// # fn demo(provider: &dyn ConnectionProvider) -> Result<(), weatherdal::DalError> {
/// let mut query = QueryExecution::new(
///     "SELECT * FROM forecaster_stations WHERE state = ?",
///     ArgumentList::new().text("PA"),
///     provider,
/// );
/// query.execute()?;
/// for row in query.rows()? {
///     println!("{}", row.get::<String>("stationCode")?);
/// }
/// query.close();
/// # Ok(())
/// # }
/// ```
pub struct QueryExecution<'p> {
    sql: String,
    args: ArgumentList,
    provider: &'p dyn ConnectionProvider,
    connection: Option<ConnectionHandle>,
    statement: Option<Box<dyn Statement>>,
    cursor: Option<Box<dyn Cursor>>,
    has_result_set: bool,
    affected_rows: Option<u64>,
    generated_key: Option<i64>,
    state: State,
}

impl<'p> QueryExecution<'p> {
    pub fn new(sql: impl Into<String>, args: ArgumentList, provider: &'p dyn ConnectionProvider) -> Self {
        Self {
            sql: sql.into(),
            args,
            provider,
            connection: None,
            statement: None,
            cursor: None,
            has_result_set: false,
            affected_rows: None,
            generated_key: None,
            state: State::Pending,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn args(&self) -> &ArgumentList {
        &self.args
    }

    /// Run the query
    ///
    /// An argument the binder cannot handle fails with
    /// `UnsupportedArgumentType` before any connection is requested. Every
    /// driver failure surfaces as `StatementExecutionFailed`. An execution
    /// runs at most once.
    pub fn execute(&mut self) -> Result<(), DalError> {
        if self.state != State::Pending {
            return Err(DriverError::InvalidState("query has already been executed").into());
        }

        if let Some(unsupported) = self.args.iter().find(|arg| !Self::is_bindable(arg)) {
            self.state = State::Failed;
            return Err(DalError::UnsupportedArgumentType(unsupported.kind()));
        }

        match self.run() {
            Ok(()) => {
                self.state = State::Executed;
                Ok(())
            }
            Err(e) => {
                self.state = State::Failed;
                debug!(sql = %self.sql, error = %e, "Query failed");
                Err(e.into())
            }
        }
    }

    fn is_bindable(arg: &TypedArgument) -> bool {
        !matches!(arg, TypedArgument::Date(_))
    }

    fn run(&mut self) -> Result<(), DriverError> {
        let connection = self.provider.connection()?;
        let connection = self.connection.insert(connection);

        // Held by self before binding so close() releases it on any failure
        let statement = self.statement.insert(connection.prepare(&self.sql)?);
        Self::bind(statement.as_mut(), &self.args)?;

        self.has_result_set = statement.execute()?;
        self.affected_rows = statement.update_count();
        self.generated_key = statement.generated_key();
        self.cursor = statement.take_result_set();

        debug!(
            sql = %self.sql,
            args = self.args.len(),
            has_result_set = self.has_result_set,
            affected_rows = ?self.affected_rows,
            "Query executed"
        );
        Ok(())
    }

    fn bind(statement: &mut dyn Statement, args: &ArgumentList) -> Result<(), DriverError> {
        for (i, arg) in args.iter().enumerate() {
            let index = i + 1;
            match arg {
                TypedArgument::Binary(bytes) => statement.bind_binary_stream(index, &mut bytes.as_slice())?,
                TypedArgument::Integer(value) => statement.bind_int(index, *value)?,
                TypedArgument::Text(value) => statement.bind_string(index, value)?,
                TypedArgument::Time(value) => statement.bind_time(index, *value)?,
                // Rejected before a connection is requested
                TypedArgument::Date(_) => return Err(DriverError::InvalidState("unsupported argument type")),
            }
        }
        Ok(())
    }

    /// Cursor over the result rows, if the query produced any
    pub fn result_set(&mut self) -> Option<&mut (dyn Cursor + 'static)> {
        self.cursor.as_deref_mut()
    }

    /// Drain the remaining result rows
    /// Returns an empty list when the query produced no result set
    pub fn rows(&mut self) -> Result<Vec<ResultRow>, DalError> {
        let mut rows = Vec::new();
        if let Some(cursor) = self.cursor.as_mut() {
            while let Some(row) = cursor.next_row()? {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    /// Whether execution produced a result set
    pub fn has_result_set(&self) -> bool {
        self.has_result_set
    }

    /// Rows changed by the query; None for a query that returned rows
    pub fn affected_rows(&self) -> Option<u64> {
        self.affected_rows
    }

    /// True when the query changed at least one row
    pub fn is_success(&self) -> bool {
        self.affected_rows.is_some_and(|n| n > 0)
    }

    /// Key generated by an INSERT, if the table generates one
    pub fn generated_key(&self) -> Option<i64> {
        self.generated_key
    }

    pub fn is_closed(&self) -> bool {
        self.state == State::Closed
    }

    /// Release the cursor, then the statement
    ///
    /// Each release is attempted on its own; a failure is logged and does not
    /// stop the other. Safe to call repeatedly and on a query that never ran.
    /// The provider's connection stays open.
    pub fn close(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            if let Err(e) = cursor.close() {
                warn!(sql = %self.sql, error = %e, "Failed to close result set");
            }
        }

        if let Some(mut statement) = self.statement.take() {
            if let Err(e) = statement.close() {
                warn!(sql = %self.sql, error = %e, "Failed to close statement");
            }
        }

        self.connection = None;
        self.state = State::Closed;
    }
}

impl Drop for QueryExecution<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Connection;
    use crate::storage::Value;
    use chrono::{NaiveDate, NaiveTime};
    use parking_lot::Mutex;
    use std::io::Read;
    use std::sync::Arc;
    use std::time::Duration;

    /// What the stub driver saw
    #[derive(Default)]
    struct Calls {
        connections: usize,
        prepares: usize,
        binds: Vec<(usize, Value)>,
        statement_closes: usize,
        cursor_closes: usize,
    }

    /// Stub driver whose statements fail to bind past `fail_bind_at`
    struct StubProvider {
        calls: Arc<Mutex<Calls>>,
        fail_bind_at: Option<usize>,
        fail_close: bool,
    }

    impl StubProvider {
        fn new() -> Self {
            Self {
                calls: Arc::new(Mutex::new(Calls::default())),
                fail_bind_at: None,
                fail_close: false,
            }
        }
    }

    struct StubConnection {
        calls: Arc<Mutex<Calls>>,
        fail_bind_at: Option<usize>,
        fail_close: bool,
    }

    struct StubStatement {
        calls: Arc<Mutex<Calls>>,
        fail_bind_at: Option<usize>,
        fail_close: bool,
    }

    struct StubCursor {
        calls: Arc<Mutex<Calls>>,
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    }

    impl ConnectionProvider for StubProvider {
        fn connection(&self) -> Result<ConnectionHandle, DriverError> {
            self.calls.lock().connections += 1;
            Ok(Arc::new(StubConnection {
                calls: Arc::clone(&self.calls),
                fail_bind_at: self.fail_bind_at,
                fail_close: self.fail_close,
            }))
        }
    }

    impl Connection for StubConnection {
        fn prepare(&self, _sql: &str) -> Result<Box<dyn Statement>, DriverError> {
            self.calls.lock().prepares += 1;
            Ok(Box::new(StubStatement {
                calls: Arc::clone(&self.calls),
                fail_bind_at: self.fail_bind_at,
                fail_close: self.fail_close,
            }))
        }
        fn is_closed(&self) -> bool {
            false
        }
        fn is_valid(&self, _timeout: Duration) -> bool {
            true
        }
        fn auto_commit(&self) -> bool {
            true
        }
        fn set_auto_commit(&self, _enabled: bool) -> Result<(), DriverError> {
            Ok(())
        }
        fn commit(&self) -> Result<(), DriverError> {
            Ok(())
        }
        fn rollback(&self) -> Result<(), DriverError> {
            Ok(())
        }
        fn close(&self) -> Result<(), DriverError> {
            Ok(())
        }
    }

    impl StubStatement {
        fn record(&mut self, index: usize, value: Value) -> Result<(), DriverError> {
            if self.fail_bind_at.is_some_and(|at| index >= at) {
                return Err(DriverError::ParameterIndex {
                    index,
                    count: index - 1,
                });
            }
            self.calls.lock().binds.push((index, value));
            Ok(())
        }
    }

    impl Statement for StubStatement {
        fn parameter_count(&self) -> usize {
            self.fail_bind_at.map_or(usize::MAX, |at| at - 1)
        }
        fn bind_binary_stream(&mut self, index: usize, reader: &mut dyn Read) -> Result<(), DriverError> {
            let mut bytes = Vec::new();
            reader.read_to_end(&mut bytes)?;
            self.record(index, Value::Blob(bytes))
        }
        fn bind_int(&mut self, index: usize, value: i32) -> Result<(), DriverError> {
            self.record(index, Value::Integer(value.into()))
        }
        fn bind_string(&mut self, index: usize, value: &str) -> Result<(), DriverError> {
            self.record(index, Value::Text(value.to_string()))
        }
        fn bind_time(&mut self, index: usize, value: NaiveTime) -> Result<(), DriverError> {
            self.record(index, Value::Time(value))
        }
        fn bind_date(&mut self, index: usize, value: NaiveDate) -> Result<(), DriverError> {
            self.record(index, Value::Date(value))
        }
        fn bind_null(&mut self, index: usize) -> Result<(), DriverError> {
            self.record(index, Value::Null)
        }
        fn clear_parameters(&mut self) {}
        fn execute(&mut self) -> Result<bool, DriverError> {
            Ok(true)
        }
        fn take_result_set(&mut self) -> Option<Box<dyn Cursor>> {
            Some(Box::new(StubCursor {
                calls: Arc::clone(&self.calls),
                columns: vec!["id".to_string()],
                rows: vec![vec![Value::Integer(5)]],
            }))
        }
        fn update_count(&self) -> Option<u64> {
            None
        }
        fn generated_key(&self) -> Option<i64> {
            None
        }
        fn close(&mut self) -> Result<(), DriverError> {
            self.calls.lock().statement_closes += 1;
            if self.fail_close {
                return Err(DriverError::Closed("statement"));
            }
            Ok(())
        }
    }

    impl Cursor for StubCursor {
        fn columns(&self) -> &[String] {
            &self.columns
        }
        fn next_row(&mut self) -> Result<Option<ResultRow>, DriverError> {
            if self.rows.is_empty() {
                return Ok(None);
            }
            let values = self.rows.remove(0);
            Ok(Some(ResultRow::new(Arc::from(self.columns.clone()), values)))
        }
        fn close(&mut self) -> Result<(), DriverError> {
            self.calls.lock().cursor_closes += 1;
            Err(DriverError::Closed("result set"))
        }
    }

    #[test]
    fn test_arguments_bind_in_order_with_their_types() {
        let provider = StubProvider::new();
        let time = NaiveTime::from_hms_opt(6, 0, 0).unwrap();
        let mut query = QueryExecution::new(
            "SELECT ?, ?, ?, ?",
            ArgumentList::new().binary(vec![7u8]).int(3).text("KPIT").time(time),
            &provider,
        );

        query.execute().unwrap();
        assert!(query.has_result_set());
        assert!(!query.is_success());
        assert_eq!(query.rows().unwrap().len(), 1);

        let calls = provider.calls.lock();
        assert_eq!(
            calls.binds,
            vec![
                (1, Value::Blob(vec![7])),
                (2, Value::Integer(3)),
                (3, Value::Text("KPIT".into())),
                (4, Value::Time(time)),
            ]
        );
    }

    #[test]
    fn test_unsupported_argument_never_reaches_the_driver() {
        let provider = StubProvider::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let mut query = QueryExecution::new(
            "SELECT * FROM t WHERE a = ? AND b = ?",
            ArgumentList::new().int(1).date(date),
            &provider,
        );

        let err = query.execute().unwrap_err();
        assert!(matches!(err, DalError::UnsupportedArgumentType(crate::query::args::ArgumentKind::Date)));

        let calls = provider.calls.lock();
        assert_eq!(calls.connections, 0);
        assert_eq!(calls.prepares, 0);
    }

    #[test]
    fn test_double_close_releases_once() {
        let provider = StubProvider::new();
        let mut query = QueryExecution::new("SELECT 1", ArgumentList::new(), &provider);
        query.execute().unwrap();

        query.close();
        query.close();
        drop(query);

        let calls = provider.calls.lock();
        assert_eq!(calls.cursor_closes, 1);
        assert_eq!(calls.statement_closes, 1);
    }

    #[test]
    fn test_close_after_bind_failure_releases_statement() {
        let mut provider = StubProvider::new();
        provider.fail_bind_at = Some(2);
        let mut query = QueryExecution::new("{call sp_x(?)}", ArgumentList::new().text("a").int(1), &provider);

        let err = query.execute().unwrap_err();
        assert!(matches!(
            err,
            DalError::StatementExecutionFailed(DriverError::ParameterIndex { index: 2, .. })
        ));
        query.close();

        let calls = provider.calls.lock();
        assert_eq!(calls.statement_closes, 1);
        assert_eq!(calls.cursor_closes, 0);
    }

    #[test]
    fn test_failed_cursor_close_still_closes_statement() {
        let mut provider = StubProvider::new();
        provider.fail_close = true;
        let mut query = QueryExecution::new("SELECT 1", ArgumentList::new(), &provider);
        query.execute().unwrap();
        query.close();

        let calls = provider.calls.lock();
        assert_eq!(calls.cursor_closes, 1);
        assert_eq!(calls.statement_closes, 1);
    }

    #[test]
    fn test_close_without_execute_and_reuse() {
        let provider = StubProvider::new();
        let mut query = QueryExecution::new("SELECT 1", ArgumentList::new(), &provider);
        query.close();
        assert!(query.is_closed());
        assert!(matches!(
            query.execute(),
            Err(DalError::StatementExecutionFailed(DriverError::InvalidState(_)))
        ));
        assert_eq!(provider.calls.lock().connections, 0);
    }
}
