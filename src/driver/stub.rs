// Scripted driver for unit tests
// Every statement fails to execute and to close; connections can be told to
// refuse switching auto-commit back on.

use super::{Connection, ConnectionHandle, ConnectionProvider, Cursor, Statement};
use crate::error::DriverError;
use chrono::{NaiveDate, NaiveTime};
use parking_lot::Mutex;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

pub(crate) struct StubConnection {
    auto_commit: Mutex<bool>,
    refuse_auto_commit: bool,
}

impl StubConnection {
    pub(crate) fn new(refuse_auto_commit: bool) -> Self {
        Self {
            auto_commit: Mutex::new(true),
            refuse_auto_commit,
        }
    }
}

impl Connection for StubConnection {
    fn prepare(&self, _sql: &str) -> Result<Box<dyn Statement>, DriverError> {
        Ok(Box::new(StubStatement))
    }

    fn is_closed(&self) -> bool {
        false
    }

    fn is_valid(&self, _timeout: Duration) -> bool {
        true
    }

    fn auto_commit(&self) -> bool {
        *self.auto_commit.lock()
    }

    fn set_auto_commit(&self, enabled: bool) -> Result<(), DriverError> {
        if enabled && self.refuse_auto_commit {
            return Err(DriverError::InvalidState("auto-commit"));
        }
        *self.auto_commit.lock() = enabled;
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

pub(crate) struct StubProvider {
    pub(crate) connection: Arc<StubConnection>,
}

impl ConnectionProvider for StubProvider {
    fn connection(&self) -> Result<ConnectionHandle, DriverError> {
        let conn: ConnectionHandle = self.connection.clone();
        Ok(conn)
    }
}

struct StubStatement;

impl Statement for StubStatement {
    fn parameter_count(&self) -> usize {
        0
    }

    fn bind_binary_stream(&mut self, _index: usize, _reader: &mut dyn Read) -> Result<(), DriverError> {
        Ok(())
    }

    fn bind_int(&mut self, _index: usize, _value: i32) -> Result<(), DriverError> {
        Ok(())
    }

    fn bind_string(&mut self, _index: usize, _value: &str) -> Result<(), DriverError> {
        Ok(())
    }

    fn bind_time(&mut self, _index: usize, _value: NaiveTime) -> Result<(), DriverError> {
        Ok(())
    }

    fn bind_date(&mut self, _index: usize, _value: NaiveDate) -> Result<(), DriverError> {
        Ok(())
    }

    fn bind_null(&mut self, _index: usize) -> Result<(), DriverError> {
        Ok(())
    }

    fn clear_parameters(&mut self) {}

    fn execute(&mut self) -> Result<bool, DriverError> {
        Err(DriverError::InvalidState("execute"))
    }

    fn take_result_set(&mut self) -> Option<Box<dyn Cursor>> {
        None
    }

    fn update_count(&self) -> Option<u64> {
        None
    }

    fn generated_key(&self) -> Option<i64> {
        None
    }

    fn close(&mut self) -> Result<(), DriverError> {
        Err(DriverError::InvalidState("close"))
    }
}
