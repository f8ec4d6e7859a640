// weatherdal - data-access layer for the weather forecasting project
// This is the library root that exposes the public API

pub mod config;
pub mod dal;
pub mod display;
pub mod driver;
pub mod engine;
pub mod error;
pub mod query;
pub mod storage;

// Re-export commonly used types for convenience
pub use config::DalConfig;
pub use dal::Dal;
pub use driver::{Connection, ConnectionHandle, ConnectionProvider, Cursor, FromValue, ResultRow, Statement};
pub use engine::{Database, EmbeddedProvider};
pub use error::{DalError, DriverError};
pub use query::{ArgumentKind, ArgumentList, QueryExecution, Transaction, TypedArgument};
pub use storage::{DataType, Value};
