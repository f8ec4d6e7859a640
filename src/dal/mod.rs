// Data-access layer
// One manager per entity of the weather application. Managers borrow a
// connection provider (a plain provider, or a Transaction to group writes)
// and run every statement through QueryExecution.

pub mod answer;
pub mod bookmark;
pub mod category;
pub mod instructor_response;
pub mod lesson;
pub mod question;
pub mod resource_relation;
pub mod response;
pub mod schema;
pub mod station;
pub mod station_data;
pub mod version;

use crate::config::DalConfig;
use crate::driver::{ConnectionProvider, ResultRow, Statement};
use crate::engine::{Database, EmbeddedProvider};
use crate::error::{DalError, DriverError};
use crate::query::{ArgumentList, QueryExecution};
use crate::storage::{DATE_FORMAT, TIMESTAMP_FORMAT};
use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::sync::Arc;
use tracing::{error, info, warn};

pub use answer::{Answer, AnswerManager};
pub use bookmark::{Bookmark, BookmarkManager};
pub use category::{BookmarkCategory, CategoryManager};
pub use instructor_response::{InstructorResponse, InstructorResponseManager};
pub use lesson::{ForecasterLesson, LessonManager};
pub use question::{Question, QuestionManager};
pub use resource_relation::ResourceRelationManager;
pub use response::{Response, ResponseManager};
pub use station::{Station, StationManager};
pub use station_data::{StationData, StationDataManager};
pub use version::{Version, VersionManager, VersionNumber};

/// Entry point to every manager
pub struct Dal {
    provider: Arc<dyn ConnectionProvider>,
    database: Option<Arc<Database>>,
}

impl Dal {
    /// Wrap an existing provider
    pub fn new(provider: Arc<dyn ConnectionProvider>) -> Self {
        Self {
            provider,
            database: None,
        }
    }

    /// Create an embedded database from configuration
    pub fn open(config: &DalConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let database = Arc::new(Database::new(config.database.name.clone()));

        if config.database.bootstrap_schema {
            schema::install(&database).context("failed to install schema")?;
        }

        if let Some(path) = &config.database.init_script {
            let script = fs::read_to_string(path)
                .with_context(|| format!("failed to read init script {}", path.display()))?;
            let statements = database
                .run_script(&script)
                .with_context(|| format!("init script {} failed", path.display()))?;
            info!(script = %path.display(), statements, "Ran init script");
        }

        let provider = EmbeddedProvider::new(Arc::clone(&database), config.validation_timeout());
        Ok(Self {
            provider: Arc::new(provider),
            database: Some(database),
        })
    }

    pub fn provider(&self) -> &dyn ConnectionProvider {
        self.provider.as_ref()
    }

    /// The embedded database, when this layer was opened from configuration
    pub fn database(&self) -> Option<&Arc<Database>> {
        self.database.as_ref()
    }

    pub fn stations(&self) -> StationManager<'_> {
        StationManager::new(self.provider())
    }

    pub fn station_data(&self) -> StationDataManager<'_> {
        StationDataManager::new(self.provider())
    }

    pub fn categories(&self) -> CategoryManager<'_> {
        CategoryManager::new(self.provider())
    }

    pub fn bookmarks(&self) -> BookmarkManager<'_> {
        BookmarkManager::new(self.provider())
    }

    pub fn lessons(&self) -> LessonManager<'_> {
        LessonManager::new(self.provider())
    }

    pub fn questions(&self) -> QuestionManager<'_> {
        QuestionManager::new(self.provider())
    }

    pub fn answers(&self) -> AnswerManager<'_> {
        AnswerManager::new(self.provider())
    }

    pub fn responses(&self) -> ResponseManager<'_> {
        ResponseManager::new(self.provider())
    }

    pub fn instructor_responses(&self) -> InstructorResponseManager<'_> {
        InstructorResponseManager::new(self.provider())
    }

    pub fn versions(&self) -> VersionManager<'_> {
        VersionManager::new(self.provider())
    }

    pub fn resource_relations(&self) -> ResourceRelationManager<'_> {
        ResourceRelationManager::new(self.provider())
    }
}

/// Rows changed by a write and the key it generated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Update {
    pub affected: u64,
    pub generated_key: Option<i64>,
}

impl Update {
    /// The generated key as an entity ID
    pub fn id(&self) -> Result<i32, DalError> {
        let key = self
            .generated_key
            .ok_or_else(|| DalError::InvalidData("insert did not generate a key".to_string()))?;
        i32::try_from(key).map_err(|_| DalError::InvalidData(format!("generated key {} out of range", key)))
    }
}

/// Run a query and map every result row
pub(crate) fn fetch_all<T>(
    provider: &dyn ConnectionProvider,
    sql: &str,
    args: ArgumentList,
    map: impl Fn(&ResultRow) -> Result<T, DriverError>,
) -> Result<Vec<T>, DalError> {
    let mut query = QueryExecution::new(sql, args, provider);
    let result = collect_rows(&mut query, map);
    query.close();
    result.inspect_err(|e| error!(sql, error = %e, "Query failed"))
}

fn collect_rows<T>(
    query: &mut QueryExecution<'_>,
    map: impl Fn(&ResultRow) -> Result<T, DriverError>,
) -> Result<Vec<T>, DalError> {
    query.execute()?;
    let rows = query.rows()?;
    Ok(rows.iter().map(map).collect::<Result<Vec<_>, _>>()?)
}

/// Run a query and map its first row, if any
pub(crate) fn fetch_one<T>(
    provider: &dyn ConnectionProvider,
    sql: &str,
    args: ArgumentList,
    map: impl Fn(&ResultRow) -> Result<T, DriverError>,
) -> Result<Option<T>, DalError> {
    Ok(fetch_all(provider, sql, args, map)?.into_iter().next())
}

/// Run a write
pub(crate) fn execute_update(
    provider: &dyn ConnectionProvider,
    sql: &str,
    args: ArgumentList,
) -> Result<Update, DalError> {
    let mut query = QueryExecution::new(sql, args, provider);
    let result = query.execute().map(|()| Update {
        affected: query.affected_rows().unwrap_or(0),
        generated_key: query.generated_key(),
    });
    query.close();
    result.inspect_err(|e| error!(sql, error = %e, "Statement failed"))
}

/// Run a write whose parameters need binds the argument list cannot carry
/// (dates, NULLs), binding them directly on the prepared statement
pub(crate) fn execute_bound(
    provider: &dyn ConnectionProvider,
    sql: &str,
    bind: impl FnOnce(&mut dyn Statement) -> Result<(), DriverError>,
) -> Result<Update, DalError> {
    let result = run_bound(provider, sql, bind);
    result.inspect_err(|e| error!(sql, error = %e, "Statement failed"))
}

fn run_bound(
    provider: &dyn ConnectionProvider,
    sql: &str,
    bind: impl FnOnce(&mut dyn Statement) -> Result<(), DriverError>,
) -> Result<Update, DalError> {
    let connection = provider.connection()?;
    let mut statement = connection.prepare(sql)?;

    let result = bind(statement.as_mut())
        .and_then(|()| statement.execute())
        .map(|_| Update {
            affected: statement.update_count().unwrap_or(0),
            generated_key: statement.generated_key(),
        });
    if let Err(e) = statement.close() {
        warn!(sql, error = %e, "Failed to close statement");
    }
    Ok(result?)
}

pub(crate) fn date_text(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn timestamp_text(timestamp: NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}
