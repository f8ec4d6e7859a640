// Forecaster lesson manager
// Lessons are read and written through stored procedures. Inserts and
// updates bind directly on the prepared call because the archived-data date
// and station code may be NULL.

use super::{execute_bound, execute_update, fetch_all, fetch_one, timestamp_text};
use crate::driver::{ConnectionProvider, ResultRow, Statement};
use crate::error::{DalError, DriverError};
use crate::query::ArgumentList;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecasterLesson {
    pub id: String,
    pub name: String,
    pub start_date: NaiveDateTime,
    pub due_date: NaiveDateTime,
    pub maximum_tries: i32,
    pub active: bool,
    /// Set when the lesson replays archived data instead of live data
    pub archived_date: Option<NaiveDate>,
    pub station_code: Option<String>,
    pub course_number: i32,
}

impl ForecasterLesson {
    fn from_row(row: &ResultRow) -> Result<Self, DriverError> {
        Ok(Self {
            id: row.get("forecasterLessonId")?,
            name: row.get("name")?,
            start_date: row.get("startDate")?,
            due_date: row.get("dueDate")?,
            maximum_tries: row.get("maximumTries")?,
            active: row.get("active")?,
            archived_date: row.get("archivedDataDate")?,
            station_code: row.get("stationCode")?,
            course_number: row.get("courseNumber")?,
        })
    }

    /// Bind the lesson's columns to parameters `first..first + 8`
    fn bind_fields(&self, statement: &mut dyn Statement, first: usize) -> Result<(), DriverError> {
        statement.bind_string(first, &self.name)?;
        statement.bind_string(first + 1, &timestamp_text(self.start_date))?;
        statement.bind_string(first + 2, &timestamp_text(self.due_date))?;
        statement.bind_int(first + 3, self.maximum_tries)?;
        statement.bind_int(first + 4, i32::from(self.active))?;
        match self.archived_date {
            Some(date) => statement.bind_date(first + 5, date)?,
            None => statement.bind_null(first + 5)?,
        }
        match &self.station_code {
            Some(code) => statement.bind_string(first + 6, code)?,
            None => statement.bind_null(first + 6)?,
        }
        statement.bind_int(first + 7, self.course_number)
    }
}

pub struct LessonManager<'a> {
    provider: &'a dyn ConnectionProvider,
}

impl<'a> LessonManager<'a> {
    pub fn new(provider: &'a dyn ConnectionProvider) -> Self {
        Self { provider }
    }

    pub fn all(&self) -> Result<Vec<ForecasterLesson>, DalError> {
        fetch_all(
            self.provider,
            "{call sp_getAllForecasterLessons()}",
            ArgumentList::new(),
            ForecasterLesson::from_row,
        )
    }

    pub fn get(&self, id: &str) -> Result<Option<ForecasterLesson>, DalError> {
        fetch_one(
            self.provider,
            "{call sp_getForecasterLessonById(?)}",
            ArgumentList::new().text(id),
            ForecasterLesson::from_row,
        )
    }

    pub fn by_course(&self, course_number: i32) -> Result<Vec<ForecasterLesson>, DalError> {
        fetch_all(
            self.provider,
            "{call sp_getForecasterLessonsByCourseNumber(?)}",
            ArgumentList::new().int(course_number),
            ForecasterLesson::from_row,
        )
    }

    pub fn insert(&self, lesson: &ForecasterLesson) -> Result<(), DalError> {
        execute_bound(
            self.provider,
            "{call sp_insertForecasterLesson(?, ?, ?, ?, ?, ?, ?, ?, ?)}",
            |statement| {
                statement.bind_string(1, &lesson.id)?;
                lesson.bind_fields(statement, 2)
            },
        )?;
        Ok(())
    }

    pub fn update(&self, lesson: &ForecasterLesson) -> Result<bool, DalError> {
        let update = execute_bound(
            self.provider,
            "{call sp_updateForecasterLessonById(?, ?, ?, ?, ?, ?, ?, ?, ?)}",
            |statement| {
                lesson.bind_fields(statement, 1)?;
                statement.bind_string(9, &lesson.id)
            },
        )?;
        Ok(update.affected > 0)
    }

    pub fn remove(&self, id: &str) -> Result<bool, DalError> {
        let update = execute_update(
            self.provider,
            "{call sp_deleteForecasterLessonById(?)}",
            ArgumentList::new().text(id),
        )?;
        Ok(update.affected > 0)
    }
}
