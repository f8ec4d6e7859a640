// Instructor response manager
// The instructor's reference answer to a question for one station and day

use super::{date_text, execute_update, fetch_all};
use crate::driver::{ConnectionProvider, ResultRow};
use crate::error::{DalError, DriverError};
use crate::query::ArgumentList;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructorResponse {
    /// Assigned by the database on insert
    pub id: Option<i32>,
    pub question_id: i32,
    pub date: NaiveDate,
    pub value: String,
    pub station_code: String,
}

impl InstructorResponse {
    fn from_row(row: &ResultRow) -> Result<Self, DriverError> {
        Ok(Self {
            id: Some(row.get("instructorResponseId")?),
            question_id: row.get("questionId")?,
            date: row.get("responseDate")?,
            value: row.get::<Option<String>>("responseValue")?.unwrap_or_default(),
            station_code: row.get("stationCode")?,
        })
    }
}

pub struct InstructorResponseManager<'a> {
    provider: &'a dyn ConnectionProvider,
}

impl<'a> InstructorResponseManager<'a> {
    pub fn new(provider: &'a dyn ConnectionProvider) -> Self {
        Self { provider }
    }

    /// Insert a response; returns it with its generated ID
    pub fn insert(&self, response: &InstructorResponse) -> Result<InstructorResponse, DalError> {
        let update = execute_update(
            self.provider,
            "{call sp_insertInstructorResponse(?, ?, ?, ?)}",
            ArgumentList::new()
                .int(response.question_id)
                .text(date_text(response.date))
                .text(&response.value)
                .text(&response.station_code),
        )?;

        Ok(InstructorResponse {
            id: Some(update.id()?),
            ..response.clone()
        })
    }

    pub fn delete(&self, id: i32) -> Result<bool, DalError> {
        let update = execute_update(
            self.provider,
            "{call sp_deleteInstructorResponse(?)}",
            ArgumentList::new().int(id),
        )?;
        Ok(update.affected > 0)
    }

    pub fn by_question_date_and_station(
        &self,
        question_id: i32,
        date: NaiveDate,
        station_code: &str,
    ) -> Result<Vec<InstructorResponse>, DalError> {
        fetch_all(
            self.provider,
            "{call sp_getInstructorResponsesByQuestionAndDateAndStation(?, ?, ?)}",
            ArgumentList::new()
                .int(question_id)
                .text(date_text(date))
                .text(station_code),
            InstructorResponse::from_row,
        )
    }
}
