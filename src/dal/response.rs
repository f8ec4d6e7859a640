// Response manager
// A student's response to one question of a lesson attempt: the selected
// answers and the score they earned

use super::answer::Answer;
use super::{execute_update, fetch_all};
use crate::driver::{ConnectionProvider, ResultRow};
use crate::error::{DalError, DriverError};
use crate::query::{ArgumentList, Transaction};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Assigned by the database on insert
    pub id: Option<i32>,
    pub attempt_id: String,
    pub points_earned: i32,
    pub points_possible: i32,
    /// IDs of the selected answers
    pub answer_ids: Vec<i32>,
}

impl Response {
    fn from_row(row: &ResultRow) -> Result<Self, DriverError> {
        Ok(Self {
            id: Some(row.get("responseId")?),
            attempt_id: row.get("attemptId")?,
            points_earned: row.get("pointsEarned")?,
            points_possible: row.get("pointsPossible")?,
            answer_ids: Vec::new(),
        })
    }

    fn saved_id(&self) -> Result<i32, DalError> {
        self.id.ok_or_else(|| {
            DalError::InvalidData(format!(
                "response for attempt '{}' has not been saved",
                self.attempt_id
            ))
        })
    }
}

pub struct ResponseManager<'a> {
    provider: &'a dyn ConnectionProvider,
}

impl<'a> ResponseManager<'a> {
    pub fn new(provider: &'a dyn ConnectionProvider) -> Self {
        Self { provider }
    }

    /// Insert a response with its selected answers; returns its ID
    pub fn insert(&self, response: &Response, answers: &[Answer]) -> Result<i32, DalError> {
        let answer_ids = answers
            .iter()
            .map(Answer::saved_id)
            .collect::<Result<Vec<_>, _>>()?;

        let transaction = Transaction::begin(self.provider)?;
        let update = execute_update(
            &transaction,
            "{call sp_insertResponseWithScore(?, ?, ?)}",
            ArgumentList::new()
                .text(&response.attempt_id)
                .int(response.points_earned)
                .int(response.points_possible),
        )?;
        let id = update.id()?;

        Self::link_answers(&transaction, id, &answer_ids)?;
        transaction.commit()?;
        Ok(id)
    }

    /// Rewrite the selected answers and the score
    pub fn update(&self, response: &Response) -> Result<bool, DalError> {
        let id = response.saved_id()?;
        let transaction = Transaction::begin(self.provider)?;

        execute_update(
            &transaction,
            "{call sp_clearResponseAnswers(?)}",
            ArgumentList::new().int(id),
        )?;
        let update = execute_update(
            &transaction,
            "{call sp_updateResponseScore(?, ?, ?)}",
            ArgumentList::new()
                .int(response.points_earned)
                .int(response.points_possible)
                .int(id),
        )?;
        Self::link_answers(&transaction, id, &response.answer_ids)?;

        transaction.commit()?;
        Ok(update.affected > 0)
    }

    pub fn delete(&self, response: &Response) -> Result<bool, DalError> {
        let id = response.saved_id()?;
        let transaction = Transaction::begin(self.provider)?;

        execute_update(
            &transaction,
            "{call sp_clearResponseAnswers(?)}",
            ArgumentList::new().int(id),
        )?;
        let update = execute_update(
            &transaction,
            "{call sp_deleteResponse(?)}",
            ArgumentList::new().int(id),
        )?;

        transaction.commit()?;
        Ok(update.affected > 0)
    }

    /// Every response of an attempt with its selected answer IDs
    pub fn by_attempt(&self, attempt_id: &str) -> Result<Vec<Response>, DalError> {
        let mut responses = fetch_all(
            self.provider,
            "{call sp_getResponsesByAttempt(?)}",
            ArgumentList::new().text(attempt_id),
            Response::from_row,
        )?;

        for response in &mut responses {
            response.answer_ids = fetch_all(
                self.provider,
                "{call sp_getResponseAnswerIds(?)}",
                ArgumentList::new().int(response.saved_id()?),
                |row| row.get::<i32>("answerId"),
            )?;
        }
        Ok(responses)
    }

    fn link_answers(transaction: &Transaction, response_id: i32, answer_ids: &[i32]) -> Result<(), DalError> {
        for answer_id in answer_ids {
            execute_update(
                transaction,
                "{call sp_insertResponseAnswer(?, ?)}",
                ArgumentList::new().int(response_id).int(*answer_id),
            )?;
        }
        Ok(())
    }
}
