// Answer manager
// Multiple-choice answers belonging to a lesson question

use super::{execute_update, fetch_all, fetch_one};
use crate::driver::{ConnectionProvider, ResultRow};
use crate::error::{DalError, DriverError};
use crate::query::ArgumentList;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// Assigned by the database on insert
    pub id: Option<i32>,
    pub text: String,
    pub value: String,
}

impl Answer {
    pub fn new(text: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            value: value.into(),
        }
    }

    fn from_row(row: &ResultRow) -> Result<Self, DriverError> {
        Ok(Self {
            id: Some(row.get("answerId")?),
            text: row.get("answerText")?,
            value: row.get::<Option<String>>("answerValue")?.unwrap_or_default(),
        })
    }

    pub(crate) fn saved_id(&self) -> Result<i32, DalError> {
        self.id
            .ok_or_else(|| DalError::InvalidData(format!("answer '{}' has not been saved", self.text)))
    }
}

pub struct AnswerManager<'a> {
    provider: &'a dyn ConnectionProvider,
}

impl<'a> AnswerManager<'a> {
    pub fn new(provider: &'a dyn ConnectionProvider) -> Self {
        Self { provider }
    }

    /// Add an answer to a question; returns it with its generated ID
    pub fn add_to_question(&self, answer: &Answer, question_id: i32) -> Result<Answer, DalError> {
        let update = execute_update(
            self.provider,
            "{call sp_insertAnswer(?, ?, ?)}",
            ArgumentList::new()
                .int(question_id)
                .text(&answer.text)
                .text(&answer.value),
        )?;

        Ok(Answer {
            id: Some(update.id()?),
            ..answer.clone()
        })
    }

    pub fn update(&self, answer: &Answer) -> Result<bool, DalError> {
        let id = answer.saved_id()?;
        let update = execute_update(
            self.provider,
            "{call sp_updateAnswer(?, ?, ?)}",
            ArgumentList::new().text(&answer.text).text(&answer.value).int(id),
        )?;
        Ok(update.affected > 0)
    }

    pub fn delete(&self, answer: &Answer) -> Result<bool, DalError> {
        let id = answer.saved_id()?;
        let update = execute_update(
            self.provider,
            "{call sp_deleteAnswer(?)}",
            ArgumentList::new().int(id),
        )?;
        Ok(update.affected > 0)
    }

    /// Remove every answer of a question
    pub fn delete_for_question(&self, question_id: i32) -> Result<u64, DalError> {
        let update = execute_update(
            self.provider,
            "{call sp_deleteAnswersByQuestion(?)}",
            ArgumentList::new().int(question_id),
        )?;
        Ok(update.affected)
    }

    pub fn for_question(&self, question_id: i32) -> Result<Vec<Answer>, DalError> {
        fetch_all(
            self.provider,
            "{call sp_getAnswersByQuestion(?)}",
            ArgumentList::new().int(question_id),
            Answer::from_row,
        )
    }

    /// The answers a student selected in a response
    pub fn for_response(&self, response_id: i32) -> Result<Vec<Answer>, DalError> {
        let ids = fetch_all(
            self.provider,
            "{call sp_getResponseAnswerIds(?)}",
            ArgumentList::new().int(response_id),
            |row| row.get::<i32>("answerId"),
        )?;

        let mut answers = Vec::with_capacity(ids.len());
        for id in ids {
            let answer = fetch_one(
                self.provider,
                "{call sp_getAnswerById(?)}",
                ArgumentList::new().int(id),
                Answer::from_row,
            )?;
            // A selected answer may have been deleted since
            answers.extend(answer);
        }
        Ok(answers)
    }
}
