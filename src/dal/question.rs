// Question manager
// Lesson questions, each asked about conditions at a zulu (UTC) time of day,
// stored together with their answers

use super::answer::{Answer, AnswerManager};
use super::{execute_update, fetch_all};
use crate::driver::{ConnectionProvider, ResultRow};
use crate::error::{DalError, DriverError};
use crate::query::{ArgumentList, Transaction};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Assigned by the database on insert
    pub id: Option<i32>,
    pub lesson_id: String,
    pub number: i32,
    pub text: String,
    pub zulu: NaiveTime,
    pub answers: Vec<Answer>,
}

impl Question {
    fn from_row(row: &ResultRow) -> Result<Self, DriverError> {
        Ok(Self {
            id: Some(row.get("questionId")?),
            lesson_id: row.get("forecasterLessonId")?,
            number: row.get("questionNumber")?,
            text: row.get::<Option<String>>("questionText")?.unwrap_or_default(),
            zulu: row.get("questionZulu")?,
            answers: Vec::new(),
        })
    }

    fn saved_id(&self) -> Result<i32, DalError> {
        self.id.ok_or_else(|| {
            DalError::InvalidData(format!("question {} has not been saved", self.number))
        })
    }
}

pub struct QuestionManager<'a> {
    provider: &'a dyn ConnectionProvider,
}

impl<'a> QuestionManager<'a> {
    pub fn new(provider: &'a dyn ConnectionProvider) -> Self {
        Self { provider }
    }

    /// Questions of a lesson with their answers, ordered by question number
    pub fn for_lesson(&self, lesson_id: &str) -> Result<Vec<Question>, DalError> {
        let mut questions = fetch_all(
            self.provider,
            "{call sp_getQuestionsByForecasterLesson(?)}",
            ArgumentList::new().text(lesson_id),
            Question::from_row,
        )?;

        let answers = AnswerManager::new(self.provider);
        for question in &mut questions {
            question.answers = answers.for_question(question.saved_id()?)?;
        }
        questions.sort_by_key(|q| q.number);
        Ok(questions)
    }

    /// Insert a question and its answers in one transaction
    /// Returns the question with every generated ID filled in
    pub fn insert(&self, question: &Question) -> Result<Question, DalError> {
        let transaction = Transaction::begin(self.provider)?;

        let update = execute_update(
            &transaction,
            "{call sp_insertQuestion(?, ?, ?, ?)}",
            ArgumentList::new()
                .text(&question.lesson_id)
                .int(question.number)
                .text(&question.text)
                .time(question.zulu),
        )?;
        let id = update.id()?;

        let answers = AnswerManager::new(&transaction);
        let saved = question
            .answers
            .iter()
            .map(|answer| answers.add_to_question(answer, id))
            .collect::<Result<Vec<_>, _>>()?;

        transaction.commit()?;
        Ok(Question {
            id: Some(id),
            answers: saved,
            ..question.clone()
        })
    }

    /// Update the question's number, text and zulu time (answers are untouched)
    pub fn update(&self, question: &Question) -> Result<bool, DalError> {
        let id = question.saved_id()?;
        let update = execute_update(
            self.provider,
            "{call sp_updateQuestion(?, ?, ?, ?)}",
            ArgumentList::new()
                .int(question.number)
                .text(&question.text)
                .time(question.zulu)
                .int(id),
        )?;
        Ok(update.affected > 0)
    }

    /// Delete a question together with its answers
    pub fn delete(&self, question: &Question) -> Result<bool, DalError> {
        let id = question.saved_id()?;
        let transaction = Transaction::begin(self.provider)?;

        AnswerManager::new(&transaction).delete_for_question(id)?;
        let update = execute_update(
            &transaction,
            "{call sp_deleteQuestion(?)}",
            ArgumentList::new().int(id),
        )?;

        transaction.commit()?;
        Ok(update.affected > 0)
    }
}
