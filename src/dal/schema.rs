// Schema bootstrap
// Tables, indexes and stored procedures used by the managers

use crate::engine::Database;
use crate::error::DriverError;
use tracing::info;

const TABLES: &str = "
CREATE TABLE forecaster_stations (
    stationCode TEXT PRIMARY KEY,
    stationName TEXT NOT NULL,
    state TEXT
);
CREATE TABLE forecaster_station_data (
    stationDataId INTEGER PRIMARY KEY,
    stationCode TEXT NOT NULL,
    dataDate DATE NOT NULL,
    dataKey TEXT NOT NULL,
    dataValue TEXT
);
CREATE INDEX station_data_code ON forecaster_station_data (stationCode);
CREATE TABLE bookmark_categories (
    bookmarkCategoryNumber INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    notes TEXT,
    orderRank INTEGER
);
CREATE INDEX category_name ON bookmark_categories (name);
CREATE TABLE bookmarks (
    bookmarkNumber INTEGER PRIMARY KEY,
    bookmarkCategoryNumber INTEGER NOT NULL,
    name TEXT NOT NULL,
    createdBy INTEGER NOT NULL,
    startTime TIMESTAMP NOT NULL,
    endTime TIMESTAMP NOT NULL,
    weatherCameraPicture BLOB,
    notes TEXT
);
CREATE INDEX bookmark_category ON bookmarks (bookmarkCategoryNumber);
CREATE TABLE forecaster_lessons (
    forecasterLessonId TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    startDate TIMESTAMP NOT NULL,
    dueDate TIMESTAMP NOT NULL,
    maximumTries INTEGER NOT NULL,
    active BOOLEAN NOT NULL,
    archivedDataDate DATE,
    stationCode TEXT,
    courseNumber INTEGER NOT NULL
);
CREATE TABLE forecaster_questions (
    questionId INTEGER PRIMARY KEY,
    forecasterLessonId TEXT NOT NULL,
    questionNumber INTEGER NOT NULL,
    questionText TEXT,
    questionZulu TIME NOT NULL
);
CREATE INDEX question_lesson ON forecaster_questions (forecasterLessonId);
CREATE TABLE forecaster_answers (
    answerId INTEGER PRIMARY KEY,
    questionId INTEGER NOT NULL,
    answerText TEXT NOT NULL,
    answerValue TEXT
);
CREATE INDEX answer_question ON forecaster_answers (questionId);
CREATE TABLE forecaster_responses (
    responseId INTEGER PRIMARY KEY,
    attemptId TEXT NOT NULL,
    pointsEarned INTEGER NOT NULL,
    pointsPossible INTEGER NOT NULL
);
CREATE TABLE forecaster_response_answers (
    responseAnswerId INTEGER PRIMARY KEY,
    responseId INTEGER NOT NULL,
    answerId INTEGER NOT NULL
);
CREATE INDEX response_answer_response ON forecaster_response_answers (responseId);
CREATE TABLE instructor_responses (
    instructorResponseId INTEGER PRIMARY KEY,
    questionId INTEGER NOT NULL,
    responseDate DATE NOT NULL,
    responseValue TEXT,
    stationCode TEXT NOT NULL
);
CREATE TABLE versions (
    versionId INTEGER PRIMARY KEY,
    majorVersionNumber INTEGER NOT NULL,
    minorVersionNumber INTEGER NOT NULL,
    minorReleaseNumber INTEGER NOT NULL,
    releaseNotes TEXT,
    releaseDate TIMESTAMP NOT NULL
);
CREATE TABLE resource_relation (
    cameraNumber INTEGER PRIMARY KEY,
    stationNumber INTEGER NOT NULL
);
";

/// (name, body) of every stored procedure
const PROCEDURES: &[(&str, &str)] = &[
    (
        "sp_getStationsByState",
        "SELECT * FROM forecaster_stations WHERE state = ?",
    ),
    (
        "sp_getStationDataByIdAndDate",
        "SELECT dataKey, dataValue FROM forecaster_station_data WHERE stationCode = ? AND dataDate = ?",
    ),
    (
        "sp_insertStationData",
        "INSERT INTO forecaster_station_data (stationCode, dataDate, dataKey, dataValue) VALUES (?, ?, ?, ?)",
    ),
    ("sp_getAllForecasterLessons", "SELECT * FROM forecaster_lessons"),
    (
        "sp_getForecasterLessonById",
        "SELECT * FROM forecaster_lessons WHERE forecasterLessonId = ?",
    ),
    (
        "sp_insertForecasterLesson",
        "INSERT INTO forecaster_lessons (forecasterLessonId, name, startDate, dueDate, maximumTries, \
         active, archivedDataDate, stationCode, courseNumber) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    ),
    (
        "sp_updateForecasterLessonById",
        "UPDATE forecaster_lessons SET name = ?, startDate = ?, dueDate = ?, maximumTries = ?, \
         active = ?, archivedDataDate = ?, stationCode = ?, courseNumber = ? WHERE forecasterLessonId = ?",
    ),
    (
        "sp_deleteForecasterLessonById",
        "DELETE FROM forecaster_lessons WHERE forecasterLessonId = ?",
    ),
    (
        "sp_getForecasterLessonsByCourseNumber",
        "SELECT * FROM forecaster_lessons WHERE courseNumber = ?",
    ),
    (
        "sp_getQuestionsByForecasterLesson",
        "SELECT * FROM forecaster_questions WHERE forecasterLessonId = ?",
    ),
    (
        "sp_insertQuestion",
        "INSERT INTO forecaster_questions (forecasterLessonId, questionNumber, questionText, questionZulu) \
         VALUES (?, ?, ?, ?)",
    ),
    (
        "sp_updateQuestion",
        "UPDATE forecaster_questions SET questionNumber = ?, questionText = ?, questionZulu = ? WHERE questionId = ?",
    ),
    (
        "sp_deleteQuestion",
        "DELETE FROM forecaster_questions WHERE questionId = ?",
    ),
    (
        "sp_insertAnswer",
        "INSERT INTO forecaster_answers (questionId, answerText, answerValue) VALUES (?, ?, ?)",
    ),
    (
        "sp_updateAnswer",
        "UPDATE forecaster_answers SET answerText = ?, answerValue = ? WHERE answerId = ?",
    ),
    ("sp_deleteAnswer", "DELETE FROM forecaster_answers WHERE answerId = ?"),
    (
        "sp_deleteAnswersByQuestion",
        "DELETE FROM forecaster_answers WHERE questionId = ?",
    ),
    (
        "sp_getAnswersByQuestion",
        "SELECT * FROM forecaster_answers WHERE questionId = ?",
    ),
    ("sp_getAnswerById", "SELECT * FROM forecaster_answers WHERE answerId = ?"),
    (
        "sp_insertResponseWithScore",
        "INSERT INTO forecaster_responses (attemptId, pointsEarned, pointsPossible) VALUES (?, ?, ?)",
    ),
    (
        "sp_insertResponseAnswer",
        "INSERT INTO forecaster_response_answers (responseId, answerId) VALUES (?, ?)",
    ),
    (
        "sp_clearResponseAnswers",
        "DELETE FROM forecaster_response_answers WHERE responseId = ?",
    ),
    (
        "sp_getResponseAnswerIds",
        "SELECT answerId FROM forecaster_response_answers WHERE responseId = ?",
    ),
    (
        "sp_updateResponseScore",
        "UPDATE forecaster_responses SET pointsEarned = ?, pointsPossible = ? WHERE responseId = ?",
    ),
    (
        "sp_deleteResponse",
        "DELETE FROM forecaster_responses WHERE responseId = ?",
    ),
    (
        "sp_getResponsesByAttempt",
        "SELECT * FROM forecaster_responses WHERE attemptId = ?",
    ),
    (
        "sp_insertInstructorResponse",
        "INSERT INTO instructor_responses (questionId, responseDate, responseValue, stationCode) \
         VALUES (?, ?, ?, ?)",
    ),
    (
        "sp_deleteInstructorResponse",
        "DELETE FROM instructor_responses WHERE instructorResponseId = ?",
    ),
    (
        "sp_getInstructorResponsesByQuestionAndDateAndStation",
        "SELECT * FROM instructor_responses WHERE questionId = ? AND responseDate = ? AND stationCode = ?",
    ),
    (
        "sp_insertVersion",
        "INSERT INTO versions (majorVersionNumber, minorVersionNumber, minorReleaseNumber, releaseNotes, \
         releaseDate) VALUES (?, ?, ?, ?, ?)",
    ),
    ("sp_getAllVersions", "SELECT * FROM versions"),
    (
        "sp_updateVersionNotes",
        "UPDATE versions SET releaseNotes = ? WHERE majorVersionNumber = ? AND minorVersionNumber = ? \
         AND minorReleaseNumber = ?",
    ),
];

/// Create every table, index and procedure
pub fn install(database: &Database) -> Result<(), DriverError> {
    let statements = database.run_script(TABLES)?;
    for (name, body) in PROCEDURES {
        database.define_procedure(name, body)?;
    }

    info!(
        database = database.name(),
        statements,
        procedures = PROCEDURES.len(),
        "Installed schema"
    );
    Ok(())
}
