// src/models/score.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

/// One entry of a session's answer log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: i64,
    pub question_text: String,
    /// Text of the chosen option. `None` when the question timed out.
    pub selected_option: Option<String>,
    pub is_correct: bool,
    pub points: i64,
    #[serde(default)]
    pub timed_out: bool,
    pub answered_at: DateTime<Utc>,
}

/// Final outcome of a quiz session, handed to the result sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    /// `None` for anonymous sessions.
    pub user_id: Option<i64>,
    pub score: i64,
    pub total_questions: i32,
    pub completed_at: DateTime<Utc>,
    pub answers: Vec<Answer>,
}

/// Represents the 'scores' table in the database.
/// Stores the persisted results of user quizzes.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub id: i64,
    pub user_id: i64,
    pub score: i64,
    pub total_questions: i32,
    pub completed_at: DateTime<Utc>,
    pub answers: Json<Vec<Answer>>,
}

/// Per-user summary built from score records.
#[derive(Debug, Clone, Serialize)]
pub struct UserScoreHistory {
    pub user_id: i64,
    pub user_name: String,
    /// Most recent first.
    pub scores: Vec<ScoreRecord>,
    pub total_score: i64,
    pub quiz_count: i64,
    pub average_score: i64,
}
