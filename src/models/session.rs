// src/models/session.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    engine::session::{QuizSession, SessionState},
    models::{question::PublicQuestion, score::Answer},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    NotStarted,
    InProgress,
    Finished,
}

/// What a player sees of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub status: SessionStatus,
    pub current_index: Option<usize>,
    pub total_questions: usize,
    pub time_left: Option<u32>,
    pub score: i64,
    /// The question to answer now, without correctness flags.
    pub question: Option<PublicQuestion>,
    pub answers: Vec<Answer>,
}

impl SessionView {
    pub fn of(session_id: Uuid, session: &QuizSession) -> Self {
        let (status, current_index, time_left) = match session.state() {
            SessionState::NotStarted => (SessionStatus::NotStarted, None, None),
            SessionState::InProgress {
                current_index,
                time_left,
            } => (
                SessionStatus::InProgress,
                Some(current_index),
                Some(time_left),
            ),
            SessionState::Finished => (SessionStatus::Finished, None, None),
        };

        Self {
            session_id,
            status,
            current_index,
            total_questions: session.questions().len(),
            time_left,
            score: session.score(),
            question: session.current_question().map(PublicQuestion::from),
            answers: session.answers().to_vec(),
        }
    }
}

/// DTO for answering the current question.
#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub option_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: Answer,
    pub session: SessionView,
}
