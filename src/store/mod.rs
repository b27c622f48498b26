// src/store/mod.rs

//! Persistence boundary of the quiz service.
//!
//! The engine only ever sees the shapes defined in `models`; where they live
//! is decided by the [`QuizStore`] implementation picked at startup.

pub mod memory;
pub mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    question::{NewQuestion, Question, QuestionChanges},
    score::{QuizResult, ScoreRecord},
    user::{NewUser, User, UserChanges},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Invalid(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Question source, result sink, score history source and user directory.
#[async_trait]
pub trait QuizStore: Send + Sync {
    /// All questions, in quiz order.
    async fn list_questions(&self) -> Result<Vec<Question>, StoreError>;
    async fn count_questions(&self) -> Result<i64, StoreError>;
    async fn create_question(&self, question: NewQuestion) -> Result<i64, StoreError>;
    async fn update_question(&self, id: i64, changes: QuestionChanges) -> Result<(), StoreError>;
    async fn delete_question(&self, id: i64) -> Result<(), StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn create_user(&self, user: NewUser) -> Result<i64, StoreError>;
    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<(), StoreError>;
    async fn delete_user(&self, id: i64) -> Result<(), StoreError>;

    /// user id -> display name.
    async fn user_directory(&self) -> Result<HashMap<i64, String>, StoreError>;

    /// Persists a finished quiz. Anonymous results are rejected.
    async fn save_result(&self, result: &QuizResult) -> Result<i64, StoreError>;
    async fn list_scores(&self) -> Result<Vec<ScoreRecord>, StoreError>;
    async fn list_user_scores(&self, user_id: i64) -> Result<Vec<ScoreRecord>, StoreError>;
    async fn delete_score(&self, id: i64) -> Result<(), StoreError>;
}

fn owner_of(result: &QuizResult) -> Result<i64, StoreError> {
    result
        .user_id
        .ok_or_else(|| StoreError::Invalid("Anonymous results are not persisted".to_string()))
}
