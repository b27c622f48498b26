// src/store/memory.rs

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;

use super::{QuizStore, StoreError, owner_of};
use crate::models::{
    question::{NewQuestion, Question, QuestionChanges},
    score::{QuizResult, ScoreRecord},
    user::{NewUser, User, UserChanges},
};

#[derive(Default)]
struct Tables {
    questions: Vec<Question>,
    users: Vec<User>,
    scores: Vec<ScoreRecord>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(email) && Some(u.id) != except)
    }
}

/// Volatile store used when no database is configured, and in tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // A poisoned lock only means another request panicked mid-update.
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl QuizStore for MemoryStore {
    async fn list_questions(&self) -> Result<Vec<Question>, StoreError> {
        let mut questions = self.tables().questions.clone();
        questions.sort_by_key(|q| q.id);
        Ok(questions)
    }

    async fn count_questions(&self) -> Result<i64, StoreError> {
        Ok(self.tables().questions.len() as i64)
    }

    async fn create_question(&self, question: NewQuestion) -> Result<i64, StoreError> {
        let mut tables = self.tables();
        let id = tables.next_id();
        tables.questions.push(Question {
            id,
            text: question.text,
            options: Json(question.options),
            time_limit: question.time_limit,
            points: question.points,
            created_at: Some(Utc::now()),
        });
        Ok(id)
    }

    async fn update_question(&self, id: i64, changes: QuestionChanges) -> Result<(), StoreError> {
        let mut tables = self.tables();
        let question = tables
            .questions
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or(StoreError::NotFound("Question"))?;

        if let Some(text) = changes.text {
            question.text = text;
        }
        if let Some(options) = changes.options {
            question.options = Json(options);
        }
        if let Some(time_limit) = changes.time_limit {
            question.time_limit = time_limit;
        }
        if let Some(points) = changes.points {
            question.points = points;
        }
        Ok(())
    }

    async fn delete_question(&self, id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables();
        let before = tables.questions.len();
        tables.questions.retain(|q| q.id != id);
        if tables.questions.len() == before {
            return Err(StoreError::NotFound("Question"));
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users = self.tables().users.clone();
        users.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(users)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .tables()
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<i64, StoreError> {
        let mut tables = self.tables();
        if tables.email_taken(&user.email, None) {
            return Err(StoreError::Conflict(format!(
                "Email '{}' is already registered",
                user.email
            )));
        }

        let id = tables.next_id();
        tables.users.push(User {
            id,
            display_name: user.display_name,
            email: user.email,
            password: user.password_hash,
            role: user.role,
            created_at: Some(Utc::now()),
        });
        Ok(id)
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<(), StoreError> {
        let mut tables = self.tables();
        if let Some(email) = &changes.email {
            if tables.email_taken(email, Some(id)) {
                return Err(StoreError::Conflict(format!(
                    "Email '{}' is already registered",
                    email
                )));
            }
        }

        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::NotFound("User"))?;

        if let Some(display_name) = changes.display_name {
            user.display_name = display_name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(password_hash) = changes.password_hash {
            user.password = password_hash;
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables();
        let before = tables.users.len();
        tables.users.retain(|u| u.id != id);
        if tables.users.len() == before {
            return Err(StoreError::NotFound("User"));
        }
        Ok(())
    }

    async fn user_directory(&self) -> Result<HashMap<i64, String>, StoreError> {
        Ok(self
            .tables()
            .users
            .iter()
            .map(|u| (u.id, u.display_name.clone()))
            .collect())
    }

    async fn save_result(&self, result: &QuizResult) -> Result<i64, StoreError> {
        let user_id = owner_of(result)?;
        let mut tables = self.tables();
        let id = tables.next_id();
        tables.scores.push(ScoreRecord {
            id,
            user_id,
            score: result.score,
            total_questions: result.total_questions,
            completed_at: result.completed_at,
            answers: Json(result.answers.clone()),
        });
        Ok(id)
    }

    async fn list_scores(&self) -> Result<Vec<ScoreRecord>, StoreError> {
        let mut scores = self.tables().scores.clone();
        scores.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(scores)
    }

    async fn list_user_scores(&self, user_id: i64) -> Result<Vec<ScoreRecord>, StoreError> {
        let mut scores: Vec<ScoreRecord> = self
            .tables()
            .scores
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        scores.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(scores)
    }

    async fn delete_score(&self, id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables();
        let before = tables.scores.len();
        tables.scores.retain(|s| s.id != id);
        if tables.scores.len() == before {
            return Err(StoreError::NotFound("Score"));
        }
        Ok(())
    }
}
