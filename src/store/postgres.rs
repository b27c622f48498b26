// src/store/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};

use super::{QuizStore, StoreError, owner_of};
use crate::models::{
    question::{NewQuestion, Question, QuestionChanges},
    score::{QuizResult, ScoreRecord},
    user::{NewUser, User, UserChanges},
};

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn conflict_on_unique(e: sqlx::Error, message: String) -> StoreError {
    let unique_violation = e
        .as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation());

    if unique_violation {
        StoreError::Conflict(message)
    } else {
        StoreError::Database(e)
    }
}

#[async_trait]
impl QuizStore for PgStore {
    async fn list_questions(&self) -> Result<Vec<Question>, StoreError> {
        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, text, options, time_limit, points, created_at
            FROM questions
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(questions)
    }

    async fn count_questions(&self) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM questions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create_question(&self, question: NewQuestion) -> Result<i64, StoreError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO questions (text, options, time_limit, points)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(question.text)
        .bind(Json(question.options))
        .bind(question.time_limit)
        .bind(question.points)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn update_question(&self, id: i64, changes: QuestionChanges) -> Result<(), StoreError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE questions SET ");
        let mut separated = builder.separated(", ");
        // Keeps the statement valid when no field changes; still reports a missing row.
        separated.push("id = id");

        if let Some(text) = changes.text {
            separated.push("text = ");
            separated.push_bind_unseparated(text);
        }

        if let Some(options) = changes.options {
            separated.push("options = ");
            separated.push_bind_unseparated(Json(options));
        }

        if let Some(time_limit) = changes.time_limit {
            separated.push("time_limit = ");
            separated.push_bind_unseparated(time_limit);
        }

        if let Some(points) = changes.points {
            separated.push("points = ");
            separated.push_bind_unseparated(points);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Question"));
        }
        Ok(())
    }

    async fn delete_question(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Question"));
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, display_name, email, password, role, created_at
            FROM users
            ORDER BY display_name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, display_name, email, password, role, created_at
            FROM users
            WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> Result<i64, StoreError> {
        let email = user.email.clone();
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO users (display_name, email, password, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(user.display_name)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, format!("Email '{}' is already registered", email)))?;

        Ok(id)
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<(), StoreError> {
        let conflict_message = changes
            .email
            .as_ref()
            .map(|email| format!("Email '{}' is already registered", email))
            .unwrap_or_default();

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET ");
        let mut separated = builder.separated(", ");
        separated.push("id = id");

        if let Some(display_name) = changes.display_name {
            separated.push("display_name = ");
            separated.push_bind_unseparated(display_name);
        }

        if let Some(email) = changes.email {
            separated.push("email = ");
            separated.push_bind_unseparated(email);
        }

        if let Some(password_hash) = changes.password_hash {
            separated.push("password = ");
            separated.push_bind_unseparated(password_hash);
        }

        if let Some(role) = changes.role {
            separated.push("role = ");
            separated.push_bind_unseparated(role);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, conflict_message))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("User"));
        }
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("User"));
        }
        Ok(())
    }

    async fn user_directory(&self) -> Result<HashMap<i64, String>, StoreError> {
        let rows = sqlx::query_as::<_, (i64, String)>("SELECT id, display_name FROM users")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().collect())
    }

    async fn save_result(&self, result: &QuizResult) -> Result<i64, StoreError> {
        let user_id = owner_of(result)?;

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO scores (user_id, score, total_questions, completed_at, answers)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(result.score)
        .bind(result.total_questions)
        .bind(result.completed_at)
        .bind(Json(result.answers.clone()))
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn list_scores(&self) -> Result<Vec<ScoreRecord>, StoreError> {
        let scores = sqlx::query_as::<_, ScoreRecord>(
            r#"
            SELECT id, user_id, score, total_questions, completed_at, answers
            FROM scores
            ORDER BY completed_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(scores)
    }

    async fn list_user_scores(&self, user_id: i64) -> Result<Vec<ScoreRecord>, StoreError> {
        let scores = sqlx::query_as::<_, ScoreRecord>(
            r#"
            SELECT id, user_id, score, total_questions, completed_at, answers
            FROM scores
            WHERE user_id = $1
            ORDER BY completed_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(scores)
    }

    async fn delete_score(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM scores WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Score"));
        }
        Ok(())
    }
}
