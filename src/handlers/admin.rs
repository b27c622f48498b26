// src/handlers/admin.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::{DEFAULT_POINTS, DEFAULT_TIME_LIMIT},
    engine::aggregate::aggregate_scores,
    error::AppError,
    models::{
        question::{
            CreateQuestionRequest, NewOption, NewQuestion, QuestionChanges, QuizOption,
            UpdateQuestionRequest,
        },
        user::{CreateUserRequest, NewUser, ROLE_ADMIN, ROLE_USER, UpdateUserRequest, UserChanges},
    },
    store::QuizStore,
    utils::{
        hash::hash_password,
        html::{clean_html, clean_text},
        jwt::Claims,
    },
};

fn role_for(admin: bool) -> String {
    let role = if admin { ROLE_ADMIN } else { ROLE_USER };
    role.to_string()
}

/// Gives each option a fresh id and strips unsafe markup.
fn build_options(options: Vec<NewOption>) -> Vec<QuizOption> {
    options
        .into_iter()
        .map(|o| QuizOption {
            id: Uuid::new_v4().to_string(),
            text: clean_text(&o.text),
            is_correct: o.is_correct,
        })
        .collect()
}

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(
    State(store): State<Arc<dyn QuizStore>>,
) -> Result<impl IntoResponse, AppError> {
    let users = store.list_users().await?;
    Ok(Json(users))
}

/// Creates a new user, optionally with the admin role.
/// Admin only.
pub async fn create_user(
    State(store): State<Arc<dyn QuizStore>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let password_hash = hash_password(&payload.password)?;

    let id = store
        .create_user(NewUser {
            display_name: clean_text(&payload.display_name),
            email: payload.email.trim().to_string(),
            password_hash,
            role: role_for(payload.admin),
        })
        .await?;

    tracing::info!(user_id = id, admin = payload.admin, "User created");
    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Updates user information.
/// Admin only.
pub async fn update_user(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    // Prevent an admin from locking themselves out
    if payload.admin == Some(false) && id == claims.user_id()? {
        return Err(AppError::BadRequest(
            "Cannot remove your own admin role".to_string(),
        ));
    }

    let password_hash = match payload.password {
        Some(password) => Some(hash_password(&password)?),
        None => None,
    };

    store
        .update_user(
            id,
            UserChanges {
                display_name: payload.display_name.as_deref().map(clean_text),
                email: payload.email.map(|e| e.trim().to_string()),
                password_hash,
                role: payload.admin.map(role_for),
            },
        )
        .await?;

    Ok(StatusCode::OK)
}

/// Deletes a user by ID.
/// Admin only. Prevents deleting self. The user's scores are kept.
pub async fn delete_user(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if id == claims.user_id()? {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    store.delete_user(id).await?;

    tracing::info!(user_id = id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Lists all questions, correctness flags included.
/// Admin only.
pub async fn list_questions(
    State(store): State<Arc<dyn QuizStore>>,
) -> Result<impl IntoResponse, AppError> {
    let questions = store.list_questions().await?;
    Ok(Json(questions))
}

/// Creates a new quiz question.
/// Admin only.
pub async fn create_question(
    State(store): State<Arc<dyn QuizStore>>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let id = store
        .create_question(NewQuestion {
            text: clean_html(&payload.text),
            options: build_options(payload.options),
            time_limit: payload.time_limit.unwrap_or(DEFAULT_TIME_LIMIT),
            points: payload.points.unwrap_or(DEFAULT_POINTS),
        })
        .await?;

    tracing::info!(question_id = id, "Question created");
    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Updates a question by ID.
/// Admin only. Running sessions keep the version they started with.
pub async fn update_question(
    State(store): State<Arc<dyn QuizStore>>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if payload.is_empty() {
        return Ok(StatusCode::OK);
    }

    store
        .update_question(
            id,
            QuestionChanges {
                text: payload.text.as_deref().map(clean_html),
                options: payload.options.map(build_options),
                time_limit: payload.time_limit,
                points: payload.points,
            },
        )
        .await?;

    Ok(StatusCode::OK)
}

/// Deletes a quiz question by ID.
/// Admin only.
pub async fn delete_question(
    State(store): State<Arc<dyn QuizStore>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    store.delete_question(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Score history of every user, grouped and averaged.
/// Admin only.
pub async fn list_scores(
    State(store): State<Arc<dyn QuizStore>>,
) -> Result<impl IntoResponse, AppError> {
    let records = store.list_scores().await?;
    let directory = store.user_directory().await?;

    Ok(Json(aggregate_scores(&records, &directory)))
}

/// Deletes a single score record.
/// Admin only.
pub async fn delete_score(
    State(store): State<Arc<dyn QuizStore>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    store.delete_score(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
