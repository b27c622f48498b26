// src/handlers/quiz.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    engine::aggregate::aggregate_scores,
    error::AppError,
    models::session::AnswerRequest,
    services::SessionManager,
    store::QuizStore,
    utils::jwt::{Claims, Identity},
};

/// Returns how many questions a new session would contain.
pub async fn question_count(
    State(store): State<Arc<dyn QuizStore>>,
) -> Result<impl IntoResponse, AppError> {
    let count = store.count_questions().await?;
    Ok(Json(serde_json::json!({ "count": count })))
}

/// Starts a quiz session with the current question set.
///
/// Anonymous callers may play; only sessions of signed-in users are scored
/// into the history.
pub async fn start_session(
    State(sessions): State<Arc<SessionManager>>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, AppError> {
    let view = sessions.start(identity.user_id()).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Current state of a session: question, time left, score.
pub async fn get_session(
    State(sessions): State<Arc<SessionManager>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = sessions.view(id, identity.user_id())?;
    Ok(Json(view))
}

/// Answers the current question of a session and moves to the next one.
pub async fn submit_answer(
    State(sessions): State<Arc<SessionManager>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    Json(req): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = sessions
        .answer(id, identity.user_id(), &req.option_id)
        .await?;
    Ok(Json(outcome))
}

/// The caller's own score history.
pub async fn my_history(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let records = store.list_user_scores(user_id).await?;
    let directory = store.user_directory().await?;

    let history = aggregate_scores(&records, &directory).into_iter().next();
    Ok(Json(history))
}
