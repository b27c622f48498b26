// src/handlers/auth.rs

use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{LoginRequest, RosterEntry},
    store::QuizStore,
    utils::{hash::verify_password, jwt::sign_jwt},
};

/// Lists every user's id and display name.
///
/// Feeds the name picker of the login screen; no e-mails or roles leak.
pub async fn list_roster(
    State(store): State<Arc<dyn QuizStore>>,
) -> Result<impl IntoResponse, AppError> {
    let roster: Vec<RosterEntry> = store
        .list_users()
        .await?
        .into_iter()
        .map(|u| RosterEntry {
            id: u.id,
            display_name: u.display_name,
        })
        .collect();

    Ok(Json(roster))
}

/// Authenticates a user and returns a JWT token.
///
/// Verifies the e-mail and password against the store.
/// If valid, signs a JWT token with the user's ID and role.
pub async fn login(
    State(store): State<Arc<dyn QuizStore>>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = store
        .find_user_by_email(&payload.email)
        .await?
        .ok_or(AppError::AuthError("Invalid credentials".to_string()))?;

    let is_valid = verify_password(&payload.password, &user.password)?;

    if !is_valid {
        tracing::info!(user_id = user.id, "Rejected login with a wrong password");
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    let token = sign_jwt(user.id, &user.role, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "user_id": user.id,
        "display_name": user.display_name,
        "is_admin": user.is_admin()
    })))
}
