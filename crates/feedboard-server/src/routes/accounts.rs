//! Signup, login and logout

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::State,
    http::{
        StatusCode,
        header::{LOCATION, SET_COOKIE},
    },
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::auth::{self, AuthError, Caller};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// `{"success":...,"message":...}` reply of the account endpoints
#[derive(Debug, Serialize)]
pub struct AccountReply {
    pub success: bool,
    pub message: &'static str,
}

impl AccountReply {
    fn ok(message: &'static str) -> Json<Self> {
        Json(Self {
            success: true,
            message,
        })
    }
}

#[instrument(skip_all, fields(username = %form.username))]
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Form(form): Form<Credentials>,
) -> Result<Json<AccountReply>, AppError> {
    if form.username.is_empty() || form.password.is_empty() {
        return Err(AuthError::MissingFields.into());
    }
    if state.users.contains(&form.username) {
        return Err(AuthError::UsernameTaken.into());
    }

    let password = form.password;
    let hash = tokio::task::spawn_blocking(move || auth::hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    state.users.register(&form.username, hash)?;
    Ok(AccountReply::ok("Signup successful"))
}

#[instrument(skip_all, fields(username = %form.username))]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<Credentials>,
) -> Result<Response, AppError> {
    let stored = state
        .users
        .password_hash(&form.username)
        .ok_or(AuthError::InvalidCredentials)?;

    let password = form.password;
    let valid = tokio::task::spawn_blocking(move || auth::verify_password(&password, &stored))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !valid {
        return Err(AuthError::InvalidCredentials.into());
    }

    let token = state.sessions.create(form.username.as_str());
    let auth_config = &state.config.auth;
    let cookie = auth::session_cookie(&auth_config.cookie_name, &token, auth_config.secure_cookie);
    info!("User logged in");

    Ok(([(SET_COOKIE, cookie)], AccountReply::ok("Login successful")).into_response())
}

/// Clears the session (if any) and sends the browser to `/login`
pub async fn logout(State(state): State<Arc<AppState>>, caller: Caller) -> Response {
    if let Some(session) = caller.token().and_then(|token| state.sessions.remove(token)) {
        info!(username = %session.username, "User logged out");
    }

    (
        StatusCode::FOUND,
        [
            (LOCATION, "/login".to_string()),
            (SET_COOKIE, auth::expired_cookie(&state.config.auth.cookie_name)),
        ],
    )
        .into_response()
}
