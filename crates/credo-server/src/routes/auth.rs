//! Authentication routes: signup, login, password reset, principal echo.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::warn;

use credo_core::underwriter::NewUnderwriter;

use crate::auth::{hash_credential, verify_credential};
use crate::error::ApiError;
use crate::state::AppState;

use super::AuthedUser;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub security_question: String,
    pub security_answer: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
    pub security_answer: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

fn check_password_length(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    check_password_length(&request.password)?;

    if state
        .underwriters
        .find_by_email(&request.email)
        .await?
        .is_some()
    {
        warn!(email = %request.email, "signup attempt with existing email");
        return Err(ApiError::bad_request("Email already registered"));
    }

    let underwriter = state
        .underwriters
        .create(NewUnderwriter {
            name: request.name,
            email: request.email,
            phone: request.phone,
            credential: hash_credential(&request.password),
            security_question: request.security_question,
            security_answer: request.security_answer,
        })
        .await?;

    let access_token = state.auth.issue(&underwriter.email)?;
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let underwriter = state.underwriters.find_by_email(&request.email).await?;
    let valid = underwriter
        .as_ref()
        .is_some_and(|u| verify_credential(&request.password, &u.credential));
    if !valid {
        warn!(email = %request.email, "failed login attempt");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let access_token = state.auth.issue(&request.email)?;
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    check_password_length(&request.new_password)?;

    let Some(underwriter) = state.underwriters.find_by_email(&request.email).await? else {
        warn!(email = %request.email, "password reset attempt for unknown email");
        return Err(ApiError::not_found("User not found"));
    };

    if request.security_answer != underwriter.security_answer {
        warn!(email = %request.email, "invalid security answer");
        return Err(ApiError::unauthorized("Invalid security answer"));
    }

    state
        .underwriters
        .update_credential(&request.email, hash_credential(&request.new_password))
        .await?;
    Ok(Json(json!({ "message": "Password updated successfully" })))
}

pub async fn me(AuthedUser(principal): AuthedUser) -> Json<Value> {
    Json(json!({ "email": principal.subject }))
}
