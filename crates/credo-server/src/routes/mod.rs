//! HTTP surface: route table and shared extractors.

mod assessment;
mod auth;
mod cases;
mod chat;
mod documents;

use axum::Router;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::routing::{get, patch, post};
use serde_json::json;
use tower_http::trace::TraceLayer;

use credo_core::session::{Principal, TokenVerifier};
use credo_core::underwriter::Underwriter;

use crate::error::ApiError;
use crate::state::AppState;

/// Builds the application router over the shared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/forgot-password", patch(auth::forgot_password))
        .route("/me", get(auth::me))
        .route("/loan-cases", post(cases::create).get(cases::list))
        .route(
            "/loan-cases/:case_id",
            get(cases::fetch).patch(cases::update).delete(cases::remove),
        )
        .route("/documents", post(documents::upload))
        .route("/assessments", post(assessment::build))
        .route("/analyze", post(assessment::analyze))
        .route("/memo", post(assessment::memo))
        .route("/chat", get(chat::connect))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(json!({ "status": "healthy" }))
}

/// Extractor for the bearer-authenticated principal.
pub struct AuthedUser(pub Principal);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        let Some(token) = token else {
            return Err(ApiError::unauthorized("Please log in to access"));
        };

        match state.auth.verify(token).await {
            Some(principal) => Ok(Self(principal)),
            None => Err(ApiError::unauthorized("Please log in to access")),
        }
    }
}

/// Resolves the authenticated principal to its underwriter record.
pub(crate) async fn current_underwriter(
    state: &AppState,
    principal: &Principal,
) -> Result<Underwriter, ApiError> {
    state
        .underwriters
        .find_by_email(&principal.subject)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}
