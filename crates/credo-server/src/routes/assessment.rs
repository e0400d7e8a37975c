//! Assessment and underwriting-memo routes.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use credo_core::conversation::Turn;
use credo_core::prompts::{self, MemoParams};
use credo_core::scorecard::Assessment;

use crate::error::ApiError;
use crate::state::AppState;

use super::AuthedUser;

#[derive(Debug, Deserialize)]
pub struct AssessmentRequest {
    /// Opaque, already-extracted document corpus.
    pub document_context: String,
    #[serde(default)]
    pub prior_turns: Option<Vec<Turn>>,
}

/// Runs the extraction pipeline and returns the normalized scorecard, or a
/// typed error, never a partially-populated assessment.
pub async fn build(
    State(state): State<AppState>,
    AuthedUser(_principal): AuthedUser,
    Json(request): Json<AssessmentRequest>,
) -> Result<Json<Assessment>, ApiError> {
    let assessment = state
        .builder
        .build(&request.document_context, request.prior_turns.as_deref())
        .await?;
    Ok(Json(assessment))
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub document_context: String,
    #[serde(default)]
    pub prior_turns: Vec<Turn>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub answer: String,
}

/// Ad hoc Q&A over the corpus: the conversational preamble plus any prior
/// turns, answered in one non-streaming call.
pub async fn analyze(
    State(state): State<AppState>,
    AuthedUser(_principal): AuthedUser,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let context = format!("{}\n\n{}", prompts::CHAT_PROMPT, request.document_context);
    let answer = state
        .gateway
        .complete_once(&context, &request.prior_turns)
        .await?;
    Ok(Json(AnalyzeResponse { answer }))
}

#[derive(Debug, Deserialize)]
pub struct MemoRequest {
    pub document_context: String,
    #[serde(flatten)]
    pub params: MemoParams,
}

#[derive(Debug, Serialize)]
pub struct MemoResponse {
    pub memo: String,
}

/// Renders the CAM prompt and issues a single-shot call over the corpus.
pub async fn memo(
    State(state): State<AppState>,
    AuthedUser(_principal): AuthedUser,
    Json(request): Json<MemoRequest>,
) -> Result<Json<MemoResponse>, ApiError> {
    let prompt = prompts::render_memo(&request.params)?;
    let context = format!("{prompt}\n\nDocuments:\n{}", request.document_context);
    let memo = state.gateway.complete_once(&context, &[]).await?;
    Ok(Json(MemoResponse { memo }))
}
