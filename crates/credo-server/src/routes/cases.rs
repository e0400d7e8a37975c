//! Loan case CRUD routes, ownership-checked against the bearer principal.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::warn;

use credo_core::case::{LoanCase, LoanCaseDraft, LoanCaseUpdate};

use crate::error::ApiError;
use crate::state::AppState;

use super::{AuthedUser, current_underwriter};

/// Fetches a case and rejects access by anyone but its owner.
async fn owned_case(
    state: &AppState,
    case_id: u64,
    underwriter_id: u64,
    action: &str,
) -> Result<LoanCase, ApiError> {
    let Some(case) = state.cases.find_by_id(case_id).await? else {
        warn!(case_id, "loan case not found");
        return Err(ApiError::not_found("Loan case not found"));
    };

    if case.underwriter_id != underwriter_id {
        warn!(case_id, underwriter_id, "unauthorized {action} attempt");
        return Err(ApiError::forbidden(format!(
            "Not authorized to {action} this loan case"
        )));
    }
    Ok(case)
}

pub async fn create(
    State(state): State<AppState>,
    AuthedUser(principal): AuthedUser,
    Json(draft): Json<LoanCaseDraft>,
) -> Result<(StatusCode, Json<LoanCase>), ApiError> {
    let underwriter = current_underwriter(&state, &principal).await?;
    let case = state.cases.create(draft, underwriter.id).await?;
    Ok((StatusCode::CREATED, Json(case)))
}

pub async fn list(
    State(state): State<AppState>,
    AuthedUser(principal): AuthedUser,
) -> Result<Json<Vec<LoanCase>>, ApiError> {
    let underwriter = current_underwriter(&state, &principal).await?;
    let cases = state.cases.list_for_underwriter(underwriter.id).await?;
    Ok(Json(cases))
}

pub async fn fetch(
    State(state): State<AppState>,
    AuthedUser(principal): AuthedUser,
    Path(case_id): Path<u64>,
) -> Result<Json<LoanCase>, ApiError> {
    let underwriter = current_underwriter(&state, &principal).await?;
    let case = owned_case(&state, case_id, underwriter.id, "access").await?;
    Ok(Json(case))
}

pub async fn update(
    State(state): State<AppState>,
    AuthedUser(principal): AuthedUser,
    Path(case_id): Path<u64>,
    Json(changes): Json<LoanCaseUpdate>,
) -> Result<Json<LoanCase>, ApiError> {
    let underwriter = current_underwriter(&state, &principal).await?;
    owned_case(&state, case_id, underwriter.id, "update").await?;
    let case = state.cases.update(case_id, changes).await?;
    Ok(Json(case))
}

pub async fn remove(
    State(state): State<AppState>,
    AuthedUser(principal): AuthedUser,
    Path(case_id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let underwriter = current_underwriter(&state, &principal).await?;
    owned_case(&state, case_id, underwriter.id, "delete").await?;
    state.cases.delete(case_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
