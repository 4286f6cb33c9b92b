use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use checkin_application::commands::check_in_commands;
use checkin_application::dtos::{
    CheckInReceipt, CheckInRequest, CredentialInput, ManualCheckInRequest, VerificationSummary,
};
use checkin_application::queries::verification_queries;
use checkin_application::AppState;

use super::settle;
use crate::error::HttpError;
use crate::middleware::authorize;

#[derive(Deserialize)]
pub struct VerifyCodeQuery {
    pub code: String,
}

pub async fn verify_credential(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CredentialInput>,
) -> Result<Json<VerificationSummary>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let decision = verification_queries::verify_credential(&state, payload).await?;
    Ok(Json(settle(decision)?))
}

/// Target of the credential's `verification_url`.
pub async fn verify_code(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<VerifyCodeQuery>,
) -> Result<Json<VerificationSummary>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let input = CredentialInput {
        code: Some(query.code),
        ..CredentialInput::default()
    };
    let decision = verification_queries::verify_credential(&state, input).await?;
    Ok(Json(settle(decision)?))
}

pub async fn check_in(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CheckInRequest>,
) -> Result<(StatusCode, Json<CheckInReceipt>), HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let decision = check_in_commands::check_in(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(settle(decision)?)))
}

pub async fn manual_check_in(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ManualCheckInRequest>,
) -> Result<(StatusCode, Json<CheckInReceipt>), HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let decision = check_in_commands::manual_check_in(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(settle(decision)?)))
}
