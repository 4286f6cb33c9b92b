use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use checkin_application::commands::registration_commands;
use checkin_application::credentials::CredentialPayload;
use checkin_application::dtos::{
    CredentialImageQuery, RegistrationReceipt, RegistrationRequest, RegistrationView,
};
use checkin_application::queries::{credential_queries, registration_queries};
use checkin_application::AppState;
use checkin_domain::{CheckIn, EventId, RegistrationId};

use super::settle;
use crate::error::HttpError;
use crate::middleware::authorize;

pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(event_id): Path<i64>,
    Json(payload): Json<RegistrationRequest>,
) -> Result<(StatusCode, Json<RegistrationReceipt>), HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let decision =
        registration_commands::register_attendee(&state, EventId(event_id), payload).await?;
    Ok((StatusCode::CREATED, Json(settle(decision)?)))
}

pub async fn get_registration(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(registration_id): Path<i64>,
) -> Result<Json<RegistrationView>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let view =
        registration_queries::get_registration(&state, RegistrationId(registration_id)).await?;
    Ok(Json(view))
}

pub async fn cancel_registration(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(registration_id): Path<i64>,
) -> Result<Json<RegistrationView>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let decision =
        registration_commands::cancel_registration(&state, RegistrationId(registration_id))
            .await?;
    Ok(Json(settle(decision)?))
}

pub async fn reissue_credential(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(registration_id): Path<i64>,
) -> Result<Json<CredentialPayload>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let decision =
        registration_commands::reissue_credential(&state, RegistrationId(registration_id))
            .await?;
    Ok(Json(settle(decision)?))
}

pub async fn credential_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(registration_id): Path<i64>,
    Query(query): Query<CredentialImageQuery>,
) -> Result<impl IntoResponse, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let image = credential_queries::render_credential(
        &state,
        RegistrationId(registration_id),
        query.size,
    )
    .await?;
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("private, max-age=300"));
    Ok((headers, (*image).clone()))
}

pub async fn get_check_in(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(registration_id): Path<i64>,
) -> Result<Json<CheckIn>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let check_in =
        registration_queries::get_check_in(&state, RegistrationId(registration_id)).await?;
    Ok(Json(check_in))
}
