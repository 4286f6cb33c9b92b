use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

use checkin_application::AppError;
use checkin_domain::{Rejection, RejectionCategory};

#[derive(Debug)]
pub enum HttpError {
    Unauthorized,
    BadRequest(String),
    NotFound(String),
    Unavailable(String),
    Internal(String),
    Rejected(Rejection),
}

impl From<AppError> for HttpError {
    fn from(value: AppError) -> Self {
        match value {
            AppError::Unauthorized => HttpError::Unauthorized,
            AppError::BadRequest(msg) => HttpError::BadRequest(msg),
            AppError::NotFound(msg) => HttpError::NotFound(msg),
            AppError::StorageUnavailable(msg) => HttpError::Unavailable(msg),
            AppError::Internal(err) => HttpError::Internal(err.to_string()),
        }
    }
}

impl From<Rejection> for HttpError {
    fn from(value: Rejection) -> Self {
        HttpError::Rejected(value)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    details: Value,
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::Unauthorized => StatusCode::UNAUTHORIZED,
            HttpError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HttpError::NotFound(_) => StatusCode::NOT_FOUND,
            HttpError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            HttpError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            HttpError::Rejected(rejection) => match rejection.category() {
                RejectionCategory::Input | RejectionCategory::Integrity => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                RejectionCategory::State => StatusCode::CONFLICT,
            },
        }
    }
}

/// Integrity failures expose nothing beyond the generic message.
fn rejection_details(rejection: &Rejection) -> Value {
    match rejection {
        Rejection::Expired { expires_at } => json!({ "expires_at": expires_at }),
        Rejection::NotConfirmed { status } => json!({ "status": status }),
        Rejection::AlreadyCheckedIn {
            checked_in_at,
            operator_id,
        } => json!({ "checked_in_at": checked_in_at, "operator_id": operator_id }),
        Rejection::EventNotEligible(issue) => json!(issue),
        Rejection::UnsupportedVersion(version) => json!({ "version": version }),
        _ => Value::Null,
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            HttpError::Unauthorized => ErrorBody {
                error: "UNAUTHORIZED".to_string(),
                message: "unauthorized".to_string(),
                details: Value::Null,
            },
            HttpError::BadRequest(msg) => ErrorBody {
                error: "BAD_REQUEST".to_string(),
                message: format!("bad request: {}", msg),
                details: Value::Null,
            },
            HttpError::NotFound(msg) => ErrorBody {
                error: "NOT_FOUND".to_string(),
                message: format!("not found: {}", msg),
                details: Value::Null,
            },
            HttpError::Unavailable(msg) => {
                error!("storage unavailable: {}", msg);
                ErrorBody {
                    error: "STORAGE_UNAVAILABLE".to_string(),
                    message: "storage unavailable, retry later".to_string(),
                    details: Value::Null,
                }
            }
            HttpError::Internal(msg) => {
                error!("internal error: {}", msg);
                ErrorBody {
                    error: "INTERNAL".to_string(),
                    message: "internal error".to_string(),
                    details: Value::Null,
                }
            }
            HttpError::Rejected(rejection) => ErrorBody {
                error: rejection.code().to_string(),
                message: rejection.public_message(),
                details: rejection_details(&rejection),
            },
        };
        (status, Json(body)).into_response()
    }
}
