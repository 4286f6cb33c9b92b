use axum::routing::{get, post};
use axum::Router;

use checkin_application::AppState;

use crate::handlers::{check_in_handlers, ops_handlers, registration_handlers};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1/events/:event_id/registrations",
            post(registration_handlers::register),
        )
        .route(
            "/v1/registrations/:id",
            get(registration_handlers::get_registration),
        )
        .route(
            "/v1/registrations/:id/cancel",
            post(registration_handlers::cancel_registration),
        )
        .route(
            "/v1/registrations/:id/credential",
            post(registration_handlers::reissue_credential),
        )
        .route(
            "/v1/registrations/:id/credential/image",
            get(registration_handlers::credential_image),
        )
        .route(
            "/v1/registrations/:id/check-in",
            get(registration_handlers::get_check_in),
        )
        .route(
            "/v1/check-ins/verify",
            get(check_in_handlers::verify_code).post(check_in_handlers::verify_credential),
        )
        .route("/v1/check-ins", post(check_in_handlers::check_in))
        .route(
            "/v1/check-ins/manual",
            post(check_in_handlers::manual_check_in),
        )
        .route("/v1/ops/health/live", get(ops_handlers::health_live))
        .route("/v1/ops/health/ready", get(ops_handlers::health_ready))
        .route(
            "/v1/ops/metrics/prometheus",
            get(ops_handlers::metrics_prometheus),
        )
        .with_state(state)
}
