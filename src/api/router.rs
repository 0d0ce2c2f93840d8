use crate::api::{middleware::AppState, password_reset};
use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

async fn health() -> StatusCode {
    StatusCode::OK
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/password-reset/request",
            post(password_reset::request_password_reset),
        )
        .route(
            "/api/password-reset/verify",
            get(password_reset::verify_reset_token),
        )
        .route(
            "/api/password-reset/reset",
            post(password_reset::reset_password),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
