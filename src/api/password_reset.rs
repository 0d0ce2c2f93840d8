/// Password Reset API Handlers
use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    api::middleware::{ApiResult, AppState},
    models::*,
    services::dispatch_reset_link,
};

/// POST /api/password-reset/request
///
/// Returns the same response for both existing and non-existing emails
/// to prevent email enumeration attacks. The link goes out in the
/// background so delivery latency does not show in the response time.
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(request): Json<RequestPasswordResetRequest>,
) -> ApiResult<Json<RequestPasswordResetResponse>> {
    let issuance = state
        .password_reset_service
        .request_reset(&request.email)
        .await?;

    let message = issuance.message().to_string();
    if let Some(reset) = issuance.reset {
        dispatch_reset_link(
            state.reset_delivery.clone(),
            state.event_bus.clone(),
            reset,
        );
    }

    Ok(Json(RequestPasswordResetResponse { message }))
}

/// GET /api/password-reset/verify?token=...
///
/// Lets the reset form check a link before asking for a new password
pub async fn verify_reset_token(
    State(state): State<AppState>,
    Query(query): Query<VerifyResetTokenQuery>,
) -> ApiResult<Json<VerifyResetTokenResponse>> {
    state
        .password_reset_service
        .verify_token(&query.token)
        .await?;

    Ok(Json(VerifyResetTokenResponse { valid: true }))
}

/// POST /api/password-reset/reset
///
/// Complete password reset using a valid token
///
/// This endpoint:
/// - Validates the token
/// - Validates password complexity
/// - Updates the account password
/// - Marks the token as used and invalidates the account's other tokens
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> ApiResult<Json<ResetPasswordResponse>> {
    state
        .password_reset_service
        .reset_password(&request.token, &request.new_password)
        .await?;

    Ok(Json(ResetPasswordResponse {
        message: RESET_SUCCESS_MESSAGE.to_string(),
    }))
}
