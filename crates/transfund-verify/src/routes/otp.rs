//! OTP issue and verify endpoints.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use transfund_common::{IssueRequest, IssueResponse, VerifyRequest, VerifyResponse};

use super::ApiError;
use crate::state::AppState;

/// Issue a code and hand it to the delivery channel
pub async fn send_code(
    State(state): State<AppState>,
    payload: Result<Json<IssueRequest>, JsonRejection>,
) -> Result<Json<IssueResponse>, ApiError> {
    let Json(payload) = payload?;
    let issued = state.issuer.issue(&payload.identity).await?;
    state.metrics.record_issued();

    if let Err(e) = state.sender.send(&issued, payload.purpose).await {
        state.metrics.record_delivery_failure();
        tracing::error!(
            identity = %issued.identity.masked(),
            channel = state.sender.channel(),
            error = %e,
            "OTP delivery failed"
        );
        return Err(e.into());
    }

    tracing::info!(
        identity = %issued.identity.masked(),
        purpose = ?payload.purpose,
        "OTP sent"
    );

    Ok(Json(IssueResponse {
        success: true,
        message: "OTP sent to your email".to_string(),
        expires_in_secs: state.issuer.code_ttl(),
        debug_code: state.echo_codes().then_some(issued.code),
    }))
}

/// Check a submitted code
pub async fn verify_code(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let Json(payload) = payload?;
    match state.verifier.verify(&payload.identity, &payload.code).await {
        Ok(_) => {
            state.metrics.record_verified();
            Ok(Json(VerifyResponse {
                success: true,
                verified: true,
                message: "OTP verified successfully".to_string(),
            }))
        }
        Err(e) => {
            state.metrics.record_verify_error(&e);
            Err(e.into())
        }
    }
}
