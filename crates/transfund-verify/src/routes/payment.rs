//! Payment callback verification endpoint.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use transfund_common::{PaymentVerifyRequest, PaymentVerifyResponse, TransfundError};

use super::ApiError;
use crate::state::AppState;

/// Verify a checkout callback signature
///
/// Returns:
/// - 200: Signature valid
/// - 400: Malformed body, missing fields or invalid signature
/// - 503: No gateway key secret configured
pub async fn verify_payment(
    State(state): State<AppState>,
    payload: Result<Json<PaymentVerifyRequest>, JsonRejection>,
) -> Result<Json<PaymentVerifyResponse>, ApiError> {
    let Json(payload) = payload?;
    let verifier = state.payments.as_ref().ok_or_else(|| {
        TransfundError::NotConfigured("payment gateway credentials".to_string())
    })?;

    verifier.verify(&payload.order_id, &payload.payment_id, &payload.signature)?;
    state.metrics.record_payment_verified();

    Ok(Json(PaymentVerifyResponse {
        success: true,
        verified: true,
        payment_id: payload.payment_id.trim().to_string(),
        message: "Payment verified".to_string(),
    }))
}
