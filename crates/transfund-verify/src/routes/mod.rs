//! HTTP route handlers for the verification service.

use axum::{
    Json, Router,
    extract::rejection::JsonRejection,
    http::{HeaderName, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use transfund_common::{ErrorResponse, TransfundError};

use crate::state::AppState;

mod health;
mod otp;
mod payment;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    Router::new()
        // Health & Status
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/metrics", get(health::metrics))

        // OTP endpoints
        .route("/otp/send", post(otp::send_code))
        .route("/otp/verify", post(otp::verify_code))

        // Payment gateway callbacks
        .route("/payments/verify", post(payment::verify_payment))

        // Add shared state
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

/// Browser clients call the functions directly, so allow any origin
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ])
}

/// Error wrapper turning [`TransfundError`] into a JSON response
#[derive(Debug)]
pub struct ApiError(TransfundError);

impl From<TransfundError> for ApiError {
    fn from(err: TransfundError) -> Self {
        Self(err)
    }
}

/// Malformed bodies (bad JSON, wrong field types, wrong content type)
/// answer with the same JSON error body as every other failure
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(status = %rejection.status(), error = %rejection.body_text(), "Rejected request body");
        Self(TransfundError::Validation(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}
