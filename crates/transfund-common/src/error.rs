//! Common error types for TransFund components.

use thiserror::Error;

/// Result alias used by the verification components
pub type Result<T> = std::result::Result<T, TransfundError>;

/// Errors surfaced by OTP issuance, OTP verification, and payment checks
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransfundError {
    /// Bad input from the caller; the message is shown to users as-is
    #[error("{0}")]
    Validation(String),

    /// No live challenge for the identity
    #[error("OTP expired or not found. Please request a new one.")]
    NotFound,

    /// Challenge outlived its expiry
    #[error("OTP has expired. Please request a new one.")]
    Expired,

    /// Attempt budget used up
    #[error("Too many attempts. Please request a new OTP.")]
    AttemptsExceeded,

    /// Wrong code, challenge still active
    #[error("Invalid OTP. Please try again.")]
    Mismatch { attempts: u32, remaining: u32 },

    /// Challenge store unavailable or failing
    #[error("Storage error: {0}")]
    Persistence(String),

    /// Delivery channel refused or failed
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Payment callback signature does not match
    #[error("Payment verification failed - invalid signature")]
    InvalidSignature,

    /// Feature needs configuration that is missing
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TransfundError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound => 404,
            Self::Expired => 410,
            Self::AttemptsExceeded => 429,
            Self::Mismatch { .. } => 401,
            Self::Persistence(_) => 503,
            Self::Delivery(_) => 502,
            Self::InvalidSignature => 400,
            Self::NotConfigured(_) => 503,
            Self::Config(_) => 500,
        }
    }

    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound => "not_found",
            Self::Expired => "expired",
            Self::AttemptsExceeded => "attempts_exceeded",
            Self::Mismatch { .. } => "mismatch",
            Self::Persistence(_) => "persistence",
            Self::Delivery(_) => "delivery",
            Self::InvalidSignature => "invalid_signature",
            Self::NotConfigured(_) => "not_configured",
            Self::Config(_) => "config",
        }
    }

    /// Returns true if the caller may retry the same operation
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Mismatch { .. } | Self::Persistence(_) | Self::Delivery(_)
        )
    }

    /// Returns true if the challenge is gone and a new code must be issued
    pub fn requires_reissue(&self) -> bool {
        matches!(self, Self::NotFound | Self::Expired | Self::AttemptsExceeded)
    }
}
