//! Core types shared across TransFund components.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TransfundError};

/// Normalized identity a challenge is keyed on (an email address).
///
/// Parsing trims surrounding whitespace and lowercases, so `" A@B.com"`
/// and `"a@b.com"` name the same challenge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Normalize a raw identity, rejecting empty input
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TransfundError::Validation("Email is required".to_string()));
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Log-safe rendering: `alice@example.com` -> `a***@example.com`
    pub fn masked(&self) -> String {
        match self.0.split_once('@') {
            Some((local, domain)) => {
                let first = local.chars().next().unwrap_or('*');
                format!("{first}***@{domain}")
            }
            None => {
                let first = self.0.chars().next().unwrap_or('*');
                format!("{first}***")
            }
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why the code was requested
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
    Signup,
    #[default]
    Signin,
}

impl Purpose {
    /// Subject line used by delivery channels
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Signup => "Confirm your TransFund account",
            Self::Signin => "Your TransFund sign-in code",
        }
    }
}

/// Server-side record of an outstanding OTP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    /// Lookup key
    pub identity: Identity,
    /// Six-digit code
    pub code: String,
    /// Expiry timestamp (Unix epoch seconds)
    pub expires_at: i64,
    /// Failed comparisons so far
    pub attempts: u32,
}

impl Challenge {
    pub fn new(identity: Identity, code: String, expires_at: i64) -> Self {
        Self {
            identity,
            code,
            expires_at,
            attempts: 0,
        }
    }

    /// Check expiry against a Unix timestamp
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.expires_at
    }

    /// Check expiry against the wall clock
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp())
    }
}

/// `POST /otp/send` body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueRequest {
    #[serde(default, alias = "email")]
    pub identity: String,
    #[serde(default, alias = "type")]
    pub purpose: Purpose,
}

/// `POST /otp/send` success body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueResponse {
    pub success: bool,
    pub message: String,
    pub expires_in_secs: u64,
    /// Raw code, only in non-production configurations with echo enabled
    #[serde(rename = "_debug_otp", default, skip_serializing_if = "Option::is_none")]
    pub debug_code: Option<String>,
}

/// `POST /otp/verify` body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyRequest {
    #[serde(default, alias = "email")]
    pub identity: String,
    #[serde(default, alias = "otp")]
    pub code: String,
}

/// `POST /otp/verify` success body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub verified: bool,
    pub message: String,
}

/// `POST /payments/verify` body, as delivered by the gateway checkout callback
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentVerifyRequest {
    #[serde(default, alias = "razorpay_order_id")]
    pub order_id: String,
    #[serde(default, alias = "razorpay_payment_id")]
    pub payment_id: String,
    #[serde(default, alias = "razorpay_signature")]
    pub signature: String,
}

/// `POST /payments/verify` success body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentVerifyResponse {
    pub success: bool,
    pub verified: bool,
    pub payment_id: String,
    pub message: String,
}

/// Body returned for every failed request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub verified: bool,
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_attempts: Option<u32>,
}

impl From<&TransfundError> for ErrorResponse {
    fn from(err: &TransfundError) -> Self {
        let remaining_attempts = match err {
            TransfundError::Mismatch { remaining, .. } => Some(*remaining),
            _ => None,
        };
        Self {
            success: false,
            verified: false,
            error: err.kind().to_string(),
            message: err.to_string(),
            remaining_attempts,
        }
    }
}

/// Metrics snapshot for monitoring
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Node that produced the snapshot
    pub node_id: String,

    /// Codes issued
    pub codes_issued: u64,

    /// Codes verified successfully
    pub codes_verified: u64,

    /// Wrong-code submissions
    pub mismatches: u64,

    /// Verifications rejected as not found, expired, or exhausted
    pub rejections: u64,

    /// Delivery channel failures
    pub delivery_failures: u64,

    /// Payment signatures verified
    pub payments_verified: u64,
}
