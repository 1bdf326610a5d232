//! One-time-password issuance and verification.
//!
//! ```text
//! issue:  identity -> OtpIssuer   -> ChallengeStore::replace -> code (delivered out of band)
//! verify: identity, code -> OtpVerifier -> fetch / increment / delete_if
//! ```

mod issuer;
mod verifier;

pub use issuer::{IssuedCode, OtpIssuer};
pub use verifier::OtpVerifier;

use rand::Rng;
use transfund_common::constants::{CODE_MAX, CODE_MIN};

/// Draw a uniform six-digit code from the thread CSPRNG
pub fn generate_code() -> String {
    let mut rng = rand::rng();
    rng.random_range(CODE_MIN..=CODE_MAX).to_string()
}

/// Constant-time code comparison
pub fn codes_match(expected: &str, submitted: &str) -> bool {
    constant_time_eq::constant_time_eq(expected.as_bytes(), submitted.as_bytes())
}
