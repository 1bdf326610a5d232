//! Payment gateway callback verification.
//!
//! Only the signature check lives here; recording the donation is the
//! caller's business.

mod signature;

pub use signature::PaymentVerifier;
#[cfg(test)]
pub(crate) use signature::sign;
