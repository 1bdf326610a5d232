//! Challenge storage.
//!
//! One live challenge per identity. Every mutation the verifier relies on
//! (replace, attempt increment, delete) is atomic at this boundary, so
//! concurrent requests for the same identity cannot lose updates.
//!
//! Verifier-side mutations are guarded by the code the verifier read: once
//! the issuer replaces a challenge, stale verifications can neither charge
//! nor delete the fresh one.

mod memory;
mod redis_store;

pub use memory::{MemoryChallengeStore, sweep_worker};
pub use redis_store::RedisChallengeStore;

use async_trait::async_trait;
use transfund_common::{Challenge, Identity, Result};

#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Delete any challenge for the identity and insert this one, atomically
    async fn replace(&self, challenge: &Challenge) -> Result<()>;

    /// Fetch the stored challenge, expired or not
    async fn fetch(&self, identity: &Identity) -> Result<Option<Challenge>>;

    /// Atomically bump the attempt counter if the stored code still equals
    /// `code`.
    ///
    /// Returns the new count, or `None` if the challenge is gone or was
    /// replaced.
    async fn increment_attempts(&self, identity: &Identity, code: &str) -> Result<Option<u32>>;

    /// Remove the challenge only if its code still equals `code`.
    /// Returns whether it was removed.
    async fn delete_if(&self, identity: &Identity, code: &str) -> Result<bool>;

    /// Backend health check
    async fn ping(&self) -> Result<()>;

    /// Backend name for logs and readiness output
    fn backend(&self) -> &'static str;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use transfund_common::TransfundError;

    /// Store whose every operation fails, for error-path tests
    pub struct UnavailableStore;

    fn down() -> TransfundError {
        TransfundError::Persistence("connection refused".to_string())
    }

    #[async_trait]
    impl ChallengeStore for UnavailableStore {
        async fn replace(&self, _: &Challenge) -> Result<()> {
            Err(down())
        }
        async fn fetch(&self, _: &Identity) -> Result<Option<Challenge>> {
            Err(down())
        }
        async fn increment_attempts(&self, _: &Identity, _: &str) -> Result<Option<u32>> {
            Err(down())
        }
        async fn delete_if(&self, _: &Identity, _: &str) -> Result<bool> {
            Err(down())
        }
        async fn ping(&self) -> Result<()> {
            Err(down())
        }
        fn backend(&self) -> &'static str {
            "unavailable"
        }
    }
}
