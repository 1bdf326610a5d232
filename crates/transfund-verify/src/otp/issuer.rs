//! OTP issuance.

use std::sync::Arc;
use transfund_common::{Challenge, Identity, Result};

use crate::store::ChallengeStore;

/// A freshly issued code, ready to hand to a delivery channel
#[derive(Debug, Clone)]
pub struct IssuedCode {
    pub identity: Identity,
    pub code: String,
    /// Expiry timestamp (Unix epoch seconds)
    pub expires_at: i64,
}

/// OTP issuer service
pub struct OtpIssuer {
    store: Arc<dyn ChallengeStore>,
    /// Code validity in seconds
    code_ttl: u64,
}

impl OtpIssuer {
    pub fn new(store: Arc<dyn ChallengeStore>, code_ttl: u64) -> Self {
        Self { store, code_ttl }
    }

    pub fn code_ttl(&self) -> u64 {
        self.code_ttl
    }

    /// Issue a new code for `identity`, replacing any outstanding one.
    ///
    /// Store failures are returned as-is and never retried: a retry could
    /// silently invalidate a code the user is already looking at.
    pub async fn issue(&self, identity: &str) -> Result<IssuedCode> {
        let identity = Identity::parse(identity)?;
        let code = super::generate_code();
        let expires_at = chrono::Utc::now().timestamp() + self.code_ttl as i64;

        let challenge = Challenge::new(identity.clone(), code.clone(), expires_at);
        if let Err(e) = self.store.replace(&challenge).await {
            tracing::error!(
                identity = %identity.masked(),
                backend = self.store.backend(),
                error = %e,
                "Failed to persist OTP challenge"
            );
            return Err(e);
        }

        tracing::debug!(
            identity = %identity.masked(),
            expires_at,
            "Issued OTP challenge"
        );

        Ok(IssuedCode {
            identity,
            code,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryChallengeStore;
    use crate::store::test_support::UnavailableStore;
    use transfund_common::TransfundError;
    use transfund_common::constants::CODE_TTL_SECS;

    #[tokio::test]
    async fn test_issue_persists_challenge() {
        let store = Arc::new(MemoryChallengeStore::new());
        let issuer = OtpIssuer::new(store.clone(), CODE_TTL_SECS);

        let before = chrono::Utc::now().timestamp();
        let issued = issuer.issue("Donor@Example.com").await.unwrap();

        assert_eq!(issued.identity.as_str(), "donor@example.com");
        assert!(issued.expires_at >= before + CODE_TTL_SECS as i64);

        let stored = store.fetch(&issued.identity).await.unwrap().unwrap();
        assert_eq!(stored.code, issued.code);
        assert_eq!(stored.attempts, 0);
        assert_eq!(stored.expires_at, issued.expires_at);
    }

    #[tokio::test]
    async fn test_reissue_leaves_single_fresh_challenge() {
        let store = Arc::new(MemoryChallengeStore::new());
        let issuer = OtpIssuer::new(store.clone(), CODE_TTL_SECS);

        let first = issuer.issue("a@b.com").await.unwrap();
        store.increment_attempts(&first.identity, &first.code).await.unwrap();
        let second = issuer.issue("A@B.COM").await.unwrap();

        assert_eq!(store.len().await, 1);
        let stored = store.fetch(&second.identity).await.unwrap().unwrap();
        assert_eq!(stored.code, second.code);
        assert_eq!(stored.attempts, 0);
    }

    #[tokio::test]
    async fn test_issue_rejects_empty_identity() {
        let store = Arc::new(MemoryChallengeStore::new());
        let issuer = OtpIssuer::new(store.clone(), CODE_TTL_SECS);

        let err = issuer.issue("  ").await.unwrap_err();
        assert!(matches!(err, TransfundError::Validation(_)));
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_issue_surfaces_store_failure() {
        let issuer = OtpIssuer::new(Arc::new(UnavailableStore), CODE_TTL_SECS);
        let err = issuer.issue("a@b.com").await.unwrap_err();
        assert!(matches!(err, TransfundError::Persistence(_)));
    }
}
