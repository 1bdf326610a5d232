//! OTP verification logic.

use std::sync::Arc;
use transfund_common::{Identity, Result, TransfundError};

use crate::store::ChallengeStore;

/// OTP verifier service
pub struct OtpVerifier {
    store: Arc<dyn ChallengeStore>,
    /// Failed comparisons allowed per challenge
    max_attempts: u32,
}

impl OtpVerifier {
    pub fn new(store: Arc<dyn ChallengeStore>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts,
        }
    }

    /// Verify a submitted code.
    ///
    /// Checks run in a fixed order: existence, attempt budget, expiry,
    /// equality. Exhausted and expired challenges are deleted on sight. A
    /// match consumes the challenge, so a code verifies at most once.
    ///
    /// Every store mutation is conditioned on the code that was read, so a
    /// challenge re-issued mid-verification is never charged or deleted.
    pub async fn verify(&self, identity: &str, submitted: &str) -> Result<Identity> {
        let identity = Identity::parse(identity)?;
        let submitted = submitted.trim();
        if submitted.is_empty() {
            return Err(TransfundError::Validation(
                "Email and OTP are required".to_string(),
            ));
        }

        let Some(challenge) = self.store.fetch(&identity).await? else {
            tracing::debug!(identity = %identity.masked(), "No OTP challenge on record");
            return Err(TransfundError::NotFound);
        };

        if challenge.attempts >= self.max_attempts {
            self.store.delete_if(&identity, &challenge.code).await?;
            tracing::warn!(
                identity = %identity.masked(),
                attempts = challenge.attempts,
                "OTP challenge exhausted"
            );
            return Err(TransfundError::AttemptsExceeded);
        }

        if challenge.is_expired() {
            self.store.delete_if(&identity, &challenge.code).await?;
            tracing::debug!(identity = %identity.masked(), "OTP challenge expired");
            return Err(TransfundError::Expired);
        }

        if !super::codes_match(&challenge.code, submitted) {
            return Err(self.record_mismatch(&identity, &challenge.code).await?);
        }

        // Compare-and-delete: a concurrent verify or re-issue may have won
        if !self.store.delete_if(&identity, &challenge.code).await? {
            tracing::debug!(identity = %identity.masked(), "OTP challenge consumed concurrently");
            return Err(TransfundError::NotFound);
        }

        tracing::info!(identity = %identity.masked(), "OTP verified");
        Ok(identity)
    }

    /// Charge one attempt and build the resulting error
    async fn record_mismatch(&self, identity: &Identity, stored_code: &str) -> Result<TransfundError> {
        let Some(attempts) = self.store.increment_attempts(identity, stored_code).await? else {
            return Ok(TransfundError::NotFound);
        };

        // A concurrent guess already took the last slot
        if attempts > self.max_attempts {
            self.store.delete_if(identity, stored_code).await?;
            tracing::warn!(
                identity = %identity.masked(),
                attempts,
                "OTP attempt budget overrun by concurrent guesses"
            );
            return Ok(TransfundError::AttemptsExceeded);
        }

        tracing::debug!(
            identity = %identity.masked(),
            attempts,
            max_attempts = self.max_attempts,
            "OTP mismatch"
        );

        Ok(TransfundError::Mismatch {
            attempts,
            remaining: self.max_attempts - attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::otp::OtpIssuer;
    use crate::store::MemoryChallengeStore;
    use crate::store::test_support::UnavailableStore;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use transfund_common::Challenge;
    use transfund_common::constants::{CODE_TTL_SECS, MAX_ATTEMPTS};

    // Codes are drawn from [100000, 999999], so this never matches
    const WRONG: &str = "000000";

    fn services() -> (Arc<MemoryChallengeStore>, OtpIssuer, OtpVerifier) {
        let store = Arc::new(MemoryChallengeStore::new());
        let issuer = OtpIssuer::new(store.clone(), CODE_TTL_SECS);
        let verifier = OtpVerifier::new(store.clone(), MAX_ATTEMPTS);
        (store, issuer, verifier)
    }

    #[tokio::test]
    async fn test_verify_succeeds_exactly_once() {
        let (_, issuer, verifier) = services();
        let issued = issuer.issue("a@b.com").await.unwrap();

        let verified = verifier.verify("A@B.com", &issued.code).await.unwrap();
        assert_eq!(verified.as_str(), "a@b.com");

        let err = verifier.verify("a@b.com", &issued.code).await.unwrap_err();
        assert_eq!(err, TransfundError::NotFound);
    }

    #[tokio::test]
    async fn test_reissued_code_replaces_previous() {
        let (store, issuer, verifier) = services();
        let first = issuer.issue("a@b.com").await.unwrap();
        let second = issuer.issue("a@b.com").await.unwrap();
        assert_eq!(store.len().await, 1);

        if first.code != second.code {
            let err = verifier.verify("a@b.com", &first.code).await.unwrap_err();
            assert!(matches!(err, TransfundError::Mismatch { attempts: 1, .. }));
        }
        assert!(verifier.verify("a@b.com", &second.code).await.is_ok());
    }

    #[tokio::test]
    async fn test_mismatches_count_up_then_exhaust() {
        let (store, issuer, verifier) = services();
        let issued = issuer.issue("x@y.com").await.unwrap();

        for expected in 1..=MAX_ATTEMPTS {
            let err = verifier.verify("x@y.com", WRONG).await.unwrap_err();
            assert_eq!(
                err,
                TransfundError::Mismatch {
                    attempts: expected,
                    remaining: MAX_ATTEMPTS - expected,
                }
            );
        }

        // Correct code on the fourth call is still refused
        let err = verifier.verify("x@y.com", &issued.code).await.unwrap_err();
        assert_eq!(err, TransfundError::AttemptsExceeded);
        assert_eq!(store.len().await, 0);

        let err = verifier.verify("x@y.com", &issued.code).await.unwrap_err();
        assert_eq!(err, TransfundError::NotFound);
    }

    #[tokio::test]
    async fn test_expired_challenge_rejected_and_deleted() {
        let (store, _, verifier) = services();
        let identity = Identity::parse("late@b.com").unwrap();
        let past = chrono::Utc::now().timestamp() - 1;
        store
            .replace(&Challenge::new(identity.clone(), "417253".into(), past))
            .await
            .unwrap();

        let err = verifier.verify("late@b.com", "417253").await.unwrap_err();
        assert_eq!(err, TransfundError::Expired);
        assert!(store.fetch(&identity).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_attempt_limit_checked_before_expiry() {
        let (store, _, verifier) = services();
        let identity = Identity::parse("both@b.com").unwrap();
        let mut challenge = Challenge::new(identity, "417253".into(), 0);
        challenge.attempts = MAX_ATTEMPTS;
        store.replace(&challenge).await.unwrap();

        let err = verifier.verify("both@b.com", "417253").await.unwrap_err();
        assert_eq!(err, TransfundError::AttemptsExceeded);
    }

    #[tokio::test]
    async fn test_submitted_code_is_trimmed() {
        let (_, issuer, verifier) = services();
        let issued = issuer.issue("a@b.com").await.unwrap();
        let padded = format!(" {}\n", issued.code);
        assert!(verifier.verify("a@b.com", &padded).await.is_ok());
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let (_, _, verifier) = services();
        assert!(matches!(
            verifier.verify("", "123456").await,
            Err(TransfundError::Validation(_))
        ));
        assert!(matches!(
            verifier.verify("a@b.com", "  ").await,
            Err(TransfundError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_never_issued_is_not_found() {
        let (_, _, verifier) = services();
        let err = verifier.verify("ghost@b.com", "123456").await.unwrap_err();
        assert_eq!(err, TransfundError::NotFound);
    }

    #[tokio::test]
    async fn test_store_failure_surfaces() {
        let verifier = OtpVerifier::new(Arc::new(UnavailableStore), MAX_ATTEMPTS);
        let err = verifier.verify("a@b.com", "123456").await.unwrap_err();
        assert!(matches!(err, TransfundError::Persistence(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_guesses_stay_within_budget() {
        let (_, issuer, verifier) = services();
        issuer.issue("race@b.com").await.unwrap();
        let verifier = Arc::new(verifier);

        let mut guesses = tokio::task::JoinSet::new();
        for _ in 0..16 {
            let verifier = verifier.clone();
            guesses.spawn(async move { verifier.verify("race@b.com", WRONG).await });
        }

        let mut mismatches = 0;
        while let Some(result) = guesses.join_next().await {
            match result.unwrap().unwrap_err() {
                TransfundError::Mismatch { .. } => mismatches += 1,
                TransfundError::AttemptsExceeded | TransfundError::NotFound => {}
                other => panic!("unexpected error: {other:?}"),
            }
        }
        assert!(mismatches <= MAX_ATTEMPTS);
    }

    /// Memory store that lands a re-issue right after the next fetch
    struct ReissueAfterFetch {
        inner: MemoryChallengeStore,
        fresh: Mutex<Option<Challenge>>,
    }

    impl ReissueAfterFetch {
        async fn new(stale: Challenge, fresh: Challenge) -> Self {
            let inner = MemoryChallengeStore::new();
            inner.replace(&stale).await.unwrap();
            Self {
                inner,
                fresh: Mutex::new(Some(fresh)),
            }
        }
    }

    #[async_trait]
    impl ChallengeStore for ReissueAfterFetch {
        async fn replace(&self, challenge: &Challenge) -> Result<()> {
            self.inner.replace(challenge).await
        }
        async fn fetch(&self, identity: &Identity) -> Result<Option<Challenge>> {
            let read = self.inner.fetch(identity).await?;
            let fresh = self.fresh.lock().unwrap().take();
            if let Some(fresh) = fresh {
                self.inner.replace(&fresh).await?;
            }
            Ok(read)
        }
        async fn increment_attempts(&self, identity: &Identity, code: &str) -> Result<Option<u32>> {
            self.inner.increment_attempts(identity, code).await
        }
        async fn delete_if(&self, identity: &Identity, code: &str) -> Result<bool> {
            self.inner.delete_if(identity, code).await
        }
        async fn ping(&self) -> Result<()> {
            Ok(())
        }
        fn backend(&self) -> &'static str {
            "reissue-after-fetch"
        }
    }

    fn reissue_pair(stale_attempts: u32, stale_expires_at: i64) -> (Identity, Challenge, Challenge) {
        let identity = Identity::parse("reissue@b.com").unwrap();
        let mut stale = Challenge::new(identity.clone(), "111111".into(), stale_expires_at);
        stale.attempts = stale_attempts;
        let fresh_expiry = chrono::Utc::now().timestamp() + 600;
        let fresh = Challenge::new(identity.clone(), "222222".into(), fresh_expiry);
        (identity, stale, fresh)
    }

    #[tokio::test]
    async fn test_exhausted_cleanup_spares_reissued_challenge() {
        let (identity, stale, fresh) = reissue_pair(MAX_ATTEMPTS, chrono::Utc::now().timestamp() + 600);
        let store = Arc::new(ReissueAfterFetch::new(stale, fresh).await);
        let verifier = OtpVerifier::new(store.clone(), MAX_ATTEMPTS);

        let err = verifier.verify("reissue@b.com", "111111").await.unwrap_err();
        assert_eq!(err, TransfundError::AttemptsExceeded);

        let kept = store.fetch(&identity).await.unwrap().unwrap();
        assert_eq!(kept.code, "222222");
        assert_eq!(kept.attempts, 0);
        assert!(verifier.verify("reissue@b.com", "222222").await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_cleanup_spares_reissued_challenge() {
        let (identity, stale, fresh) = reissue_pair(0, chrono::Utc::now().timestamp() - 1);
        let store = Arc::new(ReissueAfterFetch::new(stale, fresh).await);
        let verifier = OtpVerifier::new(store.clone(), MAX_ATTEMPTS);

        let err = verifier.verify("reissue@b.com", "111111").await.unwrap_err();
        assert_eq!(err, TransfundError::Expired);
        assert!(store.fetch(&identity).await.unwrap().is_some());
        assert!(verifier.verify("reissue@b.com", "222222").await.is_ok());
    }

    #[tokio::test]
    async fn test_stale_mismatch_does_not_charge_reissued_challenge() {
        let (identity, stale, fresh) = reissue_pair(0, chrono::Utc::now().timestamp() + 600);
        let store = Arc::new(ReissueAfterFetch::new(stale, fresh).await);
        let verifier = OtpVerifier::new(store.clone(), MAX_ATTEMPTS);

        let err = verifier.verify("reissue@b.com", WRONG).await.unwrap_err();
        assert_eq!(err, TransfundError::NotFound);
        assert_eq!(store.fetch(&identity).await.unwrap().unwrap().attempts, 0);
    }

    #[tokio::test]
    async fn test_stale_match_does_not_consume_reissued_challenge() {
        let (identity, stale, fresh) = reissue_pair(0, chrono::Utc::now().timestamp() + 600);
        let store = Arc::new(ReissueAfterFetch::new(stale, fresh).await);
        let verifier = OtpVerifier::new(store.clone(), MAX_ATTEMPTS);

        let err = verifier.verify("reissue@b.com", "111111").await.unwrap_err();
        assert_eq!(err, TransfundError::NotFound);
        assert!(store.fetch(&identity).await.unwrap().is_some());
        assert!(verifier.verify("reissue@b.com", "222222").await.is_ok());
    }
}
