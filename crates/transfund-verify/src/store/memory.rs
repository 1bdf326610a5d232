//! In-process challenge store.
//!
//! Used by tests and single-process development setups. Not shared between
//! processes, so horizontally scaled deployments must use Redis.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use transfund_common::{Challenge, Identity, Result};

use super::ChallengeStore;

#[derive(Default)]
pub struct MemoryChallengeStore {
    challenges: RwLock<HashMap<Identity, Challenge>>,
}

impl MemoryChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored challenges, expired ones included
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.challenges.read().await.len()
    }

    /// Drop every challenge that expired before `now`. Returns how many.
    pub async fn purge_expired(&self, now: i64) -> usize {
        let mut challenges = self.challenges.write().await;
        let before = challenges.len();
        challenges.retain(|_, c| !c.is_expired_at(now));
        before - challenges.len()
    }
}

#[async_trait]
impl ChallengeStore for MemoryChallengeStore {
    async fn replace(&self, challenge: &Challenge) -> Result<()> {
        self.challenges
            .write()
            .await
            .insert(challenge.identity.clone(), challenge.clone());
        Ok(())
    }

    async fn fetch(&self, identity: &Identity) -> Result<Option<Challenge>> {
        Ok(self.challenges.read().await.get(identity).cloned())
    }

    async fn increment_attempts(&self, identity: &Identity, code: &str) -> Result<Option<u32>> {
        let mut challenges = self.challenges.write().await;
        Ok(challenges
            .get_mut(identity)
            .filter(|c| c.code == code)
            .map(|c| {
                c.attempts += 1;
                c.attempts
            }))
    }

    async fn delete_if(&self, identity: &Identity, code: &str) -> Result<bool> {
        let mut challenges = self.challenges.write().await;
        match challenges.get(identity) {
            Some(c) if c.code == code => {
                challenges.remove(identity);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Background task purging expired challenges until shutdown
pub async fn sweep_worker(
    store: Arc<MemoryChallengeStore>,
    interval: Duration,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) {
    tracing::info!(interval_secs = interval.as_secs(), "Challenge sweeper started");

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                let purged = store.purge_expired(chrono::Utc::now().timestamp()).await;
                if purged > 0 {
                    tracing::debug!(purged, "Purged expired challenges");
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("Challenge sweeper shutting down");
                break;
            }
        }
    }
}
