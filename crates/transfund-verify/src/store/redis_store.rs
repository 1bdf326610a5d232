//! Redis-backed challenge store.
//!
//! Each challenge is a hash at `otp:challenge:{identity}`. The key expires
//! server-side at `expires_at + retention`, so an expired challenge can
//! still be reported as expired (and deleted) before Redis reclaims it.

use anyhow::Context;
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use transfund_common::constants::{challenge_fields, redis_keys};
use transfund_common::{Challenge, Identity, Result, TransfundError};

use super::ChallengeStore;

// ARGV: code field, expected code, attempts field
const INCREMENT_ATTEMPTS_LUA: &str = r#"
if redis.call('HGET', KEYS[1], ARGV[1]) == ARGV[2] then
    return redis.call('HINCRBY', KEYS[1], ARGV[3], 1)
end
return nil
"#;

// ARGV: code field, expected code
const DELETE_IF_LUA: &str = r#"
if redis.call('HGET', KEYS[1], ARGV[1]) == ARGV[2] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

pub struct RedisChallengeStore {
    /// Redis connection manager (auto-reconnecting)
    redis: ConnectionManager,
    /// Extra seconds an expired challenge stays readable
    retention_secs: u64,
    increment_script: redis::Script,
    delete_if_script: redis::Script,
}

impl RedisChallengeStore {
    pub fn new(redis: ConnectionManager, retention_secs: u64) -> Self {
        Self {
            redis,
            retention_secs,
            increment_script: redis::Script::new(INCREMENT_ATTEMPTS_LUA),
            delete_if_script: redis::Script::new(DELETE_IF_LUA),
        }
    }

    /// Open a managed connection to `redis_url`
    pub async fn connect(redis_url: &str, retention_secs: u64) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;

        let redis = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        Ok(Self::new(redis, retention_secs))
    }

    fn key(identity: &Identity) -> String {
        format!("{}{}", redis_keys::CHALLENGE_PREFIX, identity.as_str())
    }
}

fn persistence(err: redis::RedisError) -> TransfundError {
    TransfundError::Persistence(err.to_string())
}

/// Rebuild a challenge from `HGETALL` output. An empty map means no key.
fn decode_challenge(identity: &Identity, fields: HashMap<String, String>) -> Result<Option<Challenge>> {
    if fields.is_empty() {
        return Ok(None);
    }

    let corrupt = |field: &str| {
        TransfundError::Persistence(format!(
            "corrupt challenge record for {}: bad `{field}`",
            identity.masked()
        ))
    };

    let code = fields
        .get(challenge_fields::CODE)
        .cloned()
        .ok_or_else(|| corrupt(challenge_fields::CODE))?;
    let expires_at = fields
        .get(challenge_fields::EXPIRES_AT)
        .and_then(|v| v.parse::<i64>().ok())
        .ok_or_else(|| corrupt(challenge_fields::EXPIRES_AT))?;
    let attempts = fields
        .get(challenge_fields::ATTEMPTS)
        .and_then(|v| v.parse::<u32>().ok())
        .ok_or_else(|| corrupt(challenge_fields::ATTEMPTS))?;

    Ok(Some(Challenge {
        identity: identity.clone(),
        code,
        expires_at,
        attempts,
    }))
}

#[async_trait]
impl ChallengeStore for RedisChallengeStore {
    async fn replace(&self, challenge: &Challenge) -> Result<()> {
        let key = Self::key(&challenge.identity);
        let fields = [
            (challenge_fields::CODE, challenge.code.clone()),
            (challenge_fields::EXPIRES_AT, challenge.expires_at.to_string()),
            (challenge_fields::ATTEMPTS, challenge.attempts.to_string()),
        ];
        let reclaim_at = challenge.expires_at + self.retention_secs as i64;

        // DEL + HSET in one MULTI/EXEC so no reader sees a half-written record
        let mut conn = self.redis.clone();
        let _: () = redis::pipe()
            .atomic()
            .del(&key)
            .ignore()
            .hset_multiple(&key, &fields)
            .ignore()
            .expire_at(&key, reclaim_at)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(persistence)?;

        Ok(())
    }

    async fn fetch(&self, identity: &Identity) -> Result<Option<Challenge>> {
        let mut conn = self.redis.clone();
        let fields: HashMap<String, String> = conn
            .hgetall(Self::key(identity))
            .await
            .map_err(persistence)?;

        decode_challenge(identity, fields)
    }

    async fn increment_attempts(&self, identity: &Identity, code: &str) -> Result<Option<u32>> {
        let mut conn = self.redis.clone();
        self.increment_script
            .key(Self::key(identity))
            .arg(challenge_fields::CODE)
            .arg(code)
            .arg(challenge_fields::ATTEMPTS)
            .invoke_async(&mut conn)
            .await
            .map_err(persistence)
    }

    async fn delete_if(&self, identity: &Identity, code: &str) -> Result<bool> {
        let mut conn = self.redis.clone();
        let removed: i64 = self
            .delete_if_script
            .key(Self::key(identity))
            .arg(challenge_fields::CODE)
            .arg(code)
            .invoke_async(&mut conn)
            .await
            .map_err(persistence)?;
        Ok(removed > 0)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.redis.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(persistence)?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
