//! Shared constants for TransFund components.

/// Default Redis connection URL
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Default HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

/// OTP validity window (10 minutes)
pub const CODE_TTL_SECS: u64 = 600;

/// Failed comparisons allowed before a challenge is burned
pub const MAX_ATTEMPTS: u32 = 3;

/// How long an expired challenge stays readable in Redis (1 hour)
pub const EXPIRED_RETENTION_SECS: u64 = 3600;

/// Number of digits in an OTP
pub const CODE_LENGTH: usize = 6;

/// Smallest code value (inclusive)
pub const CODE_MIN: u32 = 100_000;

/// Largest code value (inclusive)
pub const CODE_MAX: u32 = 999_999;

/// Default HTTP request timeout
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Redis key prefixes
pub mod redis_keys {
    /// OTP challenge hash: otp:challenge:{identity}
    pub const CHALLENGE_PREFIX: &str = "otp:challenge:";
}

/// Redis hash fields of a stored challenge
pub mod challenge_fields {
    pub const CODE: &str = "code";
    pub const EXPIRES_AT: &str = "expires_at";
    pub const ATTEMPTS: &str = "attempts";
}
