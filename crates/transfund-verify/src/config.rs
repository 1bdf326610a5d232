//! Configuration management for the verification service.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;

use transfund_common::constants::{
    CODE_TTL_SECS, DEFAULT_LISTEN_ADDR, DEFAULT_REDIS_URL, EXPIRED_RETENTION_SECS, MAX_ATTEMPTS,
    REQUEST_TIMEOUT_SECS,
};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Deployment environment
    #[serde(default)]
    pub environment: Environment,

    /// This node's unique ID (auto-generated if not set)
    #[serde(default = "generate_node_id")]
    pub node_id: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// OTP configuration
    #[serde(default)]
    pub otp: OtpConfig,

    /// Challenge store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Code delivery configuration
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Payment verification configuration
    #[serde(default)]
    pub payment: PaymentConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// OTP-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OtpConfig {
    /// Code validity in seconds
    #[serde(default = "default_code_ttl")]
    pub code_ttl_secs: u64,

    /// Failed comparisons allowed per challenge
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Seconds an expired challenge stays readable in Redis
    #[serde(default = "default_expired_retention")]
    pub expired_retention_secs: u64,

    /// Echo the raw code in issue responses (`_debug_otp`).
    /// Refused when `environment = "production"`.
    #[serde(default)]
    pub debug_echo_code: bool,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            code_ttl_secs: default_code_ttl(),
            max_attempts: default_max_attempts(),
            expired_retention_secs: default_expired_retention(),
            debug_echo_code: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    Memory,
}

/// Challenge store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Expired-challenge sweep interval for the memory backend
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryChannel {
    #[default]
    Log,
    Webhook,
}

/// Code delivery configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub channel: DeliveryChannel,

    /// Mail relay endpoint (webhook channel)
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Bearer token for the mail relay
    #[serde(default)]
    pub webhook_token: Option<String>,

    /// Relay request timeout in seconds
    #[serde(default = "default_delivery_timeout")]
    pub timeout_secs: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            channel: DeliveryChannel::default(),
            webhook_url: None,
            webhook_token: None,
            timeout_secs: default_delivery_timeout(),
        }
    }
}

/// Payment verification configuration
#[derive(Clone, Default, Deserialize)]
pub struct PaymentConfig {
    /// Gateway key secret; payment verification is disabled without it
    #[serde(default)]
    pub key_secret: Option<String>,
}

impl std::fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("key_secret", &self.key_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// Default value functions
fn default_redis_url() -> String { DEFAULT_REDIS_URL.to_string() }
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_request_timeout() -> u64 { REQUEST_TIMEOUT_SECS }
fn default_code_ttl() -> u64 { CODE_TTL_SECS } // 10 minutes
fn default_max_attempts() -> u32 { MAX_ATTEMPTS }
fn default_expired_retention() -> u64 { EXPIRED_RETENTION_SECS } // 1 hour
fn default_sweep_interval() -> u64 { 60 }
fn default_delivery_timeout() -> u64 { 10 }

fn generate_node_id() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    format!("node-{:08x}", rng.random::<u32>())
}

impl AppConfig {
    /// Load configuration from file and `TRANSFUND__*` env vars, with CLI overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        if !Path::new(config_path).exists() {
            // Defaults plus environment overrides
            tracing::warn!("Config file not found, using defaults");
        }

        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("TRANSFUND")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load config file")?;

        let mut config: Self = settings
            .try_deserialize()
            .context("Failed to parse config")?;

        // Apply CLI overrides
        if let Some(ref redis_url) = args.redis_url {
            config.redis_url = redis_url.clone();
        }
        if let Some(ref listen) = args.listen {
            config.listen_addr = listen.clone();
        }
        if let Some(ref secret) = args.payment_key_secret {
            config.payment.key_secret = Some(secret.clone());
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run safely with
    pub fn validate(&self) -> Result<()> {
        if self.otp.code_ttl_secs == 0 {
            bail!("otp.code_ttl_secs must be greater than zero");
        }
        if self.otp.max_attempts == 0 {
            bail!("otp.max_attempts must be greater than zero");
        }
        if self.store.sweep_interval_secs == 0 {
            bail!("store.sweep_interval_secs must be greater than zero");
        }
        if self.otp.debug_echo_code && self.environment == Environment::Production {
            bail!("otp.debug_echo_code cannot be enabled in production");
        }
        if self.delivery.channel == DeliveryChannel::Webhook && self.delivery.webhook_url.is_none() {
            bail!("delivery.webhook_url is required for the webhook channel");
        }
        if self.environment == Environment::Production {
            if self.delivery.channel == DeliveryChannel::Log {
                tracing::warn!("Log delivery channel in production: codes are only written to logs");
            }
            if self.store.backend == StoreBackend::Memory {
                tracing::warn!("Memory challenge store in production: state is per-process");
            }
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            listen_addr: default_listen_addr(),
            environment: Environment::default(),
            node_id: generate_node_id(),
            request_timeout_secs: default_request_timeout(),
            otp: OtpConfig::default(),
            store: StoreConfig::default(),
            delivery: DeliveryConfig::default(),
            payment: PaymentConfig::default(),
        }
    }
}
