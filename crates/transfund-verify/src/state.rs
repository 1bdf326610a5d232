//! Application state and shared resources.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AppConfig, DeliveryChannel, DeliveryConfig, StoreBackend};
use crate::delivery::{CodeSender, LogSender, WebhookSender};
use crate::metrics::ServiceMetrics;
use crate::otp::{OtpIssuer, OtpVerifier};
use crate::payment::PaymentVerifier;
use crate::store::{ChallengeStore, MemoryChallengeStore, RedisChallengeStore, sweep_worker};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// Challenge store (Redis or in-process)
    pub store: Arc<dyn ChallengeStore>,

    /// OTP issuer
    pub issuer: Arc<OtpIssuer>,

    /// OTP verifier
    pub verifier: Arc<OtpVerifier>,

    /// Out-of-band code delivery
    pub sender: Arc<dyn CodeSender>,

    /// Payment signature checks (absent without a key secret)
    pub payments: Option<Arc<PaymentVerifier>>,

    /// Request counters
    pub metrics: Arc<ServiceMetrics>,

    /// Node identifier
    pub node_id: String,
}

impl AppState {
    /// Create application state, connecting the configured store backend.
    ///
    /// The memory backend gets a sweeper task that stops on `shutdown`.
    pub async fn new(config: AppConfig, shutdown: &tokio::sync::broadcast::Sender<()>) -> Result<Self> {
        let store: Arc<dyn ChallengeStore> = match config.store.backend {
            StoreBackend::Redis => {
                let store =
                    RedisChallengeStore::connect(&config.redis_url, config.otp.expired_retention_secs)
                        .await?;
                tracing::info!("✅ Redis connected: {}", config.redis_url);
                Arc::new(store)
            }
            StoreBackend::Memory => {
                let store = Arc::new(MemoryChallengeStore::new());
                tokio::spawn(sweep_worker(
                    store.clone(),
                    Duration::from_secs(config.store.sweep_interval_secs),
                    shutdown.subscribe(),
                ));
                tracing::info!("🧠 Using in-process challenge store");
                store
            }
        };

        let sender = build_sender(&config.delivery)?;
        tracing::info!(channel = sender.channel(), "📨 Delivery channel ready");

        Ok(Self::with_components(config, store, sender))
    }

    /// Assemble state around an already-built store and sender
    pub fn with_components(
        config: AppConfig,
        store: Arc<dyn ChallengeStore>,
        sender: Arc<dyn CodeSender>,
    ) -> Self {
        let issuer = Arc::new(OtpIssuer::new(store.clone(), config.otp.code_ttl_secs));
        let verifier = Arc::new(OtpVerifier::new(store.clone(), config.otp.max_attempts));
        let payments = config
            .payment
            .key_secret
            .clone()
            .map(|secret| Arc::new(PaymentVerifier::new(secret)));
        let node_id = config.node_id.clone();

        Self {
            config,
            store,
            issuer,
            verifier,
            sender,
            payments,
            metrics: Arc::new(ServiceMetrics::default()),
            node_id,
        }
    }

    /// Whether issue responses may carry the raw code
    pub fn echo_codes(&self) -> bool {
        self.config.otp.debug_echo_code
            && self.config.environment != crate::config::Environment::Production
    }
}

fn build_sender(config: &DeliveryConfig) -> Result<Arc<dyn CodeSender>> {
    match config.channel {
        DeliveryChannel::Log => Ok(Arc::new(LogSender)),
        DeliveryChannel::Webhook => {
            let url = config
                .webhook_url
                .clone()
                .context("delivery.webhook_url is required for the webhook channel")?;
            let sender = WebhookSender::new(
                url,
                config.webhook_token.clone(),
                Duration::from_secs(config.timeout_secs),
            )?;
            Ok(Arc::new(sender))
        }
    }
}
