//! HTTP webhook channel.
//!
//! POSTs the code to a transactional-mail relay, which renders and sends
//! the email. Any non-2xx answer is a delivery failure.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use transfund_common::{Purpose, Result, TransfundError};

use super::CodeSender;
use crate::otp::IssuedCode;

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    to: &'a str,
    code: &'a str,
    purpose: Purpose,
    expires_at: i64,
    subject: &'static str,
}

pub struct WebhookSender {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl WebhookSender {
    pub fn new(url: String, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransfundError::Config(format!("webhook client: {e}")))?;

        Ok(Self { client, url, token })
    }
}

#[async_trait]
impl CodeSender for WebhookSender {
    async fn send(&self, issued: &IssuedCode, purpose: Purpose) -> Result<()> {
        let payload = WebhookPayload {
            to: issued.identity.as_str(),
            code: &issued.code,
            purpose,
            expires_at: issued.expires_at,
            subject: purpose.subject(),
        };

        let mut request = self.client.post(&self.url).json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransfundError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransfundError::Delivery(format!(
                "relay answered {status}"
            )));
        }

        tracing::debug!(
            identity = %issued.identity.masked(),
            status = status.as_u16(),
            "OTP handed to mail relay"
        );
        Ok(())
    }

    fn channel(&self) -> &'static str {
        "webhook"
    }
}
