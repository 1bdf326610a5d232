//! Development channel: writes the code to the log.

use async_trait::async_trait;
use transfund_common::{Purpose, Result};

use super::CodeSender;
use crate::otp::IssuedCode;

pub struct LogSender;

#[async_trait]
impl CodeSender for LogSender {
    async fn send(&self, issued: &IssuedCode, purpose: Purpose) -> Result<()> {
        tracing::info!(
            identity = %issued.identity,
            code = %issued.code,
            purpose = ?purpose,
            expires_at = issued.expires_at,
            "OTP ready (log delivery channel)"
        );
        Ok(())
    }

    fn channel(&self) -> &'static str {
        "log"
    }
}
