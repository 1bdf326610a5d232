//! Out-of-band code delivery.
//!
//! The issuer's job ends once a code is persisted; a [`CodeSender`] then
//! hands it to the user through some external channel.

mod log;
mod webhook;

pub use log::LogSender;
pub use webhook::WebhookSender;

use async_trait::async_trait;
use transfund_common::{Purpose, Result};

use crate::otp::IssuedCode;

#[async_trait]
pub trait CodeSender: Send + Sync {
    /// Deliver `issued.code` to `issued.identity`
    async fn send(&self, issued: &IssuedCode, purpose: Purpose) -> Result<()>;

    /// Channel name for logs
    fn channel(&self) -> &'static str;
}
