//! HMAC-SHA256 checkout signatures.
//!
//! The gateway signs `"{order_id}|{payment_id}"` with the merchant key
//! secret and sends the hex digest back with the checkout callback.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use transfund_common::{Result, TransfundError};

type HmacSha256 = Hmac<Sha256>;

pub struct PaymentVerifier {
    key_secret: String,
}

impl PaymentVerifier {
    pub fn new(key_secret: String) -> Self {
        Self { key_secret }
    }

    /// Check a checkout callback signature
    pub fn verify(&self, order_id: &str, payment_id: &str, signature: &str) -> Result<()> {
        let order_id = order_id.trim();
        let payment_id = payment_id.trim();
        let signature = signature.trim();
        if order_id.is_empty() || payment_id.is_empty() || signature.is_empty() {
            return Err(TransfundError::Validation(
                "order_id, payment_id and signature are required".to_string(),
            ));
        }

        let Ok(expected) = hex::decode(signature) else {
            tracing::warn!(payment_id, "Payment signature is not valid hex");
            return Err(TransfundError::InvalidSignature);
        };

        let mac = keyed_mac(&self.key_secret, order_id, payment_id)?;

        // verify_slice compares in constant time
        if mac.verify_slice(&expected).is_err() {
            tracing::warn!(payment_id, "Payment signature mismatch");
            return Err(TransfundError::InvalidSignature);
        }

        tracing::info!(payment_id, "Payment signature verified");
        Ok(())
    }
}

fn keyed_mac(key_secret: &str, order_id: &str, payment_id: &str) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(key_secret.as_bytes())
        .map_err(|e| TransfundError::Config(format!("payment key: {e}")))?;
    mac.update(format!("{order_id}|{payment_id}").as_bytes());
    Ok(mac)
}

/// Produce the hex signature the gateway would send
#[cfg(test)]
pub(crate) fn sign(key_secret: &str, order_id: &str, payment_id: &str) -> Result<String> {
    let mac = keyed_mac(key_secret, order_id, payment_id)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}
