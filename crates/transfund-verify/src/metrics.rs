//! In-process counters exposed on `/metrics`.

use std::sync::atomic::{AtomicU64, Ordering};
use transfund_common::{MetricsSnapshot, TransfundError};

#[derive(Debug, Default)]
pub struct ServiceMetrics {
    codes_issued: AtomicU64,
    codes_verified: AtomicU64,
    mismatches: AtomicU64,
    rejections: AtomicU64,
    delivery_failures: AtomicU64,
    payments_verified: AtomicU64,
}

impl ServiceMetrics {
    pub fn record_issued(&self) {
        self.codes_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_verified(&self) {
        self.codes_verified.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivery_failure(&self) {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_payment_verified(&self) {
        self.payments_verified.fetch_add(1, Ordering::Relaxed);
    }

    /// Classify a failed verification
    pub fn record_verify_error(&self, err: &TransfundError) {
        if matches!(err, TransfundError::Mismatch { .. }) {
            self.mismatches.fetch_add(1, Ordering::Relaxed);
        } else if err.requires_reissue() {
            self.rejections.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self, node_id: &str) -> MetricsSnapshot {
        MetricsSnapshot {
            node_id: node_id.to_string(),
            codes_issued: self.codes_issued.load(Ordering::Relaxed),
            codes_verified: self.codes_verified.load(Ordering::Relaxed),
            mismatches: self.mismatches.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            payments_verified: self.payments_verified.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_errors_are_classified() {
        let metrics = ServiceMetrics::default();
        metrics.record_verify_error(&TransfundError::Mismatch { attempts: 1, remaining: 2 });
        metrics.record_verify_error(&TransfundError::Expired);
        metrics.record_verify_error(&TransfundError::NotFound);
        metrics.record_verify_error(&TransfundError::Validation("x".into()));

        let snap = metrics.snapshot("node-1");
        assert_eq!(snap.node_id, "node-1");
        assert_eq!(snap.mismatches, 1);
        assert_eq!(snap.rejections, 2);
        assert_eq!(snap.codes_verified, 0);
    }
}
