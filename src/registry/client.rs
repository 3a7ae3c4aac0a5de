//! Registry client facade.
//!
//! Owns one ledger backend (or none, in disconnected mode), normalizes
//! timestamps to milliseconds, and applies read-retry policy. Every write
//! returns only after on-chain confirmation; writes are never retried
//! because a submitted transaction cannot be cancelled.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{
    Approval, Fingerprint, RegistryHealth, TxReceipt, VerificationStatus,
};
use crate::infra::{RegistryError, Result, Retry, RetryConfig};
use crate::registry::eth::{EthLedger, EthLedgerConfig};
use crate::registry::DocumentLedger;

/// Client over a document registry ledger.
///
/// Constructed once at startup and shared. In disconnected mode (no signing
/// credential or contract address configured) every operation fails fast
/// with `NotConnected` and `health_check` reports `connected: false`; the
/// rest of the application keeps running.
#[derive(Clone)]
pub struct RegistryClient {
    ledger: Option<Arc<dyn DocumentLedger>>,
    read_retry: RetryConfig,
}

impl RegistryClient {
    pub fn new(ledger: Arc<dyn DocumentLedger>) -> Self {
        Self {
            ledger: Some(ledger),
            read_retry: RetryConfig::reads(),
        }
    }

    /// A client with no backend. All operations fail with `NotConnected`.
    pub fn disconnected() -> Self {
        Self {
            ledger: None,
            read_retry: RetryConfig::reads(),
        }
    }

    /// Build a client from environment configuration. Missing or invalid
    /// configuration degrades to disconnected mode instead of failing
    /// startup.
    pub fn from_env() -> Self {
        let Some(config) = EthLedgerConfig::from_env() else {
            warn!(
                "Registry not configured (PRIVATE_KEY / CONTRACT_ADDRESS unset), \
                 running in disconnected mode"
            );
            return Self::disconnected();
        };

        match EthLedger::new(config) {
            Ok(ledger) => {
                info!(chain_id = ledger.chain_id(), "Registry client connected");
                Self::new(Arc::new(ledger))
            }
            Err(e) => {
                warn!(error = %e, "Registry configuration rejected, running in disconnected mode");
                Self::disconnected()
            }
        }
    }

    pub fn with_read_retry(mut self, config: RetryConfig) -> Self {
        self.read_retry = config;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.ledger.is_some()
    }

    fn ledger(&self) -> Result<&Arc<dyn DocumentLedger>> {
        self.ledger.as_ref().ok_or(RegistryError::NotConnected)
    }

    /// Register a document fingerprint on chain. Blocks until the
    /// transaction is confirmed.
    pub async fn register(&self, fingerprint: Fingerprint, contract_id: &str) -> Result<TxReceipt> {
        self.ledger()?.register(fingerprint, contract_id).await
    }

    /// Log an approval against a registered fingerprint. Blocks until the
    /// transaction is confirmed.
    pub async fn log_approval(
        &self,
        fingerprint: Fingerprint,
        role: &str,
        comment: &str,
    ) -> Result<TxReceipt> {
        self.ledger()?.log_approval(fingerprint, role, comment).await
    }

    /// Check whether a fingerprint is registered. Absence is a normal
    /// result. Transient transport failures are retried.
    pub async fn verify(&self, fingerprint: Fingerprint) -> Result<VerificationStatus> {
        let ledger = self.ledger()?;
        let raw = Retry::new(self.read_retry.clone())
            .run_with_predicate(|| ledger.verify(fingerprint), RegistryError::is_retryable)
            .await
            .into_result()?;
        Ok(VerificationStatus::from(raw))
    }

    /// Ordered approval list for a fingerprint, millisecond timestamps.
    pub async fn approvals(&self, fingerprint: Fingerprint) -> Result<Vec<Approval>> {
        let ledger = self.ledger()?;
        let records = Retry::new(self.read_retry.clone())
            .run_with_predicate(|| ledger.approvals(fingerprint), RegistryError::is_retryable)
            .await
            .into_result()?;
        Ok(records.into_iter().map(Approval::from).collect())
    }

    /// Ordered audit log for a fingerprint; empty if unregistered.
    pub async fn audit_log(&self, fingerprint: Fingerprint) -> Result<Vec<String>> {
        let ledger = self.ledger()?;
        Retry::new(self.read_retry.clone())
            .run_with_predicate(|| ledger.audit_log(fingerprint), RegistryError::is_retryable)
            .await
            .into_result()
    }

    /// Connectivity report. Never fails.
    pub async fn health_check(&self) -> RegistryHealth {
        match &self.ledger {
            Some(ledger) => ledger.health().await,
            None => RegistryHealth::disconnected(),
        }
    }
}

impl std::fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryClient")
            .field("connected", &self.ledger.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::domain::{AccountId, OnChainVerification};
    use crate::registry::MockDocumentLedger;

    fn fp() -> Fingerprint {
        Fingerprint::from_bytes([0x42; 32])
    }

    #[tokio::test]
    async fn disconnected_client_fails_fast() {
        let client = RegistryClient::disconnected();
        assert!(!client.is_connected());

        let err = client.register(fp(), "contract-1").await.unwrap_err();
        assert!(matches!(err, RegistryError::NotConnected));

        let err = client.verify(fp()).await.unwrap_err();
        assert!(matches!(err, RegistryError::NotConnected));

        let err = client.log_approval(fp(), "LEGAL", "").await.unwrap_err();
        assert!(matches!(err, RegistryError::NotConnected));
    }

    #[tokio::test]
    async fn disconnected_health_reports_not_connected() {
        let client = RegistryClient::disconnected();
        let health = client.health_check().await;
        assert!(!health.connected);
        assert!(health.network_name.is_none());
    }

    #[tokio::test]
    async fn verify_converts_seconds_to_millis() {
        let mut ledger = MockDocumentLedger::new();
        ledger.expect_verify().returning(|_| {
            Ok(OnChainVerification {
                exists: true,
                registered_by: AccountId::from_bytes([7; 20]),
                timestamp_secs: 1_700_000_000,
            })
        });

        let client = RegistryClient::new(Arc::new(ledger));
        let status = client.verify(fp()).await.unwrap();
        assert!(status.exists);
        assert_eq!(status.timestamp_ms, 1_700_000_000_000);
    }

    #[tokio::test]
    async fn reads_retry_on_network_errors() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc as StdArc;

        let calls = StdArc::new(AtomicU32::new(0));
        let calls_in_mock = calls.clone();

        let mut ledger = MockDocumentLedger::new();
        ledger.expect_verify().returning(move |_| {
            if calls_in_mock.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(RegistryError::Network("connection reset".to_string()))
            } else {
                Ok(OnChainVerification::absent())
            }
        });

        let client = RegistryClient::new(Arc::new(ledger)).with_read_retry(
            RetryConfig::reads().with_initial_delay(Duration::from_millis(1)),
        );

        let status = client.verify(fp()).await.unwrap();
        assert!(!status.exists);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn typed_errors_are_not_retried() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc as StdArc;

        let calls = StdArc::new(AtomicU32::new(0));
        let calls_in_mock = calls.clone();

        let mut ledger = MockDocumentLedger::new();
        ledger.expect_audit_log().returning(move |f| {
            calls_in_mock.fetch_add(1, Ordering::SeqCst);
            Err(RegistryError::NotRegistered(f))
        });

        let client = RegistryClient::new(Arc::new(ledger)).with_read_retry(
            RetryConfig::reads().with_initial_delay(Duration::from_millis(1)),
        );

        let err = client.audit_log(fp()).await.unwrap_err();
        assert!(matches!(err, RegistryError::NotRegistered(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn debug_reveals_no_secrets() {
        let client = RegistryClient::disconnected();
        let debug = format!("{client:?}");
        assert!(debug.contains("connected: false"));
    }
}
