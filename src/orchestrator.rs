//! Verification orchestrator.
//!
//! Drives the end-to-end flows: fingerprint a stored document, anchor it on
//! the ledger, and keep the external contract store's mirror row in step.
//! The mirror is a cache of on-chain truth; when it disagrees with the
//! ledger (a registration exists that the row does not reflect) the ledger
//! wins and the row is reconciled from a view call.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::crypto::fingerprint_file;
use crate::domain::{Approval, Fingerprint, TxHash, TxReceipt, VerificationStatus};
use crate::infra::{
    ActivityEntry, ActivityKind, ActivityLog, ContractRecord, ContractStore, RegistryError, Result,
};
use crate::registry::RegistryClient;

/// Outcome of a verification request.
#[derive(Debug, Clone)]
pub enum VerifyOutcome {
    /// The document was registered by this call.
    Verified {
        fingerprint: Fingerprint,
        receipt: TxReceipt,
    },
    /// A registration already existed; no transaction was sent.
    AlreadyVerified {
        fingerprint: Fingerprint,
        /// Cached transaction metadata, when the mirror row still has it.
        tx_hash: Option<TxHash>,
        block_number: Option<u64>,
    },
}

/// Combined verification report for one contract.
#[derive(Debug, Clone, Serialize)]
pub struct ContractVerification {
    pub contract_id: String,
    pub fingerprint: Option<Fingerprint>,
    pub status: VerificationStatus,
    pub approvals: Vec<Approval>,
}

pub struct VerificationOrchestrator {
    client: RegistryClient,
    store: Arc<dyn ContractStore>,
    activity: Arc<dyn ActivityLog>,
}

impl VerificationOrchestrator {
    pub fn new(
        client: RegistryClient,
        store: Arc<dyn ContractStore>,
        activity: Arc<dyn ActivityLog>,
    ) -> Self {
        Self {
            client,
            store,
            activity,
        }
    }

    pub fn client(&self) -> &RegistryClient {
        &self.client
    }

    /// Verify a contract document: fingerprint it and register the
    /// fingerprint on the ledger.
    ///
    /// Idempotent from the caller's view. A row already marked verified
    /// short-circuits without touching the ledger; an `AlreadyRegistered`
    /// revert means the mirror lagged behind the chain, so the row is
    /// rebuilt from a view call instead of failing the request.
    pub async fn verify_contract(&self, contract_id: &str, actor: &str) -> Result<VerifyOutcome> {
        let record = self.require_record(contract_id).await?;

        if record.is_verified {
            let fingerprint = match record.fingerprint {
                Some(fp) => fp,
                None => self.fingerprint_of(&record).await?,
            };
            return Ok(VerifyOutcome::AlreadyVerified {
                fingerprint,
                tx_hash: record.tx_hash,
                block_number: record.block_number,
            });
        }

        let fingerprint = self.fingerprint_of(&record).await?;

        match self.client.register(fingerprint, contract_id).await {
            Ok(receipt) => {
                self.store
                    .mark_verified(contract_id, fingerprint, &receipt)
                    .await?;
                self.record_activity(ActivityEntry::new(
                    contract_id,
                    actor,
                    ActivityKind::Verified,
                    format!(
                        "Contract verified on blockchain. Block: {}",
                        receipt.block_number
                    ),
                    serde_json::json!({
                        "tx_hash": receipt.tx_hash.to_hex(),
                        "block_number": receipt.block_number,
                    }),
                ))
                .await;
                Ok(VerifyOutcome::Verified {
                    fingerprint,
                    receipt,
                })
            }
            Err(RegistryError::AlreadyRegistered(_)) => {
                info!(
                    contract_id,
                    fingerprint = %fingerprint,
                    "Fingerprint already on chain, reconciling mirror row"
                );
                let status = self.client.verify(fingerprint).await?;
                if !status.exists {
                    // Revert said registered, view says absent. Likely a
                    // reorg between the two calls; surface the conflict.
                    return Err(RegistryError::AlreadyRegistered(fingerprint));
                }
                self.store
                    .reconcile_verified(contract_id, fingerprint, status.timestamp_ms)
                    .await?;
                Ok(VerifyOutcome::AlreadyVerified {
                    fingerprint,
                    tx_hash: record.tx_hash,
                    block_number: record.block_number,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Log an approval for a verified contract.
    pub async fn log_approval(
        &self,
        contract_id: &str,
        role: &str,
        comment: &str,
        actor: &str,
    ) -> Result<TxReceipt> {
        let record = self.require_record(contract_id).await?;
        let fingerprint = match record.fingerprint {
            Some(fp) => fp,
            None => self.fingerprint_of(&record).await?,
        };

        let receipt = self.client.log_approval(fingerprint, role, comment).await?;

        self.record_activity(ActivityEntry::new(
            contract_id,
            actor,
            ActivityKind::Approved,
            format!("Approval recorded on blockchain ({role})"),
            serde_json::json!({
                "role": role,
                "tx_hash": receipt.tx_hash.to_hex(),
                "block_number": receipt.block_number,
            }),
        ))
        .await;

        Ok(receipt)
    }

    /// On-chain verification report for a contract: current status plus
    /// the full approval list.
    pub async fn verification_status(&self, contract_id: &str) -> Result<ContractVerification> {
        let record = self.require_record(contract_id).await?;

        let Some(fingerprint) = record.fingerprint else {
            // Never fingerprinted, so it cannot be registered.
            return Ok(ContractVerification {
                contract_id: record.id,
                fingerprint: None,
                status: VerificationStatus::from(crate::domain::OnChainVerification::absent()),
                approvals: Vec::new(),
            });
        };

        let status = self.client.verify(fingerprint).await?;
        let approvals = if status.exists {
            self.client.approvals(fingerprint).await?
        } else {
            Vec::new()
        };

        Ok(ContractVerification {
            contract_id: record.id,
            fingerprint: Some(fingerprint),
            status,
            approvals,
        })
    }

    /// Check an arbitrary fingerprint against the ledger, independent of
    /// any contract row.
    pub async fn check_fingerprint(&self, fingerprint: Fingerprint) -> Result<VerificationStatus> {
        self.client.verify(fingerprint).await
    }

    async fn require_record(&self, contract_id: &str) -> Result<ContractRecord> {
        self.store
            .get(contract_id)
            .await?
            .ok_or_else(|| RegistryError::ContractNotFound(contract_id.to_string()))
    }

    async fn fingerprint_of(&self, record: &ContractRecord) -> Result<Fingerprint> {
        if let Some(fp) = record.fingerprint {
            return Ok(fp);
        }
        let path = record.file_path.as_ref().ok_or_else(|| {
            RegistryError::Internal(format!("contract {} has no stored document", record.id))
        })?;
        fingerprint_file(path).await
    }

    /// Activity recording is best-effort; a failed write must not fail the
    /// ledger operation it describes.
    async fn record_activity(&self, entry: ActivityEntry) {
        if let Err(e) = self.activity.record(entry).await {
            warn!(error = %e, "Failed to record activity entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use crate::crypto::fingerprint_bytes;
    use crate::infra::{InMemoryActivityLog, InMemoryContractStore, MockContractStore};
    use crate::registry::{DocumentLedger, InMemoryLedger};

    struct Fixture {
        orchestrator: VerificationOrchestrator,
        store: Arc<InMemoryContractStore>,
        activity: Arc<InMemoryActivityLog>,
        ledger: Arc<InMemoryLedger>,
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(InMemoryLedger::new());
        let store = Arc::new(InMemoryContractStore::new());
        let activity = Arc::new(InMemoryActivityLog::new());
        let orchestrator = VerificationOrchestrator::new(
            RegistryClient::new(ledger.clone()),
            store.clone(),
            activity.clone(),
        );
        Fixture {
            orchestrator,
            store,
            activity,
            ledger,
        }
    }

    fn doc_file(content: &[u8]) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(content).unwrap();
        tmp.flush().unwrap();
        tmp
    }

    #[tokio::test]
    async fn verify_registers_and_updates_mirror() {
        let fx = fixture();
        let tmp = doc_file(b"signed agreement v1");
        fx.store
            .insert(ContractRecord::new("c1").with_file_path(tmp.path()));

        let outcome = fx.orchestrator.verify_contract("c1", "user-1").await.unwrap();

        let expected_fp = fingerprint_bytes(b"signed agreement v1");
        match outcome {
            VerifyOutcome::Verified { fingerprint, receipt } => {
                assert_eq!(fingerprint, expected_fp);
                assert!(receipt.block_number > 0);
            }
            other => panic!("expected Verified, got {other:?}"),
        }

        let row = fx.store.get("c1").await.unwrap().unwrap();
        assert!(row.is_verified);
        assert_eq!(row.fingerprint, Some(expected_fp));
        assert!(row.tx_hash.is_some());

        let entries = fx.activity.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, ActivityKind::Verified);
        assert_eq!(entries[0].actor, "user-1");
    }

    #[tokio::test]
    async fn verify_unknown_contract_fails() {
        let fx = fixture();
        let err = fx
            .orchestrator
            .verify_contract("missing", "user-1")
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::ContractNotFound(_)));
    }

    #[tokio::test]
    async fn verify_already_verified_row_short_circuits() {
        let fx = fixture();
        let tmp = doc_file(b"doc");
        fx.store
            .insert(ContractRecord::new("c1").with_file_path(tmp.path()));

        fx.orchestrator.verify_contract("c1", "user-1").await.unwrap();
        let events_after_first = fx.ledger.events().len();

        let outcome = fx.orchestrator.verify_contract("c1", "user-1").await.unwrap();
        match outcome {
            VerifyOutcome::AlreadyVerified {
                tx_hash,
                block_number,
                ..
            } => {
                // The cached transaction metadata comes back intact.
                assert!(tx_hash.is_some());
                assert!(block_number.is_some());
            }
            other => panic!("expected AlreadyVerified, got {other:?}"),
        }
        // No second transaction reached the ledger.
        assert_eq!(fx.ledger.events().len(), events_after_first);
    }

    #[tokio::test]
    async fn mirror_write_failure_surfaces_after_registration() {
        let ledger = Arc::new(InMemoryLedger::new());
        let tmp = doc_file(b"doc");
        let record = ContractRecord::new("c1").with_file_path(tmp.path());

        let mut store = MockContractStore::new();
        store.expect_get().returning(move |_| Ok(Some(record.clone())));
        store.expect_mark_verified().returning(|_, _, _| {
            Err(RegistryError::Internal("mirror write failed".to_string()))
        });

        let orchestrator = VerificationOrchestrator::new(
            RegistryClient::new(ledger.clone()),
            Arc::new(store),
            Arc::new(InMemoryActivityLog::new()),
        );

        let err = orchestrator
            .verify_contract("c1", "user-1")
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Internal(_)));
        // The registration itself reached the ledger before the row update failed.
        assert_eq!(ledger.events().len(), 1);
    }

    #[tokio::test]
    async fn stale_mirror_is_reconciled_from_ledger() {
        let fx = fixture();
        let tmp = doc_file(b"already on chain");
        let fp = fingerprint_bytes(b"already on chain");

        // Registered on chain, but the mirror row knows nothing of it.
        fx.ledger.register(fp, "c1").await.unwrap();
        fx.store
            .insert(ContractRecord::new("c1").with_file_path(tmp.path()));

        let outcome = fx.orchestrator.verify_contract("c1", "user-1").await.unwrap();
        match outcome {
            VerifyOutcome::AlreadyVerified { fingerprint, .. } => assert_eq!(fingerprint, fp),
            other => panic!("expected AlreadyVerified, got {other:?}"),
        }

        let row = fx.store.get("c1").await.unwrap().unwrap();
        assert!(row.is_verified);
        assert_eq!(row.fingerprint, Some(fp));
        assert!(row.verified_at.is_some());
    }

    #[tokio::test]
    async fn approval_flow_records_activity_and_audit() {
        let fx = fixture();
        let tmp = doc_file(b"doc");
        fx.store
            .insert(ContractRecord::new("c1").with_file_path(tmp.path()));

        fx.orchestrator.verify_contract("c1", "user-1").await.unwrap();
        fx.orchestrator
            .log_approval("c1", "LEGAL", "reviewed", "user-2")
            .await
            .unwrap();

        let fp = fingerprint_bytes(b"doc");
        let audit = fx.orchestrator.client().audit_log(fp).await.unwrap();
        assert_eq!(audit, vec!["Contract registered", "Approved by LEGAL"]);

        let entries = fx.activity.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].kind, ActivityKind::Approved);
    }

    #[tokio::test]
    async fn approval_on_unregistered_fingerprint_fails() {
        let fx = fixture();
        let tmp = doc_file(b"never verified");
        fx.store
            .insert(ContractRecord::new("c1").with_file_path(tmp.path()));

        let err = fx
            .orchestrator
            .log_approval("c1", "LEGAL", "", "user-2")
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotRegistered(_)));
    }

    #[tokio::test]
    async fn status_report_includes_approvals() {
        let fx = fixture();
        let tmp = doc_file(b"doc");
        fx.store
            .insert(ContractRecord::new("c1").with_file_path(tmp.path()));

        fx.orchestrator.verify_contract("c1", "user-1").await.unwrap();
        fx.orchestrator
            .log_approval("c1", "LEGAL", "ok", "user-2")
            .await
            .unwrap();
        fx.orchestrator
            .log_approval("c1", "ADMIN", "final", "user-3")
            .await
            .unwrap();

        let report = fx.orchestrator.verification_status("c1").await.unwrap();
        assert!(report.status.exists);
        assert_eq!(report.approvals.len(), 2);
        assert_eq!(report.approvals[0].role, "LEGAL");
        assert_eq!(report.approvals[1].role, "ADMIN");
        // Millisecond convention on the way out.
        assert_eq!(report.approvals[0].timestamp_ms % 1000, 0);
    }

    #[tokio::test]
    async fn status_of_unfingerprinted_contract_is_absent() {
        let fx = fixture();
        fx.store.insert(ContractRecord::new("c1"));

        let report = fx.orchestrator.verification_status("c1").await.unwrap();
        assert!(!report.status.exists);
        assert!(report.fingerprint.is_none());
        assert!(report.approvals.is_empty());
    }

    #[tokio::test]
    async fn check_fingerprint_absent_is_not_an_error() {
        let fx = fixture();
        let status = fx
            .orchestrator
            .check_fingerprint(fingerprint_bytes(b"unknown"))
            .await
            .unwrap();
        assert!(!status.exists);
        assert_eq!(status.timestamp_ms, 0);
    }

    #[tokio::test]
    async fn contract_without_document_cannot_be_verified() {
        let fx = fixture();
        fx.store.insert(ContractRecord::new("c1"));

        let err = fx
            .orchestrator
            .verify_contract("c1", "user-1")
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Internal(_)));
    }
}
