//! Backend abstraction over the document registry ledger.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::domain::{
    ApprovalRecord, Fingerprint, OnChainVerification, RegistryHealth, TxReceipt,
};
use crate::infra::Result;

/// A ledger holding the document registry.
///
/// Write operations return only after the transaction is confirmed
/// (included in a block), never on submission alone. Preconditions are
/// enforced by the ledger itself: implementations reject a second
/// registration and approvals against unregistered fingerprints
/// atomically, with no partial state change.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DocumentLedger: Send + Sync {
    /// Register a fingerprint. Fails with `AlreadyRegistered` if a
    /// registration record exists.
    async fn register(&self, fingerprint: Fingerprint, contract_id: &str) -> Result<TxReceipt>;

    /// Append an approval. Fails with `NotRegistered` if the fingerprint
    /// has no registration record.
    async fn log_approval(
        &self,
        fingerprint: Fingerprint,
        role: &str,
        comment: &str,
    ) -> Result<TxReceipt>;

    /// Read-only existence check. Absence is a normal result, never an
    /// error.
    async fn verify(&self, fingerprint: Fingerprint) -> Result<OnChainVerification>;

    /// Ordered approval list; empty if none or unregistered.
    async fn approvals(&self, fingerprint: Fingerprint) -> Result<Vec<ApprovalRecord>>;

    /// Ordered audit log; empty if unregistered.
    async fn audit_log(&self, fingerprint: Fingerprint) -> Result<Vec<String>>;

    /// Connectivity report. Must not fail; problems collapse into
    /// `connected: false`.
    async fn health(&self) -> RegistryHealth;
}
