//! External store seams.
//!
//! The relational contract store and the activity feed live outside this
//! service; they are reached through these traits. The rows held here are a
//! cache/mirror of on-chain truth: eventually consistent and re-derivable
//! by re-querying the ledger.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Fingerprint, TxHash, TxReceipt};
use crate::infra::{RegistryError, Result};

/// Mirror row for one contract document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractRecord {
    pub id: String,
    /// Location of the stored document, when this process can read it.
    pub file_path: Option<PathBuf>,
    /// Cached fingerprint, if one was computed before.
    pub fingerprint: Option<Fingerprint>,
    pub is_verified: bool,
    pub tx_hash: Option<TxHash>,
    pub block_number: Option<u64>,
    pub verified_at: Option<DateTime<Utc>>,
}

impl ContractRecord {
    /// Fresh, unverified row.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            file_path: None,
            fingerprint: None,
            is_verified: false,
            tx_hash: None,
            block_number: None,
            verified_at: None,
        }
    }

    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }
}

/// Access to the external contract store.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContractStore: Send + Sync {
    /// Fetch the mirror row for a contract.
    async fn get(&self, contract_id: &str) -> Result<Option<ContractRecord>>;

    /// Persist a successful on-chain registration.
    async fn mark_verified(
        &self,
        contract_id: &str,
        fingerprint: Fingerprint,
        receipt: &TxReceipt,
    ) -> Result<()>;

    /// Rebuild the verified flag from ledger state when the transaction
    /// metadata is unknown (mirror recovery path). Existing tx fields are
    /// left untouched.
    async fn reconcile_verified(
        &self,
        contract_id: &str,
        fingerprint: Fingerprint,
        registered_at_ms: i64,
    ) -> Result<()>;
}

/// Kind of activity recorded against a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    Verified,
    Approved,
}

/// Human-readable activity entry emitted back to the external store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub contract_id: String,
    pub actor: String,
    pub kind: ActivityKind,
    pub description: String,
    pub metadata: serde_json::Value,
    pub at: DateTime<Utc>,
}

impl ActivityEntry {
    pub fn new(
        contract_id: impl Into<String>,
        actor: impl Into<String>,
        kind: ActivityKind,
        description: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            contract_id: contract_id.into(),
            actor: actor.into(),
            kind,
            description: description.into(),
            metadata,
            at: Utc::now(),
        }
    }
}

/// Sink for activity entries.
#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn record(&self, entry: ActivityEntry) -> Result<()>;
}

/// In-memory contract store. Stands in for the external relational store
/// in tests and single-process deployments.
#[derive(Debug, Default)]
pub struct InMemoryContractStore {
    rows: RwLock<HashMap<String, ContractRecord>>,
}

impl InMemoryContractStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a contract row.
    pub fn insert(&self, record: ContractRecord) {
        self.rows
            .write()
            .expect("contract store lock poisoned")
            .insert(record.id.clone(), record);
    }
}

#[async_trait]
impl ContractStore for InMemoryContractStore {
    async fn get(&self, contract_id: &str) -> Result<Option<ContractRecord>> {
        Ok(self
            .rows
            .read()
            .expect("contract store lock poisoned")
            .get(contract_id)
            .cloned())
    }

    async fn mark_verified(
        &self,
        contract_id: &str,
        fingerprint: Fingerprint,
        receipt: &TxReceipt,
    ) -> Result<()> {
        let mut rows = self.rows.write().expect("contract store lock poisoned");
        let row = rows
            .get_mut(contract_id)
            .ok_or_else(|| RegistryError::ContractNotFound(contract_id.to_string()))?;
        row.is_verified = true;
        row.fingerprint = Some(fingerprint);
        row.tx_hash = Some(receipt.tx_hash);
        row.block_number = Some(receipt.block_number);
        row.verified_at = Some(Utc::now());
        Ok(())
    }

    async fn reconcile_verified(
        &self,
        contract_id: &str,
        fingerprint: Fingerprint,
        registered_at_ms: i64,
    ) -> Result<()> {
        let mut rows = self.rows.write().expect("contract store lock poisoned");
        let row = rows
            .get_mut(contract_id)
            .ok_or_else(|| RegistryError::ContractNotFound(contract_id.to_string()))?;
        row.is_verified = true;
        row.fingerprint = Some(fingerprint);
        row.verified_at = DateTime::<Utc>::from_timestamp_millis(registered_at_ms);
        Ok(())
    }
}

/// In-memory activity log.
#[derive(Debug, Default)]
pub struct InMemoryActivityLog {
    entries: RwLock<Vec<ActivityEntry>>,
}

impl InMemoryActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.entries
            .read()
            .expect("activity log lock poisoned")
            .clone()
    }
}

#[async_trait]
impl ActivityLog for InMemoryActivityLog {
    async fn record(&self, entry: ActivityEntry) -> Result<()> {
        self.entries
            .write()
            .expect("activity log lock poisoned")
            .push(entry);
        Ok(())
    }
}
