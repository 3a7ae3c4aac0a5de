//! Registry state machine and in-memory ledger backend.
//!
//! [`RegistryState`] is a pure reimplementation of the on-chain
//! `DealSignRegistry` contract: per fingerprint, `Unregistered` →
//! `Registered` is the only transition, `Registered` is terminal, and every
//! write either fully applies or leaves the state untouched.
//!
//! [`InMemoryLedger`] wraps the state machine behind the
//! [`DocumentLedger`](super::DocumentLedger) trait, fabricating receipts and
//! block numbers. It backs tests and lets the host run with chain features
//! degraded but exercised.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::domain::{
    audit_approved, AccountId, ApprovalRecord, Fingerprint, OnChainVerification,
    RegistrationRecord, RegistryEvent, RegistryHealth, TxHash, TxReceipt, AUDIT_REGISTERED,
};
use crate::infra::{RegistryError, Result};
use crate::registry::DocumentLedger;

/// Per-fingerprint storage: the immutable registration plus append-only
/// approval and audit lists.
#[derive(Debug, Clone)]
struct Entry {
    registration: RegistrationRecord,
    approvals: Vec<ApprovalRecord>,
    audit_log: Vec<String>,
}

/// The registry contract state machine.
///
/// Synchronous and lock-free; callers own concurrency control. Timestamps
/// are supplied by the caller (the ledger clock) and must be
/// non-decreasing per fingerprint, matching chain ordering.
#[derive(Debug, Default)]
pub struct RegistryState {
    entries: HashMap<Fingerprint, Entry>,
    events: Vec<RegistryEvent>,
}

impl RegistryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the registration record for a fingerprint.
    ///
    /// Rejects a second registration without touching existing state.
    pub fn register(
        &mut self,
        fingerprint: Fingerprint,
        contract_id: &str,
        caller: AccountId,
        now_secs: u64,
    ) -> Result<()> {
        if self.entries.contains_key(&fingerprint) {
            return Err(RegistryError::AlreadyRegistered(fingerprint));
        }

        self.entries.insert(
            fingerprint,
            Entry {
                registration: RegistrationRecord {
                    fingerprint,
                    registered_by: caller,
                    contract_id: contract_id.to_string(),
                    timestamp_secs: now_secs,
                },
                approvals: Vec::new(),
                audit_log: vec![AUDIT_REGISTERED.to_string()],
            },
        );

        self.events.push(RegistryEvent::ContractRegistered {
            fingerprint,
            registered_by: caller,
            timestamp_secs: now_secs,
            contract_id: contract_id.to_string(),
        });

        Ok(())
    }

    /// Append an approval record for a registered fingerprint.
    ///
    /// Repeats by the same approver/role are allowed: the list is an audit
    /// trail, not a workflow gate.
    pub fn log_approval(
        &mut self,
        fingerprint: Fingerprint,
        role: &str,
        comment: &str,
        caller: AccountId,
        now_secs: u64,
    ) -> Result<()> {
        let entry = self
            .entries
            .get_mut(&fingerprint)
            .ok_or(RegistryError::NotRegistered(fingerprint))?;

        entry.approvals.push(ApprovalRecord {
            approver: caller,
            role: role.to_string(),
            comment: comment.to_string(),
            timestamp_secs: now_secs,
        });
        entry.audit_log.push(audit_approved(role));

        self.events.push(RegistryEvent::ApprovalLogged {
            fingerprint,
            approver: caller,
            role: role.to_string(),
            timestamp_secs: now_secs,
        });

        Ok(())
    }

    /// Existence check; never fails for an absent fingerprint.
    pub fn verify(&self, fingerprint: Fingerprint) -> OnChainVerification {
        match self.entries.get(&fingerprint) {
            Some(entry) => OnChainVerification {
                exists: true,
                registered_by: entry.registration.registered_by,
                timestamp_secs: entry.registration.timestamp_secs,
            },
            None => OnChainVerification::absent(),
        }
    }

    pub fn registration(&self, fingerprint: Fingerprint) -> Option<&RegistrationRecord> {
        self.entries.get(&fingerprint).map(|e| &e.registration)
    }

    pub fn approvals(&self, fingerprint: Fingerprint) -> Vec<ApprovalRecord> {
        self.entries
            .get(&fingerprint)
            .map(|e| e.approvals.clone())
            .unwrap_or_default()
    }

    pub fn audit_log(&self, fingerprint: Fingerprint) -> Vec<String> {
        self.entries
            .get(&fingerprint)
            .map(|e| e.audit_log.clone())
            .unwrap_or_default()
    }

    /// All events emitted so far, in emission order.
    pub fn events(&self) -> &[RegistryEvent] {
        &self.events
    }
}

/// In-memory ledger backend over [`RegistryState`].
#[derive(Debug)]
pub struct InMemoryLedger {
    state: RwLock<RegistryState>,
    block_number: AtomicU64,
    /// Highest timestamp handed out, to keep the clock non-decreasing.
    last_secs: AtomicU64,
    caller: AccountId,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState::new()),
            block_number: AtomicU64::new(0),
            last_secs: AtomicU64::new(0),
            caller: AccountId::from_bytes([0x11; 20]),
        }
    }

    /// Override the account all writes are attributed to.
    pub fn with_caller(mut self, caller: AccountId) -> Self {
        self.caller = caller;
        self
    }

    /// Snapshot of emitted events, for assertions.
    pub fn events(&self) -> Vec<RegistryEvent> {
        self.state
            .read()
            .expect("registry state lock poisoned")
            .events()
            .to_vec()
    }

    fn next_block(&self) -> u64 {
        self.block_number.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn now_secs(&self) -> u64 {
        let wall = Utc::now().timestamp().max(0) as u64;
        self.last_secs.fetch_max(wall, Ordering::SeqCst);
        self.last_secs.load(Ordering::SeqCst)
    }

    fn receipt(&self, fingerprint: Fingerprint, block_number: u64, tag: &[u8]) -> TxReceipt {
        let mut hasher = Sha256::new();
        hasher.update(tag);
        hasher.update(fingerprint.as_bytes());
        hasher.update(block_number.to_be_bytes());
        TxReceipt {
            tx_hash: TxHash::from_bytes(hasher.finalize().into()),
            block_number,
            timestamp_ms: Utc::now().timestamp_millis(),
        }
    }
}

#[async_trait]
impl DocumentLedger for InMemoryLedger {
    async fn register(&self, fingerprint: Fingerprint, contract_id: &str) -> Result<TxReceipt> {
        let now = self.now_secs();
        {
            let mut state = self.state.write().expect("registry state lock poisoned");
            state.register(fingerprint, contract_id, self.caller, now)?;
        }
        Ok(self.receipt(fingerprint, self.next_block(), b"register"))
    }

    async fn log_approval(
        &self,
        fingerprint: Fingerprint,
        role: &str,
        comment: &str,
    ) -> Result<TxReceipt> {
        let now = self.now_secs();
        {
            let mut state = self.state.write().expect("registry state lock poisoned");
            state.log_approval(fingerprint, role, comment, self.caller, now)?;
        }
        Ok(self.receipt(fingerprint, self.next_block(), b"approval"))
    }

    async fn verify(&self, fingerprint: Fingerprint) -> Result<OnChainVerification> {
        Ok(self
            .state
            .read()
            .expect("registry state lock poisoned")
            .verify(fingerprint))
    }

    async fn approvals(&self, fingerprint: Fingerprint) -> Result<Vec<ApprovalRecord>> {
        Ok(self
            .state
            .read()
            .expect("registry state lock poisoned")
            .approvals(fingerprint))
    }

    async fn audit_log(&self, fingerprint: Fingerprint) -> Result<Vec<String>> {
        Ok(self
            .state
            .read()
            .expect("registry state lock poisoned")
            .audit_log(fingerprint))
    }

    async fn health(&self) -> RegistryHealth {
        RegistryHealth {
            connected: true,
            network_name: Some("in-memory".to_string()),
            block_height: Some(self.block_number.load(Ordering::SeqCst)),
        }
    }
}
