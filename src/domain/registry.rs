//! Registry records and events.
//!
//! These mirror the on-chain `DealSignRegistry` contract storage: one
//! immutable registration record per fingerprint, an append-only approval
//! list, and a derived human-readable audit log.

use serde::{Deserialize, Serialize};

use super::types::{AccountId, Fingerprint};

/// Audit log entry written when a fingerprint is registered.
pub const AUDIT_REGISTERED: &str = "Contract registered";

/// Audit log entry written when an approval is logged.
pub fn audit_approved(role: &str) -> String {
    format!("Approved by {role}")
}

/// Witness that a document is registered. Created exactly once per
/// fingerprint, immutable after creation, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub fingerprint: Fingerprint,
    /// Account that performed the initial register call.
    pub registered_by: AccountId,
    /// Opaque external reference to the off-chain contract row.
    pub contract_id: String,
    /// Block time at registration, in seconds.
    pub timestamp_secs: u64,
}

/// One entry in a fingerprint's append-only approval list.
///
/// No uniqueness constraint applies: the same approver and role may log
/// any number of times. The list is an audit trail, not a workflow gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub approver: AccountId,
    pub role: String,
    pub comment: String,
    /// Block time at approval, in seconds.
    pub timestamp_secs: u64,
}

/// Approval in the millisecond convention used off-chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub approver: AccountId,
    pub role: String,
    pub comment: String,
    pub timestamp_ms: i64,
}

impl From<ApprovalRecord> for Approval {
    fn from(record: ApprovalRecord) -> Self {
        Self {
            approver: record.approver,
            role: record.role,
            comment: record.comment,
            timestamp_ms: record.timestamp_secs as i64 * 1000,
        }
    }
}

/// Events emitted by the registry, indexed by fingerprint and actor for
/// off-chain log filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryEvent {
    ContractRegistered {
        fingerprint: Fingerprint,
        registered_by: AccountId,
        timestamp_secs: u64,
        contract_id: String,
    },
    ApprovalLogged {
        fingerprint: Fingerprint,
        approver: AccountId,
        role: String,
        timestamp_secs: u64,
    },
}

impl RegistryEvent {
    pub fn fingerprint(&self) -> Fingerprint {
        match self {
            RegistryEvent::ContractRegistered { fingerprint, .. } => *fingerprint,
            RegistryEvent::ApprovalLogged { fingerprint, .. } => *fingerprint,
        }
    }
}
