//! DealSign Registry Library
//!
//! On-chain document registry and verification protocol for the DealSign
//! contract platform: SHA-256 document fingerprinting, at-most-once
//! registration, append-only approval and audit trails, and tamper-evident
//! verification of stored contract documents.
//!
//! ## Modules
//!
//! - [`domain`] - Core domain types (fingerprints, records, events)
//! - [`crypto`] - Document fingerprinting
//! - [`registry`] - Ledger backends and the registry client
//! - [`orchestrator`] - End-to-end verification workflows
//! - [`infra`] - Errors, retry policy, external store seams
//! - [`api`] - REST API routes

pub mod api;
pub mod crypto;
pub mod domain;
pub mod infra;
pub mod orchestrator;
pub mod registry;
pub mod server;

// Re-export commonly used types
pub use domain::{
    AccountId, Approval, ApprovalRecord, Fingerprint, OnChainVerification, RegistrationRecord,
    RegistryEvent, RegistryHealth, TxHash, TxReceipt, VerificationStatus,
};

pub use infra::{RegistryError, Result};

pub use orchestrator::{VerificationOrchestrator, VerifyOutcome};

pub use registry::{DocumentLedger, InMemoryLedger, RegistryClient};
