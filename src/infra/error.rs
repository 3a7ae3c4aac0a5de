//! Error types for the registry client and verification workflow.

use std::time::Duration;

use thiserror::Error;

use crate::domain::Fingerprint;

/// Errors surfaced by the registry protocol.
///
/// The client never swallows these: every failure mode callers need to
/// distinguish gets its own variant rather than a string to parse.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Write rejected because the fingerprint already has a registration
    /// record. Recoverable by switching to the verify/read path.
    #[error("document already registered: {0}")]
    AlreadyRegistered(Fingerprint),

    /// Approval attempted against a fingerprint with no registration
    /// record. Recoverable by registering first.
    #[error("document not registered: {0}")]
    NotRegistered(Fingerprint),

    /// Client has no usable network/credential configuration. Fatal for
    /// write paths; reported as a configuration problem, never retried.
    #[error("registry client is not connected; set BLOCKCHAIN_RPC_URL, PRIVATE_KEY and CONTRACT_ADDRESS")]
    NotConnected,

    /// Transaction submitted but confirmation not observed in time. The
    /// transaction may still confirm later; callers must re-check ledger
    /// state before resubmitting.
    #[error("transaction confirmation not observed within {waited:?}")]
    ConfirmationTimeout { waited: Duration },

    /// Transport or connection failure. Retryable with backoff.
    #[error("network error: {0}")]
    Network(String),

    /// Input hash is not a 32-byte hex value.
    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    /// Contract row missing in the external store.
    #[error("contract not found: {0}")]
    ContractNotFound(String),

    /// Document read failure while computing a fingerprint.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid endpoint, key, or address configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RegistryError {
    /// Whether a failed call may be retried as-is. Only transport failures
    /// qualify; a confirmation timeout requires a ledger state check first,
    /// and everything else is definite.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RegistryError::Network(_))
    }
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
