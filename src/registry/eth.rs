//! Ethereum backend for the document registry.
//!
//! Talks to the deployed `DealSignRegistry` contract. Write calls submit a
//! transaction and block until the receipt is observed, bounded by the
//! configured confirmation timeout. Reverts are classified into the typed
//! error set: custom-error decoding from revert data first, substring
//! matching on the legacy require-strings as a fallback only.

use std::time::Duration;

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, FixedBytes};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::sol_types::SolInterface;
use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use crate::domain::{
    network_name, AccountId, ApprovalRecord, Fingerprint, OnChainVerification, RegistryHealth,
    TxHash, TxReceipt,
};
use crate::infra::{RegistryError, Result};
use crate::registry::DocumentLedger;

// Contract bindings
sol! {
    #[sol(rpc)]
    interface IDealSignRegistry {
        struct Approval {
            address approver;
            string role;
            uint256 timestamp;
            string comment;
        }

        error AlreadyRegistered(bytes32 documentHash);
        error NotRegistered(bytes32 documentHash);

        event ContractRegistered(
            bytes32 indexed documentHash,
            address indexed registeredBy,
            uint256 timestamp,
            string contractId
        );
        event ApprovalLogged(
            bytes32 indexed documentHash,
            address indexed approver,
            string role,
            uint256 timestamp
        );

        function registerContract(bytes32 documentHash, string calldata contractId) external;

        function logApproval(bytes32 documentHash, string calldata role, string calldata comment) external;

        function verifyDocument(bytes32 documentHash)
            external
            view
            returns (bool exists, address registeredBy, uint256 timestamp);

        function getApprovals(bytes32 documentHash) external view returns (Approval[] memory);

        function getAuditLog(bytes32 documentHash) external view returns (string[] memory);
    }
}

/// Connection settings for the Ethereum backend.
///
/// The signing key is process-wide, read-only after initialization, and
/// must never appear in logs or error text.
#[derive(Clone)]
pub struct EthLedgerConfig {
    pub rpc_url: String,
    pub contract_address: Address,
    pub chain_id: u64,
    /// Bound on the wait for transaction inclusion.
    pub confirmation_timeout: Duration,
    private_key: String,
}

impl EthLedgerConfig {
    pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(90);

    pub fn new(
        rpc_url: impl Into<String>,
        contract_address: Address,
        private_key: impl Into<String>,
        chain_id: u64,
    ) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            contract_address,
            chain_id,
            confirmation_timeout: Self::DEFAULT_CONFIRMATION_TIMEOUT,
            private_key: private_key.into(),
        }
    }

    /// Load configuration from environment variables. Returns `None` when
    /// the signing credential or contract address is absent, which drops
    /// the client into disconnected mode rather than failing startup.
    pub fn from_env() -> Option<Self> {
        let rpc_url = std::env::var("BLOCKCHAIN_RPC_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8545".to_string());
        let private_key = std::env::var("PRIVATE_KEY").ok()?;
        let contract_address: Address = std::env::var("CONTRACT_ADDRESS")
            .ok()
            .and_then(|s| s.parse().ok())?;
        let chain_id = std::env::var("CHAIN_ID")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1337);
        let confirmation_timeout = std::env::var("REGISTRY_CONFIRMATION_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Self::DEFAULT_CONFIRMATION_TIMEOUT);

        Some(Self {
            rpc_url,
            contract_address,
            chain_id,
            confirmation_timeout,
            private_key,
        })
    }
}

impl std::fmt::Debug for EthLedgerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EthLedgerConfig")
            .field("rpc_url", &self.rpc_url)
            .field("contract_address", &self.contract_address)
            .field("chain_id", &self.chain_id)
            .field("confirmation_timeout", &self.confirmation_timeout)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// `DocumentLedger` implementation over an Ethereum-compatible chain.
pub struct EthLedger {
    config: EthLedgerConfig,
    signer: PrivateKeySigner,
}

impl EthLedger {
    pub fn new(config: EthLedgerConfig) -> Result<Self> {
        let signer: PrivateKeySigner = config
            .private_key
            .parse()
            .map_err(|_| RegistryError::Configuration("invalid signing key".to_string()))?;
        Ok(Self { config, signer })
    }

    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    fn to_bytes32(fingerprint: &Fingerprint) -> FixedBytes<32> {
        FixedBytes::from_slice(fingerprint.as_bytes())
    }

    /// Wait for inclusion of a submitted transaction, bounded by the
    /// configured confirmation timeout. A timeout does not retract the
    /// transaction; it may still confirm later.
    async fn await_receipt<F>(&self, receipt_fut: F) -> Result<TxReceipt>
    where
        F: std::future::Future<
            Output = std::result::Result<
                alloy::rpc::types::TransactionReceipt,
                alloy::providers::PendingTransactionError,
            >,
        >,
    {
        let waited = self.config.confirmation_timeout;
        let receipt = tokio::time::timeout(waited, receipt_fut)
            .await
            .map_err(|_| RegistryError::ConfirmationTimeout { waited })?
            .map_err(|e| RegistryError::Network(e.to_string()))?;

        Ok(TxReceipt {
            tx_hash: TxHash::from_bytes(receipt.transaction_hash.0),
            block_number: receipt.block_number.unwrap_or_default(),
            timestamp_ms: Utc::now().timestamp_millis(),
        })
    }
}

/// Classify a contract call failure into the typed error set.
///
/// Typed custom errors decoded from revert data take precedence; the
/// require-strings of older contract deployments are matched as a fallback.
fn classify_call_error(err: alloy::contract::Error, fingerprint: Fingerprint) -> RegistryError {
    if let alloy::contract::Error::TransportError(transport) = &err {
        if let Some(payload) = transport.as_error_resp() {
            if let Some(data) = payload.as_revert_data() {
                if let Ok(decoded) =
                    IDealSignRegistry::IDealSignRegistryErrors::abi_decode(&data, true)
                {
                    return match decoded {
                        IDealSignRegistry::IDealSignRegistryErrors::AlreadyRegistered(_) => {
                            RegistryError::AlreadyRegistered(fingerprint)
                        }
                        IDealSignRegistry::IDealSignRegistryErrors::NotRegistered(_) => {
                            RegistryError::NotRegistered(fingerprint)
                        }
                    };
                }
            }
        }
    }

    classify_revert_message(&err.to_string(), fingerprint)
}

/// Fallback classification from the revert reason text.
fn classify_revert_message(message: &str, fingerprint: Fingerprint) -> RegistryError {
    let lower = message.to_lowercase();
    if lower.contains("already registered") {
        RegistryError::AlreadyRegistered(fingerprint)
    } else if lower.contains("contract not found") || lower.contains("not registered") {
        RegistryError::NotRegistered(fingerprint)
    } else {
        RegistryError::Network(message.to_string())
    }
}

#[async_trait]
impl DocumentLedger for EthLedger {
    async fn register(&self, fingerprint: Fingerprint, contract_id: &str) -> Result<TxReceipt> {
        info!(fingerprint = %fingerprint, contract_id, "Registering document on chain");

        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(self.signer.clone()))
            .on_http(
                self.config
                    .rpc_url
                    .parse()
                    .map_err(|e| RegistryError::Configuration(format!("Invalid RPC URL: {e}")))?,
            );
        let contract = IDealSignRegistry::new(self.config.contract_address, &provider);

        let pending = contract
            .registerContract(Self::to_bytes32(&fingerprint), contract_id.to_string())
            .send()
            .await
            .map_err(|e| classify_call_error(e, fingerprint))?;

        info!(tx_hash = %pending.tx_hash(), "Registration transaction sent");

        let receipt = self.await_receipt(pending.get_receipt()).await?;
        info!(
            tx_hash = %receipt.tx_hash,
            block_number = receipt.block_number,
            "Registration confirmed"
        );
        Ok(receipt)
    }

    async fn log_approval(
        &self,
        fingerprint: Fingerprint,
        role: &str,
        comment: &str,
    ) -> Result<TxReceipt> {
        info!(fingerprint = %fingerprint, role, "Logging approval on chain");

        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(self.signer.clone()))
            .on_http(
                self.config
                    .rpc_url
                    .parse()
                    .map_err(|e| RegistryError::Configuration(format!("Invalid RPC URL: {e}")))?,
            );
        let contract = IDealSignRegistry::new(self.config.contract_address, &provider);

        let pending = contract
            .logApproval(
                Self::to_bytes32(&fingerprint),
                role.to_string(),
                comment.to_string(),
            )
            .send()
            .await
            .map_err(|e| classify_call_error(e, fingerprint))?;

        let receipt = self.await_receipt(pending.get_receipt()).await?;
        info!(
            tx_hash = %receipt.tx_hash,
            block_number = receipt.block_number,
            "Approval confirmed"
        );
        Ok(receipt)
    }

    async fn verify(&self, fingerprint: Fingerprint) -> Result<OnChainVerification> {
        let provider = ProviderBuilder::new().on_http(
            self.config
                .rpc_url
                .parse()
                .map_err(|e| RegistryError::Configuration(format!("Invalid RPC URL: {e}")))?,
        );
        let contract = IDealSignRegistry::new(self.config.contract_address, &provider);

        let ret = contract
            .verifyDocument(Self::to_bytes32(&fingerprint))
            .call()
            .await
            .map_err(|e| RegistryError::Network(e.to_string()))?;

        Ok(OnChainVerification {
            exists: ret.exists,
            registered_by: AccountId::from_bytes(ret.registeredBy.into_array()),
            timestamp_secs: ret.timestamp.saturating_to::<u64>(),
        })
    }

    async fn approvals(&self, fingerprint: Fingerprint) -> Result<Vec<ApprovalRecord>> {
        let provider = ProviderBuilder::new().on_http(
            self.config
                .rpc_url
                .parse()
                .map_err(|e| RegistryError::Configuration(format!("Invalid RPC URL: {e}")))?,
        );
        let contract = IDealSignRegistry::new(self.config.contract_address, &provider);

        let ret = contract
            .getApprovals(Self::to_bytes32(&fingerprint))
            .call()
            .await
            .map_err(|e| RegistryError::Network(e.to_string()))?;

        Ok(ret
            ._0
            .into_iter()
            .map(|a| ApprovalRecord {
                approver: AccountId::from_bytes(a.approver.into_array()),
                role: a.role,
                comment: a.comment,
                timestamp_secs: a.timestamp.saturating_to::<u64>(),
            })
            .collect())
    }

    async fn audit_log(&self, fingerprint: Fingerprint) -> Result<Vec<String>> {
        let provider = ProviderBuilder::new().on_http(
            self.config
                .rpc_url
                .parse()
                .map_err(|e| RegistryError::Configuration(format!("Invalid RPC URL: {e}")))?,
        );
        let contract = IDealSignRegistry::new(self.config.contract_address, &provider);

        let ret = contract
            .getAuditLog(Self::to_bytes32(&fingerprint))
            .call()
            .await
            .map_err(|e| RegistryError::Network(e.to_string()))?;

        Ok(ret._0)
    }

    async fn health(&self) -> RegistryHealth {
        let url = match self.config.rpc_url.parse() {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Registry health check failed");
                return RegistryHealth::disconnected();
            }
        };
        let provider = ProviderBuilder::new().on_http(url);

        let chain_id = match provider.get_chain_id().await {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "Registry health check failed");
                return RegistryHealth::disconnected();
            }
        };

        let block_height = match provider.get_block_number().await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "Registry health check failed");
                return RegistryHealth::disconnected();
            }
        };

        RegistryHealth {
            connected: true,
            network_name: Some(network_name(chain_id).to_string()),
            block_height: Some(block_height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp() -> Fingerprint {
        Fingerprint::from_bytes([0xaa; 32])
    }

    #[test]
    fn revert_message_fallback_classification() {
        assert!(matches!(
            classify_revert_message("execution reverted: Contract already registered", fp()),
            RegistryError::AlreadyRegistered(_)
        ));
        assert!(matches!(
            classify_revert_message("execution reverted: Contract not found", fp()),
            RegistryError::NotRegistered(_)
        ));
        assert!(matches!(
            classify_revert_message("connection refused", fp()),
            RegistryError::Network(_)
        ));
    }

    #[test]
    fn config_debug_redacts_key() {
        let config = EthLedgerConfig::new(
            "http://127.0.0.1:8545",
            Address::ZERO,
            "0x0123456789012345678901234567890123456789012345678901234567890123",
            1337,
        );
        let debug = format!("{config:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("0123456789012345678901234567890123456789012345678901234567890123"));
    }

    #[test]
    fn fingerprint_converts_to_bytes32() {
        let bytes = EthLedger::to_bytes32(&fp());
        assert_eq!(bytes.0, [0xaa; 32]);
    }

    #[tokio::test]
    async fn receipt_wait_is_bounded_by_configured_timeout() {
        let mut config = EthLedgerConfig::new(
            "http://127.0.0.1:8545",
            Address::ZERO,
            "0x0123456789012345678901234567890123456789012345678901234567890123",
            1337,
        );
        config.confirmation_timeout = Duration::from_millis(10);
        let ledger = EthLedger::new(config).unwrap();

        // A receipt that never arrives.
        let err = ledger
            .await_receipt(std::future::pending())
            .await
            .unwrap_err();
        match err {
            RegistryError::ConfirmationTimeout { waited } => {
                assert_eq!(waited, Duration::from_millis(10));
            }
            other => panic!("expected ConfirmationTimeout, got {other:?}"),
        }
    }
}
