//! Core type definitions for the document registry.
//!
//! Fingerprints, account identities, and transaction hashes are fixed-width
//! byte arrays wrapped in newtypes. The canonical wire encoding for all of
//! them is lowercase hex with a `0x` prefix; parsing accepts input with or
//! without the prefix and normalizes it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::infra::RegistryError;

/// Content-derived SHA-256 digest identifying a document for registry
/// purposes. Two documents with identical bytes collide intentionally.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(#[serde(with = "bytes32_hex_0x")] pub [u8; 32]);

impl Fingerprint {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Canonical `0x`-prefixed lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_str = s.strip_prefix("0x").unwrap_or(s);
        let bytes =
            hex::decode(hex_str).map_err(|_| RegistryError::InvalidFingerprint(s.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| RegistryError::InvalidFingerprint(s.to_string()))?;
        Ok(Self(arr))
    }
}

/// On-chain account identity (20-byte Ethereum-style address).
///
/// The zero account marks "no registrant" in verification results for
/// fingerprints that were never registered.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(#[serde(with = "bytes20_hex_0x")] pub [u8; 20]);

impl AccountId {
    pub const ZERO: AccountId = AccountId([0u8; 20]);

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.to_hex())
    }
}

/// Hash of a confirmed ledger transaction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(#[serde(with = "bytes32_hex_0x")] pub [u8; 32]);

impl TxHash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self.to_hex())
    }
}

/// Receipt returned for every confirmed write call.
///
/// Produced only after the transaction is included in a block; submission
/// alone never yields a receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    /// Wall-clock confirmation time in milliseconds.
    pub timestamp_ms: i64,
}

/// Raw verification result as the ledger reports it (seconds precision).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnChainVerification {
    pub exists: bool,
    pub registered_by: AccountId,
    pub timestamp_secs: u64,
}

impl OnChainVerification {
    /// Result for a fingerprint with no registration. Absence is a normal,
    /// representable outcome, not an error.
    pub fn absent() -> Self {
        Self {
            exists: false,
            registered_by: AccountId::ZERO,
            timestamp_secs: 0,
        }
    }
}

/// Verification result in the millisecond convention used by the rest of
/// the system.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VerificationStatus {
    pub exists: bool,
    pub registered_by: AccountId,
    pub timestamp_ms: i64,
}

impl From<OnChainVerification> for VerificationStatus {
    fn from(raw: OnChainVerification) -> Self {
        Self {
            exists: raw.exists,
            registered_by: raw.registered_by,
            timestamp_ms: raw.timestamp_secs as i64 * 1000,
        }
    }
}

/// Registry connectivity report. Produced by `health_check`, which never
/// fails; any connectivity problem collapses into `connected: false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryHealth {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u64>,
}

impl RegistryHealth {
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            network_name: None,
            block_height: None,
        }
    }
}

/// Human-readable name for well-known chain IDs.
pub fn network_name(chain_id: u64) -> &'static str {
    match chain_id {
        1 => "mainnet",
        1337 => "localhost",
        31337 => "hardhat",
        11155111 => "sepolia",
        _ => "unknown",
    }
}

/// Serde module for 32-byte values as `0x`-prefixed hex strings.
pub mod bytes32_hex_0x {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let hex_str = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(hex_str).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes"))
    }
}

/// Serde module for 20-byte values as `0x`-prefixed hex strings.
pub mod bytes20_hex_0x {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 20], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 20], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let hex_str = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(hex_str).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 20 bytes"))
    }
}
