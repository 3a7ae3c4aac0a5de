//! HTTP handlers for the document registry API.

use std::str::FromStr;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ErrorCode};
use crate::domain::{Approval, Fingerprint, RegistryHealth, TxReceipt, VerificationStatus};
use crate::orchestrator::{ContractVerification, VerifyOutcome};
use crate::server::AppState;

fn default_actor() -> String {
    "system".to_string()
}

/// Request body for contract verification.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// Acting user, recorded in the activity feed.
    #[serde(default = "default_actor")]
    pub actor: String,
}

/// Request body for logging an approval.
#[derive(Debug, Deserialize)]
pub struct ApprovalRequest {
    pub role: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default = "default_actor")]
    pub actor: String,
}

/// Request body for checking an arbitrary document hash.
#[derive(Debug, Deserialize)]
pub struct CheckHashRequest {
    pub hash: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub fingerprint: String,
    pub tx_hash: String,
    pub block_number: u64,
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
pub struct ApprovalResponse {
    pub success: bool,
    pub tx_hash: String,
    pub block_number: u64,
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
pub struct CheckHashResponse {
    pub hash: String,
    #[serde(flatten)]
    pub status: VerificationStatus,
}

#[derive(Debug, Serialize)]
pub struct AuditLogResponse {
    pub hash: String,
    pub entries: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ApprovalsResponse {
    pub hash: String,
    pub approvals: Vec<Approval>,
}

/// POST /api/v1/contracts/:id/verify
///
/// Fingerprint the contract's stored document and register it on the
/// ledger. The body is optional; a bare POST acts as the system user.
/// A contract already marked verified (or whose fingerprint is already
/// on chain) yields a 400 `ALREADY_VERIFIED` response carrying the
/// cached transaction metadata; no second transaction is sent.
pub async fn verify_contract(
    State(state): State<AppState>,
    Path(contract_id): Path<String>,
    body: Option<Json<VerifyRequest>>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let actor = body
        .map(|Json(req)| req.actor)
        .unwrap_or_else(default_actor);
    let outcome = state
        .orchestrator
        .verify_contract(&contract_id, &actor)
        .await?;

    match outcome {
        VerifyOutcome::Verified {
            fingerprint,
            receipt,
        } => Ok(Json(verify_response(fingerprint, receipt))),
        VerifyOutcome::AlreadyVerified {
            fingerprint,
            tx_hash,
            block_number,
        } => Err(ApiError::new(
            ErrorCode::AlreadyVerified,
            "Contract already verified on blockchain",
        )
        .with_resource_id(contract_id)
        .with_details(serde_json::json!({
            "fingerprint": fingerprint.to_hex(),
            "tx_hash": tx_hash.map(|h| h.to_hex()),
            "block_number": block_number,
        }))),
    }
}

fn verify_response(fingerprint: Fingerprint, receipt: TxReceipt) -> VerifyResponse {
    VerifyResponse {
        success: true,
        fingerprint: fingerprint.to_hex(),
        tx_hash: receipt.tx_hash.to_hex(),
        block_number: receipt.block_number,
        timestamp: receipt.timestamp_ms,
    }
}

/// POST /api/v1/contracts/:id/approvals
pub async fn log_approval(
    State(state): State<AppState>,
    Path(contract_id): Path<String>,
    Json(req): Json<ApprovalRequest>,
) -> Result<Json<ApprovalResponse>, ApiError> {
    if req.role.trim().is_empty() {
        return Err(ApiError::new(
            ErrorCode::InvalidRequestBody,
            "role must not be empty",
        ));
    }

    let receipt = state
        .orchestrator
        .log_approval(&contract_id, &req.role, &req.comment, &req.actor)
        .await?;

    Ok(Json(ApprovalResponse {
        success: true,
        tx_hash: receipt.tx_hash.to_hex(),
        block_number: receipt.block_number,
        timestamp: receipt.timestamp_ms,
    }))
}

/// GET /api/v1/contracts/:id/status
pub async fn contract_status(
    State(state): State<AppState>,
    Path(contract_id): Path<String>,
) -> Result<Json<ContractVerification>, ApiError> {
    let report = state.orchestrator.verification_status(&contract_id).await?;
    Ok(Json(report))
}

/// POST /api/v1/hashes/check
///
/// Check an arbitrary document hash against the ledger. Accepts the hash
/// with or without a `0x` prefix. An unregistered hash is a 200 with
/// `exists: false`, never an error.
pub async fn check_hash(
    State(state): State<AppState>,
    Json(req): Json<CheckHashRequest>,
) -> Result<Json<CheckHashResponse>, ApiError> {
    let fingerprint = Fingerprint::from_str(&req.hash).map_err(ApiError::from)?;
    let status = state.orchestrator.check_fingerprint(fingerprint).await?;
    Ok(Json(CheckHashResponse {
        hash: fingerprint.to_hex(),
        status,
    }))
}

/// GET /api/v1/hashes/:hash/approvals
pub async fn approvals_by_hash(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<ApprovalsResponse>, ApiError> {
    let fingerprint = Fingerprint::from_str(&hash).map_err(ApiError::from)?;
    let approvals = state.orchestrator.client().approvals(fingerprint).await?;
    Ok(Json(ApprovalsResponse {
        hash: fingerprint.to_hex(),
        approvals,
    }))
}

/// GET /api/v1/hashes/:hash/audit-log
pub async fn audit_log_by_hash(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<AuditLogResponse>, ApiError> {
    let fingerprint = Fingerprint::from_str(&hash).map_err(ApiError::from)?;
    let entries = state.orchestrator.client().audit_log(fingerprint).await?;
    Ok(Json(AuditLogResponse {
        hash: fingerprint.to_hex(),
        entries,
    }))
}

/// GET /api/v1/registry/health
///
/// Registry connectivity report. Always 200; disconnected mode shows up
/// as `connected: false`.
pub async fn registry_health(State(state): State<AppState>) -> Json<RegistryHealth> {
    Json(state.orchestrator.client().health_check().await)
}

/// GET /health
pub async fn health_check() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "healthy",
            "service": "dealsign-registry",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}
