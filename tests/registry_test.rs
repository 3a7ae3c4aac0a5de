//! End-to-end registry protocol tests over the in-memory ledger.
//!
//! These exercise the full client path: state machine transitions,
//! audit ordering, timestamp conventions, and disconnected mode.

use std::sync::Arc;

use dealsign_registry::crypto::fingerprint_bytes;
use dealsign_registry::registry::DocumentLedger;
use dealsign_registry::{
    Fingerprint, InMemoryLedger, RegistryClient, RegistryError, RegistryEvent,
};

fn client_with_ledger() -> (RegistryClient, Arc<InMemoryLedger>) {
    let ledger = Arc::new(InMemoryLedger::new());
    (RegistryClient::new(ledger.clone()), ledger)
}

#[tokio::test]
async fn register_then_verify_round_trip() {
    let (client, _) = client_with_ledger();
    let fp = fingerprint_bytes(b"master services agreement");

    let receipt = client.register(fp, "contract-1").await.unwrap();
    assert!(receipt.block_number > 0);
    assert!(receipt.timestamp_ms > 0);

    let status = client.verify(fp).await.unwrap();
    assert!(status.exists);
    assert!(!status.registered_by.is_zero());
    // Ledger reports seconds; the client converts to milliseconds.
    assert_eq!(status.timestamp_ms % 1000, 0);
}

#[tokio::test]
async fn registration_is_at_most_once() {
    let (client, ledger) = client_with_ledger();
    let fp = fingerprint_bytes(b"doc");

    client.register(fp, "contract-1").await.unwrap();
    let original = client.verify(fp).await.unwrap();

    let err = client.register(fp, "contract-2").await.unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyRegistered(f) if f == fp));

    // The original registration is untouched.
    let after = client.verify(fp).await.unwrap();
    assert_eq!(after.registered_by, original.registered_by);
    assert_eq!(after.timestamp_ms, original.timestamp_ms);

    // And no second event was emitted.
    let registrations = ledger
        .events()
        .iter()
        .filter(|e| matches!(e, RegistryEvent::ContractRegistered { .. }))
        .count();
    assert_eq!(registrations, 1);
}

#[tokio::test]
async fn approval_requires_registration() {
    let (client, ledger) = client_with_ledger();
    let fp = fingerprint_bytes(b"unregistered");

    let err = client.log_approval(fp, "LEGAL", "ok").await.unwrap_err();
    assert!(matches!(err, RegistryError::NotRegistered(f) if f == fp));

    // The failed approval left nothing behind.
    assert!(client.approvals(fp).await.unwrap().is_empty());
    assert!(client.audit_log(fp).await.unwrap().is_empty());
    assert!(ledger.events().is_empty());
}

#[tokio::test]
async fn audit_log_preserves_operation_order() {
    let (client, _) = client_with_ledger();
    let fp = fingerprint_bytes(b"doc");

    client.register(fp, "contract-1").await.unwrap();
    client.log_approval(fp, "LEGAL", "reviewed").await.unwrap();
    client.log_approval(fp, "FINANCE", "budget ok").await.unwrap();
    client.log_approval(fp, "ADMIN", "countersigned").await.unwrap();

    let audit = client.audit_log(fp).await.unwrap();
    assert_eq!(
        audit,
        vec![
            "Contract registered",
            "Approved by LEGAL",
            "Approved by FINANCE",
            "Approved by ADMIN",
        ]
    );
}

#[tokio::test]
async fn duplicate_approvals_are_appended() {
    let (client, _) = client_with_ledger();
    let fp = fingerprint_bytes(b"doc");

    client.register(fp, "contract-1").await.unwrap();
    client.log_approval(fp, "LEGAL", "first pass").await.unwrap();
    client.log_approval(fp, "LEGAL", "second pass").await.unwrap();

    let approvals = client.approvals(fp).await.unwrap();
    assert_eq!(approvals.len(), 2);
    assert_eq!(approvals[0].role, "LEGAL");
    assert_eq!(approvals[1].role, "LEGAL");
    assert_eq!(approvals[0].comment, "first pass");
    assert_eq!(approvals[1].comment, "second pass");
}

#[tokio::test]
async fn verify_absent_fingerprint_is_not_an_error() {
    let (client, _) = client_with_ledger();

    let status = client
        .verify(Fingerprint::from_bytes([0xee; 32]))
        .await
        .unwrap();
    assert!(!status.exists);
    assert!(status.registered_by.is_zero());
    assert_eq!(status.timestamp_ms, 0);
}

#[tokio::test]
async fn distinct_documents_do_not_interfere() {
    let (client, _) = client_with_ledger();
    let fp_a = fingerprint_bytes(b"contract a");
    let fp_b = fingerprint_bytes(b"contract b");

    client.register(fp_a, "contract-a").await.unwrap();
    client.register(fp_b, "contract-b").await.unwrap();
    client.log_approval(fp_a, "LEGAL", "").await.unwrap();

    assert_eq!(client.approvals(fp_a).await.unwrap().len(), 1);
    assert!(client.approvals(fp_b).await.unwrap().is_empty());
    assert_eq!(client.audit_log(fp_b).await.unwrap(), vec!["Contract registered"]);
}

#[tokio::test]
async fn approval_timestamps_convert_to_millis() {
    let (client, ledger) = client_with_ledger();
    let fp = fingerprint_bytes(b"doc");

    client.register(fp, "contract-1").await.unwrap();
    client.log_approval(fp, "LEGAL", "ok").await.unwrap();

    let raw = ledger.approvals(fp).await.unwrap();
    let converted = client.approvals(fp).await.unwrap();
    assert_eq!(converted[0].timestamp_ms, raw[0].timestamp_secs as i64 * 1000);
}

#[tokio::test]
async fn health_reports_connected_ledger() {
    let (client, _) = client_with_ledger();
    let health = client.health_check().await;
    assert!(health.connected);
    assert!(health.network_name.is_some());
    assert!(health.block_height.is_some());
}

#[tokio::test]
async fn disconnected_mode_degrades_gracefully() {
    let client = RegistryClient::disconnected();
    let fp = fingerprint_bytes(b"doc");

    // Writes and reads fail fast with a typed error.
    assert!(matches!(
        client.register(fp, "c1").await.unwrap_err(),
        RegistryError::NotConnected
    ));
    assert!(matches!(
        client.verify(fp).await.unwrap_err(),
        RegistryError::NotConnected
    ));

    // Health never errors.
    let health = client.health_check().await;
    assert!(!health.connected);
}
