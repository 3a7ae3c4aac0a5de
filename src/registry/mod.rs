//! Document registry: ledger backends and the client facade.

mod client;
pub mod eth;
mod ledger;
mod state;

pub use client::RegistryClient;
pub use eth::{EthLedger, EthLedgerConfig};
pub use ledger::DocumentLedger;
pub use state::{InMemoryLedger, RegistryState};

#[cfg(test)]
pub use ledger::MockDocumentLedger;
