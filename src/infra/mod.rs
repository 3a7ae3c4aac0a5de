//! Infrastructure layer: error taxonomy, retry policy, and the seams to
//! the external contract store.

mod error;
mod retry;
mod store;

pub use error::*;
pub use retry::{Retry, RetryConfig, RetryResult};
pub use store::{
    ActivityEntry, ActivityKind, ActivityLog, ContractRecord, ContractStore,
    InMemoryActivityLog, InMemoryContractStore,
};

#[cfg(test)]
pub use store::MockContractStore;
