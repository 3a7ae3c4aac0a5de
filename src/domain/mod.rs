//! Domain models for the document registry.

mod registry;
mod types;

pub use registry::*;
pub use types::*;
