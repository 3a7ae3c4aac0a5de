//! Cryptographic utilities: document fingerprinting.

mod fingerprint;

pub use fingerprint::{fingerprint_bytes, fingerprint_file, FingerprintHasher};
