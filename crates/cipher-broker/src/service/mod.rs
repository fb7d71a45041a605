//! Application services built on the worker port.

pub mod policy;

pub use policy::{extract_ciphertext, PolicyError, SelectiveEncryptionPolicy, CIPHERTEXT_FIELD};
