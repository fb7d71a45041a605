//! # Cipher Gateway Test Suite
//!
//! End-to-end flows that spawn real `/bin/sh` worker processes.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── support.rs              # Stub workers, request helpers
//! └── integration/
//!     ├── broker_flows.rs     # ProcessWorker + SelectiveEncryptionPolicy
//!     └── http_flows.rs       # Full router, HTTP contract
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p cipher-tests
//! cargo test -p cipher-tests integration::http_flows::
//! ```

#![cfg(unix)]

pub mod integration;
