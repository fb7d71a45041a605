//! Adapters connecting the broker to the operating system.

pub mod process;

pub use process::ProcessWorker;
