//! End-to-end flows against real worker processes.

pub mod broker_flows;
pub mod http_flows;
