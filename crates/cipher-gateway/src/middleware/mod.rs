//! Middleware stack for the cipher gateway.
//!
//! Layer order: Request → CORS → Tracing → BodyLimit → Auth (encryption routes only) → Handler

pub mod auth;
pub mod cors;
pub mod metrics;
pub mod tracing;

pub use auth::{constant_time_compare, AuthLayer};
pub use cors::create_cors_layer;
pub use metrics::GatewayMetrics;
pub use self::tracing::{TracingLayer, REQUEST_ID_HEADER};
