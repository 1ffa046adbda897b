//! Metering reverse proxy
//!
//! Authenticates the caller, routes the request to the configured upstream,
//! relays the response untouched and charges the workspace for the usage
//! the upstream reports. Streamed bodies are metered while they are relayed.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod error;
pub mod handler;
pub mod meter;
pub mod registry;
pub mod relay;
pub mod sse;
pub mod state;
pub mod transform;
pub mod upstream;
pub mod usage;

pub use error::ProxyError;
pub use handler::{Endpoint, proxy_router};
pub use meter::{MeterContext, UsageMeter};
pub use registry::{ModelRegistry, ModelRoute};
pub use sse::StreamDecoder;
pub use state::ProxyState;
