//! Shared types for the tollgate metering proxy

#![allow(clippy::must_use_candidate)]

mod context;
mod error;
pub mod headers;

pub use context::{ApiKeyRecord, Caller};
pub use error::HttpError;
pub use headers::{HeaderRename, apply_renames, relay_response_headers, scrub_request_headers};
