//! Caller authentication for tollgate
//!
//! Resolves bearer tokens against an external key store. The store is a
//! collaborator behind the [`KeyStore`] trait: inline keys from config or
//! the remote account service.

#![allow(clippy::missing_errors_doc)]

mod error;
mod gate;
mod remote;
mod store;

pub use error::AuthError;
pub use gate::{AuthGate, bearer_token};
pub use remote::RemoteKeyStore;
pub use store::{KeyStore, StaticKeyStore};

use std::sync::Arc;

use tollgate_config::KeyStoreConfig;

/// Build the configured key store
pub fn key_store_from_config(config: &KeyStoreConfig) -> anyhow::Result<Arc<dyn KeyStore>> {
    Ok(match config {
        KeyStoreConfig::Static(config) => Arc::new(StaticKeyStore::from_config(config)),
        KeyStoreConfig::Remote(config) => Arc::new(RemoteKeyStore::from_config(config)?),
    })
}
