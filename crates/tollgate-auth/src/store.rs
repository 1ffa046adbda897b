use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use jiff::Timestamp;
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use tollgate_config::StaticKeysConfig;
use tollgate_core::ApiKeyRecord;

use crate::AuthError;

/// External store that owns API key records
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Look up a key by its exact secret
    ///
    /// `Ok(None)` means no key matches.
    async fn lookup(&self, secret: &str) -> Result<Option<ApiKeyRecord>, AuthError>;

    /// Record that a key was used
    ///
    /// Best effort: callers log failures and carry on.
    async fn touch(&self, key_id: &str, at: Timestamp) -> Result<(), AuthError>;
}

/// Key store backed by the inline `[[auth.keys]]` table
///
/// Secrets are held only as SHA-256 digests.
#[derive(Debug, Default)]
pub struct StaticKeyStore {
    keys: HashMap<String, ApiKeyRecord>,
    last_used: DashMap<String, Timestamp>,
}

impl StaticKeyStore {
    /// Build from the `[auth]` section
    pub fn from_config(config: &StaticKeysConfig) -> Self {
        let keys = config
            .keys
            .iter()
            .map(|key| {
                let record = ApiKeyRecord {
                    id: key.id.clone(),
                    workspace_id: key.workspace_id.clone(),
                };
                (sha256_hex(key.secret.expose_secret()), record)
            })
            .collect();

        Self {
            keys,
            last_used: DashMap::new(),
        }
    }

    /// Add a key (used by tests and embedded setups)
    #[must_use]
    pub fn with_key(mut self, secret: &str, record: ApiKeyRecord) -> Self {
        self.keys.insert(sha256_hex(secret), record);
        self
    }

    /// When a key was last used, if ever
    pub fn last_used(&self, key_id: &str) -> Option<Timestamp> {
        self.last_used.get(key_id).map(|entry| *entry)
    }
}

#[async_trait]
impl KeyStore for StaticKeyStore {
    async fn lookup(&self, secret: &str) -> Result<Option<ApiKeyRecord>, AuthError> {
        Ok(self.keys.get(&sha256_hex(secret)).cloned())
    }

    async fn touch(&self, key_id: &str, at: Timestamp) -> Result<(), AuthError> {
        self.last_used.insert(key_id.to_owned(), at);
        Ok(())
    }
}

/// SHA-256 hex digest of a secret
pub(crate) fn sha256_hex(input: &str) -> String {
    Sha256::digest(input.as_bytes())
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ApiKeyRecord {
        ApiKeyRecord {
            id: "key_1".to_owned(),
            workspace_id: "wrk_1".to_owned(),
        }
    }

    #[tokio::test]
    async fn lookup_is_exact_match() {
        let store = StaticKeyStore::default().with_key("sk-caller", record());

        assert_eq!(store.lookup("sk-caller").await.unwrap(), Some(record()));
        assert_eq!(store.lookup("sk-caller ").await.unwrap(), None);
        assert_eq!(store.lookup("sk-CALLER").await.unwrap(), None);
    }

    #[tokio::test]
    async fn touch_records_last_use() {
        let store = StaticKeyStore::default().with_key("sk-caller", record());
        let now = Timestamp::now();

        assert!(store.last_used("key_1").is_none());
        store.touch("key_1", now).await.unwrap();
        assert_eq!(store.last_used("key_1"), Some(now));
    }

    #[test]
    fn sha256_hex_is_lowercase_hex() {
        let digest = sha256_hex("abc");
        assert_eq!(digest, "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
    }
}
