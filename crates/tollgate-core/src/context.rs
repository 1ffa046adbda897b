use serde::{Deserialize, Serialize};

/// API key as known to the external key store
///
/// Immutable once created; looked up by its opaque secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyRecord {
    /// Key record ID
    pub id: String,
    /// Workspace the key bills against
    pub workspace_id: String,
}

/// Identity attached to a proxied request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    /// A bearer token resolved to a key record
    Authenticated(ApiKeyRecord),
    /// No usable credential on a model that does not require one
    Anonymous,
}

impl Caller {
    /// The resolved key, if any
    pub const fn key(&self) -> Option<&ApiKeyRecord> {
        match self {
            Self::Authenticated(key) => Some(key),
            Self::Anonymous => None,
        }
    }

    /// Workspace to bill, if any
    pub fn workspace_id(&self) -> Option<&str> {
        self.key().map(|key| key.workspace_id.as_str())
    }
}
