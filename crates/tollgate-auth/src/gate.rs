use std::sync::Arc;

use http::HeaderMap;
use http::header::AUTHORIZATION;
use tollgate_core::{ApiKeyRecord, Caller};

use crate::{AuthError, KeyStore};

/// Resolves the caller's bearer token to a key record
#[derive(Clone)]
pub struct AuthGate {
    store: Arc<dyn KeyStore>,
}

impl AuthGate {
    /// Create a gate over the given key store
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self { store }
    }

    /// The underlying key store
    pub fn store(&self) -> &Arc<dyn KeyStore> {
        &self.store
    }

    /// Require a valid bearer token
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<ApiKeyRecord, AuthError> {
        let token = bearer_token(headers)?;

        self.store.lookup(token).await?.ok_or(AuthError::InvalidKey)
    }

    /// Identify the caller for a model
    ///
    /// When the model does not require auth, any failure degrades to an
    /// anonymous caller and the request carries no billing identity.
    pub async fn identify(&self, headers: &HeaderMap, requires_auth: bool) -> Result<Caller, AuthError> {
        match self.authenticate(headers).await {
            Ok(key) => Ok(Caller::Authenticated(key)),
            Err(e) if requires_auth => Err(e),
            Err(e) => {
                tracing::debug!(error = %e, "proceeding anonymously on public model");
                Ok(Caller::Anonymous)
            }
        }
    }
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate").finish_non_exhaustive()
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers.get(AUTHORIZATION).ok_or(AuthError::MissingKey)?;
    let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;

    let (scheme, token) = value.split_once(' ').ok_or(AuthError::MalformedHeader)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedHeader);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }

    Ok(token)
}
