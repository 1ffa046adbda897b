/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization` header on the request
    #[error("missing API key")]
    MissingKey,

    /// `Authorization` header present but not a bearer token
    #[error("malformed authorization header")]
    MalformedHeader,

    /// Token did not match any key record
    #[error("invalid API key")]
    InvalidKey,

    /// HTTP request to the key store failed
    #[error("key lookup failed: {0}")]
    LookupFailed(#[from] reqwest::Error),

    /// Key store returned a non-success response
    #[error("key store error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the key store
        message: String,
    },
}
