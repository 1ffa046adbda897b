use http::StatusCode;

/// Trait for domain errors that can be converted to HTTP responses
///
/// Gate and pipeline errors implement this; the handler boundary turns
/// them into a status plus the `{"error":{"message":..}}` body.
pub trait HttpError: std::error::Error {
    /// HTTP status code for this error
    fn status_code(&self) -> StatusCode;

    /// Machine-readable error kind (e.g. `auth_error`)
    fn error_type(&self) -> &str;

    /// Message safe to expose to API consumers
    fn client_message(&self) -> String;

    /// JSON error envelope returned to the caller
    fn error_body(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "message": self.client_message(),
            }
        })
    }
}
