use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use thiserror::Error;
use tollgate_auth::AuthError;
use tollgate_billing::BillingError;
use tollgate_core::HttpError;

/// Errors that end a proxied request before a response is relayed
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Missing, malformed or unknown caller credential
    #[error(transparent)]
    Auth(AuthError),

    /// Workspace balance is not positive
    #[error(transparent)]
    Credits(BillingError),

    /// Requested model is not in the registry
    #[error("model not supported: {model}")]
    Model { model: String },

    /// Request body is not a JSON object with a `model` string
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Upstream could not be reached or answered with a server error
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Unexpected failure, including collaborator outages
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<AuthError> for ProxyError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::LookupFailed(_) | AuthError::Api { .. } => Self::Internal(error.into()),
            other => Self::Auth(other),
        }
    }
}

impl From<BillingError> for ProxyError {
    fn from(error: BillingError) -> Self {
        match error {
            BillingError::InsufficientCredits { .. } => Self::Credits(error),
            other => Self::Internal(other.into()),
        }
    }
}

impl HttpError for ProxyError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Auth(_) | Self::Credits(_) => StatusCode::UNAUTHORIZED,
            Self::Model { .. } | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::Auth(_) => "auth_error",
            Self::Credits(_) => "credits_error",
            Self::Model { .. } => "model_error",
            Self::InvalidRequest(_) => "invalid_request_error",
            Self::Upstream(_) => "upstream_error",
            Self::Internal(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Auth(AuthError::MissingKey) => "Missing API key.".to_owned(),
            Self::Auth(_) => "Invalid API key.".to_owned(),
            Self::Credits(_) => "Insufficient balance. Add credits to your workspace to continue.".to_owned(),
            Self::Model { model } => format!("Model {model} is not supported."),
            Self::InvalidRequest(reason) => format!("Invalid request: {reason}."),
            Self::Upstream(_) => "Upstream provider error.".to_owned(),
            Self::Internal(_) => "An internal error occurred.".to_owned(),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, error_type = self.error_type(), "request failed");
        } else {
            tracing::debug!(error = %self, error_type = self.error_type(), "request rejected");
        }

        (status, Json(self.error_body())).into_response()
    }
}
