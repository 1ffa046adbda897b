/// Errors returned by the credit gate and ledgers
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    /// Workspace balance is zero or negative
    #[error("insufficient credits for workspace {workspace_id}")]
    InsufficientCredits {
        /// Workspace that was refused
        workspace_id: String,
    },

    /// HTTP transport or connection error
    #[error("ledger request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Billing service returned a non-success status
    #[error("ledger API error ({status}): {message}")]
    Api {
        /// HTTP status from the billing service
        status: u16,
        /// Error message from the response body
        message: String,
    },
}
