use async_trait::async_trait;

use crate::error::BillingError;
use crate::types::{Charge, UsageRecord};

/// External store that owns balance rows and usage records
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Current balance in micro-cents; unknown workspaces read as 0
    async fn balance(&self, workspace_id: &str) -> Result<i64, BillingError>;

    /// Debit the workspace and append the usage record in one transaction
    ///
    /// Concurrent charges against one workspace serialize on its balance
    /// row. The balance may go negative.
    async fn charge(&self, charge: Charge) -> Result<UsageRecord, BillingError>;

    /// Usage records written for a workspace, oldest first
    async fn records(&self, workspace_id: &str) -> Result<Vec<UsageRecord>, BillingError>;
}
