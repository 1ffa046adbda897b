use std::sync::Arc;

use tollgate_config::MountConfig;
use tollgate_core::Caller;

use crate::error::BillingError;
use crate::ledger::Ledger;

/// Refuses paid requests from workspaces without a positive balance
///
/// The check is a plain read. It is not a reservation, so concurrent
/// requests may all pass and drive the balance negative once charged.
#[derive(Clone)]
pub struct CreditGate {
    ledger: Arc<dyn Ledger>,
}

impl CreditGate {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        &self.ledger
    }

    /// Workspace whose balance must be read, or `None` when the check is skipped
    pub fn workspace_to_check<'a>(caller: &'a Caller, requires_auth: bool, mount: &MountConfig) -> Option<&'a str> {
        if !requires_auth || !mount.enforce_credits {
            return None;
        }

        caller.workspace_id().filter(|workspace_id| !mount.is_free(workspace_id))
    }

    /// Fail with [`BillingError::InsufficientCredits`] when the balance is not positive
    pub async fn check(&self, caller: &Caller, requires_auth: bool, mount: &MountConfig) -> Result<(), BillingError> {
        let Some(workspace_id) = Self::workspace_to_check(caller, requires_auth, mount) else {
            return Ok(());
        };

        let balance = self.ledger.balance(workspace_id).await?;
        if balance <= 0 {
            tracing::debug!(workspace_id, balance, "rejecting request on non-positive balance");
            return Err(BillingError::InsufficientCredits {
                workspace_id: workspace_id.to_owned(),
            });
        }

        Ok(())
    }
}

impl std::fmt::Debug for CreditGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreditGate").finish_non_exhaustive()
    }
}
