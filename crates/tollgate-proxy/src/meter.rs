use std::sync::Arc;
use std::time::Instant;

use jiff::Timestamp;
use tokio_util::task::TaskTracker;
use tollgate_auth::KeyStore;
use tollgate_billing::{Charge, Ledger, Pricing, TokenUsage, UsageRecord};
use tollgate_core::Caller;

/// Everything needed to charge one request once its usage is known
#[derive(Debug, Clone)]
pub struct MeterContext {
    pub model_id: String,
    pub caller: Caller,
    pub pricing: Pricing,
    /// Cost is forced to zero (free-tier workspace or public model)
    pub free: bool,
    pub stream: bool,
    pub started: Instant,
}

impl MeterContext {
    /// Cost of the given usage under this request's pricing
    pub fn cost(&self, usage: &TokenUsage) -> i64 {
        if self.free { 0 } else { self.pricing.cost(usage) }
    }
}

/// Turns observed usage into a ledger charge
#[derive(Clone)]
pub struct UsageMeter {
    ledger: Arc<dyn Ledger>,
    keys: Arc<dyn KeyStore>,
    tasks: TaskTracker,
}

impl UsageMeter {
    pub fn new(ledger: Arc<dyn Ledger>, keys: Arc<dyn KeyStore>) -> Self {
        Self {
            ledger,
            keys,
            tasks: TaskTracker::new(),
        }
    }

    /// Background settlements still owed by dropped streams
    ///
    /// Shared by every clone of the meter. Close and wait on it before the
    /// runtime shuts down so observed usage is not lost.
    pub const fn tasks(&self) -> &TaskTracker {
        &self.tasks
    }

    /// Charge a finished request
    ///
    /// Writes exactly one usage record for an authenticated caller with
    /// observed usage. Anonymous callers are logged but not recorded. A
    /// request without usage is not charged. Ledger failures are logged
    /// and never reach the caller, whose response is already on its way.
    pub async fn settle(&self, context: &MeterContext, usage: Option<TokenUsage>) -> Option<UsageRecord> {
        let duration_ms = u64::try_from(context.started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let Some(usage) = usage else {
            tracing::warn!(
                model = %context.model_id,
                workspace_id = context.caller.workspace_id().unwrap_or_default(),
                stream = context.stream,
                duration_ms,
                "upstream response carried no usage, request not charged"
            );
            return None;
        };

        let cost = context.cost(&usage);

        tracing::info!(
            target: "tollgate::usage",
            model = %context.model_id,
            workspace_id = context.caller.workspace_id().unwrap_or_default(),
            input_tokens = usage.input,
            output_tokens = usage.output,
            reasoning_tokens = usage.reasoning,
            cache_read_tokens = usage.cache_read,
            cache_write_tokens = usage.cache_write,
            cost_micro_cents = cost,
            duration_ms,
            stream = context.stream,
            "usage metered"
        );

        let key = context.caller.key()?;

        let charge = Charge::new(key.workspace_id.as_str(), context.model_id.as_str(), usage, cost);
        let record = match self.ledger.charge(charge).await {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(
                    workspace_id = %key.workspace_id,
                    model = %context.model_id,
                    cost_micro_cents = cost,
                    error = %e,
                    "failed to charge usage"
                );
                return None;
            }
        };

        if let Err(e) = self.keys.touch(&key.id, Timestamp::now()).await {
            tracing::warn!(key_id = %key.id, error = %e, "failed to update key last-used time");
        }

        Some(record)
    }
}

impl std::fmt::Debug for UsageMeter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageMeter")
            .field("pending_settlements", &self.tasks.len())
            .finish_non_exhaustive()
    }
}
