use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token counts in the canonical billing categories
///
/// Categories are disjoint: `input` excludes cache reads, `output`
/// excludes reasoning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
    pub reasoning: u64,
    pub cache_read: u64,
    pub cache_write: u64,
}

impl TokenUsage {
    /// Sum over every category
    pub const fn total(&self) -> u64 {
        self.input + self.output + self.reasoning + self.cache_read + self.cache_write
    }
}

/// Workspace balance row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceAccount {
    pub workspace_id: String,
    pub balance_micro_cents: i64,
}

/// A debit to apply together with its usage record
///
/// The ID is assigned up front so a remote ledger can deduplicate retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charge {
    pub id: Uuid,
    pub workspace_id: String,
    pub model_id: String,
    pub usage: TokenUsage,
    pub cost_micro_cents: i64,
    pub at: Timestamp,
}

impl Charge {
    /// New charge stamped with a fresh ID and the current time
    pub fn new(workspace_id: impl Into<String>, model_id: impl Into<String>, usage: TokenUsage, cost_micro_cents: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            workspace_id: workspace_id.into(),
            model_id: model_id.into(),
            usage,
            cost_micro_cents,
            at: Timestamp::now(),
        }
    }
}

/// Append-only audit row, one per metered request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub id: Uuid,
    pub workspace_id: String,
    pub model_id: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub reasoning_tokens: u64,
    pub cache_read_tokens: u64,
    pub cache_write_tokens: u64,
    pub cost_micro_cents: i64,
    pub timestamp: Timestamp,
}

impl From<Charge> for UsageRecord {
    fn from(charge: Charge) -> Self {
        Self {
            id: charge.id,
            workspace_id: charge.workspace_id,
            model_id: charge.model_id,
            input_tokens: charge.usage.input,
            output_tokens: charge.usage.output,
            reasoning_tokens: charge.usage.reasoning,
            cache_read_tokens: charge.usage.cache_read,
            cache_write_tokens: charge.usage.cache_write,
            cost_micro_cents: charge.cost_micro_cents,
            timestamp: charge.at,
        }
    }
}

impl UsageRecord {
    /// Token counts of this record
    pub const fn usage(&self) -> TokenUsage {
        TokenUsage {
            input: self.input_tokens,
            output: self.output_tokens,
            reasoning: self.reasoning_tokens,
            cache_read: self.cache_read_tokens,
            cache_write: self.cache_write_tokens,
        }
    }
}

/// Response from the balance read endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub balance_micro_cents: i64,
}

/// Response listing a workspace's usage records
#[derive(Debug, Clone, Deserialize)]
pub struct RecordsResponse {
    pub records: Vec<UsageRecord>,
}
