use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tollgate_config::MemoryLedgerConfig;

use crate::error::BillingError;
use crate::ledger::Ledger;
use crate::types::{BalanceAccount, Charge, UsageRecord};

#[derive(Debug, Default)]
struct Account {
    balance: i64,
    records: Vec<UsageRecord>,
}

/// Process-local ledger
///
/// Each workspace row sits behind its own mutex, which plays the role of
/// the row lock: debit and record append happen while it is held.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    accounts: DashMap<String, Arc<Mutex<Account>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed balances from the `[billing]` section
    pub fn from_config(config: &MemoryLedgerConfig) -> Self {
        let ledger = Self::new();
        for (workspace_id, balance) in &config.balances {
            ledger.set_balance(workspace_id, *balance);
        }
        ledger
    }

    /// Builder-style seeding
    #[must_use]
    pub fn with_balance(self, workspace_id: &str, balance: i64) -> Self {
        self.set_balance(workspace_id, balance);
        self
    }

    /// Overwrite a workspace balance, creating the row if needed
    pub fn set_balance(&self, workspace_id: &str, balance: i64) {
        let account = Account {
            balance,
            records: Vec::new(),
        };
        self.accounts
            .insert(workspace_id.to_owned(), Arc::new(Mutex::new(account)));
    }

    /// Snapshot of a workspace row
    pub async fn account(&self, workspace_id: &str) -> BalanceAccount {
        BalanceAccount {
            workspace_id: workspace_id.to_owned(),
            balance_micro_cents: self.balance_of(workspace_id).await,
        }
    }

    fn row(&self, workspace_id: &str) -> Option<Arc<Mutex<Account>>> {
        self.accounts.get(workspace_id).map(|entry| Arc::clone(entry.value()))
    }

    fn row_or_insert(&self, workspace_id: &str) -> Arc<Mutex<Account>> {
        // Clone the Arc out so the shard guard is released before awaiting
        let entry = self.accounts.entry(workspace_id.to_owned()).or_default();
        Arc::clone(entry.value())
    }

    async fn balance_of(&self, workspace_id: &str) -> i64 {
        match self.row(workspace_id) {
            Some(row) => row.lock().await.balance,
            None => 0,
        }
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn balance(&self, workspace_id: &str) -> Result<i64, BillingError> {
        Ok(self.balance_of(workspace_id).await)
    }

    async fn charge(&self, charge: Charge) -> Result<UsageRecord, BillingError> {
        let row = self.row_or_insert(&charge.workspace_id);
        let mut account = row.lock().await;

        let record = UsageRecord::from(charge);
        account.balance = account.balance.saturating_sub(record.cost_micro_cents);
        account.records.push(record.clone());

        Ok(record)
    }

    async fn records(&self, workspace_id: &str) -> Result<Vec<UsageRecord>, BillingError> {
        Ok(match self.row(workspace_id) {
            Some(row) => row.lock().await.records.clone(),
            None => Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::types::TokenUsage;

    fn usage() -> TokenUsage {
        TokenUsage {
            input: 100,
            output: 50,
            ..TokenUsage::default()
        }
    }

    #[tokio::test]
    async fn unknown_workspace_reads_zero() {
        let ledger = MemoryLedger::new();

        assert_eq!(ledger.balance("wrk_missing").await.unwrap(), 0);
        assert!(ledger.records("wrk_missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn charge_debits_and_records_together() {
        let ledger = MemoryLedger::new().with_balance("wrk_1", 10_000);

        let record = ledger.charge(Charge::new("wrk_1", "gpt-test", usage(), 2_500)).await.unwrap();

        assert_eq!(record.cost_micro_cents, 2_500);
        assert_eq!(ledger.balance("wrk_1").await.unwrap(), 7_500);
        assert_eq!(ledger.records("wrk_1").await.unwrap(), vec![record]);
    }

    #[tokio::test]
    async fn zero_cost_charge_still_records() {
        let ledger = MemoryLedger::new().with_balance("wrk_free", 0);

        ledger.charge(Charge::new("wrk_free", "gpt-test", usage(), 0)).await.unwrap();

        assert_eq!(ledger.balance("wrk_free").await.unwrap(), 0);
        assert_eq!(ledger.records("wrk_free").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn balance_may_go_negative() {
        let ledger = MemoryLedger::new().with_balance("wrk_1", 100);

        ledger.charge(Charge::new("wrk_1", "gpt-test", usage(), 250)).await.unwrap();

        assert_eq!(ledger.account("wrk_1").await.balance_micro_cents, -150);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_charges_lose_no_updates() {
        let ledger = Arc::new(MemoryLedger::new().with_balance("wrk_1", 1_000_000));

        let tasks = (0..64).map(|i| {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move {
                ledger
                    .charge(Charge::new("wrk_1", "gpt-test", usage(), 100 + i))
                    .await
                    .unwrap()
            })
        });
        let records = futures::future::join_all(tasks).await;

        let charged: i64 = records.into_iter().map(|r| r.unwrap().cost_micro_cents).sum();
        assert_eq!(ledger.balance("wrk_1").await.unwrap(), 1_000_000 - charged);
        assert_eq!(ledger.records("wrk_1").await.unwrap().len(), 64);
    }

    #[tokio::test]
    async fn from_config_seeds_balances() {
        let mut balances = IndexMap::new();
        balances.insert("wrk_1".to_owned(), 5_000_000);
        let ledger = MemoryLedger::from_config(&MemoryLedgerConfig { balances });

        assert_eq!(ledger.balance("wrk_1").await.unwrap(), 5_000_000);
    }
}
