//! Ledger wrapper that counts calls

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tollgate_billing::{BillingError, Charge, Ledger, MemoryLedger, UsageRecord};

/// [`MemoryLedger`] that counts balance reads and charges
#[derive(Debug, Default)]
pub struct CountingLedger {
    inner: MemoryLedger,
    balance_reads: AtomicU32,
    charges: AtomicU32,
}

impl CountingLedger {
    pub fn with_balance(workspace_id: &str, balance: i64) -> Self {
        Self {
            inner: MemoryLedger::new().with_balance(workspace_id, balance),
            ..Self::default()
        }
    }

    pub fn balance_reads(&self) -> u32 {
        self.balance_reads.load(Ordering::Relaxed)
    }

    pub fn charges(&self) -> u32 {
        self.charges.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Ledger for CountingLedger {
    async fn balance(&self, workspace_id: &str) -> Result<i64, BillingError> {
        self.balance_reads.fetch_add(1, Ordering::Relaxed);
        self.inner.balance(workspace_id).await
    }

    async fn charge(&self, charge: Charge) -> Result<UsageRecord, BillingError> {
        self.charges.fetch_add(1, Ordering::Relaxed);
        self.inner.charge(charge).await
    }

    async fn records(&self, workspace_id: &str) -> Result<Vec<UsageRecord>, BillingError> {
        self.inner.records(workspace_id).await
    }
}

/// Poll until a workspace has `count` usage records or two seconds pass
pub async fn wait_for_records(ledger: &dyn Ledger, workspace_id: &str, count: usize) -> Vec<UsageRecord> {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(2);
    loop {
        let records = ledger.records(workspace_id).await.unwrap();
        if records.len() >= count || tokio::time::Instant::now() >= deadline {
            return records;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}
