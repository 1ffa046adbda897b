//! Prepaid balances, usage records and pricing for tollgate
//!
//! The ledger is an external collaborator behind the [`Ledger`] trait. The
//! debit and the usage record insert are one transaction on the ledger side.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

pub mod client;
pub mod cost;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod memory;
pub mod types;

use std::sync::Arc;

pub use client::RemoteLedger;
pub use cost::Pricing;
pub use error::BillingError;
pub use gate::CreditGate;
pub use ledger::Ledger;
pub use memory::MemoryLedger;
pub use types::{BalanceAccount, Charge, TokenUsage, UsageRecord};

use tollgate_config::LedgerConfig;

/// Build the configured ledger
pub fn ledger_from_config(config: &LedgerConfig) -> anyhow::Result<Arc<dyn Ledger>> {
    Ok(match config {
        LedgerConfig::Memory(config) => Arc::new(MemoryLedger::from_config(config)),
        LedgerConfig::Remote(config) => Arc::new(RemoteLedger::from_config(config)?),
    })
}
