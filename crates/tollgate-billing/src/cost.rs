//! Integer pricing
//!
//! Config rates are USD per million tokens. They are converted once, at
//! startup, to micro-cents per million tokens so every per-request cost is
//! computed with integer arithmetic.

use tollgate_config::CostTable;

use crate::types::TokenUsage;

/// One dollar in micro-cents (100 cents × 1,000,000)
pub const MICRO_CENTS_PER_USD: f64 = 100_000_000.0;

const TOKENS_PER_UNIT: u128 = 1_000_000;

/// Rates in micro-cents per million tokens
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pricing {
    pub input: u64,
    pub output: u64,
    pub reasoning: u64,
    pub cache_read: u64,
    pub cache_write: u64,
}

impl Pricing {
    /// Pricing that charges nothing
    pub const FREE: Self = Self {
        input: 0,
        output: 0,
        reasoning: 0,
        cache_read: 0,
        cache_write: 0,
    };

    /// Cost of a usage in micro-cents, rounded half up
    pub fn cost(&self, usage: &TokenUsage) -> i64 {
        let scaled = [
            (usage.input, self.input),
            (usage.output, self.output),
            (usage.reasoning, self.reasoning),
            (usage.cache_read, self.cache_read),
            (usage.cache_write, self.cache_write),
        ]
        .iter()
        .map(|&(tokens, rate)| u128::from(tokens) * u128::from(rate))
        .sum::<u128>();

        let micro_cents = (scaled + TOKENS_PER_UNIT / 2) / TOKENS_PER_UNIT;
        i64::try_from(micro_cents).unwrap_or(i64::MAX)
    }
}

impl From<&CostTable> for Pricing {
    fn from(table: &CostTable) -> Self {
        let [input, output, reasoning, cache_read, cache_write] = table.rates().map(usd_to_micro_cents);
        Self {
            input,
            output,
            reasoning,
            cache_read,
            cache_write,
        }
    }
}

/// Rates are validated finite and non-negative at config load
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn usd_to_micro_cents(usd: f64) -> u64 {
    (usd * MICRO_CENTS_PER_USD).round() as u64
}
