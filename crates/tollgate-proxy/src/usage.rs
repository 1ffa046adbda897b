//! Usage payload detection and normalization
//!
//! Two shapes are recognized:
//!
//! - inline usage (`prompt_tokens` / `completion_tokens`), attached to the
//!   final chat completion chunk or to a buffered chat completion body
//! - completed-event usage (`input_tokens` / `output_tokens`), nested under
//!   a `response.completed` event or at the top of a buffered response body
//!
//! In both shapes the top-level input and output counts include the cached,
//! cache-write and reasoning details, so those are subtracted to keep
//! categories disjoint.

use serde::Deserialize;
use serde_json::Value;
use tollgate_billing::TokenUsage;

/// Terminal event type carrying completed-event usage
const RESPONSE_COMPLETED: &str = "response.completed";

#[derive(Debug, Default, Deserialize)]
struct InlineUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    cached_tokens: Option<u64>,
    cache_creation_input_tokens: Option<u64>,
    prompt_tokens_details: Option<PromptTokensDetails>,
    completion_tokens_details: Option<CompletionTokensDetails>,
}

#[derive(Debug, Default, Deserialize)]
struct PromptTokensDetails {
    cached_tokens: Option<u64>,
    cache_write_tokens: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CompletionTokensDetails {
    reasoning_tokens: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CompletedUsage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
    input_tokens_details: Option<InputTokensDetails>,
    output_tokens_details: Option<OutputTokensDetails>,
}

#[derive(Debug, Default, Deserialize)]
struct InputTokensDetails {
    cached_tokens: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct OutputTokensDetails {
    reasoning_tokens: Option<u64>,
}

impl From<InlineUsage> for TokenUsage {
    fn from(usage: InlineUsage) -> Self {
        let prompt = usage.prompt_tokens_details.unwrap_or_default();
        let completion = usage.completion_tokens_details.unwrap_or_default();

        let reasoning = completion.reasoning_tokens.unwrap_or(0);
        let cache_read = usage.cached_tokens.or(prompt.cached_tokens).unwrap_or(0);
        let cache_write = usage
            .cache_creation_input_tokens
            .or(prompt.cache_write_tokens)
            .unwrap_or(0);

        // Prompt and completion counts are totals that include their details
        Self {
            input: usage
                .prompt_tokens
                .unwrap_or(0)
                .saturating_sub(cache_read)
                .saturating_sub(cache_write),
            output: usage.completion_tokens.unwrap_or(0).saturating_sub(reasoning),
            reasoning,
            cache_read,
            cache_write,
        }
    }
}

impl From<CompletedUsage> for TokenUsage {
    fn from(usage: CompletedUsage) -> Self {
        let cached = usage
            .input_tokens_details
            .and_then(|details| details.cached_tokens)
            .unwrap_or(0);
        let reasoning = usage
            .output_tokens_details
            .and_then(|details| details.reasoning_tokens)
            .unwrap_or(0);

        Self {
            input: usage.input_tokens.unwrap_or(0).saturating_sub(cached),
            output: usage.output_tokens.unwrap_or(0).saturating_sub(reasoning),
            reasoning,
            cache_read: cached,
            cache_write: 0,
        }
    }
}

/// Extract usage from one parsed stream event or a buffered response body
///
/// Returns `None` when the value carries no usage object.
pub fn extract(value: &Value) -> Option<TokenUsage> {
    if value.get("type").and_then(Value::as_str) == Some(RESPONSE_COMPLETED) {
        let usage = value.get("response")?.get("usage")?;
        return parse_completed(usage);
    }

    let usage = value.get("usage").filter(|usage| usage.is_object())?;

    if usage.get("input_tokens").is_some() && usage.get("prompt_tokens").is_none() {
        parse_completed(usage)
    } else {
        parse_inline(usage)
    }
}

fn parse_inline(usage: &Value) -> Option<TokenUsage> {
    match InlineUsage::deserialize(usage) {
        Ok(usage) => Some(usage.into()),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring malformed inline usage");
            None
        }
    }
}

fn parse_completed(usage: &Value) -> Option<TokenUsage> {
    if !usage.is_object() {
        return None;
    }

    match CompletedUsage::deserialize(usage) {
        Ok(usage) => Some(usage.into()),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring malformed completed-event usage");
            None
        }
    }
}
