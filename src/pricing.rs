/*!
 * Token estimation and cost accounting.
 *
 * Token counts are heuristic approximations, not an exact tokenizer:
 * callers must not rely on them matching provider billing. Costs are
 * linear in the estimated token counts using a static per-provider
 * pricing table (USD per million tokens).
 */

use crate::app_config::TranslationProvider;

/// Per-provider pricing, USD per one million tokens
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    /// Input (prompt) price per 1M tokens
    pub input_per_million: f64,
    /// Output (completion) price per 1M tokens
    pub output_per_million: f64,
}

impl Pricing {
    /// Static pricing table. The bulk backend is free; paid entries
    /// carry the upstream list prices.
    pub fn for_provider(provider: TranslationProvider) -> Self {
        match provider {
            TranslationProvider::Bulk => Self { input_per_million: 0.0, output_per_million: 0.0 },
            TranslationProvider::DeepSeek => {
                Self { input_per_million: 0.14, output_per_million: 0.28 }
            }
            TranslationProvider::Zhipu => {
                Self { input_per_million: 0.5, output_per_million: 0.5 }
            }
            TranslationProvider::OpenRouter => {
                Self { input_per_million: 0.14, output_per_million: 0.28 }
            }
            TranslationProvider::Kimi => {
                Self { input_per_million: 1.2, output_per_million: 1.2 }
            }
            TranslationProvider::Gpt => {
                Self { input_per_million: 2.0, output_per_million: 8.0 }
            }
        }
    }
}

/// Whether a character falls in the CJK Unified Ideographs block
pub fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// Proportion of CJK characters in the text, 0.0 when empty
pub fn cjk_ratio(text: &str) -> f64 {
    let mut total = 0usize;
    let mut cjk = 0usize;
    for c in text.chars() {
        total += 1;
        if is_cjk(c) {
            cjk += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        cjk as f64 / total as f64
    }
}

/// Estimate the token count of a text.
///
/// CJK-dominant text (more than 30% ideographs) counts roughly one token
/// per character; everything else roughly one token per four characters,
/// with a floor of one token for non-empty text.
pub fn estimate_tokens(text: &str) -> u64 {
    if text.is_empty() {
        return 0;
    }

    let chars = text.chars().count() as u64;
    if cjk_ratio(text) > 0.3 {
        chars
    } else {
        (chars / 4).max(1)
    }
}

/// Estimate the cost in USD of a translation run
pub fn estimate_cost(input_tokens: u64, output_tokens: u64, provider: TranslationProvider) -> f64 {
    let pricing = Pricing::for_provider(provider);
    let input_cost = (input_tokens as f64 / 1_000_000.0) * pricing.input_per_million;
    let output_cost = (output_tokens as f64 / 1_000_000.0) * pricing.output_per_million;
    input_cost + output_cost
}

/// Shared per-task accumulators, mutated under a single lock by any worker
#[derive(Debug, Default, Clone, Copy)]
pub struct UsageCounters {
    /// Cumulative estimated input tokens
    pub input_tokens: u64,
    /// Cumulative estimated output tokens
    pub output_tokens: u64,
    /// Number of completed work items
    pub completed: usize,
}

impl UsageCounters {
    /// Cost of the accumulated usage for the given provider
    pub fn cost(&self, provider: TranslationProvider) -> f64 {
        estimate_cost(self.input_tokens, self.output_tokens, provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens_empty_should_be_zero() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn test_estimate_tokens_latin_uses_quarter_ratio() {
        let text = "a".repeat(4000);
        assert_eq!(estimate_tokens(&text), 1000);
    }

    #[test]
    fn test_estimate_tokens_cjk_is_per_character() {
        let text = "中".repeat(100);
        assert_eq!(estimate_tokens(&text), 100);
    }

    #[test]
    fn test_estimate_tokens_short_latin_has_floor_of_one() {
        assert_eq!(estimate_tokens("ab"), 1);
    }

    #[test]
    fn test_bulk_provider_is_free() {
        assert_eq!(estimate_cost(5_000_000, 5_000_000, TranslationProvider::Bulk), 0.0);
    }

    #[test]
    fn test_gpt_cost_is_linear_in_both_counts() {
        let cost = estimate_cost(1_000_000, 1_000_000, TranslationProvider::Gpt);
        assert!((cost - 10.0).abs() < 1e-9);
    }
}
