//! Token estimation and budget fitting.
//!
//! Sizes are estimated with a fixed 4-characters-per-token ratio. The
//! [`TokenEstimator`] trait lets a real tokenizer stand in without changing
//! how [`fit_budget`] trims.
//!
//! # Algorithm
//!
//! 1. Estimate every part; if the total fits the limit, return unchanged.
//! 2. Walk the caller's trim order (most disposable part first). For each
//!    part, compute how many tokens must go (`excess`), keep
//!    `tokens - excess` tokens worth of characters scaled proportionally, but
//!    never fewer than `min_slice` characters.
//! 3. Re-estimate after every cut; stop as soon as the total fits.
//! 4. Repeat the walk while it still makes progress. Parts that are not in
//!    the trim order are never touched.
//! 5. If the total still exceeds the limit, attach a [`BudgetWarning`].
//!
//! # Example
//!
//! ```rust
//! use formtext_core::budget::{fit_budget, TokenBudget};
//!
//! let parts = vec!["short".to_string(), "x".repeat(400)];
//! let out = fit_budget(&parts, &[1], &TokenBudget { limit: 20, min_slice: 50 });
//! assert_eq!(out.parts[0], "short");
//! assert!(out.total_tokens <= 20);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Approximate characters-per-token ratio.
pub const CHARS_PER_TOKEN: usize = 4;

/// Default floor for a trimmed part, in characters.
pub const DEFAULT_MIN_SLICE: usize = 50;

/// Something that can size text in model tokens.
pub trait TokenEstimator {
    fn estimate(&self, text: &str) -> usize;
}

/// `ceil(chars / chars_per_token)`; empty text is zero tokens.
#[derive(Debug, Clone, Copy)]
pub struct CharRatioEstimator {
    pub chars_per_token: usize,
}

impl Default for CharRatioEstimator {
    fn default() -> Self {
        Self {
            chars_per_token: CHARS_PER_TOKEN,
        }
    }
}

impl TokenEstimator for CharRatioEstimator {
    fn estimate(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token.max(1))
    }
}

/// Estimate tokens with the default 4-chars-per-token ratio.
pub fn approx_tokens(text: &str) -> usize {
    CharRatioEstimator::default().estimate(text)
}

/// Budget limits for [`fit_budget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    pub limit: usize,
    pub min_slice: usize,
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self {
            limit: 7500,
            min_slice: DEFAULT_MIN_SLICE,
        }
    }
}

/// One cut applied to a part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trim {
    pub part: usize,
    pub from_chars: usize,
    pub to_chars: usize,
}

/// The budget could not be met after exhausting every trimmable part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetWarning {
    pub limit: usize,
    pub total_tokens: usize,
}

impl fmt::Display for BudgetWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "token budget {} still exceeded after trimming ({} tokens)",
            self.limit, self.total_tokens
        )
    }
}

/// Result of [`fit_budget`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetOutcome {
    pub parts: Vec<String>,
    pub trims: Vec<Trim>,
    pub total_tokens: usize,
    pub warning: Option<BudgetWarning>,
}

/// Fit `parts` into `budget` using the default estimator.
///
/// `trim_order` lists part indices, most disposable first. Indices out of
/// range are ignored.
pub fn fit_budget(parts: &[String], trim_order: &[usize], budget: &TokenBudget) -> BudgetOutcome {
    fit_budget_with(parts, trim_order, budget, &CharRatioEstimator::default())
}

/// Fit `parts` into `budget` using `estimator`.
pub fn fit_budget_with<E: TokenEstimator>(
    parts: &[String],
    trim_order: &[usize],
    budget: &TokenBudget,
    estimator: &E,
) -> BudgetOutcome {
    let mut parts = parts.to_vec();
    let mut tokens: Vec<usize> = parts.iter().map(|p| estimator.estimate(p)).collect();
    let mut total: usize = tokens.iter().sum();
    let mut trims = Vec::new();

    loop {
        if total <= budget.limit {
            break;
        }
        let mut progressed = false;
        for &idx in trim_order {
            if total <= budget.limit {
                break;
            }
            let Some(part) = parts.get(idx) else {
                tracing::debug!(idx, "trim order names a missing part");
                continue;
            };
            let current_tokens = tokens[idx];
            if part.is_empty() || current_tokens == 0 {
                continue;
            }
            let chars = part.chars().count();
            let excess = total - budget.limit;
            let keep_tokens = current_tokens.saturating_sub(excess);
            let scaled = chars * keep_tokens / current_tokens;
            let target = scaled.max(budget.min_slice);
            if target >= chars {
                continue;
            }

            let trimmed = truncate_chars(part, target).to_string();
            let new_tokens = estimator.estimate(&trimmed);
            tracing::warn!(
                part = idx,
                from_chars = chars,
                to_chars = target,
                from_tokens = current_tokens,
                to_tokens = new_tokens,
                "trimmed part to fit token budget"
            );
            total = total - current_tokens + new_tokens;
            tokens[idx] = new_tokens;
            parts[idx] = trimmed;
            trims.push(Trim {
                part: idx,
                from_chars: chars,
                to_chars: target,
            });
            progressed = true;
        }
        if !progressed {
            break;
        }
    }

    let warning = (total > budget.limit).then(|| {
        let warning = BudgetWarning {
            limit: budget.limit,
            total_tokens: total,
        };
        tracing::warn!("{}", warning);
        warning
    });

    BudgetOutcome {
        parts,
        trims,
        total_tokens: total,
        warning,
    }
}

/// Cap `text` at `max_tokens` estimated tokens by cutting characters.
///
/// Returns the text unchanged (borrowed) when it already fits.
pub fn cap_tokens(text: &str, max_tokens: usize) -> &str {
    if approx_tokens(text) <= max_tokens {
        return text;
    }
    truncate_chars(text, max_tokens * CHARS_PER_TOKEN)
}

/// The first `max_chars` characters of `text`, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}
