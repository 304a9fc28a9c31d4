//! Embedding provider trait and vector utilities.
//!
//! Defines the [`EmbeddingProvider`] collaborator trait plus the pure helpers
//! used to turn a long document into one vector: overlapping character
//! windows, mean pooling, and L2 normalization.
//!
//! Concrete providers (HTTP services, local models) are supplied by callers;
//! this crate never talks to one directly.

use anyhow::Result;
use async_trait::async_trait;

use crate::error::InputError;
use crate::neighbors::normalize;

/// Default window size for [`window_chars`], in characters.
pub const DEFAULT_WINDOW_CHARS: usize = 4000;

/// Default overlap between consecutive windows, in characters.
pub const DEFAULT_OVERLAP_CHARS: usize = 500;

/// Trait for embedding providers.
///
/// Implementations return one vector per input text, in input order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;
    /// Embed a batch of texts.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Split `text` into windows of at most `max_chars` characters, each
/// starting `max_chars - overlap` characters after the previous one.
///
/// Empty text yields no windows. An `overlap` not smaller than `max_chars`
/// is treated as zero overlap.
///
/// ```rust
/// use formtext_core::embedding::window_chars;
///
/// assert_eq!(window_chars("abcdefgh", 4, 1), vec!["abcd", "defg", "gh"]);
/// ```
pub fn window_chars(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || max_chars == 0 {
        return Vec::new();
    }
    let step = if overlap < max_chars {
        max_chars - overlap
    } else {
        max_chars
    };

    let mut windows = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + max_chars).min(chars.len());
        windows.push(chars[start..end].iter().collect());
        if end >= chars.len() {
            break;
        }
        start += step;
    }
    windows
}

/// Component-wise mean of equally sized vectors.
///
/// # Errors
///
/// [`InputError`] when `vectors` is empty, zero-dimensional, ragged, or
/// holds a non-finite component.
pub fn mean_pool(vectors: &[Vec<f32>]) -> Result<Vec<f32>, InputError> {
    let first = vectors.first().ok_or(InputError::Empty)?;
    let dims = first.len();
    if dims == 0 {
        return Err(InputError::ZeroDimension {
            id: "window 0".to_string(),
        });
    }
    let mut sum = vec![0.0f32; dims];
    for (i, v) in vectors.iter().enumerate() {
        if v.len() != dims {
            return Err(InputError::DimensionMismatch {
                id: format!("window {}", i),
                expected: dims,
                found: v.len(),
            });
        }
        if v.iter().any(|x| !x.is_finite()) {
            return Err(InputError::NonFinite {
                id: format!("window {}", i),
            });
        }
        for (acc, x) in sum.iter_mut().zip(v) {
            *acc += x;
        }
    }
    let n = vectors.len() as f32;
    Ok(sum.into_iter().map(|x| x / n).collect())
}

/// Embed a whole document: window it, embed every window, mean-pool, and
/// L2-normalize.
///
/// Returns `Ok(None)` for empty text.
pub async fn embed_document(
    provider: &dyn EmbeddingProvider,
    text: &str,
    max_chars: usize,
    overlap: usize,
) -> Result<Option<Vec<f32>>> {
    let windows = window_chars(text, max_chars, overlap);
    if windows.is_empty() {
        return Ok(None);
    }
    let vectors = provider.embed(&windows).await?;
    if vectors.len() != windows.len() {
        anyhow::bail!(
            "{} returned {} vectors for {} windows",
            provider.model_name(),
            vectors.len(),
            windows.len()
        );
    }
    let pooled = mean_pool(&vectors)?;
    Ok(Some(normalize(&pooled)))
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors or vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
