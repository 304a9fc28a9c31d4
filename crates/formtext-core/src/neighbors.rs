//! All-pairs nearest neighbors over a batch of document vectors.
//!
//! Used to build evaluation ground truth: every document's closest other
//! documents by cosine similarity.
//!
//! # Algorithm
//!
//! 1. Validate: non-empty batch, non-zero and consistent dimensionality,
//!    finite components.
//! 2. L2-normalize every row (norms clipped at `1e-8`).
//! 3. For each row, dot against every other row.
//! 4. Sort descending; ties keep corpus order. Take the first `k`.

use serde::Serialize;

use crate::error::InputError;

const NORM_EPSILON: f32 = 1e-8;

/// One neighbor of a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighbor {
    pub neighbor_id: String,
    pub score: f32,
}

/// Neighbors of one document, in corpus order of the queried document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborList {
    pub id: String,
    pub neighbors: Vec<Neighbor>,
}

/// Compute the top `k` neighbors of every document.
///
/// `vectors` is in corpus order; that order breaks similarity ties. The
/// result has one entry per input document, in the same order.
///
/// # Errors
///
/// [`InputError::Empty`] for an empty batch, [`InputError::ZeroDimension`]
/// for a vector with no components, [`InputError::DimensionMismatch`]
/// when a vector's length differs from the first one, and
/// [`InputError::NonFinite`] for a NaN or infinite component.
pub fn top_neighbors(
    vectors: &[(String, Vec<f32>)],
    k: usize,
) -> Result<Vec<NeighborList>, InputError> {
    let dims = check_dims(vectors)?;
    let normalized: Vec<Vec<f32>> = vectors.iter().map(|(_, v)| normalize(v)).collect();

    let lists = vectors
        .iter()
        .enumerate()
        .map(|(i, (id, _))| {
            let mut scored: Vec<(usize, f32)> = normalized
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(j, other)| (j, dot(&normalized[i], other)))
                .collect();
            scored.sort_by(|a, b| b.1.total_cmp(&a.1));
            let neighbors = scored
                .into_iter()
                .take(k)
                .map(|(j, score)| Neighbor {
                    neighbor_id: vectors[j].0.clone(),
                    score,
                })
                .collect();
            NeighborList {
                id: id.clone(),
                neighbors,
            }
        })
        .collect();

    tracing::debug!(documents = vectors.len(), dims, k, "computed neighbor lists");
    Ok(lists)
}

/// Validate a batch and return its dimensionality.
pub(crate) fn check_dims(vectors: &[(String, Vec<f32>)]) -> Result<usize, InputError> {
    let (first_id, first) = vectors.first().ok_or(InputError::Empty)?;
    let dims = first.len();
    if dims == 0 {
        return Err(InputError::ZeroDimension {
            id: first_id.clone(),
        });
    }
    for (id, v) in vectors {
        if v.len() != dims {
            return Err(InputError::DimensionMismatch {
                id: id.clone(),
                expected: dims,
                found: v.len(),
            });
        }
        if v.iter().any(|x| !x.is_finite()) {
            return Err(InputError::NonFinite { id: id.clone() });
        }
    }
    Ok(dims)
}

/// L2-normalize `v`, clipping tiny norms so zero vectors stay zero.
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(NORM_EPSILON);
    v.iter().map(|x| x / norm).collect()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
