//! Multi-signal retrieval over a [`Ranker`] collaborator.
//!
//! The calling application supplies the ranker (an HTTP search service, a
//! local index, recorded results). [`retrieve_and_fuse`] runs one search per
//! signal, keeps every signal's raw hits for inspection, and fuses them.
//!
//! | Step | Behaviour |
//! |------|-----------|
//! | Empty query | Skipped; the ranker is not called. |
//! | Zero-weight signal | Searched and recorded, excluded from fusion. |
//! | Ranker error | Propagated; retries belong to the caller. |

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::fusion::{fuse_with, FusedHit, FusionOptions, RankedHit, WeightedSignal};

/// What a ranker is asked to match.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum QueryRepresentation {
    Text(String),
    Vector(Vec<f32>),
}

impl QueryRepresentation {
    pub fn is_empty(&self) -> bool {
        match self {
            QueryRepresentation::Text(t) => t.trim().is_empty(),
            QueryRepresentation::Vector(v) => v.is_empty(),
        }
    }
}

/// One named signal query with its fusion weight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalQuery {
    pub name: String,
    pub query: QueryRepresentation,
    pub weight: f64,
}

impl SignalQuery {
    pub fn text(name: impl Into<String>, text: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            query: QueryRepresentation::Text(text.into()),
            weight,
        }
    }
}

/// Ranking collaborator: returns an ordered hit list for one query.
#[async_trait]
pub trait Ranker: Send + Sync {
    async fn search(
        &self,
        index: &str,
        query: &QueryRepresentation,
        k: usize,
    ) -> Result<Vec<RankedHit>>;
}

/// Raw per-signal hits plus the fused ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    pub signals: Vec<WeightedSignal>,
    pub fused: Vec<FusedHit>,
}

/// Search `index` once per query (sequentially) and fuse the results.
///
/// `k` is the per-signal result count; `opts.top_k` bounds the fused list.
pub async fn retrieve_and_fuse<R: Ranker + ?Sized>(
    ranker: &R,
    index: &str,
    queries: &[SignalQuery],
    k: usize,
    opts: &FusionOptions,
) -> Result<Retrieval> {
    let mut signals = Vec::with_capacity(queries.len());
    for q in queries {
        let hits = if q.query.is_empty() {
            tracing::debug!(signal = %q.name, "empty query; not searched");
            Vec::new()
        } else {
            ranker.search(index, &q.query, k).await?
        };
        tracing::debug!(signal = %q.name, hits = hits.len(), "signal searched");
        signals.push(WeightedSignal::new(q.name.clone(), hits, q.weight));
    }
    let fused = fuse_with(&signals, opts);
    Ok(Retrieval { signals, fused })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned hits keyed by query text and records every call.
    #[derive(Default)]
    struct CannedRanker {
        hits: HashMap<String, Vec<RankedHit>>,
        calls: Mutex<Vec<String>>,
    }

    impl CannedRanker {
        fn with(mut self, query: &str, hits: Vec<RankedHit>) -> Self {
            self.hits.insert(query.to_string(), hits);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Ranker for CannedRanker {
        async fn search(
            &self,
            index: &str,
            query: &QueryRepresentation,
            k: usize,
        ) -> Result<Vec<RankedHit>> {
            let QueryRepresentation::Text(text) = query else {
                anyhow::bail!("vector queries not supported");
            };
            self.calls.lock().unwrap().push(format!("{}:{}", index, text));
            let mut hits = self.hits.get(text).cloned().unwrap_or_default();
            hits.truncate(k);
            Ok(hits)
        }
    }

    fn opts(top_k: usize) -> FusionOptions {
        FusionOptions {
            top_k,
            ..FusionOptions::default()
        }
    }

    #[tokio::test]
    async fn test_retrieve_and_fuse() {
        let ranker = CannedRanker::default()
            .with("permit body", vec![RankedHit::new("x", 0.9)])
            .with(
                "Name:\nDate:",
                vec![RankedHit::new("x", 1.0), RankedHit::new("y", 0.8)],
            );
        let queries = vec![
            SignalQuery::text("semantics", "permit body", 1.0),
            SignalQuery::text("fields", "Name:\nDate:", 0.5),
        ];
        let out = retrieve_and_fuse(&ranker, "records", &queries, 5, &opts(3))
            .await
            .unwrap();
        assert_eq!(out.signals.len(), 2);
        assert_eq!(out.fused.len(), 2);
        assert!((out.fused[1].weighted_score - 0.4).abs() < 1e-9);
        assert_eq!(
            ranker.calls(),
            vec!["records:permit body".to_string(), "records:Name:\nDate:".to_string()]
        );
    }

    #[tokio::test]
    async fn test_empty_query_not_searched() {
        let ranker = CannedRanker::default();
        let queries = vec![
            SignalQuery::text("headings", "   ", 1.0),
            SignalQuery {
                name: "vec".into(),
                query: QueryRepresentation::Vector(Vec::new()),
                weight: 1.0,
            },
        ];
        let out = retrieve_and_fuse(&ranker, "idx", &queries, 5, &opts(5))
            .await
            .unwrap();
        assert!(ranker.calls().is_empty());
        assert!(out.fused.is_empty());
        assert_eq!(out.signals.len(), 2);
    }

    #[tokio::test]
    async fn test_zero_weight_hits_recorded_not_fused() {
        let ranker = CannedRanker::default()
            .with("layout", vec![RankedHit::new("z", 0.99)])
            .with("body", vec![RankedHit::new("x", 0.3)]);
        let queries = vec![
            SignalQuery::text("semantics", "body", 1.0),
            SignalQuery::text("layout", "layout", 0.0),
        ];
        let out = retrieve_and_fuse(&ranker, "idx", &queries, 5, &opts(5))
            .await
            .unwrap();
        assert_eq!(out.signals[1].hits.len(), 1);
        assert_eq!(out.fused.len(), 1);
        assert_eq!(out.fused[0].signal, "semantics");
    }

    #[tokio::test]
    async fn test_ranker_error_propagates() {
        let ranker = CannedRanker::default();
        let queries = vec![SignalQuery {
            name: "semantics".into(),
            query: QueryRepresentation::Vector(vec![0.1, 0.2]),
            weight: 1.0,
        }];
        let err = retrieve_and_fuse(&ranker, "idx", &queries, 5, &opts(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("vector queries not supported"));
    }
}
