//! Weighted max-score fusion of independently ranked hit lists.
//!
//! Each signal (semantics, fields, headings, layout) is searched on its own
//! and returns its own ranked list. Fusion merges those lists into one:
//!
//! 1. `weighted = raw_score × weight` for every hit of every signal.
//! 2. Group by document identity: the `id` field, else a fallback field
//!    (default `parentId`). Hits with neither are skipped.
//! 3. Keep the MAX weighted score per identity. The first-seen hit record is
//!    the representative for passthrough fields.
//! 4. Sort by weighted score descending; ties keep first-seen order.
//! 5. Truncate to `top_k`.
//!
//! Signals with weight `0` (or a negative or non-finite weight) take no part
//! in fusion. Fusion never fails; an empty result is a valid outcome.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default secondary identity field.
pub const DEFAULT_IDENTITY_FALLBACK: &str = "parentId";

/// Score key written by the search collaborator.
pub const SCORE_KEY: &str = "@search.score";

/// One hit returned by a ranking collaborator.
///
/// The raw score is read from `@search.score`, else from `score`. When both
/// are present, `score` stays in the passthrough fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct RankedHit {
    /// Raw relevance score as reported by the ranker.
    #[serde(rename = "@search.score")]
    pub score: f64,
    /// Every other field of the hit, passed through untouched.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl RankedHit {
    /// A hit with just an `id` and a score.
    pub fn new(id: &str, score: f64) -> Self {
        let mut fields = Map::new();
        fields.insert("id".to_string(), Value::String(id.to_string()));
        Self { score, fields }
    }

    /// Add a passthrough field.
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Document identity: `id`, else `fallback`. Blank values do not count.
    pub fn identity(&self, fallback: &str) -> Option<String> {
        [self.fields.get("id"), self.fields.get(fallback)]
            .into_iter()
            .flatten()
            .find_map(identity_text)
    }
}

impl TryFrom<Map<String, Value>> for RankedHit {
    type Error = String;

    fn try_from(mut fields: Map<String, Value>) -> Result<Self, Self::Error> {
        let raw = match fields.remove(SCORE_KEY) {
            Some(v) => Some((SCORE_KEY, v)),
            None => fields.remove("score").map(|v| ("score", v)),
        };
        let score = match raw {
            None | Some((_, Value::Null)) => 0.0,
            Some((key, v)) => v
                .as_f64()
                .ok_or_else(|| format!("'{}' is not a number: {}", key, v))?,
        };
        Ok(Self { score, fields })
    }
}

fn identity_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// One signal's ranked hits and its fusion weight.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedSignal {
    pub name: String,
    pub hits: Vec<RankedHit>,
    pub weight: f64,
}

impl WeightedSignal {
    pub fn new(name: impl Into<String>, hits: Vec<RankedHit>, weight: f64) -> Self {
        Self {
            name: name.into(),
            hits,
            weight,
        }
    }

    /// Weight used for scoring; `None` when the signal is excluded.
    pub fn effective_weight(&self) -> Option<f64> {
        (self.weight.is_finite() && self.weight > 0.0).then_some(self.weight)
    }
}

/// A fused result: the representative hit plus its combined score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusedHit {
    #[serde(flatten)]
    pub hit: RankedHit,
    pub weighted_score: f64,
    /// Signal that produced the winning weighted score.
    pub signal: String,
}

impl FusedHit {
    pub fn id(&self, fallback: &str) -> Option<String> {
        self.hit.identity(fallback)
    }
}

/// Fusion parameters.
#[derive(Debug, Clone)]
pub struct FusionOptions {
    pub top_k: usize,
    pub identity_fallback: String,
}

impl Default for FusionOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            identity_fallback: DEFAULT_IDENTITY_FALLBACK.to_string(),
        }
    }
}

/// Fuse `signals` and keep the best `top_k`.
pub fn fuse(signals: &[WeightedSignal], top_k: usize) -> Vec<FusedHit> {
    fuse_with(
        signals,
        &FusionOptions {
            top_k,
            ..FusionOptions::default()
        },
    )
}

/// Fuse `signals` with explicit options.
pub fn fuse_with(signals: &[WeightedSignal], opts: &FusionOptions) -> Vec<FusedHit> {
    let mut merged: Vec<FusedHit> = Vec::new();
    let mut by_identity: HashMap<String, usize> = HashMap::new();

    for signal in signals {
        let Some(weight) = signal.effective_weight() else {
            tracing::debug!(
                signal = %signal.name,
                weight = signal.weight,
                "signal excluded from fusion"
            );
            continue;
        };
        for hit in &signal.hits {
            let Some(key) = hit.identity(&opts.identity_fallback) else {
                tracing::debug!(signal = %signal.name, "skipping hit without identity");
                continue;
            };
            let weighted = hit.score * weight;
            if weighted.is_nan() {
                continue;
            }
            match by_identity.get(&key) {
                Some(&at) => {
                    let entry = &mut merged[at];
                    if weighted > entry.weighted_score {
                        entry.weighted_score = weighted;
                        entry.signal = signal.name.clone();
                    }
                }
                None => {
                    by_identity.insert(key, merged.len());
                    merged.push(FusedHit {
                        hit: hit.clone(),
                        weighted_score: weighted,
                        signal: signal.name.clone(),
                    });
                }
            }
        }
    }

    merged.sort_by(|a, b| b.weighted_score.total_cmp(&a.weighted_score));
    merged.truncate(opts.top_k);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(hits: &[FusedHit]) -> Vec<String> {
        hits.iter()
            .map(|h| h.id(DEFAULT_IDENTITY_FALLBACK).unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_max_weighted_score_example() {
        let a = WeightedSignal::new("semantics", vec![RankedHit::new("x", 0.9)], 1.0);
        let b = WeightedSignal::new(
            "fields",
            vec![RankedHit::new("x", 1.0), RankedHit::new("y", 0.8)],
            0.5,
        );
        let out = fuse(&[a, b], 3);
        assert_eq!(ids(&out), vec!["x", "y"]);
        assert!((out[0].weighted_score - 0.9).abs() < 1e-9);
        assert!((out[1].weighted_score - 0.4).abs() < 1e-9);
        assert_eq!(out[0].signal, "semantics");
    }

    #[test]
    fn test_first_seen_fields_kept() {
        let a = WeightedSignal::new(
            "a",
            vec![RankedHit::new("x", 0.1).with_field("name", "first")],
            1.0,
        );
        let b = WeightedSignal::new(
            "b",
            vec![RankedHit::new("x", 0.9).with_field("name", "second")],
            1.0,
        );
        let out = fuse(&[a, b], 5);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].hit.fields["name"], json!("first"));
        assert!((out[0].weighted_score - 0.9).abs() < 1e-9);
        assert_eq!(out[0].signal, "b");
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let a = WeightedSignal::new(
            "a",
            vec![RankedHit::new("p", 0.5), RankedHit::new("q", 0.5)],
            1.0,
        );
        let b = WeightedSignal::new("b", vec![RankedHit::new("r", 0.5)], 1.0);
        assert_eq!(ids(&fuse(&[a, b], 10)), vec!["p", "q", "r"]);
    }

    #[test]
    fn test_identity_fallback() {
        let hit: RankedHit =
            serde_json::from_value(json!({"parentId": "wf-1", "@search.score": 0.7})).unwrap();
        let out = fuse(&[WeightedSignal::new("s", vec![hit], 1.0)], 5);
        assert_eq!(ids(&out), vec!["wf-1"]);

        let blank_id: RankedHit =
            serde_json::from_value(json!({"id": "", "parentId": "wf-2", "score": 0.1})).unwrap();
        assert_eq!(blank_id.identity("parentId").as_deref(), Some("wf-2"));
    }

    #[test]
    fn test_search_score_wins_over_document_score() {
        let hit: RankedHit =
            serde_json::from_value(json!({"id": "x", "@search.score": 0.9, "score": 0.1}))
                .unwrap();
        assert!((hit.score - 0.9).abs() < 1e-9);
        assert_eq!(hit.fields["score"], json!(0.1));

        let plain: RankedHit = serde_json::from_value(json!({"id": "y", "score": 0.4})).unwrap();
        assert!((plain.score - 0.4).abs() < 1e-9);
        assert!(!plain.fields.contains_key("score"));

        let missing: RankedHit = serde_json::from_value(json!({"id": "z"})).unwrap();
        assert_eq!(missing.score, 0.0);

        assert!(serde_json::from_value::<RankedHit>(json!({"id": "w", "score": "high"})).is_err());
    }

    #[test]
    fn test_hits_without_identity_skipped() {
        let hit: RankedHit =
            serde_json::from_value(json!({"name": "orphan", "score": 1.0})).unwrap();
        let out = fuse(&[WeightedSignal::new("s", vec![hit], 1.0)], 5);
        assert!(out.is_empty());
    }

    #[test]
    fn test_zero_weight_signal_excluded() {
        let a = WeightedSignal::new("semantics", vec![RankedHit::new("x", 0.2)], 1.0);
        let layout = WeightedSignal::new("layout", vec![RankedHit::new("z", 0.99)], 0.0);
        let negative = WeightedSignal::new("neg", vec![RankedHit::new("w", 0.99)], -2.0);
        assert_eq!(ids(&fuse(&[a, layout, negative], 5)), vec!["x"]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(fuse(&[], 5).is_empty());
        let empty = WeightedSignal::new("s", Vec::new(), 1.0);
        assert!(fuse(&[empty], 5).is_empty());
        let one = WeightedSignal::new("s", vec![RankedHit::new("x", 1.0)], 1.0);
        assert!(fuse(&[one], 0).is_empty());
    }

    #[test]
    fn test_top_k_truncates() {
        let hits = (0..10)
            .map(|i| RankedHit::new(&format!("d{}", i), 1.0 - i as f64 / 10.0))
            .collect();
        let out = fuse(&[WeightedSignal::new("s", hits, 1.0)], 3);
        assert_eq!(ids(&out), vec!["d0", "d1", "d2"]);
    }

    #[test]
    fn test_order_of_signals_does_not_change_scores() {
        let a = WeightedSignal::new(
            "a",
            vec![RankedHit::new("x", 0.3), RankedHit::new("y", 0.6)],
            1.0,
        );
        let b = WeightedSignal::new(
            "b",
            vec![RankedHit::new("y", 0.2), RankedHit::new("x", 0.9)],
            0.5,
        );
        let ab = fuse(&[a.clone(), b.clone()], 5);
        let ba = fuse(&[b, a], 5);
        let score = |hits: &[FusedHit], id: &str| {
            hits.iter()
                .find(|h| h.id("parentId").as_deref() == Some(id))
                .map(|h| h.weighted_score)
        };
        for id in ["x", "y"] {
            assert_eq!(score(&ab, id), score(&ba, id));
        }
    }

    #[test]
    fn test_raising_weight_never_lowers_rank() {
        let rank_of = |weight: f64| {
            let boosted = WeightedSignal::new("fields", vec![RankedHit::new("f", 0.6)], weight);
            let other = WeightedSignal::new(
                "semantics",
                vec![RankedHit::new("a", 0.9), RankedHit::new("b", 0.5), RankedHit::new("c", 0.2)],
                1.0,
            );
            let out = fuse(&[other, boosted], 10);
            ids(&out).iter().position(|id| id == "f")
        };
        let mut last = usize::MAX;
        for weight in [0.1, 0.5, 1.0, 1.2, 2.0] {
            let rank = rank_of(weight).expect("boosted hit present");
            assert!(rank <= last);
            last = rank;
        }
    }

    #[test]
    fn test_serialized_shape() {
        let out = fuse(
            &[WeightedSignal::new(
                "semantics",
                vec![RankedHit::new("x", 0.5).with_field("name", "Permit")],
                2.0,
            )],
            1,
        );
        let v = serde_json::to_value(&out[0]).unwrap();
        assert_eq!(v["id"], json!("x"));
        assert_eq!(v["name"], json!("Permit"));
        assert_eq!(v["@search.score"], json!(0.5));
        assert_eq!(v["weighted_score"], json!(1.0));
        assert_eq!(v["signal"], json!("semantics"));
    }
}
