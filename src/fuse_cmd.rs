//! `ftx fuse`: fuse recorded per-signal hit lists.
//!
//! Each `--signal` is `name=path[@weight]`. The file holds either a JSON array
//! of hits or a search-service response object with a `value` array. Without
//! an explicit weight, the configured weight for `name` is used (1.0 for
//! names the config does not know).

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

use formtext_core::fusion::{fuse_with, RankedHit, WeightedSignal};

use crate::config::Config;

/// A parsed `--signal` argument.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalArg {
    pub name: String,
    pub path: PathBuf,
    pub weight: Option<f64>,
}

impl std::str::FromStr for SignalArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (name, rest) = s
            .split_once('=')
            .with_context(|| format!("Invalid signal '{}': expected name=path[@weight]", s))?;
        let name = name.trim();
        if name.is_empty() {
            anyhow::bail!("Invalid signal '{}': empty name", s);
        }

        let (path, weight) = match rest.rsplit_once('@') {
            Some((path, w)) => match w.trim().parse::<f64>() {
                Ok(w) => (path, Some(w)),
                Err(_) => (rest, None),
            },
            None => (rest, None),
        };
        if path.trim().is_empty() {
            anyhow::bail!("Invalid signal '{}': empty path", s);
        }

        Ok(Self {
            name: name.to_string(),
            path: PathBuf::from(path),
            weight,
        })
    }
}

/// Read a hit list from a JSON array or a `{"value": [...]}` object.
pub fn load_hits(path: &Path) -> Result<Vec<RankedHit>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read hits: {}", path.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse hits JSON: {}", path.display()))?;
    let items = match value {
        Value::Object(mut map) => map.remove("value").unwrap_or(Value::Array(Vec::new())),
        other => other,
    };
    serde_json::from_value(items)
        .with_context(|| format!("Hits must be an array of objects: {}", path.display()))
}

pub fn run_fuse(config: &Config, signals: &[SignalArg], top_k: Option<usize>) -> Result<()> {
    let weighted = signals
        .iter()
        .map(|arg| {
            let hits = load_hits(&arg.path)?;
            let weight = arg
                .weight
                .or_else(|| config.fusion.weights.get(&arg.name))
                .unwrap_or(1.0);
            tracing::debug!(signal = %arg.name, hits = hits.len(), weight, "loaded signal");
            Ok(WeightedSignal::new(arg.name.clone(), hits, weight))
        })
        .collect::<Result<Vec<_>>>()?;

    let opts = config.fusion_options(top_k);
    let fused = fuse_with(&weighted, &opts);
    tracing::info!(signals = weighted.len(), results = fused.len(), "fused");
    println!("{}", serde_json::to_string_pretty(&fused)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_signal_arg() {
        let arg: SignalArg = "fields=hits/f.json@0.5".parse().unwrap();
        assert_eq!(arg.name, "fields");
        assert_eq!(arg.path, PathBuf::from("hits/f.json"));
        assert_eq!(arg.weight, Some(0.5));

        let arg: SignalArg = "semantics=a@b.json".parse().unwrap();
        assert_eq!(arg.path, PathBuf::from("a@b.json"));
        assert_eq!(arg.weight, None);
    }

    #[test]
    fn test_parse_signal_arg_errors() {
        assert!("nopath".parse::<SignalArg>().is_err());
        assert!("=x.json".parse::<SignalArg>().is_err());
        assert!("name=@1.0".parse::<SignalArg>().is_err());
    }

    #[test]
    fn test_load_hits_array_and_value() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.json");
        fs::write(&a, r#"[{"id": "x", "score": 0.9}]"#).unwrap();
        let b = dir.path().join("b.json");
        fs::write(
            &b,
            r#"{"value": [{"id": "y", "@search.score": 0.4, "name": "Y"}]}"#,
        )
        .unwrap();

        let hits = load_hits(&a).unwrap();
        assert_eq!(hits.len(), 1);
        assert!((hits[0].score - 0.9).abs() < 1e-9);

        let hits = load_hits(&b).unwrap();
        assert!((hits[0].score - 0.4).abs() < 1e-9);
        assert_eq!(hits[0].fields.get("name"), Some(&Value::from("Y")));
    }

    #[test]
    fn test_load_hits_rejects_scalars() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.json");
        fs::write(&a, "[1, 2]").unwrap();
        assert!(load_hits(&a).is_err());
    }
}
