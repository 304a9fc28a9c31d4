//! Ground-truth neighbor labels and embedding windows.
//!
//! `ftx neighbors` reads a JSON object mapping document id to either one
//! vector or a list of per-window vectors (mean-pooled first). Object order
//! is the corpus order that breaks similarity ties.
//!
//! `ftx windows` prints the overlapping character windows a document is split
//! into before embedding, so an external embedder sees exactly what the
//! pooled vector is built from.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

use formtext_core::embedding::{mean_pool, window_chars};
use formtext_core::neighbors::top_neighbors;

use crate::config::Config;
use crate::query_cmd::write_output;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VectorEntry {
    Single(Vec<f32>),
    Windows(Vec<Vec<f32>>),
}

/// Load `id -> vector` pairs in file order, pooling window lists.
pub fn load_vectors(path: &Path) -> Result<Vec<(String, Vec<f32>)>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read vectors: {}", path.display()))?;
    let map: Map<String, Value> = serde_json::from_str(&text).with_context(|| {
        format!("Vectors must be a JSON object of id -> vector: {}", path.display())
    })?;

    map.into_iter()
        .map(|(id, value)| {
            let entry: VectorEntry = serde_json::from_value(value)
                .with_context(|| format!("Invalid vector for {}", id))?;
            let vector = match entry {
                VectorEntry::Single(v) => v,
                VectorEntry::Windows(windows) => mean_pool(&windows)
                    .with_context(|| format!("Cannot pool windows for {}", id))?,
            };
            Ok((id, vector))
        })
        .collect()
}

pub fn run_neighbors(
    config: &Config,
    vectors: &Path,
    top: Option<usize>,
    out: Option<&Path>,
) -> Result<()> {
    let batch = load_vectors(vectors)?;
    let k = top.unwrap_or(config.neighbors.top);
    let lists = top_neighbors(&batch, k)?;
    tracing::info!(documents = lists.len(), k, "neighbors computed");
    write_output(out, &serde_json::to_string_pretty(&lists)?)
}

/// Document text for windowing: `text_full` of a record JSON, or the raw file.
pub fn load_document_text(path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read document: {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if !is_json {
        return Ok(text);
    }
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse record JSON: {}", path.display()))?;
    value
        .get("text_full")
        .and_then(Value::as_str)
        .map(str::to_string)
        .with_context(|| format!("Record has no text_full: {}", path.display()))
}

pub fn run_windows(config: &Config, input: &Path) -> Result<()> {
    let text = load_document_text(input)?;
    let windows = window_chars(
        &text,
        config.neighbors.window_chars,
        config.neighbors.overlap_chars,
    );
    tracing::info!(windows = windows.len(), "document windowed");
    println!("{}", serde_json::to_string_pretty(&windows)?);
    Ok(())
}
