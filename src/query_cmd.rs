//! Query-side commands: `extract`, `compose`, and `signals`.
//!
//! `compose` and `signals` accept either a saved extract JSON file or a PDF,
//! which is extracted on the fly.

use anyhow::{Context, Result};
use std::path::Path;

use formtext_core::query::{compose_combined, signal_queries, QueryExtract};

use crate::config::Config;
use crate::extract;
use crate::runlog::{append_entry, JsonLogSequence, RunEntry};
use crate::textify::is_pdf;

/// Write `text` to `out`, or print it when no path is given.
pub fn write_output(out: Option<&Path>, text: &str) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Written: {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

pub fn load_extract(input: &Path) -> Result<QueryExtract> {
    if is_pdf(input) {
        return extract::query_extract(input)
            .with_context(|| format!("Failed to extract query signals: {}", input.display()));
    }
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read extract: {}", input.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse extract JSON: {}", input.display()))
}

pub fn run_extract(pdf: &Path, out: Option<&Path>) -> Result<()> {
    let extract = extract::query_extract(pdf)
        .with_context(|| format!("Failed to extract query signals: {}", pdf.display()))?;
    tracing::info!(
        candidates = extract.field_candidates.len(),
        semantics_chars = extract.semantics_text.chars().count(),
        "query extract built"
    );
    write_output(out, &serde_json::to_string_pretty(&extract)?)
}

pub fn run_compose(
    config: &Config,
    input: &Path,
    token_budget: Option<usize>,
    log: Option<&Path>,
) -> Result<()> {
    let extract = load_extract(input)?;
    let opts = config.compose_options(token_budget)?;
    let composition = compose_combined(&extract, &opts);

    tracing::info!(
        tokens = composition.total_tokens,
        limit = opts.budget.limit,
        trims = composition.trims.len(),
        deduped = composition.deduped_lines,
        "combined query composed"
    );

    if let Some(log) = log {
        let entry = RunEntry::new(
            &JsonLogSequence::new(log),
            input,
            opts.budget.limit,
            composition.text.chars().count(),
            composition.trims.clone(),
        );
        append_entry(log, &entry)?;
        tracing::info!(run_id = %entry.run_id, log = %log.display(), "run logged");
    }

    println!("{}", composition.text);
    Ok(())
}

pub fn run_signals(config: &Config, input: &Path) -> Result<()> {
    let extract = load_extract(input)?;
    let queries = signal_queries(&extract, &config.signal_options());
    println!("{}", serde_json::to_string_pretty(&queries)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_extract_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("extract.json");
        fs::write(
            &path,
            r#"{"semantics_text": "body", "field_candidates": ["Name:"]}"#,
        )
        .unwrap();
        let extract = load_extract(&path).unwrap();
        assert_eq!(extract.semantics_text, "body");
        assert_eq!(extract.field_candidates, vec!["Name:"]);
        assert!(extract.layout_text.is_empty());
    }

    #[test]
    fn test_load_extract_bad_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("extract.json");
        fs::write(&path, "[1, 2").unwrap();
        let err = load_extract(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse extract JSON"));
    }

    #[test]
    fn test_write_output_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        write_output(Some(&path), "hello").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
    }
}
