//! Single-workflow textify and count commands.
//!
//! Reads a workflow JSON file, gathers optional page context and manifest
//! metadata from beside it, and writes the text record as two files:
//!
//! | File | Content |
//! |------|---------|
//! | `text-record.txt` | Complete view (primary + supplementary). |
//! | `text-record.json` | Full record with identity metadata and all views. |

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use formtext_core::counts::synthesize;
use formtext_core::models::{PageContext, WorkflowDocument};
use formtext_core::record::{build_text_record, Manifest, RecordSource, TextRecord};

use crate::config::Config;
use crate::extract;

pub const RECORD_TXT: &str = "text-record.txt";
pub const RECORD_JSON: &str = "text-record.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Explicit paths for one textify run. Missing ones are inferred.
#[derive(Debug)]
pub struct TextifyArgs<'a> {
    pub input: &'a Path,
    pub pdf: Option<&'a Path>,
    pub context: Option<&'a Path>,
    pub manifest: Option<&'a Path>,
    pub out_dir: Option<&'a Path>,
}

pub fn run_textify(config: &Config, args: &TextifyArgs<'_>) -> Result<()> {
    let doc = load_workflow(args.input)?;

    let ctx = match args.context {
        Some(path) => load_page_context(path)?,
        None => {
            let pdf = args.pdf.map(Path::to_path_buf).or_else(|| find_pdf(args.input));
            match pdf {
                Some(pdf) => extract::page_context(
                    &pdf,
                    config.textify.intro_chars,
                    &config.textify.field_clues,
                ),
                None => PageContext::default(),
            }
        }
    };

    let manifest_path = args
        .manifest
        .map(Path::to_path_buf)
        .or_else(|| sibling(args.input, MANIFEST_FILE));
    let manifest = match manifest_path {
        Some(path) => load_manifest(&path),
        None => Manifest::default(),
    };

    let stem = file_stem(args.input);
    let source = RecordSource {
        fallback_id: stem.clone(),
        fallback_name: stem,
        source_path: args.input.display().to_string(),
        ..RecordSource::default()
    };

    let record = build_text_record(&doc, &ctx, &manifest, &source, &config.record_options());

    let out_dir = match args.out_dir {
        Some(dir) => dir.to_path_buf(),
        None => args
            .input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    let (txt, json) = write_record(&out_dir, &record)?;

    println!("Written text record: {}", txt.display());
    println!("Written text record JSON: {}", json.display());
    println!(
        "  id={} fields={} page_context={}",
        record.id,
        doc.fields.len(),
        !ctx.is_empty()
    );
    Ok(())
}

/// Print the count block for a workflow.
pub fn run_counts(input: &Path) -> Result<()> {
    let doc = load_workflow(input)?;
    let counts = synthesize(&doc.fields, &doc.conditions);
    for line in counts.lines() {
        println!("{}", line.text);
    }
    Ok(())
}

/// Print the page context extracted from a PDF as JSON.
pub fn run_context(config: &Config, pdf: &Path) -> Result<()> {
    let ctx = extract::page_context(pdf, config.textify.intro_chars, &config.textify.field_clues);
    println!("{}", serde_json::to_string_pretty(&ctx)?);
    Ok(())
}

pub fn load_workflow(path: &Path) -> Result<WorkflowDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read workflow: {}", path.display()))?;
    WorkflowDocument::from_json(&text)
        .with_context(|| format!("Failed to parse workflow JSON: {}", path.display()))
}

pub fn load_page_context(path: &Path) -> Result<PageContext> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read page context: {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse page context JSON: {}", path.display()))
}

/// Load a manifest; an unreadable or malformed one is treated as absent.
pub fn load_manifest(path: &Path) -> Manifest {
    let parsed = std::fs::read_to_string(path)
        .map_err(anyhow::Error::from)
        .and_then(|text| serde_json::from_str::<Manifest>(&text).map_err(anyhow::Error::from));
    match parsed {
        Ok(manifest) => manifest,
        Err(e) => {
            tracing::warn!(manifest = %path.display(), error = %e, "ignoring manifest");
            Manifest::default()
        }
    }
}

/// Write `text-record.txt` and `text-record.json` into `dir`.
pub fn write_record(dir: &Path, record: &TextRecord) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    let txt = dir.join(RECORD_TXT);
    let json = dir.join(RECORD_JSON);
    std::fs::write(&txt, &record.text_full)
        .with_context(|| format!("Failed to write {}", txt.display()))?;
    std::fs::write(&json, serde_json::to_string_pretty(record)?)
        .with_context(|| format!("Failed to write {}", json.display()))?;
    Ok((txt, json))
}

/// Locate the rendered PDF for a workflow file.
///
/// Tries `<stem>.pdf`, then the `tagged` naming variants, then the first PDF
/// in the folder by name.
pub fn find_pdf(input: &Path) -> Option<PathBuf> {
    let candidate = input.with_extension("pdf");
    if candidate.is_file() {
        return Some(candidate);
    }
    let dir = input.parent()?;
    let stem = file_stem(input);
    for name in [
        "tagged.pdf".to_string(),
        format!("tagged {}.pdf", stem),
        format!("tagged_{}.pdf", stem),
    ] {
        let cand = dir.join(name);
        if cand.is_file() {
            return Some(cand);
        }
    }
    let mut pdfs: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| is_pdf(p))
        .collect();
    pdfs.sort();
    pdfs.into_iter().next()
}

pub fn is_pdf(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn sibling(path: &Path, name: &str) -> Option<PathBuf> {
    let cand = path.parent()?.join(name);
    cand.is_file().then_some(cand)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_pdf_prefers_stem_match() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("form.sgws");
        fs::write(&input, "{}").unwrap();
        fs::write(dir.path().join("a.pdf"), "x").unwrap();
        fs::write(dir.path().join("form.pdf"), "x").unwrap();
        assert_eq!(find_pdf(&input), Some(dir.path().join("form.pdf")));
    }

    #[test]
    fn test_find_pdf_tagged_then_first() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("form.sgws");
        fs::write(&input, "{}").unwrap();
        fs::write(dir.path().join("b.pdf"), "x").unwrap();
        fs::write(dir.path().join("a.pdf"), "x").unwrap();
        assert_eq!(find_pdf(&input), Some(dir.path().join("a.pdf")));

        fs::write(dir.path().join("tagged_form.pdf"), "x").unwrap();
        assert_eq!(find_pdf(&input), Some(dir.path().join("tagged_form.pdf")));
    }

    #[test]
    fn test_find_pdf_none() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("form.sgws");
        fs::write(&input, "{}").unwrap();
        assert_eq!(find_pdf(&input), None);
    }

    #[test]
    fn test_bad_manifest_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        fs::write(&path, "not json").unwrap();
        assert_eq!(load_manifest(&path), Manifest::default());
    }

    #[test]
    fn test_page_context_aliases() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ctx.json");
        fs::write(
            &path,
            r#"{"page_count": 2, "intro_pdf": "Hello", "pdf_headings": ["H"], "pdf_field_clues": ["date"]}"#,
        )
        .unwrap();
        let ctx = load_page_context(&path).unwrap();
        assert_eq!(ctx.page_count, Some(2));
        assert_eq!(ctx.intro_text.as_deref(), Some("Hello"));
        assert_eq!(ctx.headings, vec!["H"]);
        assert_eq!(ctx.field_clues, vec!["date"]);
    }

    #[test]
    fn test_load_workflow_missing_file() {
        let err = load_workflow(Path::new("/definitely/not/here.sgws")).unwrap_err();
        assert!(err.to_string().contains("Failed to read workflow"));
    }
}
