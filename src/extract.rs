//! PDF text extraction: page context for textify, signals for queries.
//!
//! `pdf-extract` supplies per-page plain text. Everything past that point is
//! delegated to pure functions so it can be tested without PDF fixtures.

use std::path::Path;

use formtext_core::models::PageContext;
use formtext_core::query::QueryExtract;

/// Number of leading pages scanned for headings and clue keywords.
const SCANNED_PAGES: usize = 2;

/// Extraction error. Callers decide whether it is fatal.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

/// Per-page plain text of the PDF in `bytes`.
pub fn pdf_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

/// Per-page plain text of the PDF at `path`.
pub fn read_pdf_pages(path: &Path) -> Result<Vec<String>, ExtractError> {
    let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
        path: path.display().to_string(),
        source,
    })?;
    pdf_pages(&bytes)
}

/// Build a page context from already-extracted page text.
pub fn page_context_from_pages(
    pages: &[String],
    intro_chars: usize,
    clues: &[String],
) -> PageContext {
    let intro = pages
        .first()
        .map(|p| p.trim().chars().take(intro_chars).collect::<String>().replace('\n', " "))
        .filter(|s| !s.is_empty());

    let mut headings = Vec::new();
    let mut found: Vec<String> = Vec::new();
    for page in pages.iter().take(SCANNED_PAGES) {
        if let Some(first) = page.lines().map(str::trim).find(|l| !l.is_empty()) {
            headings.push(first.to_string());
        }
        let lower = page.to_lowercase();
        for clue in clues {
            let clue = clue.to_lowercase();
            if !clue.is_empty() && lower.contains(&clue) && !found.contains(&clue) {
                found.push(clue);
            }
        }
    }
    found.sort();

    PageContext {
        page_count: Some(pages.len() as u64),
        intro_text: intro,
        headings,
        field_clues: found,
    }
}

/// Page context for the PDF at `path`. Any failure yields an empty context.
pub fn page_context(path: &Path, intro_chars: usize, clues: &[String]) -> PageContext {
    match read_pdf_pages(path) {
        Ok(pages) => page_context_from_pages(&pages, intro_chars, clues),
        Err(e) => {
            tracing::warn!(pdf = %path.display(), error = %e, "page context unavailable");
            PageContext::default()
        }
    }
}

/// Query signals for the PDF at `path`.
pub fn query_extract(path: &Path) -> Result<QueryExtract, ExtractError> {
    let pages = read_pdf_pages(path)?;
    tracing::debug!(pdf = %path.display(), pages = pages.len(), "extracted query pages");
    Ok(QueryExtract::from_pages(&pages))
}
