//! Text records: the persisted artifact built from one workflow document.
//!
//! A record carries the three text views plus identity and URL metadata.
//! Identity comes from an optional [`Manifest`]; whatever it does not supply
//! falls back to the [`RecordSource`] the caller derived from file paths.
//!
//! # Pipeline
//!
//! 1. Emit and assemble the views.
//! 2. Cap primary and supplementary at `slice_token_limit` estimated tokens
//!    (each cut is logged).
//! 3. Rebuild the complete view from the capped halves.
//! 4. Cap every text at `max_record_chars` characters.
//! 5. Hash the complete text (SHA-256) for change detection.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::assemble::{assemble, Slices};
use crate::budget::{approx_tokens, cap_tokens, truncate_chars};
use crate::emit::{emit_with, EmitOptions};
use crate::models::{PageContext, WorkflowDocument};

/// Optional identity metadata stored next to a workflow.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Manifest {
    #[serde(alias = "workflow_id")]
    pub workflow_id: Option<String>,
    pub tenant_id: Option<String>,
    pub name: Option<String>,
    pub sgw_url: Option<String>,
    pub pdf_url: Option<String>,
    pub theme_css_url: Option<String>,
    /// Free-form; manifests carry both numbers and strings here.
    pub version: Option<Value>,
    pub source_path: Option<String>,
}

/// Fallback identity derived from where the workflow was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSource {
    /// Identity when the manifest has no workflow id (usually the file stem
    /// or the parent folder name).
    pub fallback_id: String,
    /// Display name when the manifest has none (usually the file stem).
    pub fallback_name: String,
    pub source_path: String,
    pub tenant_id: Option<String>,
    pub sgw_url: Option<String>,
    pub pdf_url: Option<String>,
}

/// Limits applied while building a record.
#[derive(Debug, Clone)]
pub struct RecordOptions {
    pub emit: EmitOptions,
    pub slice_token_limit: usize,
    pub max_record_chars: usize,
}

impl Default for RecordOptions {
    fn default() -> Self {
        Self {
            emit: EmitOptions::default(),
            slice_token_limit: 7800,
            max_record_chars: 30_000,
        }
    }
}

/// The persisted text record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRecord {
    pub id: String,
    pub parent_id: String,
    pub workflow_id: String,
    pub tenant_id: Option<String>,
    pub name: String,
    pub sgw_url: Option<String>,
    pub pdf_url: Option<String>,
    pub theme_css_url: Option<String>,
    pub version: Option<Value>,
    pub source_path: String,
    pub content_hash: String,
    #[serde(rename = "text_full")]
    pub text_full: String,
    #[serde(rename = "text_main")]
    pub text_main: String,
    #[serde(rename = "text_meta")]
    pub text_meta: String,
}

/// Build a text record for `doc`.
pub fn build_text_record(
    doc: &WorkflowDocument,
    ctx: &PageContext,
    manifest: &Manifest,
    source: &RecordSource,
    opts: &RecordOptions,
) -> TextRecord {
    let emission = emit_with(doc, ctx, &opts.emit);
    let slices = assemble(&emission.primary, &emission.supplementary, &emission.counts);

    let main = cap_slice("text_main", &slices.primary, opts.slice_token_limit);
    let meta = cap_slice("text_meta", &slices.supplementary, opts.slice_token_limit);
    let slices = Slices::from_parts(main, meta);

    let text_full = truncate_chars(&slices.complete, opts.max_record_chars).to_string();
    let text_main = truncate_chars(&slices.primary, opts.max_record_chars).to_string();
    let text_meta = truncate_chars(&slices.supplementary, opts.max_record_chars).to_string();

    let workflow_id =
        non_empty(&manifest.workflow_id).unwrap_or_else(|| source.fallback_id.clone());

    TextRecord {
        id: workflow_id.clone(),
        parent_id: workflow_id.clone(),
        workflow_id,
        tenant_id: non_empty(&manifest.tenant_id).or_else(|| source.tenant_id.clone()),
        name: non_empty(&manifest.name).unwrap_or_else(|| source.fallback_name.clone()),
        sgw_url: non_empty(&manifest.sgw_url).or_else(|| source.sgw_url.clone()),
        pdf_url: non_empty(&manifest.pdf_url).or_else(|| source.pdf_url.clone()),
        theme_css_url: non_empty(&manifest.theme_css_url),
        version: manifest.version.clone().filter(|v| !v.is_null()),
        source_path: non_empty(&manifest.source_path).unwrap_or_else(|| source.source_path.clone()),
        content_hash: content_hash(&text_full),
        text_full,
        text_main,
        text_meta,
    }
}

/// Hex SHA-256 of `text`.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn cap_slice<'a>(label: &str, text: &'a str, limit: usize) -> &'a str {
    let capped = cap_tokens(text, limit);
    if capped.len() < text.len() {
        tracing::warn!(
            slice = label,
            tokens = approx_tokens(text),
            limit,
            "slice truncated to token limit"
        );
    }
    capped
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.trim().is_empty()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> WorkflowDocument {
        WorkflowDocument::from_value(&json!({
            "template_name": "Pet Registration",
            "fields": [
                {"Type": "text", "Label": "Pet name", "Required": true},
                {"Type": "FileUpload", "Label": "Vaccination record"}
            ],
            "conditions": ["Show vet"]
        }))
    }

    fn source() -> RecordSource {
        RecordSource {
            fallback_id: "compressed".into(),
            fallback_name: "compressed".into(),
            source_path: "tenant/wf-9/compressed.sgws".into(),
            tenant_id: Some("tenant".into()),
            sgw_url: Some("/tenant/wf-9/compressed.sgws".into()),
            pdf_url: None,
        }
    }

    #[test]
    fn test_manifest_identity_wins() {
        let manifest: Manifest = serde_json::from_value(json!({
            "workflow_id": "wf-9",
            "name": "Pets",
            "version": 3,
            "themeCssUrl": "/theme.css"
        }))
        .unwrap();
        let r = build_text_record(
            &doc(),
            &PageContext::default(),
            &manifest,
            &source(),
            &RecordOptions::default(),
        );
        assert_eq!(r.id, "wf-9");
        assert_eq!(r.parent_id, "wf-9");
        assert_eq!(r.name, "Pets");
        assert_eq!(r.version, Some(json!(3)));
        assert_eq!(r.tenant_id.as_deref(), Some("tenant"));
        assert_eq!(r.theme_css_url.as_deref(), Some("/theme.css"));
    }

    #[test]
    fn test_fallbacks_without_manifest() {
        let r = build_text_record(
            &doc(),
            &PageContext::default(),
            &Manifest::default(),
            &source(),
            &RecordOptions::default(),
        );
        assert_eq!(r.workflow_id, "compressed");
        assert_eq!(r.source_path, "tenant/wf-9/compressed.sgws");
        assert_eq!(r.sgw_url.as_deref(), Some("/tenant/wf-9/compressed.sgws"));
        assert!(r.version.is_none());
    }

    #[test]
    fn test_texts_and_hash() {
        let r = build_text_record(
            &doc(),
            &PageContext::default(),
            &Manifest::default(),
            &source(),
            &RecordOptions::default(),
        );
        assert_eq!(r.text_full, format!("{}\n\n{}", r.text_main, r.text_meta));
        assert!(r.text_meta.contains("## ATTACHMENT_FIELDS: 1"));
        assert!(r.text_main.starts_with("# FORM_TITLE: Pet Registration"));
        assert_eq!(r.content_hash, content_hash(&r.text_full));
        assert_eq!(r.content_hash.len(), 64);
    }

    #[test]
    fn test_slice_token_limit() {
        let opts = RecordOptions {
            slice_token_limit: 5,
            ..RecordOptions::default()
        };
        let r = build_text_record(
            &doc(),
            &PageContext::default(),
            &Manifest::default(),
            &source(),
            &opts,
        );
        assert_eq!(r.text_main.chars().count(), 20);
        assert_eq!(r.text_meta.chars().count(), 20);
    }

    #[test]
    fn test_max_record_chars() {
        let opts = RecordOptions {
            max_record_chars: 12,
            ..RecordOptions::default()
        };
        let r = build_text_record(
            &doc(),
            &PageContext::default(),
            &Manifest::default(),
            &source(),
            &opts,
        );
        assert_eq!(r.text_full.chars().count(), 12);
        assert_eq!(r.text_main, "# FORM_TITLE");
    }

    #[test]
    fn test_serialized_keys() {
        let r = build_text_record(
            &doc(),
            &PageContext::default(),
            &Manifest::default(),
            &source(),
            &RecordOptions::default(),
        );
        let v = serde_json::to_value(&r).unwrap();
        for key in [
            "id", "parentId", "workflowId", "tenantId", "name", "sgwUrl", "pdfUrl",
            "themeCssUrl", "version", "sourcePath", "contentHash", "text_full",
            "text_main", "text_meta",
        ] {
            assert!(v.get(key).is_some(), "missing {}", key);
        }
    }

    #[test]
    fn test_content_hash_known_value() {
        assert_eq!(
            content_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
