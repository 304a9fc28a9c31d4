//! Batch textify over a `<root>/<tenant>/<workflow folder>/` tree.
//!
//! Files are grouped by their parent folder. Each group contributes its
//! preferred workflow file, the first PDF (by name), and an optional
//! `manifest.json`. Groups without a workflow file are skipped. Groups are
//! processed in folder-name order; `--limit` applies after discovery.
//!
//! Workflow file preference:
//!
//! | Rank | File |
//! |------|------|
//! | 3 | `*.sgws` whose name contains `compressed` |
//! | 2 | `*.sgws` |
//! | 1 | `*.sgw` |

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use formtext_core::record::{build_text_record, Manifest, RecordSource};

use crate::config::Config;
use crate::extract;
use crate::textify::{file_stem, load_manifest, load_workflow, write_record, MANIFEST_FILE};

/// Files discovered for one workflow folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowGroup {
    pub folder: String,
    pub tenant: String,
    pub workflow: PathBuf,
    pub pdf: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
}

/// Preference rank of a workflow file name; `0` means not a workflow file.
pub fn workflow_priority(name: &str) -> u8 {
    let lower = name.to_lowercase();
    if lower.ends_with(".sgws") && lower.contains("compressed") {
        3
    } else if lower.ends_with(".sgws") {
        2
    } else if lower.ends_with(".sgw") {
        1
    } else {
        0
    }
}

#[derive(Default)]
struct Partial {
    tenant: String,
    workflow: Option<PathBuf>,
    pdf: Option<PathBuf>,
    manifest: Option<PathBuf>,
}

/// Discover workflow groups under `root`, sorted by folder name.
pub fn discover_groups(root: &Path, limit: Option<usize>) -> Result<Vec<WorkflowGroup>> {
    let mut partials: BTreeMap<String, Partial> = BTreeMap::new();

    for entry in WalkDir::new(root).min_depth(3).max_depth(3).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Ok(rel) = path.strip_prefix(root) else {
            continue;
        };
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let [tenant, folder, name] = parts.as_slice() else {
            continue;
        };

        let group = partials.entry(folder.clone()).or_insert_with(|| Partial {
            tenant: tenant.clone(),
            ..Partial::default()
        });

        let rank = workflow_priority(name);
        if rank > 0 {
            let better = group.workflow.as_ref().map_or(true, |existing| {
                let existing_name = existing.file_name().unwrap_or_default().to_string_lossy();
                rank > workflow_priority(&existing_name)
            });
            if better {
                group.workflow = Some(path.to_path_buf());
            }
        }
        if name.to_lowercase().ends_with(".pdf") && group.pdf.is_none() {
            group.pdf = Some(path.to_path_buf());
        }
        if name == MANIFEST_FILE {
            group.manifest = Some(path.to_path_buf());
        }
    }

    let mut groups: Vec<WorkflowGroup> = partials
        .into_iter()
        .filter_map(|(folder, p)| {
            Some(WorkflowGroup {
                folder,
                tenant: p.tenant,
                workflow: p.workflow?,
                pdf: p.pdf,
                manifest: p.manifest,
            })
        })
        .collect();

    if let Some(limit) = limit {
        groups.truncate(limit);
    }
    Ok(groups)
}

/// `/`-prefixed, forward-slash path of `path` relative to `root`.
fn url_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let joined = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{}", joined)
}

pub fn run_batch(
    config: &Config,
    root: &Path,
    out_dir: &Path,
    limit: Option<usize>,
) -> Result<()> {
    let groups = discover_groups(root, limit)?;
    println!("Discovered {} workflow folders.", groups.len());

    let opts = config.record_options();
    let mut written = 0usize;
    let mut failed = 0usize;

    for group in &groups {
        let doc = match load_workflow(&group.workflow) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(folder = %group.folder, error = %e, "skipping workflow");
                failed += 1;
                continue;
            }
        };

        let ctx = match &group.pdf {
            Some(pdf) => extract::page_context(
                pdf,
                config.textify.intro_chars,
                &config.textify.field_clues,
            ),
            None => Default::default(),
        };
        let manifest = group
            .manifest
            .as_deref()
            .map(load_manifest)
            .unwrap_or_else(Manifest::default);

        let source_path = url_path(root, &group.workflow);
        let source = RecordSource {
            fallback_id: group.folder.clone(),
            fallback_name: file_stem(&group.workflow),
            source_path: source_path.clone(),
            tenant_id: Some(group.tenant.clone()),
            sgw_url: Some(source_path),
            pdf_url: group.pdf.as_deref().map(|p| url_path(root, p)),
        };

        let record = build_text_record(&doc, &ctx, &manifest, &source, &opts);
        if let Err(e) = write_record(&out_dir.join(&group.folder), &record) {
            tracing::warn!(folder = %group.folder, error = %e, "failed to write record");
            failed += 1;
            continue;
        }
        written += 1;

        println!(
            "[{}/{}] fields={} pdf={} -> {}",
            group.tenant,
            group.folder,
            doc.fields.len(),
            group.pdf.is_some(),
            record.id
        );
    }

    tracing::info!(written, failed, "batch textify finished");
    println!("Textified {} of {} folders ({} failed).", written, groups.len(), failed);
    Ok(())
}
