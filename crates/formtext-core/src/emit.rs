//! Text emitter: turns one workflow document (plus optional page context)
//! into tagged primary and supplementary lines.
//!
//! # Views
//!
//! | Content | Primary | Supplementary |
//! |---------|:-------:|:-------------:|
//! | Intro (page text, else first rich-text field) | ✓ | ✓ |
//! | Title, prompt, title keywords | ✓ | |
//! | Stages, sections, roles, fields, options | ✓ | |
//! | Page count, page headings, field clues | | ✓ |
//! | Conditions, relationships, primary document, CSS assets | | ✓ |
//!
//! The count block is computed here, once, over the full field and condition
//! lists, but it is not placed into either view; that is the job of
//! [`assemble`](crate::assemble::assemble).

use crate::counts::{synthesize, CountBlock};
use crate::lines::{LineBuilder, LineTag, TaggedLine};
use crate::markup::strip_markup;
use crate::models::{Condition, FieldRecord, PageContext, Section, WorkflowDocument};

/// Separator used by every roll-up line.
pub const ROLLUP_SEPARATOR: &str = " | ";

/// Default truncation for an intro taken from a rich-text field.
pub const DEFAULT_FALLBACK_INTRO_CHARS: usize = 1500;

/// Emitter tuning.
#[derive(Debug, Clone)]
pub struct EmitOptions {
    /// Maximum characters of a field-derived intro.
    pub fallback_intro_chars: usize,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            fallback_intro_chars: DEFAULT_FALLBACK_INTRO_CHARS,
        }
    }
}

/// Output of [`emit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    pub primary: Vec<TaggedLine>,
    pub supplementary: Vec<TaggedLine>,
    pub counts: CountBlock,
}

/// Emit a document with default options.
pub fn emit(doc: &WorkflowDocument, ctx: &PageContext) -> Emission {
    emit_with(doc, ctx, &EmitOptions::default())
}

/// Emit a document.
pub fn emit_with(doc: &WorkflowDocument, ctx: &PageContext, opts: &EmitOptions) -> Emission {
    let mut primary = LineBuilder::new();
    let mut supplementary = LineBuilder::new();

    if let Some(intro) = ctx.intro_text.as_deref().map(strip_markup) {
        primary.intro(LineTag::IntroPage, &intro);
        supplementary.intro(LineTag::IntroPage, &intro);
    }

    emit_title(&mut primary, doc);
    emit_page_signals(&mut supplementary, doc, ctx);
    emit_stages(&mut primary, doc);
    emit_sections(&mut primary, &doc.sections);
    emit_roles(&mut primary, doc);
    emit_fields(&mut primary, &doc.fields);
    emit_conditions(&mut supplementary, &doc.conditions);
    emit_trailer(&mut supplementary, doc);

    if let Some(intro) = fallback_intro(&doc.fields, opts.fallback_intro_chars) {
        primary.intro(LineTag::IntroWorkflow, &intro);
        supplementary.intro(LineTag::IntroWorkflow, &intro);
    }

    Emission {
        primary: primary.finish(),
        supplementary: supplementary.finish(),
        counts: synthesize(&doc.fields, &doc.conditions),
    }
}

/// Lower-cased title tokens longer than three characters.
pub fn title_keywords(title: &str) -> Vec<String> {
    title
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 3)
        .map(str::to_string)
        .collect()
}

fn emit_title(out: &mut LineBuilder, doc: &WorkflowDocument) {
    if !doc.title.is_empty() {
        out.push(LineTag::Title, &doc.title);
    }
    if !doc.prompt.is_empty() {
        out.push(LineTag::Prompt, &doc.prompt);
    }
    let keywords = title_keywords(&doc.title);
    if !keywords.is_empty() {
        out.push(LineTag::TitleKeywords, keywords.join(ROLLUP_SEPARATOR));
    }
}

fn emit_page_signals(out: &mut LineBuilder, doc: &WorkflowDocument, ctx: &PageContext) {
    if let Some(pages) = ctx.page_count.or(doc.page_count).filter(|n| *n > 0) {
        out.push(LineTag::PageCount, pages.to_string());
    }
    let headings = clean_list(&ctx.headings);
    if !headings.is_empty() {
        out.push(LineTag::PageHeadings, headings.join(ROLLUP_SEPARATOR));
    }
    let clues = clean_list(&ctx.field_clues);
    if !clues.is_empty() {
        out.push(LineTag::FieldClues, clues.join(ROLLUP_SEPARATOR));
    }
}

fn emit_stages(out: &mut LineBuilder, doc: &WorkflowDocument) {
    out.header(LineTag::StagesHeader);
    out.push(LineTag::StageCount, doc.stage_count.to_string());
    let mut names = Vec::new();
    for stage in &doc.stages {
        out.push(
            LineTag::Stage,
            format!("id={}; Label=\"{}\"", stage.id, stage.label),
        );
        if !stage.label.is_empty() {
            names.push(stage.label.as_str());
        }
    }
    if !names.is_empty() {
        out.push(LineTag::StageNames, names.join(ROLLUP_SEPARATOR));
    }
}

fn emit_sections(out: &mut LineBuilder, sections: &[Section]) {
    out.header(LineTag::SectionsHeader);
    let mut names = Vec::new();
    for section in sections {
        let body = match section {
            Section::Labeled { id, label } => format!("id={}; Label=\"{}\"", id, label),
            Section::Detailed {
                id,
                label,
                stage,
                group,
            } => {
                let mut parts = vec![format!("id={}", id)];
                if let Some(stage) = stage {
                    parts.push(format!("Stage={}", stage));
                }
                if let Some(group) = group {
                    parts.push(format!("Group={}", group));
                }
                parts.push(format!("Label=\"{}\"", label));
                parts.join("; ")
            }
        };
        out.push(LineTag::Section, body);
        if !section.label().is_empty() {
            names.push(section.label());
        }
    }
    if !names.is_empty() {
        out.push(LineTag::SectionNames, names.join(ROLLUP_SEPARATOR));
    }
}

fn emit_roles(out: &mut LineBuilder, doc: &WorkflowDocument) {
    out.header(LineTag::RolesHeader);
    for role in doc.roles.iter().filter(|r| !r.name.is_empty()) {
        out.push(LineTag::Role, &role.name);
    }
}

fn emit_fields(out: &mut LineBuilder, fields: &[FieldRecord]) {
    out.header(LineTag::FieldsHeader);
    for field in fields {
        out.push(LineTag::Field, field_line(field));
        for option in &field.options {
            out.push(
                LineTag::FieldOption,
                format!(
                    "Parent=\"{}\" Type=\"{}\" Label=\"{}\"",
                    field.label, field.field_type, option
                ),
            );
        }
    }
}

/// Render the semicolon-joined attribute list of one field.
///
/// Absent attributes are omitted; explicit `false` flags are kept.
pub fn field_line(field: &FieldRecord) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !field.label.is_empty() {
        parts.push(format!("Label=\"{}\"", field.label));
    }
    if !field.field_type.is_empty() {
        parts.push(format!("Type=\"{}\"", field.field_type));
    }
    let plain = [
        ("Stage", &field.stage),
        ("Group", &field.group),
        ("Key", &field.summary_key),
        ("Help", &field.help),
        ("Placeholder", &field.placeholder),
        ("Default", &field.default),
        ("Width", &field.width),
    ];
    for (name, value) in plain {
        if let Some(v) = value {
            parts.push(format!("{}={}", name, v));
        }
    }
    let flags = [
        ("Required", field.required),
        ("ShowByDefault", field.show_by_default),
        ("ReadOnly", field.read_only),
    ];
    for (name, value) in flags {
        if let Some(v) = value {
            parts.push(format!("{}={}", name, v));
        }
    }
    let trailing = [
        ("Mask", &field.mask),
        ("Regex", &field.regex),
        ("Formula", &field.formula),
    ];
    for (name, value) in trailing {
        if let Some(v) = value {
            parts.push(format!("{}={}", name, v));
        }
    }
    parts.join("; ")
}

fn emit_conditions(out: &mut LineBuilder, conditions: &[Condition]) {
    out.header(LineTag::ConditionsHeader);
    for condition in conditions {
        out.push(LineTag::Condition, condition_line(condition));
    }
}

fn condition_line(condition: &Condition) -> String {
    match condition {
        Condition::Plain(label) => label.clone(),
        Condition::Structured {
            label,
            targets,
            operator,
            value,
            expression,
            raw,
        } => {
            let mut parts = Vec::new();
            if !label.is_empty() {
                parts.push(format!("Label=\"{}\"", label));
            }
            if !targets.is_empty() {
                parts.push(format!("Targets={}", targets.join("|")));
            }
            if !operator.is_empty() {
                parts.push(format!("Operator={}", operator));
            }
            if !value.is_empty() {
                parts.push(format!("Value={}", value));
            }
            if !expression.is_empty() {
                parts.push(format!("Expression=\"{}\"", expression));
            }
            if parts.is_empty() {
                raw.clone()
            } else {
                parts.join("; ")
            }
        }
    }
}

fn emit_trailer(out: &mut LineBuilder, doc: &WorkflowDocument) {
    if !doc.relationships.is_empty() {
        out.header(LineTag::RelationshipsHeader);
        for rel in &doc.relationships {
            out.push(LineTag::Relationship, rel);
        }
    }
    if let Some(name) = &doc.primary_document {
        out.header(LineTag::PrimaryDocumentHeader);
        out.push(LineTag::PrimaryDocument, name);
    }
    if !doc.css_assets.is_empty() {
        out.header(LineTag::CssAssetsHeader);
        for css in &doc.css_assets {
            out.push(LineTag::CssAsset, css);
        }
    }
}

fn fallback_intro(fields: &[FieldRecord], max_chars: usize) -> Option<String> {
    fields
        .iter()
        .find(|f| f.is_rich_text() && !f.label.is_empty())
        .map(|f| f.label.chars().take(max_chars).collect())
}

fn clean_list(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| strip_markup(s))
        .filter(|s| !s.is_empty())
        .collect()
}
