//! Slice assembly: turns emitted line lists into the three text views.
//!
//! # Rules
//!
//! 1. Supplementary lines whose text already occurs in the primary view are
//!    dropped (in practice: the shared intro line).
//! 2. The count block goes into the supplementary view, immediately before
//!    the first `## FIELDS` marker if that view has one, otherwise at its end.
//! 3. `complete = primary + "\n\n" + supplementary`, each side trimmed;
//!    an empty side contributes nothing and no separator.
//!
//! [`split_complete`] reverses step 3 using line tags recovered with
//! [`LineTag::classify`], so re-assembling an assembled complete view yields
//! the same primary/supplementary split.

use std::collections::HashSet;

use serde::Serialize;

use crate::counts::CountBlock;
use crate::lines::{render, LineTag, TaggedLine};

/// Separator between the primary and supplementary halves of the complete view.
pub const VIEW_SEPARATOR: &str = "\n\n";

/// One of the three textual views of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Primary,
    Supplementary,
    Complete,
}

impl View {
    pub fn as_str(self) -> &'static str {
        match self {
            View::Primary => "primary",
            View::Supplementary => "supplementary",
            View::Complete => "complete",
        }
    }
}

/// The assembled text views of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Slices {
    pub primary: String,
    pub supplementary: String,
    pub complete: String,
}

impl Slices {
    pub fn get(&self, view: View) -> &str {
        match view {
            View::Primary => &self.primary,
            View::Supplementary => &self.supplementary,
            View::Complete => &self.complete,
        }
    }

    /// Build slices from already-rendered primary and supplementary text.
    pub fn from_parts(primary: &str, supplementary: &str) -> Self {
        let primary = primary.trim().to_string();
        let supplementary = supplementary.trim().to_string();
        let complete = join_views(&primary, &supplementary);
        Self {
            primary,
            supplementary,
            complete,
        }
    }
}

/// Assemble the three views from emitter output.
pub fn assemble(
    primary: &[TaggedLine],
    supplementary: &[TaggedLine],
    counts: &CountBlock,
) -> Slices {
    let seen: HashSet<&str> = primary.iter().map(|l| l.text.as_str()).collect();
    let mut supp: Vec<TaggedLine> = supplementary
        .iter()
        .filter(|l| l.tag != LineTag::Count && !seen.contains(l.text.as_str()))
        .cloned()
        .collect();
    place_counts(&mut supp, counts.lines());

    Slices::from_parts(&render(primary), &render(&supp))
}

/// Insert `block` before the first fields marker, or append it.
fn place_counts(lines: &mut Vec<TaggedLine>, block: Vec<TaggedLine>) {
    match lines.iter().position(|l| l.tag == LineTag::FieldsHeader) {
        Some(at) => {
            lines.splice(at..at, block);
        }
        None => lines.extend(block),
    }
}

/// Split a complete view back into primary and supplementary lines.
///
/// Each line is classified by its rendered prefix. Lines this crate never
/// emits stay on the side of the preceding line.
pub fn split_complete(complete: &str) -> (Vec<TaggedLine>, Vec<TaggedLine>) {
    let mut primary = Vec::new();
    let mut supplementary = Vec::new();
    let mut in_supplementary = false;

    for line in complete.lines().filter(|l| !l.trim().is_empty()) {
        match LineTag::classify(line) {
            Some(tag) => {
                in_supplementary = tag.is_supplementary();
                let target = if in_supplementary {
                    &mut supplementary
                } else {
                    &mut primary
                };
                target.push(TaggedLine::new(tag, line));
            }
            None => {
                // Untagged text keeps the primary tag set so it never reads as a count.
                let line = TaggedLine::new(LineTag::Field, line);
                if in_supplementary {
                    supplementary.push(line);
                } else {
                    primary.push(line);
                }
            }
        }
    }
    (primary, supplementary)
}

/// Rebuild slices from a previously assembled complete view.
pub fn reassemble(complete: &str) -> Slices {
    let (primary, supplementary) = split_complete(complete);
    Slices::from_parts(&render(&primary), &render(&supplementary))
}

fn join_views(primary: &str, supplementary: &str) -> String {
    match (primary.is_empty(), supplementary.is_empty()) {
        (false, false) => format!("{}{}{}", primary, VIEW_SEPARATOR, supplementary),
        (false, true) => primary.to_string(),
        (true, _) => supplementary.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counts::synthesize;
    use crate::emit::emit;
    use crate::models::{PageContext, WorkflowDocument};
    use serde_json::json;

    fn doc() -> WorkflowDocument {
        WorkflowDocument::from_value(&json!({
            "template_name": "Dog License",
            "stage_labels": ["Apply", "Approve"],
            "section_labels": {"s": "Owner"},
            "roles": [{"name": "Owner"}],
            "fields": [
                {"Type": "text", "Label": "Owner name", "Required": true},
                {"Type": "radio", "Label": "Breed size",
                 "Options": [{"Label": "Small"}, {"Label": "Medium"}, {"Label": "Large"}]}
            ],
            "conditions": ["Show vaccine date"]
        }))
    }

    fn ctx() -> PageContext {
        PageContext {
            page_count: Some(2),
            intro_text: Some("Every dog must be licensed".into()),
            headings: vec!["DOG LICENSE".into()],
            field_clues: vec!["address".into()],
        }
    }

    fn run(doc: &WorkflowDocument, ctx: &PageContext) -> Slices {
        let e = emit(doc, ctx);
        assemble(&e.primary, &e.supplementary, &e.counts)
    }

    #[test]
    fn test_counts_only_in_supplementary() {
        let s = run(&doc(), &PageContext::default());
        assert!(s.supplementary.contains("## FIELD_COUNT: 2"));
        assert!(s.supplementary.contains("## REQUIRED_COUNT: 1"));
        assert!(s.supplementary.contains("## OPTION_COUNT: 3"));
        assert!(!s.primary.contains("FIELD_COUNT"));
        assert!(!s.complete.contains("INTRO"));
        assert_eq!(s.complete.matches("## FIELD_COUNT: ").count(), 1);
    }

    #[test]
    fn test_count_block_before_fields_marker() {
        let mut lines = vec![
            TaggedLine::new(LineTag::ConditionsHeader, "## CONDITIONS"),
            TaggedLine::new(LineTag::FieldsHeader, "## FIELDS"),
        ];
        place_counts(&mut lines, synthesize(&[], &[]).lines());
        assert_eq!(lines[0].tag, LineTag::ConditionsHeader);
        assert_eq!(lines[1].text, "## FIELD_COUNT: 0");
        assert_eq!(lines.last().map(|l| l.tag), Some(LineTag::FieldsHeader));
    }

    #[test]
    fn test_intro_once_in_complete() {
        let s = run(&doc(), &ctx());
        assert!(s.primary.starts_with("## INTRO_PDF: Every dog must be licensed"));
        assert!(!s.supplementary.contains("INTRO_PDF"));
        assert_eq!(s.complete.matches("## INTRO_PDF: ").count(), 1);
    }

    #[test]
    fn test_complete_is_concatenation() {
        let s = run(&doc(), &ctx());
        assert_eq!(s.complete, format!("{}\n\n{}", s.primary, s.supplementary));
    }

    #[test]
    fn test_no_duplicated_lines() {
        let s = run(&doc(), &ctx());
        let complete_lines = s.complete.lines().filter(|l| !l.is_empty()).count();
        assert_eq!(
            complete_lines,
            s.primary.lines().count() + s.supplementary.lines().count()
        );
    }

    #[test]
    fn test_idempotent_emit_and_assemble() {
        let a = run(&doc(), &ctx());
        let b = run(&doc(), &ctx());
        assert_eq!(a, b);
    }

    #[test]
    fn test_reassemble_reproduces_split() {
        for c in [ctx(), PageContext::default()] {
            let s = run(&doc(), &c);
            assert_eq!(reassemble(&s.complete), s);
        }
    }

    #[test]
    fn test_empty_side_has_no_separator() {
        let s = Slices::from_parts("  ## STAGES  ", "");
        assert_eq!(s.complete, "## STAGES");
        let s = Slices::from_parts("", "## CONDITIONS\n");
        assert_eq!(s.complete, "## CONDITIONS");
    }

    #[test]
    fn test_view_accessor() {
        let s = Slices::from_parts("a", "b");
        assert_eq!(s.get(View::Primary), "a");
        assert_eq!(s.get(View::Supplementary), "b");
        assert_eq!(s.get(View::Complete), "a\n\nb");
        assert_eq!(View::Complete.as_str(), "complete");
    }
}
