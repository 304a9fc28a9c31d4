//! Tagged lines and the ordered line builder used by the emitter.
//!
//! Every emitted line carries a [`LineTag`] assigned when it is created, so
//! later stages (slice assembly, intro de-duplication, count placement) work
//! on tags instead of re-inspecting rendered prefixes. The rendered prefix of
//! each tag lives in one table ([`LineTag::prefix`]); [`LineTag::classify`]
//! reads that same table when text that has already been flattened to a
//! string must be split into views again.

/// The category of an emitted line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineTag {
    IntroPage,
    IntroWorkflow,
    Title,
    Prompt,
    TitleKeywords,
    PageCount,
    PageHeadings,
    FieldClues,
    StagesHeader,
    StageCount,
    Stage,
    StageNames,
    SectionsHeader,
    Section,
    SectionNames,
    RolesHeader,
    Role,
    FieldsHeader,
    Field,
    FieldOption,
    Count,
    ConditionsHeader,
    Condition,
    RelationshipsHeader,
    Relationship,
    PrimaryDocumentHeader,
    PrimaryDocument,
    CssAssetsHeader,
    CssAsset,
}

/// Labels of the aggregate count lines, in block order.
pub const COUNT_LABELS: [&str; 8] = [
    "## FIELD_TYPE_COUNTS",
    "## FIELD_COUNT",
    "## REQUIRED_COUNT",
    "## OPTION_COUNT",
    "## CONDITION_COUNT",
    "## MASKED_FIELDS",
    "## FORMULA_FIELDS",
    "## ATTACHMENT_FIELDS",
];

const ALL_TAGS: [LineTag; 28] = [
    LineTag::IntroPage,
    LineTag::IntroWorkflow,
    LineTag::Title,
    LineTag::Prompt,
    LineTag::TitleKeywords,
    LineTag::PageCount,
    LineTag::PageHeadings,
    LineTag::FieldClues,
    LineTag::StagesHeader,
    LineTag::StageCount,
    LineTag::Stage,
    LineTag::StageNames,
    LineTag::SectionsHeader,
    LineTag::Section,
    LineTag::SectionNames,
    LineTag::RolesHeader,
    LineTag::Role,
    LineTag::FieldsHeader,
    LineTag::Field,
    LineTag::FieldOption,
    LineTag::ConditionsHeader,
    LineTag::Condition,
    LineTag::RelationshipsHeader,
    LineTag::Relationship,
    LineTag::PrimaryDocumentHeader,
    LineTag::PrimaryDocument,
    LineTag::CssAssetsHeader,
    LineTag::CssAsset,
];

impl LineTag {
    /// Rendered prefix. Header tags render as the bare prefix; every other
    /// tag renders as prefix followed by its body.
    ///
    /// [`LineTag::Count`] has no single prefix; count lines carry one of
    /// [`COUNT_LABELS`].
    pub fn prefix(self) -> &'static str {
        match self {
            LineTag::IntroPage => "## INTRO_PDF: ",
            LineTag::IntroWorkflow => "## INTRO_WORKFLOW: ",
            LineTag::Title => "# FORM_TITLE: ",
            LineTag::Prompt => "## PROMPT: ",
            LineTag::TitleKeywords => "## TITLE_KEYWORDS: ",
            LineTag::PageCount => "## PAGE_COUNT: ",
            LineTag::PageHeadings => "## PDF_HEADINGS: ",
            LineTag::FieldClues => "## PDF_FIELD_CLUES: ",
            LineTag::StagesHeader => "## STAGES",
            LineTag::StageCount => "- STAGE_COUNT: ",
            LineTag::Stage => "- STAGE: ",
            LineTag::StageNames => "- STAGE_NAMES: ",
            LineTag::SectionsHeader => "## SECTIONS",
            LineTag::Section => "- SECTION: ",
            LineTag::SectionNames => "- SECTION_NAMES: ",
            LineTag::RolesHeader => "## ROLES",
            LineTag::Role => "- ROLE: ",
            LineTag::FieldsHeader => "## FIELDS",
            LineTag::Field => "- FIELD: ",
            LineTag::FieldOption => "  - OPTION: ",
            LineTag::Count => "",
            LineTag::ConditionsHeader => "## CONDITIONS",
            LineTag::Condition => "- CONDITION: ",
            LineTag::RelationshipsHeader => "## RELATIONSHIPS",
            LineTag::Relationship => "- RELATIONSHIP: ",
            LineTag::PrimaryDocumentHeader => "## PRIMARY_DOCUMENT",
            LineTag::PrimaryDocument => "- NAME: ",
            LineTag::CssAssetsHeader => "## CSS_ASSETS",
            LineTag::CssAsset => "- CSS_ASSET: ",
        }
    }

    pub fn is_header(self) -> bool {
        matches!(
            self,
            LineTag::StagesHeader
                | LineTag::SectionsHeader
                | LineTag::RolesHeader
                | LineTag::FieldsHeader
                | LineTag::ConditionsHeader
                | LineTag::RelationshipsHeader
                | LineTag::PrimaryDocumentHeader
                | LineTag::CssAssetsHeader
        )
    }

    pub fn is_intro(self) -> bool {
        matches!(self, LineTag::IntroPage | LineTag::IntroWorkflow)
    }

    /// Whether lines of this tag belong to the supplementary view.
    ///
    /// Intro lines are emitted into both views and count as primary once
    /// assembled.
    pub fn is_supplementary(self) -> bool {
        matches!(
            self,
            LineTag::PageCount
                | LineTag::PageHeadings
                | LineTag::FieldClues
                | LineTag::Count
                | LineTag::ConditionsHeader
                | LineTag::Condition
                | LineTag::RelationshipsHeader
                | LineTag::Relationship
                | LineTag::PrimaryDocumentHeader
                | LineTag::PrimaryDocument
                | LineTag::CssAssetsHeader
                | LineTag::CssAsset
        )
    }

    /// Recover the tag of an already-rendered line.
    ///
    /// Headers match exactly; all other tags match by prefix. Returns `None`
    /// for text this crate never emits.
    pub fn classify(line: &str) -> Option<LineTag> {
        if COUNT_LABELS
            .iter()
            .any(|label| line.strip_prefix(label).is_some_and(|rest| rest.starts_with(": ")))
        {
            return Some(LineTag::Count);
        }
        ALL_TAGS.iter().copied().find(|tag| {
            if tag.is_header() {
                line == tag.prefix()
            } else {
                line.starts_with(tag.prefix())
            }
        })
    }
}

/// A rendered line together with its category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedLine {
    pub tag: LineTag,
    pub text: String,
}

impl TaggedLine {
    pub fn new(tag: LineTag, text: impl Into<String>) -> Self {
        Self {
            tag,
            text: text.into(),
        }
    }
}

/// Ordered builder for one view.
///
/// Tracks whether an intro line was already emitted, so callers never scan
/// previous output to enforce the single-intro rule.
#[derive(Debug, Default)]
pub struct LineBuilder {
    lines: Vec<TaggedLine>,
    intro_emitted: bool,
}

impl LineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `prefix + body` for `tag`.
    pub fn push(&mut self, tag: LineTag, body: impl AsRef<str>) {
        let text = format!("{}{}", tag.prefix(), body.as_ref());
        self.lines.push(TaggedLine::new(tag, text));
    }

    /// Append a section header line.
    pub fn header(&mut self, tag: LineTag) {
        debug_assert!(tag.is_header());
        self.lines.push(TaggedLine::new(tag, tag.prefix()));
    }

    /// Put an intro line at the very top of the view.
    ///
    /// Only the first call has an effect; returns whether the line was added.
    pub fn intro(&mut self, tag: LineTag, text: &str) -> bool {
        debug_assert!(tag.is_intro());
        if self.intro_emitted || text.is_empty() {
            return false;
        }
        self.intro_emitted = true;
        let line = format!("{}{}", tag.prefix(), text);
        self.lines.insert(0, TaggedLine::new(tag, line));
        true
    }

    pub fn has_intro(&self) -> bool {
        self.intro_emitted
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn finish(self) -> Vec<TaggedLine> {
        self.lines
    }
}

/// Join line texts with `\n`.
pub fn render(lines: &[TaggedLine]) -> String {
    lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
