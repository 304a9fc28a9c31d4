//! Query-side text: signal extraction from page text and query composition.
//!
//! A [`QueryExtract`] holds the signals pulled from an incoming document's
//! pages. It is turned into search input in one of two ways:
//!
//! - **Combined**: headings and field candidates are de-duplicated against
//!   each other, then `[headings, fields, semantics]` is fitted into a token
//!   budget and joined into one query text ([`compose_combined`]).
//! - **Multi-signal**: one [`SignalQuery`] per non-empty signal, each hard
//!   capped in characters and weighted for fusion ([`signal_queries`]).

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::budget::{fit_budget, truncate_chars, BudgetWarning, TokenBudget, Trim};
use crate::dedupe::dedupe_lines;
use crate::markup::collapse_whitespace;
use crate::retrieval::SignalQuery;

/// Cap on the number of field candidates kept from one document.
pub const MAX_FIELD_CANDIDATES: usize = 200;

/// Default per-signal character cap.
pub const DEFAULT_SIGNAL_CHAR_LIMIT: usize = 8000;

const FIELD_CUES: [&str; 9] = [
    ":", "?", "Number", "Name", "Date", "Address", "Type", "Select", "Describe",
];

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[•\-–\[\]()\d.\s]+").expect("valid bullet regex"));

/// Signals extracted from one document's page text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryExtract {
    pub semantics_text: String,
    pub field_candidates: Vec<String>,
    pub headings_text: String,
    pub layout_text: String,
}

impl QueryExtract {
    /// Build an extract from per-page plain text.
    pub fn from_pages(pages: &[String]) -> Self {
        let mut candidates: Vec<String> = pages
            .iter()
            .flat_map(|p| p.lines())
            .map(normalize_line)
            .filter(|l| looks_like_field(l))
            .collect();
        candidates.sort_by(|a, b| a.chars().count().cmp(&b.chars().count()).then_with(|| a.cmp(b)));
        candidates.dedup();
        candidates.truncate(MAX_FIELD_CANDIDATES);

        let headings_text = candidates
            .iter()
            .filter(|c| c.chars().count() <= 80 && (is_all_caps(c) || c.ends_with(':')))
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");

        let semantics_text = pages
            .join(" ")
            .lines()
            .map(normalize_line)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            semantics_text,
            field_candidates: candidates,
            headings_text,
            layout_text: layout_summary(pages),
        }
    }

    /// Field candidates joined one per line, optionally capped.
    pub fn fields_text(&self, limit: Option<usize>) -> String {
        let take = limit.unwrap_or(self.field_candidates.len());
        self.field_candidates
            .iter()
            .take(take)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Collapse whitespace and strip leading bullets, numbering, and brackets.
pub fn normalize_line(line: &str) -> String {
    let collapsed = collapse_whitespace(line);
    BULLET_RE.replace(&collapsed, "").to_string()
}

/// Heuristic: does a normalized line read like a form field label?
pub fn looks_like_field(line: &str) -> bool {
    let len = line.chars().count();
    if !(3..=120).contains(&len) {
        return false;
    }
    let alpha = line.chars().filter(|c| c.is_alphabetic()).count();
    if (alpha as f64) / (len as f64) < 0.35 {
        return false;
    }
    FIELD_CUES.iter().any(|cue| line.contains(cue)) || (is_all_caps(line) && len <= 40)
}

/// At least one cased letter and no lowercase ones.
fn is_all_caps(s: &str) -> bool {
    s.chars().any(char::is_uppercase) && !s.chars().any(char::is_lowercase)
}

/// Structural summary of the pages: counts only, no verbatim text.
pub fn layout_summary(pages: &[String]) -> String {
    let mut out = vec![format!("Pages: {}", pages.len())];
    for (i, page) in pages.iter().enumerate() {
        let lines: Vec<String> = page
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(normalize_line)
            .collect();
        let line_count = lines.len();
        let chars: usize = lines.iter().map(|l| l.chars().count()).sum();
        let avg_len = if line_count == 0 {
            0.0
        } else {
            chars as f64 / line_count as f64
        };
        let short_lines = lines.iter().filter(|l| l.chars().count() <= 40).count();
        let colon_lines = lines.iter().filter(|l| l.contains(':')).count();
        let formish = colon_lines as f64 >= (line_count as f64 * 0.1).max(2.0);
        out.push(format!(
            "Page {}: lines={} avg_len={:.1} short_lines={} formish={}",
            i + 1,
            line_count,
            avg_len,
            short_lines,
            formish
        ));
    }
    out.join("\n")
}

/// The parts of a combined query, in assembly order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryPart {
    Headings,
    Fields,
    Semantics,
}

impl QueryPart {
    /// Assembly order of the combined query.
    pub const ORDER: [QueryPart; 3] = [
        QueryPart::Headings,
        QueryPart::Fields,
        QueryPart::Semantics,
    ];

    pub fn index(self) -> usize {
        match self {
            QueryPart::Headings => 0,
            QueryPart::Fields => 1,
            QueryPart::Semantics => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QueryPart::Headings => "headings",
            QueryPart::Fields => "fields",
            QueryPart::Semantics => "semantics",
        }
    }
}

impl fmt::Display for QueryPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryPart {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "headings" => Ok(QueryPart::Headings),
            "fields" => Ok(QueryPart::Fields),
            "semantics" => Ok(QueryPart::Semantics),
            other => anyhow::bail!(
                "Unknown query part: {}. Use headings, fields, or semantics.",
                other
            ),
        }
    }
}

/// Options for [`compose_combined`].
#[derive(Debug, Clone)]
pub struct ComposeOptions {
    pub budget: TokenBudget,
    /// Trim order, most disposable first. Parts not listed are never trimmed.
    pub trim_priority: Vec<QueryPart>,
    pub field_limit: Option<usize>,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            budget: TokenBudget::default(),
            trim_priority: vec![QueryPart::Semantics, QueryPart::Fields, QueryPart::Headings],
            field_limit: None,
        }
    }
}

/// A combined query and how it was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Composition {
    pub text: String,
    pub headings: String,
    pub fields: String,
    pub semantics: String,
    /// Field lines dropped because they repeat a heading.
    pub deduped_lines: usize,
    pub trims: Vec<Trim>,
    pub total_tokens: usize,
    pub warning: Option<BudgetWarning>,
}

/// Build the combined, budgeted query text.
pub fn compose_combined(extract: &QueryExtract, opts: &ComposeOptions) -> Composition {
    let deduped = dedupe_lines(&extract.headings_text, &extract.fields_text(opts.field_limit));
    let parts = vec![deduped.primary, deduped.secondary, extract.semantics_text.clone()];
    let order: Vec<usize> = opts.trim_priority.iter().map(|p| p.index()).collect();
    let outcome = fit_budget(&parts, &order, &opts.budget);

    let text = outcome
        .parts
        .iter()
        .filter(|p| !p.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut parts = outcome.parts.into_iter();
    let headings = parts.next().unwrap_or_default();
    let fields = parts.next().unwrap_or_default();
    let semantics = parts.next().unwrap_or_default();

    Composition {
        text,
        headings,
        fields,
        semantics,
        deduped_lines: deduped.removed,
        trims: outcome.trims,
        total_tokens: outcome.total_tokens,
        warning: outcome.warning,
    }
}

/// Fusion weight per signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalWeights {
    pub semantics: f64,
    pub fields: f64,
    pub headings: f64,
    pub layout: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            semantics: 1.0,
            fields: 1.0,
            headings: 1.0,
            layout: 0.0,
        }
    }
}

impl SignalWeights {
    /// Weight for a signal by name; `None` for unknown names.
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "semantics" => Some(self.semantics),
            "fields" => Some(self.fields),
            "headings" => Some(self.headings),
            "layout" => Some(self.layout),
            _ => None,
        }
    }
}

/// Options for [`signal_queries`].
#[derive(Debug, Clone)]
pub struct SignalOptions {
    pub weights: SignalWeights,
    pub char_limit: usize,
    pub field_limit: Option<usize>,
}

impl Default for SignalOptions {
    fn default() -> Self {
        Self {
            weights: SignalWeights::default(),
            char_limit: DEFAULT_SIGNAL_CHAR_LIMIT,
            field_limit: None,
        }
    }
}

/// One text query per non-empty signal, each capped at `char_limit` chars.
pub fn signal_queries(extract: &QueryExtract, opts: &SignalOptions) -> Vec<SignalQuery> {
    let w = opts.weights;
    let signals = [
        ("semantics", extract.semantics_text.clone(), w.semantics),
        ("fields", extract.fields_text(opts.field_limit), w.fields),
        ("headings", extract.headings_text.clone(), w.headings),
        ("layout", extract.layout_text.clone(), w.layout),
    ];
    signals
        .into_iter()
        .filter(|(_, text, _)| !text.trim().is_empty())
        .map(|(name, text, weight)| {
            let chars = text.chars().count();
            let text = if chars > opts.char_limit {
                tracing::warn!(
                    signal = name,
                    from_chars = chars,
                    to_chars = opts.char_limit,
                    "truncating oversized signal query"
                );
                truncate_chars(&text, opts.char_limit).to_string()
            } else {
                text
            };
            SignalQuery::text(name, text, weight)
        })
        .collect()
}
