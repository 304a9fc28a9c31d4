//! Core data models: the workflow document tree and optional page context.
//!
//! Workflow documents arrive as loosely-shaped JSON. [`WorkflowDocument::from_value`]
//! reads the known collections out of that JSON, normalizes every free-text value
//! through [`strip_markup`](crate::markup::strip_markup), and skips individual
//! entries whose shape is wrong instead of rejecting the whole document.
//!
//! The parsed document is read-only input to the emitter; all derived text is
//! built fresh from it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::markup::{opt_text, value_text};

/// A workflow stage, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub id: String,
    pub label: String,
}

/// A workflow section.
///
/// Sections come either as a bare label or as a map carrying the owning
/// stage and group alongside the label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    Labeled {
        id: String,
        label: String,
    },
    Detailed {
        id: String,
        label: String,
        stage: Option<String>,
        group: Option<String>,
    },
}

impl Section {
    pub fn label(&self) -> &str {
        match self {
            Section::Labeled { label, .. } | Section::Detailed { label, .. } => label,
        }
    }
}

/// A participant role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub name: String,
}

/// One input field of the workflow.
///
/// Optional attributes are `None` when absent so the emitter can omit them;
/// boolean flags keep `Some(false)` because an explicit `false` is meaningful.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRecord {
    pub field_type: String,
    pub label: String,
    pub stage: Option<String>,
    pub group: Option<String>,
    pub summary_key: Option<String>,
    pub help: Option<String>,
    pub placeholder: Option<String>,
    pub default: Option<String>,
    pub width: Option<String>,
    pub required: Option<bool>,
    pub show_by_default: Option<bool>,
    pub read_only: Option<bool>,
    pub mask: Option<String>,
    pub regex: Option<String>,
    pub formula: Option<String>,
    /// Option labels, already stripped; options without a label are dropped.
    pub options: Vec<String>,
}

impl FieldRecord {
    /// True when the field carries an input mask or a validation pattern.
    pub fn is_masked(&self) -> bool {
        self.mask.is_some() || self.regex.is_some()
    }

    /// True when the declared type names a file/attachment input.
    pub fn is_attachment(&self) -> bool {
        self.field_type.to_lowercase().contains("file")
    }

    /// True when the declared type names a rich-text (HTML) block.
    pub fn is_rich_text(&self) -> bool {
        self.field_type.to_lowercase().contains("html")
    }
}

/// A normalized visibility/logic condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Structured {
        label: String,
        targets: Vec<String>,
        operator: String,
        value: String,
        expression: String,
        /// Compact JSON of the source entry, used when every attribute is empty.
        raw: String,
    },
    Plain(String),
}

/// The parsed workflow document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowDocument {
    pub title: String,
    pub prompt: String,
    pub page_count: Option<u64>,
    pub stages: Vec<Stage>,
    /// Number of stage labels, or of stage configs when no labels exist.
    pub stage_count: usize,
    pub sections: Vec<Section>,
    pub roles: Vec<Role>,
    pub fields: Vec<FieldRecord>,
    pub conditions: Vec<Condition>,
    pub relationships: Vec<String>,
    pub primary_document: Option<String>,
    pub css_assets: Vec<String>,
}

impl WorkflowDocument {
    /// Parse a document from JSON text.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(&value))
    }

    /// Build a document from an arbitrary JSON value.
    ///
    /// A non-object root yields an empty document.
    pub fn from_value(value: &Value) -> Self {
        let Some(root) = value.as_object() else {
            tracing::debug!("workflow root is not an object; using an empty document");
            return Self::default();
        };

        let title = first_text(root, &["template_name", "page_title"]).unwrap_or_default();
        let prompt = opt_text(root.get("prompt")).unwrap_or_default();
        let page_count = ["page_count", "PageCount"]
            .iter()
            .find_map(|key| root.get(*key).and_then(as_count))
            .filter(|n| *n > 0);

        let stages: Vec<Stage> = entries(root.get("stage_labels"))
            .map(|(id, v)| Stage {
                id,
                label: label_of(v),
            })
            .collect();
        let stage_count = if stages.is_empty() {
            root.get("stage_configs")
                .and_then(Value::as_array)
                .map_or(0, Vec::len)
        } else {
            stages.len()
        };

        let sections = entries(root.get("section_labels"))
            .map(|(id, v)| parse_section(id, v))
            .collect();

        let roles = list(root.get("roles"))
            .filter_map(|v| match v {
                Value::Object(map) => Some(Role {
                    name: opt_text(map.get("name")).unwrap_or_default(),
                }),
                _ => {
                    tracing::debug!("skipping malformed role entry");
                    None
                }
            })
            .collect();

        let fields = list(root.get("fields"))
            .filter_map(|v| match v {
                Value::Object(map) => Some(parse_field(map)),
                _ => {
                    tracing::debug!("skipping malformed field entry");
                    None
                }
            })
            .collect();

        let conditions = list(root.get("conditions")).filter_map(parse_condition).collect();

        let relationships = list(root.get("relationships"))
            .map(value_text)
            .filter(|s| !s.is_empty())
            .collect();

        let primary_document = root
            .get("primary_document")
            .and_then(Value::as_object)
            .and_then(|m| opt_text(m.get("name")));

        let css_assets = list(root.get("css_assets"))
            .filter_map(|v| match v {
                Value::Object(map) => first_text(map, &["name", "url"]),
                Value::Array(_) => None,
                other => Some(value_text(other)).filter(|s| !s.is_empty()),
            })
            .collect();

        Self {
            title,
            prompt,
            page_count,
            stages,
            stage_count,
            sections,
            roles,
            fields,
            conditions,
            relationships,
            primary_document,
            css_assets,
        }
    }
}

/// Optional context derived from the document's rendered pages.
///
/// Produced by an external text-extraction collaborator. Every member may be
/// missing; an all-default value behaves exactly like no context at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageContext {
    pub page_count: Option<u64>,
    #[serde(alias = "intro_pdf")]
    pub intro_text: Option<String>,
    #[serde(alias = "pdf_headings")]
    pub headings: Vec<String>,
    #[serde(alias = "pdf_field_clues")]
    pub field_clues: Vec<String>,
}

impl PageContext {
    pub fn is_empty(&self) -> bool {
        self.page_count.is_none()
            && self.intro_text.as_deref().map_or(true, |s| s.trim().is_empty())
            && self.headings.is_empty()
            && self.field_clues.is_empty()
    }
}

/// Iterate `(id, value)` pairs of an object, or `(index, value)` of an array.
fn entries(value: Option<&Value>) -> Box<dyn Iterator<Item = (String, &Value)> + '_> {
    match value {
        Some(Value::Object(map)) => Box::new(map.iter().map(|(k, v)| (k.clone(), v))),
        Some(Value::Array(items)) => {
            Box::new(items.iter().enumerate().map(|(i, v)| (i.to_string(), v)))
        }
        _ => Box::new(std::iter::empty()),
    }
}

fn list(value: Option<&Value>) -> std::slice::Iter<'_, Value> {
    let empty: &[Value] = &[];
    match value {
        Some(Value::Array(items)) => items.iter(),
        _ => empty.iter(),
    }
}

fn first_text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| opt_text(map.get(*key)))
}

fn label_of(value: &Value) -> String {
    match value {
        Value::Object(map) => opt_text(map.get("Label")).unwrap_or_default(),
        other => value_text(other),
    }
}

fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_flag(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Null => None,
        Value::Bool(b) => Some(*b),
        Value::Number(n) => Some(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" | "y" => Some(true),
            "false" | "no" | "0" | "n" | "" => Some(false),
            _ => Some(true),
        },
        Value::Array(items) => Some(!items.is_empty()),
        Value::Object(map) => Some(!map.is_empty()),
    }
}

fn parse_section(id: String, value: &Value) -> Section {
    match value {
        Value::Object(map) => Section::Detailed {
            id,
            label: opt_text(map.get("Label")).unwrap_or_default(),
            stage: opt_text(map.get("Stage")),
            group: opt_text(map.get("Group")),
        },
        other => Section::Labeled {
            id,
            label: value_text(other),
        },
    }
}

fn parse_field(map: &Map<String, Value>) -> FieldRecord {
    let width = opt_text(map.get("Width")).filter(|w| w != "0" && w != "false");
    let option_labels: Vec<String> = match map.get("Options") {
        Some(Value::Array(items)) => items.iter().map(label_of).collect(),
        Some(Value::Object(entries)) => entries.values().map(label_of).collect(),
        _ => Vec::new(),
    };
    let options = option_labels
        .into_iter()
        .filter(|label| !label.is_empty())
        .collect();

    FieldRecord {
        field_type: map.get("Type").map(value_text).unwrap_or_default(),
        label: opt_text(map.get("Label")).unwrap_or_default(),
        stage: opt_text(map.get("Stage")),
        group: opt_text(map.get("Group")),
        summary_key: opt_text(map.get("SummaryKey")),
        help: first_text(map, &["HelpText", "Tooltip"]),
        placeholder: opt_text(map.get("Placeholder")),
        default: opt_text(map.get("DefaultValue")),
        width,
        required: as_flag(map.get("Required")),
        show_by_default: as_flag(map.get("ShowByDefault")),
        read_only: as_flag(map.get("ReadOnly")),
        mask: first_text(map, &["Mask", "InputMask"]).filter(|m| m != "false"),
        regex: opt_text(map.get("RegexPattern")),
        formula: opt_text(map.get("Formula")),
        options,
    }
}

fn parse_condition(value: &Value) -> Option<Condition> {
    match value {
        Value::Object(map) => {
            let targets = ["Target", "TargetField", "Targets"]
                .iter()
                .find_map(|key| map.get(*key).filter(|v| is_truthy(v)))
                .map(|v| match v {
                    Value::Array(items) => items
                        .iter()
                        .map(value_text)
                        .filter(|t| !t.is_empty())
                        .collect(),
                    Value::String(_) | Value::Number(_) => vec![value_text(v)],
                    _ => Vec::new(),
                })
                .unwrap_or_default();
            Some(Condition::Structured {
                label: opt_text(map.get("Label")).unwrap_or_default(),
                targets,
                operator: opt_text(map.get("Operator")).unwrap_or_default(),
                value: opt_text(map.get("Value")).unwrap_or_default(),
                expression: opt_text(map.get("Expression")).unwrap_or_default(),
                raw: value.to_string(),
            })
        }
        Value::Array(_) | Value::Null => {
            tracing::debug!("skipping malformed condition entry");
            None
        }
        other => Some(value_text(other))
            .filter(|s| !s.is_empty())
            .map(Condition::Plain),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_object_root_is_empty() {
        let doc = WorkflowDocument::from_value(&json!([1, 2, 3]));
        assert_eq!(doc, WorkflowDocument::default());
    }

    #[test]
    fn test_title_falls_back_to_page_title() {
        let doc = WorkflowDocument::from_value(&json!({"page_title": "<h1>Permit</h1>"}));
        assert_eq!(doc.title, "Permit");
    }

    #[test]
    fn test_stage_order_preserved_for_objects() {
        let doc = WorkflowDocument::from_json(
            r#"{"stage_labels": {"9": "Intake", "2": {"Label": "Review"}, "5": ""}}"#,
        )
        .unwrap();
        let ids: Vec<&str> = doc.stages.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["9", "2", "5"]);
        assert_eq!(doc.stages[1].label, "Review");
        assert_eq!(doc.stage_count, 3);
    }

    #[test]
    fn test_stage_count_from_configs() {
        let doc = WorkflowDocument::from_value(&json!({"stage_configs": [{}, {}]}));
        assert!(doc.stages.is_empty());
        assert_eq!(doc.stage_count, 2);
    }

    #[test]
    fn test_sections_both_shapes() {
        let doc = WorkflowDocument::from_value(&json!({
            "section_labels": {
                "s1": "Contact",
                "s2": {"Label": "Payment", "Stage": 1, "Group": "g"}
            }
        }));
        assert_eq!(
            doc.sections[0],
            Section::Labeled { id: "s1".into(), label: "Contact".into() }
        );
        assert_eq!(
            doc.sections[1],
            Section::Detailed {
                id: "s2".into(),
                label: "Payment".into(),
                stage: Some("1".into()),
                group: Some("g".into()),
            }
        );
    }

    #[test]
    fn test_malformed_fields_skipped() {
        let doc = WorkflowDocument::from_value(&json!({
            "fields": ["oops", {"Type": "text", "Label": "Name"}, 7, null]
        }));
        assert_eq!(doc.fields.len(), 1);
        assert_eq!(doc.fields[0].label, "Name");
    }

    #[test]
    fn test_field_attributes() {
        let doc = WorkflowDocument::from_value(&json!({
            "fields": [{
                "Type": "FileUpload",
                "Label": "<b>Proof</b>",
                "Tooltip": "Upload a scan",
                "Required": false,
                "ReadOnly": "true",
                "Width": 0,
                "InputMask": "999",
                "Options": [{"Label": "A"}, {"Label": ""}, "B"]
            }]
        }));
        let f = &doc.fields[0];
        assert_eq!(f.label, "Proof");
        assert_eq!(f.help.as_deref(), Some("Upload a scan"));
        assert_eq!(f.required, Some(false));
        assert_eq!(f.read_only, Some(true));
        assert_eq!(f.show_by_default, None);
        assert_eq!(f.width, None);
        assert_eq!(f.mask.as_deref(), Some("999"));
        assert_eq!(f.options, vec!["A".to_string(), "B".to_string()]);
        assert!(f.is_masked());
        assert!(f.is_attachment());
    }

    #[test]
    fn test_options_as_object() {
        let doc = WorkflowDocument::from_value(&json!({
            "fields": [{"Type": "select", "Options": {"y": "Yes", "n": {"Label": "No"}}}]
        }));
        assert_eq!(doc.fields[0].options, vec!["Yes".to_string(), "No".to_string()]);
    }

    #[test]
    fn test_conditions_normalized() {
        let doc = WorkflowDocument::from_value(&json!({
            "conditions": [
                {"Label": "Show spouse", "Targets": ["f1", "", "f2"], "Operator": "eq", "Value": "married"},
                "Plain rule",
                "",
                ["bad"],
                {"TargetField": 12}
            ]
        }));
        assert_eq!(doc.conditions.len(), 3);
        match &doc.conditions[0] {
            Condition::Structured { targets, operator, .. } => {
                assert_eq!(targets, &vec!["f1".to_string(), "f2".to_string()]);
                assert_eq!(operator, "eq");
            }
            other => panic!("unexpected condition {:?}", other),
        }
        assert_eq!(doc.conditions[1], Condition::Plain("Plain rule".into()));
        match &doc.conditions[2] {
            Condition::Structured { targets, .. } => assert_eq!(targets, &vec!["12".to_string()]),
            other => panic!("unexpected condition {:?}", other),
        }
    }

    #[test]
    fn test_css_and_primary_document() {
        let doc = WorkflowDocument::from_value(&json!({
            "primary_document": {"name": "Form 7"},
            "css_assets": [{"url": "/theme.css"}, "base.css", {"name": ""}]
        }));
        assert_eq!(doc.primary_document.as_deref(), Some("Form 7"));
        assert_eq!(doc.css_assets, vec!["/theme.css".to_string(), "base.css".to_string()]);
    }

    #[test]
    fn test_page_context_aliases() {
        let ctx: PageContext = serde_json::from_value(json!({
            "page_count": 2,
            "intro_pdf": "Welcome",
            "pdf_headings": ["APPLICATION"],
            "pdf_field_clues": ["date"]
        }))
        .unwrap();
        assert_eq!(ctx.page_count, Some(2));
        assert_eq!(ctx.intro_text.as_deref(), Some("Welcome"));
        assert!(!ctx.is_empty());
        assert!(PageContext::default().is_empty());
    }
}
