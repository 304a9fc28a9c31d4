//! Aggregate counters over a document's fields and conditions.
//!
//! Counts are pure aggregates: the same field and condition lists always
//! produce the same [`CountBlock`], regardless of how or how often the views
//! are assembled afterwards.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::lines::{LineTag, TaggedLine, COUNT_LABELS};
use crate::models::{Condition, FieldRecord};

/// Histogram key for fields without a declared type.
pub const UNTYPED: &str = "untyped";

/// The fixed set of aggregate statistics for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CountBlock {
    /// Fields per declared type, ordered by type name.
    pub field_types: BTreeMap<String, usize>,
    pub field_count: usize,
    pub required_count: usize,
    pub option_count: usize,
    pub condition_count: usize,
    pub masked_count: usize,
    pub formula_count: usize,
    pub attachment_count: usize,
}

/// Compute the count block for `fields` and `conditions`.
///
/// ```rust
/// use formtext_core::counts::synthesize;
/// use formtext_core::models::FieldRecord;
///
/// let fields = vec![FieldRecord { required: Some(true), ..Default::default() }];
/// let counts = synthesize(&fields, &[]);
/// assert_eq!(counts.field_count, 1);
/// assert_eq!(counts.required_count, 1);
/// ```
pub fn synthesize(fields: &[FieldRecord], conditions: &[Condition]) -> CountBlock {
    let mut block = CountBlock {
        field_count: fields.len(),
        condition_count: conditions.len(),
        ..CountBlock::default()
    };

    for field in fields {
        let key = if field.field_type.is_empty() {
            UNTYPED
        } else {
            field.field_type.as_str()
        };
        *block.field_types.entry(key.to_string()).or_insert(0) += 1;

        if field.required == Some(true) {
            block.required_count += 1;
        }
        if field.is_masked() {
            block.masked_count += 1;
        }
        if field.formula.is_some() {
            block.formula_count += 1;
        }
        if field.is_attachment() {
            block.attachment_count += 1;
        }
        block.option_count += field.options.len();
    }

    block
}

impl CountBlock {
    /// Render the block as tagged lines.
    ///
    /// The type histogram line is omitted when there are no fields; every
    /// other counter is always present.
    pub fn lines(&self) -> Vec<TaggedLine> {
        let mut out = Vec::with_capacity(COUNT_LABELS.len());
        if !self.field_types.is_empty() {
            let summary = self
                .field_types
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(", ");
            out.push(count_line(0, summary));
        }
        let values = [
            self.field_count,
            self.required_count,
            self.option_count,
            self.condition_count,
            self.masked_count,
            self.formula_count,
            self.attachment_count,
        ];
        for (i, value) in values.iter().enumerate() {
            out.push(count_line(i + 1, value.to_string()));
        }
        out
    }
}

fn count_line(label_index: usize, value: String) -> TaggedLine {
    TaggedLine::new(
        LineTag::Count,
        format!("{}: {}", COUNT_LABELS[label_index], value),
    )
}
