//! Cross-list line de-duplication.

use std::collections::HashSet;

/// Output of [`dedupe_lines`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deduped {
    pub primary: String,
    pub secondary: String,
    /// Lines dropped from the secondary list.
    pub removed: usize,
}

/// Remove from `secondary` every line already present in `primary`.
///
/// Both inputs are split into non-blank lines. The primary list is collapsed
/// first (first occurrence wins); the secondary list then loses lines seen in
/// either list before. Order is preserved; nothing is ever reordered.
///
/// ```rust
/// use formtext_core::dedupe::dedupe_lines;
///
/// let out = dedupe_lines("NAME:\nDATE:", "Email\nDATE:\nPhone");
/// assert_eq!(out.secondary, "Email\nPhone");
/// ```
pub fn dedupe_lines(primary: &str, secondary: &str) -> Deduped {
    let mut seen: HashSet<&str> = HashSet::new();

    let primary_out: Vec<&str> = primary
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter(|l| seen.insert(*l))
        .collect();

    let secondary_lines: Vec<&str> = secondary.lines().filter(|l| !l.trim().is_empty()).collect();
    let total = secondary_lines.len();
    let secondary_out: Vec<&str> = secondary_lines
        .into_iter()
        .filter(|l| seen.insert(*l))
        .collect();

    Deduped {
        primary: primary_out.join("\n"),
        removed: total - secondary_out.len(),
        secondary: secondary_out.join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_collapsed_secondary_filtered() {
        let out = dedupe_lines("A\nB\nA\n\n", "B\nC\n  \nA\nD");
        assert_eq!(out.primary, "A\nB");
        assert_eq!(out.secondary, "C\nD");
        assert_eq!(out.removed, 2);
    }

    #[test]
    fn test_order_preserved() {
        let out = dedupe_lines("z", "c\nb\na\nz");
        assert_eq!(out.secondary, "c\nb\na");
    }

    #[test]
    fn test_empty_inputs() {
        let out = dedupe_lines("", "");
        assert_eq!(out.primary, "");
        assert_eq!(out.secondary, "");
        assert_eq!(out.removed, 0);
        assert_eq!(dedupe_lines("", "x\ny").secondary, "x\ny");
    }

    #[test]
    fn test_exact_match_only() {
        let out = dedupe_lines("Name:", "name:\nName: ");
        assert_eq!(out.secondary, "name:\nName: ");
    }

    #[test]
    fn test_secondary_internal_duplicates_collapsed() {
        let out = dedupe_lines("", "x\nx\ny");
        assert_eq!(out.secondary, "x\ny");
        assert_eq!(out.removed, 1);
    }
}
