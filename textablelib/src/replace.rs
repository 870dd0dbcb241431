//! Literal text replacements applied before escaping.
//!
//! Replacements come in two tiers:
//!
//! - **column rules** only apply to values of one named column and are
//!   checked first
//! - **global rules** apply to every column, except for literals that a
//!   column rule already replaced in the same call
//!
//! Within a tier, longer literals are applied first and literals of equal
//! length keep their insertion order. Matched literals are swapped for
//! placeholder tokens before the remaining text is escaped, so replacement
//! text (usually LaTeX markup) reaches the output untouched.

use indexmap::IndexMap;

use crate::escape::escape_latex;

/// Global and per-column literal replacements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replacements {
    global: IndexMap<String, String>,
    columns: IndexMap<String, IndexMap<String, String>>,
}

impl Replacements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a replacement used in every column. Re-adding a literal updates it in place.
    pub fn add_global(&mut self, literal: impl Into<String>, replacement: impl Into<String>) {
        self.global.insert(literal.into(), replacement.into());
    }

    /// Add a replacement used only for values of `column`.
    pub fn add_column(
        &mut self,
        literal: impl Into<String>,
        replacement: impl Into<String>,
        column: impl Into<String>,
    ) {
        self.columns
            .entry(column.into())
            .or_default()
            .insert(literal.into(), replacement.into());
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.columns.values().all(|rules| rules.is_empty())
    }

    /// Iterate over all literals, column rules first.
    pub fn literals(&self) -> impl Iterator<Item = &str> {
        self.columns
            .values()
            .flat_map(|rules| rules.keys())
            .chain(self.global.keys())
            .map(|s| s.as_str())
    }

    /// Look up the replacement for an exact literal, column rules first.
    pub fn get_replacement(&self, literal: &str, column: Option<&str>) -> Option<&str> {
        column
            .and_then(|c| self.columns.get(c))
            .and_then(|rules| rules.get(literal))
            .or_else(|| self.global.get(literal))
            .map(|s| s.as_str())
    }

    /// Apply all matching replacements to `text` and escape everything else.
    ///
    /// Without any matching rule this is plain [`escape_latex`].
    pub fn apply(&self, text: &str, column: Option<&str>) -> String {
        let mut working = text.to_string();
        let mut protected: Vec<&str> = Vec::new();
        let mut applied: Vec<&str> = Vec::new();

        if let Some(rules) = column.and_then(|c| self.columns.get(c)) {
            for (literal, replacement) in longest_first(rules) {
                if working.contains(literal) {
                    working = working.replace(literal, &placeholder(protected.len()));
                    protected.push(replacement);
                    applied.push(literal);
                }
            }
        }

        for (literal, replacement) in longest_first(&self.global) {
            if applied.contains(&literal) {
                continue;
            }
            if working.contains(literal) {
                working = working.replace(literal, &placeholder(protected.len()));
                protected.push(replacement);
            }
        }

        let mut out = escape_latex(&working);
        for (i, replacement) in protected.iter().enumerate() {
            out = out.replace(&placeholder(i), replacement);
        }
        out
    }
}

/// Rules sorted by descending literal length; the sort is stable so ties keep insertion order.
fn longest_first(rules: &IndexMap<String, String>) -> Vec<(&str, &str)> {
    let mut sorted: Vec<(&str, &str)> = rules
        .iter()
        .filter(|(literal, _)| !literal.is_empty())
        .map(|(l, r)| (l.as_str(), r.as_str()))
        .collect();
    sorted.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    sorted
}

/// Token standing in for the `i`th replacement.
///
/// Built from private-use code points only: no input literal or escape rule
/// can match inside it, and no token is a substring of another.
fn placeholder(i: usize) -> String {
    format!("\u{E000}{}\u{E002}", "\u{E001}".repeat(i + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_rules_escapes() {
        let replacements = Replacements::new();
        assert!(replacements.is_empty());
        assert_eq!(replacements.apply("a_b", Some("name")), r"a\_b");
    }

    #[test]
    fn test_global_replacement_is_not_escaped() {
        let mut replacements = Replacements::new();
        replacements.add_global("mu", r"$\mu$");
        assert_eq!(replacements.apply("mu_1", None), r"$\mu$\_1");
    }

    #[test]
    fn test_column_rule_beats_global() {
        let mut replacements = Replacements::new();
        replacements.add_global("pt", r"$p_{T}$");
        replacements.add_column("pt", r"\textbf{pt}", "var");

        assert_eq!(replacements.apply("pt", Some("var")), r"\textbf{pt}");
        assert_eq!(replacements.apply("pt", Some("other")), r"$p_{T}$");
        assert_eq!(replacements.apply("pt", None), r"$p_{T}$");
    }

    #[test]
    fn test_overlapping_global_does_not_touch_column_match() {
        let mut replacements = Replacements::new();
        replacements.add_global("eV", "electronvolt");
        replacements.add_column("GeV", r"\si{\giga\electronvolt}", "unit");

        assert_eq!(
            replacements.apply("GeV", Some("unit")),
            r"\si{\giga\electronvolt}"
        );
        assert_eq!(replacements.apply("GeV", Some("mass")), "Gelectronvolt");
    }

    #[test]
    fn test_longest_literal_first() {
        let mut replacements = Replacements::new();
        replacements.add_global("e", "E");
        replacements.add_global("ee", "<double>");
        assert_eq!(replacements.apply("eee", None), "<double>E");
    }

    #[test]
    fn test_equal_length_keeps_insertion_order() {
        let mut replacements = Replacements::new();
        replacements.add_global("ab", "X");
        replacements.add_global("bc", "Y");
        assert_eq!(replacements.apply("abc", None), "Xc");

        let mut reversed = Replacements::new();
        reversed.add_global("bc", "Y");
        reversed.add_global("ab", "X");
        assert_eq!(reversed.apply("abc", None), "aY");
    }

    #[test]
    fn test_digit_literal_does_not_hit_placeholder() {
        let mut replacements = Replacements::new();
        replacements.add_column("x", "[x]", "c");
        replacements.add_global("1", "one");
        replacements.add_global("2", "two");
        assert_eq!(replacements.apply("x1x", Some("c")), "[x]one[x]");
    }

    #[test]
    fn test_re_adding_updates_in_place() {
        let mut replacements = Replacements::new();
        replacements.add_global("a", "1");
        replacements.add_global("b", "2");
        replacements.add_global("a", "3");
        assert_eq!(replacements.literals().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(replacements.get_replacement("a", None), Some("3"));
    }

    #[test]
    fn test_get_replacement_hierarchy() {
        let mut replacements = Replacements::new();
        replacements.add_global("x", "global");
        replacements.add_column("x", "column", "c");
        assert_eq!(replacements.get_replacement("x", Some("c")), Some("column"));
        assert_eq!(replacements.get_replacement("x", Some("d")), Some("global"));
        assert_eq!(replacements.get_replacement("y", Some("c")), None);
    }
}
