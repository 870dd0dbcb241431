//! LaTeX escaping for plain text.

/// Special literals and their LaTeX-safe replacements.
///
/// Kept sorted longest literal first; [`escape_latex`] tries them in order at
/// every position.
pub const LATEX_ESCAPE_RULES: &[(&str, &str)] = &[
    ("&", r"\&"),
    ("%", r"\%"),
    ("$", r"\$"),
    ("#", r"\#"),
    ("_", r"\_"),
    ("{", r"\{"),
    ("}", r"\}"),
    ("~", r"\textasciitilde{}"),
    ("^", r"\^{}"),
    ("\\", r"\textbackslash{}"),
    ("<", r"\textless{}"),
    (">", r"\textgreater{}"),
];

/// Escape text so it can be embedded in LaTeX markup.
///
/// The input is scanned once from left to right, so every input character
/// takes part in at most one substitution and escaped output is never
/// escaped again.
pub fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    'scan: while let Some(c) = rest.chars().next() {
        for (literal, replacement) in LATEX_ESCAPE_RULES {
            if rest.starts_with(literal) {
                out.push_str(replacement);
                rest = &rest[literal.len()..];
                continue 'scan;
            }
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_sorted_longest_first() {
        let lengths: Vec<usize> = LATEX_ESCAPE_RULES.iter().map(|(l, _)| l.len()).collect();
        let mut sorted = lengths.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(lengths, sorted);
    }

    #[test]
    fn test_every_literal_is_escaped() {
        for (literal, replacement) in LATEX_ESCAPE_RULES {
            let text = format!("a{}b", literal);
            let escaped = escape_latex(&text);
            assert_eq!(escaped, format!("a{}b", replacement), "literal {literal}");
        }
    }

    #[test]
    fn test_no_raw_specials_left() {
        let escaped = escape_latex("50% of $x_1 & y^2");
        assert_eq!(escaped, r"50\% of \$x\_1 \& y\^{}2");
    }

    #[test]
    fn test_backslash_not_double_escaped() {
        // the braces produced for '\' must not be escaped again
        assert_eq!(escape_latex("a\\b"), r"a\textbackslash{}b");
        assert_eq!(escape_latex("{}"), r"\{\}");
    }

    #[test]
    fn test_plain_text_is_unchanged() {
        for text in ["", "hello world", "Zürich 12.5 (GeV)", "a-b+c=d"] {
            assert_eq!(escape_latex(text), text);
            assert_eq!(escape_latex(&escape_latex(text)), text);
        }
    }

    #[test]
    fn test_comparison_signs_are_terminated() {
        assert_eq!(escape_latex("a<b>c"), r"a\textless{}b\textgreater{}c");
    }
}
