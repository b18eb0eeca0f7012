//! Deterministic glyph correction for raw OCR text.
//!
//! Tesseract confuses a handful of glyphs on small printed flyer text
//! (vertical bar for I, doubled v for W). Corrections are an explicit ordered
//! list so a scrape can inject its own table; the default is deliberately
//! conservative, and each rule guards numeric context by default so that
//! prices like `$19.99` and limits like `Limit 2` are never rewritten.

use crate::config::CorrectionRule;

/// The default correction table. Only substitutions that cannot corrupt a
/// currency amount or a count are enabled out of the box.
pub fn default_corrections() -> Vec<CorrectionRule> {
    vec![
        CorrectionRule::new("|", "I"),
        CorrectionRule::new("vv", "W"),
    ]
}

/// Applies the ordered correction table to `text`. Rules are applied in
/// sequence, each seeing the output of the previous one.
pub fn correct_text(text: &str, rules: &[CorrectionRule]) -> String {
    let mut result = text.to_string();
    for rule in rules {
        if rule.from.is_empty() {
            continue;
        }
        result = apply_rule(&result, rule);
    }
    result
}

/// True for characters that mark a numeric or currency span. A guarded rule
/// leaves occurrences touching one of these alone.
fn is_numeric_context(c: char) -> bool {
    c.is_ascii_digit() || c == '$' || c == '.'
}

fn apply_rule(text: &str, rule: &CorrectionRule) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find(&rule.from) {
        let (before, tail) = rest.split_at(pos);
        out.push_str(before);
        let after = &tail[rule.from.len()..];

        let guarded = rule.guard_numeric
            && (before.chars().last().is_some_and(is_numeric_context)
                || after.chars().next().is_some_and(is_numeric_context));

        if guarded {
            out.push_str(&rule.from);
        } else {
            out.push_str(&rule.to);
        }
        rest = after;
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_becomes_i() {
        let rules = default_corrections();
        assert_eq!(correct_text("K|rkland", &rules), "KIrkland");
    }

    #[test]
    fn test_doubled_v_becomes_w() {
        let rules = default_corrections();
        assert_eq!(correct_text("vvaterloo Sparkling", &rules), "Waterloo Sparkling");
    }

    #[test]
    fn test_numeric_context_untouched() {
        // A bar misread between digits must not become an I.
        let rules = default_corrections();
        assert_eq!(correct_text("$19|99", &rules), "$19|99");
        assert_eq!(correct_text("Limit 2|", &rules), "Limit 2|");
    }

    #[test]
    fn test_unguarded_rule_rewrites_digits() {
        let rules = vec![CorrectionRule {
            from: "0".to_string(),
            to: "O".to_string(),
            guard_numeric: false,
        }];
        assert_eq!(correct_text("B0UNTY $10 OFF", &rules), "BOUNTY $1O OFF");
    }

    #[test]
    fn test_guarded_digit_rule_preserves_prices() {
        let rules = vec![CorrectionRule::new("1", "I")];
        // Both occurrences of 1 touch other digits or a dollar sign.
        assert_eq!(correct_text("$19.99 Limit 12", &rules), "$19.99 Limit 12");
    }

    #[test]
    fn test_rules_apply_in_order() {
        let rules = vec![
            CorrectionRule::new("a", "b"),
            CorrectionRule::new("b", "c"),
        ];
        assert_eq!(correct_text("a", &rules), "c");
    }

    #[test]
    fn test_empty_rule_ignored() {
        let rules = vec![CorrectionRule::new("", "X")];
        assert_eq!(correct_text("unchanged", &rules), "unchanged");
    }
}
