//! Per-block field extraction heuristics.
//!
//! Every extractor is a pure function of the block text. The discount/price
//! pair shares a currency pattern, disambiguated by adjacency: an amount
//! followed by OFF/SAVE is a discount, an amount with cents that is not is
//! the original price. The same numeric span never populates both fields.

use regex::Regex;

use crate::record::Channel;

pub struct FieldExtractor {
    discount: Regex,
    price: Regex,
    limit: Regex,
    keywords: Regex,
    bullets: Regex,
}

impl FieldExtractor {
    pub fn new() -> FieldExtractor {
        FieldExtractor {
            discount: Regex::new(r"(?i)\$[\d,]+(?:\.\d{2})?\s*(?:OFF|SAVE)")
                .expect("discount pattern is valid"),
            price: Regex::new(r"\$[\d,]+\.\d{2}").expect("price pattern is valid"),
            limit: Regex::new(r"(?i)Limit\s+\d+|While\s+supplies\s+last")
                .expect("limit pattern is valid"),
            keywords: Regex::new(r"(?i)\b(?:in-warehouse|warehouse|online|only|offer|valid)\b")
                .expect("keyword pattern is valid"),
            bullets: Regex::new(r"[*•]+|(?:^|\s)-+(?:\s|$)").expect("bullet pattern is valid"),
        }
    }

    /// The raw discount phrase, e.g. "$5 OFF".
    pub fn discount(&self, block: &str) -> Option<String> {
        self.discount.find(block).map(|m| m.as_str().to_string())
    }

    /// Digits and at most one decimal point from the discount phrase.
    pub fn discount_cleaned(discount: &str) -> String {
        let mut out = String::new();
        let mut seen_dot = false;
        for c in discount.chars() {
            if c.is_ascii_digit() {
                out.push(c);
            } else if c == '.' && !seen_dot {
                out.push(c);
                seen_dot = true;
            }
        }
        out
    }

    /// The pre-discount price: a currency amount with cents that is not
    /// followed by OFF/SAVE and does not overlap the discount span.
    pub fn price(&self, block: &str) -> Option<String> {
        let discount_span = self.discount.find(block).map(|m| (m.start(), m.end()));
        for m in self.price.find_iter(block) {
            if let Some((ds, de)) = discount_span
                && m.start() >= ds
                && m.end() <= de
            {
                continue;
            }
            let rest = block[m.end()..].trim_start();
            let upper = rest.to_uppercase();
            if upper.starts_with("OFF") || upper.starts_with("SAVE") {
                continue;
            }
            return Some(m.as_str().to_string());
        }
        None
    }

    /// "Limit N" or "While supplies last".
    pub fn limit(&self, block: &str) -> Option<String> {
        self.limit.find(block).map(|m| m.as_str().to_string())
    }

    /// Purchase channel, meaningful for hot-buy flyers only.
    pub fn channel(&self, block: &str) -> Channel {
        let lower = block.to_lowercase();
        let warehouse = lower.contains("warehouse");
        let online = lower.contains("online");
        match (warehouse, online) {
            (true, true) => Channel::InWarehouseAndOnline,
            (true, false) => Channel::InWarehouse,
            (false, true) => Channel::Online,
            (false, false) => Channel::Unspecified,
        }
    }

    /// The block text with the brand prefix, discount, limit, price, channel
    /// keywords, and bullet noise removed, whitespace collapsed, and
    /// non-alphanumeric edges trimmed.
    pub fn description(&self, block: &str, brand: &str) -> String {
        let mut desc = block.to_string();

        if !brand.is_empty() {
            desc = strip_brand_prefix(&desc, brand);
        }
        desc = self.discount.replace_all(&desc, " ").into_owned();
        desc = self.limit.replace_all(&desc, " ").into_owned();
        desc = self.price.replace_all(&desc, " ").into_owned();
        desc = self.keywords.replace_all(&desc, " ").into_owned();
        desc = self.bullets.replace_all(&desc, " ").into_owned();

        let mut desc = desc
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_string();

        // The removals can expose another brand occurrence at the front;
        // the description must never lead with the resolved brand.
        if !brand.is_empty() {
            loop {
                let stripped = strip_brand_prefix(&desc, brand);
                if stripped == desc {
                    break;
                }
                desc = stripped;
            }
        }
        truncate_chars(&desc, 200)
    }
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes a leading case-insensitive `brand` plus trailing separators.
fn strip_brand_prefix(text: &str, brand: &str) -> String {
    let brand_chars = brand.chars().count();
    let prefix: String = text.chars().take(brand_chars).collect();
    if prefix.to_lowercase() != brand.to_lowercase() {
        return text.to_string();
    }
    text.chars()
        .skip(brand_chars)
        .collect::<String>()
        .trim_start_matches([' ', ':', ',', '-'])
        .to_string()
}

/// Char-boundary-safe truncation.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: &str = "Kirkland Paper Towels $5 OFF Limit 2 $19.99 Online";

    #[test]
    fn test_discount_requires_marker_keyword() {
        let f = FieldExtractor::new();
        assert_eq!(f.discount(BLOCK).unwrap(), "$5 OFF");
        assert_eq!(f.discount("Charmin 30 rolls $28.99"), None);
    }

    #[test]
    fn test_discount_cleaned_digits_and_one_dot() {
        assert_eq!(FieldExtractor::discount_cleaned("$5 OFF"), "5");
        assert_eq!(FieldExtractor::discount_cleaned("$1,250.50 SAVE"), "1250.50");
        // Never more than one dot, whatever the OCR produced.
        let cleaned = FieldExtractor::discount_cleaned("$1.2.3 OFF");
        assert_eq!(cleaned.matches('.').count(), 1);
        assert!(cleaned.chars().all(|c| c.is_ascii_digit() || c == '.'));
    }

    #[test]
    fn test_price_not_adjacent_to_marker() {
        let f = FieldExtractor::new();
        assert_eq!(f.price(BLOCK).unwrap(), "$19.99");
        // The same span must not serve as both discount and price.
        assert_eq!(f.price("Dyson vacuum $99.99 OFF this week"), None);
    }

    #[test]
    fn test_price_requires_cents() {
        let f = FieldExtractor::new();
        assert_eq!(f.price("Dyson vacuum $99 each"), None);
    }

    #[test]
    fn test_limit_variants() {
        let f = FieldExtractor::new();
        assert_eq!(f.limit("tide pods Limit 2 per member").unwrap(), "Limit 2");
        assert_eq!(
            f.limit("Dyson while supplies LAST").unwrap(),
            "while supplies LAST"
        );
        assert_eq!(f.limit("no restrictions here"), None);
    }

    #[test]
    fn test_channel_mapping() {
        let f = FieldExtractor::new();
        assert_eq!(f.channel("In-Warehouse special"), Channel::InWarehouse);
        assert_eq!(f.channel("ONLINE only"), Channel::Online);
        assert_eq!(
            f.channel("valid In-Warehouse + Online"),
            Channel::InWarehouseAndOnline
        );
        assert_eq!(f.channel("Kirkland towels"), Channel::Unspecified);
    }

    #[test]
    fn test_description_strips_everything() {
        let f = FieldExtractor::new();
        let desc = f.description(BLOCK, "Kirkland");
        assert!(desc.contains("Paper Towels"), "got: {desc}");
        let lower = desc.to_lowercase();
        assert!(!lower.contains("kirkland"));
        assert!(!lower.contains("$5 off"));
        assert!(!lower.contains("limit 2"));
        assert!(!lower.contains("online"));
        assert!(!lower.contains("$19.99"));
    }

    #[test]
    fn test_description_never_leads_with_brand() {
        let f = FieldExtractor::new();
        let desc = f.description("KIRKLAND Kirkland Signature Batteries $4 OFF", "Kirkland");
        assert!(!desc.to_lowercase().starts_with("kirkland"), "got: {desc}");
    }

    #[test]
    fn test_description_trims_punctuation_edges() {
        let f = FieldExtractor::new();
        let desc = f.description("** Bounty paper towels, 12 rolls **", "");
        assert_eq!(desc, "Bounty paper towels, 12 rolls");
    }

    #[test]
    fn test_strip_brand_prefix_case_insensitive() {
        assert_eq!(
            strip_brand_prefix("KIRKLAND - Paper Towels", "Kirkland"),
            "Paper Towels"
        );
        assert_eq!(strip_brand_prefix("Bounty towels", "Kirkland"), "Bounty towels");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("ab", 10), "ab");
    }
}
