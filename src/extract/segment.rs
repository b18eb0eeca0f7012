//! Splitting normalized OCR text into per-coupon blocks.
//!
//! A coupon entry is anchored by its monetary discount marker: a currency
//! amount immediately followed by OFF or SAVE. The text is cut at each marker
//! position; whatever precedes the first marker is navigation chrome or page
//! boilerplate and is discarded.

use regex::Regex;
use tracing::debug;

/// Marker including SAVE variants ("$5 OFF", "$1,000 SAVE", "$4.99 off").
const MARKER_OFF_SAVE: &str = r"(?i)\$\d+(?:,\d{3})*(?:\.\d{2})?\s*(?:OFF|SAVE)";
/// OFF-only marker for flyers that never use SAVE wording.
const MARKER_OFF_ONLY: &str = r"(?i)\$\d+(?:,\d{3})*(?:\.\d{2})?\s*OFF";

/// Promotional boilerplate that shares the page with coupons but is not one.
const EXCLUDE_PATTERN: &str = r"(?i)BOOK WITH|TRAVEL|PACKAGE";

pub struct BlockSegmenter {
    marker: Regex,
    exclude: Regex,
    min_len: usize,
}

impl BlockSegmenter {
    pub fn new(min_len: usize, split_on_save: bool) -> BlockSegmenter {
        let pattern = if split_on_save {
            MARKER_OFF_SAVE
        } else {
            MARKER_OFF_ONLY
        };
        BlockSegmenter {
            marker: Regex::new(pattern).expect("marker pattern is valid"),
            exclude: Regex::new(EXCLUDE_PATTERN).expect("exclude pattern is valid"),
            min_len,
        }
    }

    /// Splits `text` into surviving coupon blocks, each collapsed to a single
    /// whitespace-normalized line. Blocks below the minimum length or matching
    /// the boilerplate exclusion are dropped.
    pub fn split(&self, text: &str) -> Vec<String> {
        let starts: Vec<usize> = self.marker.find_iter(text).map(|m| m.start()).collect();

        let mut blocks = Vec::new();
        for (i, &start) in starts.iter().enumerate() {
            let end = starts.get(i + 1).copied().unwrap_or(text.len());
            let flat = collapse_whitespace(&text[start..end]);

            if flat.chars().count() < self.min_len {
                debug!("discarding short block ({} chars)", flat.chars().count());
                continue;
            }
            if self.exclude.is_match(&flat) {
                debug!("discarding boilerplate block: {}", flat);
                continue;
            }
            if flat.chars().all(|c| !c.is_alphanumeric()) {
                continue;
            }
            blocks.push(flat);
        }
        blocks
    }
}

/// Joins lines and squeezes runs of whitespace into single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segmenter() -> BlockSegmenter {
        BlockSegmenter::new(15, true)
    }

    #[test]
    fn test_no_marker_yields_no_blocks() {
        let blocks = segmenter().split("Great deals inside\nVisit your local warehouse today");
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_text_before_first_marker_discarded() {
        let blocks = segmenter().split("Page 3 of 12\n$5 OFF Kirkland Paper Towels Limit 2");
        assert_eq!(blocks, vec!["$5 OFF Kirkland Paper Towels Limit 2"]);
    }

    #[test]
    fn test_splits_at_each_marker() {
        let text = "$5 OFF Kirkland Paper Towels Limit 2\n$10 SAVE Dyson Cordless Vacuum While supplies last";
        let blocks = segmenter().split(text);
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].starts_with("$5 OFF"));
        assert!(blocks[1].starts_with("$10 SAVE"));
    }

    #[test]
    fn test_off_only_mode_ignores_save() {
        let seg = BlockSegmenter::new(15, false);
        let text = "$5 OFF Kirkland Paper Towels and $10 SAVE Dyson Cordless Vacuum";
        let blocks = seg.split(text);
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn test_idempotent_on_single_block() {
        let text = "junk header\n$5 OFF Kirkland Paper Towels Limit 2 $19.99";
        let first = segmenter().split(text);
        assert_eq!(first.len(), 1);
        let second = segmenter().split(&first[0]);
        assert_eq!(second, first);
    }

    #[test]
    fn test_short_block_rejected() {
        let blocks = segmenter().split("$5 OFF soap");
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_boilerplate_rejected() {
        let blocks = segmenter().split("$500 OFF BOOK WITH Costco Travel vacation PACKAGE deals");
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_cents_and_commas_in_marker() {
        let text = "$1,000.00 OFF LG OLED 83 inch Television Limit 1";
        let blocks = segmenter().split(text);
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a\n\n b\tc  "), "a b c");
    }
}
