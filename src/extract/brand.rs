//! Brand catalog and the ordered brand-resolution strategy chain.
//!
//! Resolution tries, in order: an exact whole-word catalog hit, a fuzzy match
//! of the block's leading words against the catalog, a leading
//! capitalized-word sequence, and finally the block's first two tokens. Each
//! strategy implements the same `attempt` seam, so the chain is a list rather
//! than nested conditionals.

use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::warn;

/// Deduplicated, read-only set of known brand names, scoped per flyer kind.
#[derive(Clone, Debug, Default)]
pub struct BrandCatalog {
    brands: Vec<String>,
}

impl BrandCatalog {
    pub fn new<I, S>(brands: I) -> BrandCatalog
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        // BTreeSet dedupes and gives a deterministic iteration order.
        let set: BTreeSet<String> = brands
            .into_iter()
            .map(Into::into)
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .collect();
        BrandCatalog {
            brands: set.into_iter().collect(),
        }
    }

    /// Loads one brand per line from `path`, unioned with the supplied
    /// defaults so a sparse file never costs recall. A missing file yields
    /// just the defaults.
    pub fn load(path: &Path, defaults: &[String]) -> BrandCatalog {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let from_file = BrandCatalog::new(contents.lines());
                if from_file.is_empty() {
                    warn!("brand file {} is empty, using defaults only", path.display());
                }
                BrandCatalog::new(from_file.iter().chain(defaults.iter().map(String::as_str)))
            }
            Err(_) => {
                warn!("brand file {} not found, using defaults", path.display());
                BrandCatalog::new(defaults.iter().cloned())
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.brands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.brands.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.brands.iter().map(String::as_str)
    }
}

/// One brand-resolution heuristic. Strategies are tried in order until one
/// returns a match.
pub trait BrandStrategy {
    fn attempt(&self, text: &str, catalog: &BrandCatalog) -> Option<String>;
}

/// Whole-word, case-insensitive catalog hit anywhere in the block.
struct ExactMatch;

impl BrandStrategy for ExactMatch {
    fn attempt(&self, text: &str, catalog: &BrandCatalog) -> Option<String> {
        catalog
            .iter()
            .find(|brand| contains_word_ci(text, brand))
            .map(str::to_string)
    }
}

/// Best catalog entry by normalized Levenshtein similarity against the
/// block's leading words, accepted only at or above the cutoff.
struct FuzzyMatch {
    cutoff: u8,
}

impl BrandStrategy for FuzzyMatch {
    fn attempt(&self, text: &str, catalog: &BrandCatalog) -> Option<String> {
        let tokens: Vec<&str> = text.split_whitespace().take(3).collect();
        if tokens.is_empty() {
            return None;
        }

        let mut best: Option<(&str, u8)> = None;
        for brand in catalog.iter() {
            let brand_words = brand.split_whitespace().count().max(1);
            let head = tokens[..brand_words.min(tokens.len())].join(" ");
            let score = similarity(&head, brand);
            if score >= self.cutoff && best.is_none_or(|(_, s)| score > s) {
                best = Some((brand, score));
            }
        }
        best.map(|(brand, _)| brand.to_string())
    }
}

/// Leading run of capitalized tokens, e.g. "Dyson Cyclone" in
/// "Dyson Cyclone Cordless Vacuum $100 OFF".
struct CapitalizedPrefix {
    pattern: Regex,
}

impl CapitalizedPrefix {
    fn new() -> CapitalizedPrefix {
        CapitalizedPrefix {
            pattern: Regex::new(r"^([A-Z][A-Za-z0-9&'\-]+(?:\s+[A-Z][A-Za-z0-9&'\-]+)*)")
                .expect("capitalized prefix pattern is valid"),
        }
    }
}

impl BrandStrategy for CapitalizedPrefix {
    fn attempt(&self, text: &str, _catalog: &BrandCatalog) -> Option<String> {
        let m = self.pattern.captures(text)?;
        let candidate = m.get(1)?.as_str();
        // Long runs are product names, not brands; let the next strategy try.
        if candidate.split_whitespace().count() > 3 {
            return None;
        }
        Some(candidate.to_string())
    }
}

/// Last resort: the block's first one-to-two tokens.
struct LeadingWords;

impl BrandStrategy for LeadingWords {
    fn attempt(&self, text: &str, _catalog: &BrandCatalog) -> Option<String> {
        let head = text
            .split_whitespace()
            .take(2)
            .collect::<Vec<_>>()
            .join(" ");
        if head.is_empty() { None } else { Some(head) }
    }
}

pub struct BrandMatcher {
    strategies: Vec<Box<dyn BrandStrategy>>,
}

impl BrandMatcher {
    pub fn new(fuzzy_cutoff: u8) -> BrandMatcher {
        BrandMatcher {
            strategies: vec![
                Box::new(ExactMatch),
                Box::new(FuzzyMatch { cutoff: fuzzy_cutoff }),
                Box::new(CapitalizedPrefix::new()),
                Box::new(LeadingWords),
            ],
        }
    }

    /// Resolves the block's brand, or returns an empty string when every
    /// strategy declines.
    pub fn resolve(&self, text: &str, catalog: &BrandCatalog) -> String {
        self.strategies
            .iter()
            .find_map(|s| s.attempt(text, catalog))
            .unwrap_or_default()
    }
}

/// Case-insensitive whole-word containment: the needle's boundaries must not
/// touch alphanumeric characters.
fn contains_word_ci(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let hay = haystack.to_lowercase();
    let needle = needle.to_lowercase();

    let mut from = 0;
    while let Some(pos) = hay[from..].find(&needle) {
        let start = from + pos;
        let end = start + needle.len();
        let before_ok = hay[..start]
            .chars()
            .last()
            .is_none_or(|c| !c.is_alphanumeric());
        let after_ok = hay[end..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric());
        if before_ok && after_ok {
            return true;
        }
        from = end;
    }
    false
}

/// Levenshtein edit distance over characters.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Similarity on a 0-100 scale, case-insensitive.
fn similarity(a: &str, b: &str) -> u8 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 100;
    }
    let dist = levenshtein(&a, &b);
    (100 - (100 * dist / max_len).min(100)) as u8
}
