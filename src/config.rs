//! Scraper and pipeline configuration.
//!
//! Loaded from an optional JSON file at startup. Every field has a serde
//! default, so a missing or partial file still yields a working configuration.
//! The structure is passed explicitly into the components that need it;
//! nothing is global.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Which flyer a page belongs to. Hot buys get channel extraction and
/// next-page pagination; coupon books get neither.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlyerKind {
    CouponBook,
    HotBuys,
}

impl FlyerKind {
    /// Default brand catalog file for this flyer kind.
    pub fn brand_file(&self) -> &'static str {
        match self {
            FlyerKind::CouponBook => "coupon_book_brands.txt",
            FlyerKind::HotBuys => "hot_buy_brands.txt",
        }
    }

    pub fn is_hot_buy(&self) -> bool {
        matches!(self, FlyerKind::HotBuys)
    }
}

/// How a composite image is divided before OCR.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridMode {
    /// OCR the image as a single block.
    Off,
    /// Always use the width-based default grid.
    Fixed,
    /// Detect cell boundaries from edge projections, falling back to the
    /// default grid when none are found.
    Dynamic,
}

/// Binarization method used during preprocessing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Global Otsu threshold; best for clean bimodal scans.
    Otsu,
    /// Local adaptive threshold; better for unevenly lit photographs.
    Adaptive,
}

/// One ordered OCR glyph correction applied by the text normalizer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorrectionRule {
    pub from: String,
    pub to: String,
    /// Skip occurrences adjacent to digits or currency punctuation so that
    /// prices and limits survive the substitution.
    #[serde(default = "default_true")]
    pub guard_numeric: bool,
}

impl CorrectionRule {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            guard_numeric: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// HTTP fetch behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Fixed delay before each page request, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Upper bound of the uniform random jitter added to the delay.
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Pages followed per flyer before pagination gives up.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36"
        .to_string()
}

fn default_delay_ms() -> u64 {
    2000
}

fn default_jitter_ms() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_max_pages() -> usize {
    25
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            delay_ms: default_delay_ms(),
            jitter_ms: default_jitter_ms(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            max_pages: default_max_pages(),
        }
    }
}

/// Extraction pipeline tuning. The observed flyer layouts differ from month
/// to month, so the variant choices live here instead of in code paths.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_threshold_mode")]
    pub threshold: ThresholdMode,
    #[serde(default = "default_grid_mode")]
    pub grid: GridMode,
    /// Contrast multiplier applied after binarization.
    #[serde(default = "default_contrast")]
    pub contrast: f32,
    /// Minimum collapsed-whitespace length for a coupon block.
    #[serde(default = "default_min_block_len")]
    pub min_block_len: usize,
    /// Split blocks on SAVE markers as well as OFF.
    #[serde(default = "default_true")]
    pub split_on_save: bool,
    /// Similarity cutoff (0-100) for fuzzy brand matching.
    #[serde(default = "default_fuzzy_cutoff")]
    pub fuzzy_cutoff: u8,
    /// Minimum raw OCR text length for an image to be worth parsing.
    #[serde(default = "default_min_text_len")]
    pub min_text_len: usize,
    /// Ordered glyph corrections applied to raw OCR text.
    #[serde(default = "crate::extract::normalize::default_corrections")]
    pub corrections: Vec<CorrectionRule>,
}

fn default_threshold_mode() -> ThresholdMode {
    ThresholdMode::Otsu
}

fn default_grid_mode() -> GridMode {
    GridMode::Off
}

fn default_contrast() -> f32 {
    2.0
}

fn default_min_block_len() -> usize {
    15
}

fn default_fuzzy_cutoff() -> u8 {
    80
}

fn default_min_text_len() -> usize {
    20
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold_mode(),
            grid: default_grid_mode(),
            contrast: default_contrast(),
            min_block_len: default_min_block_len(),
            split_on_save: true,
            fuzzy_cutoff: default_fuzzy_cutoff(),
            min_text_len: default_min_text_len(),
            corrections: crate::extract::normalize::default_corrections(),
        }
    }
}

/// CSS selectors tried in order when discovering coupon images on a page.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageSelectors {
    #[serde(default = "default_coupon_selectors")]
    pub coupon: Vec<String>,
    #[serde(default = "default_hot_buy_selectors")]
    pub hot_buy: Vec<String>,
}

fn default_coupon_selectors() -> Vec<String> {
    vec![
        "img[src*=\"coupon\"]".to_string(),
        "div.entry-content img".to_string(),
        ".coupon-book img".to_string(),
    ]
}

fn default_hot_buy_selectors() -> Vec<String> {
    vec![
        "img[src*=\"hotbuy\"]".to_string(),
        "img[src*=\"deal\"]".to_string(),
        "div.hot-deals img".to_string(),
    ]
}

impl Default for ImageSelectors {
    fn default() -> Self {
        Self {
            coupon: default_coupon_selectors(),
            hot_buy: default_hot_buy_selectors(),
        }
    }
}

impl ImageSelectors {
    pub fn for_kind(&self, kind: FlyerKind) -> &[String] {
        match kind {
            FlyerKind::CouponBook => &self.coupon,
            FlyerKind::HotBuys => &self.hot_buy,
        }
    }
}

/// Complete configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_coupon_url")]
    pub coupon_url_template: String,
    #[serde(default = "default_hot_buys_url")]
    pub hot_buys_url_template: String,
    #[serde(default)]
    pub image_selectors: ImageSelectors,
    /// Brands assumed known when no catalog file is present.
    #[serde(default = "default_brands")]
    pub default_brands: Vec<String>,
    /// Explicit tesseract executable; PATH and common install locations are
    /// searched when unset.
    #[serde(default)]
    pub tesseract_path: Option<PathBuf>,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

fn default_coupon_url() -> String {
    "https://www.costcoinsider.com/costco-{month}-{year}-coupon-book/".to_string()
}

fn default_hot_buys_url() -> String {
    "https://www.costcoinsider.com/costco-{month}-{year}-hot-buys-coupons/".to_string()
}

fn default_brands() -> Vec<String> {
    [
        "Kirkland", "Nike", "Samsung", "Apple", "Adidas", "Sony", "LG", "Kerrygold",
        "Orgain", "Michelin", "Greenworks", "Huggies", "Woozoo", "Wonderful",
        "Yardistry", "Waterloo", "Tide", "Bounty", "Dyson", "Cuisinart",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            coupon_url_template: default_coupon_url(),
            hot_buys_url_template: default_hot_buys_url(),
            image_selectors: ImageSelectors::default(),
            default_brands: default_brands(),
            tesseract_path: None,
            fetch: FetchConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the given JSON file, or returns defaults when
    /// the path is unset, missing, or unparseable.
    pub fn load(path: Option<&Path>) -> Config {
        let Some(path) = path else {
            return Config::default();
        };

        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    info!("config loaded from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("failed to parse {}: {}. Using defaults.", path.display(), e);
                    Config::default()
                }
            },
            Err(e) => {
                warn!("failed to read {}: {}. Using defaults.", path.display(), e);
                Config::default()
            }
        }
    }

    /// Fills the `{month}`/`{year}` placeholders of a flyer URL template.
    pub fn flyer_url(&self, kind: FlyerKind, month: &str, year: i32) -> String {
        let template = match kind {
            FlyerKind::CouponBook => &self.coupon_url_template,
            FlyerKind::HotBuys => &self.hot_buys_url_template,
        };
        template
            .replace("{month}", &month.to_lowercase())
            .replace("{year}", &year.to_string())
    }
}
