//! Text-to-record extraction: glyph correction, block segmentation, field
//! extraction, brand resolution, and record assembly.

pub mod brand;
pub mod fields;
pub mod normalize;
pub mod segment;

pub use brand::{BrandCatalog, BrandMatcher};
pub use segment::BlockSegmenter;

use chrono::Local;
use tracing::debug;

use crate::config::{FlyerKind, PipelineConfig};
use crate::record::{Channel, CouponRecord, PageMeta};
use fields::FieldExtractor;

/// Validity window used when neither the page nor the caller provides one.
pub const PERIOD_NOT_SPECIFIED: &str = "Not specified";

/// Turns normalized OCR text into coupon records for one flyer kind.
pub struct BlockParser {
    kind: FlyerKind,
    segmenter: BlockSegmenter,
    matcher: BrandMatcher,
    fields: FieldExtractor,
    corrections: Vec<crate::config::CorrectionRule>,
}

impl BlockParser {
    pub fn new(config: &PipelineConfig, kind: FlyerKind) -> BlockParser {
        BlockParser {
            kind,
            segmenter: BlockSegmenter::new(config.min_block_len, config.split_on_save),
            matcher: BrandMatcher::new(config.fuzzy_cutoff),
            fields: FieldExtractor::new(),
            corrections: config.corrections.clone(),
        }
    }

    /// Runs the whole text side of the pipeline: correction, segmentation,
    /// then one record per surviving block.
    pub fn parse(&self, raw_text: &str, catalog: &BrandCatalog, meta: &PageMeta) -> Vec<CouponRecord> {
        let corrected = normalize::correct_text(raw_text, &self.corrections);
        let blocks = self.segmenter.split(&corrected);
        debug!("{} candidate blocks from {} chars of OCR text", blocks.len(), corrected.len());

        blocks
            .iter()
            .map(|block| self.extract_block(block, catalog, meta))
            .collect()
    }

    /// Extracts every field from one block and merges in the page metadata.
    /// No field is ever omitted; absent values are empty strings.
    pub fn extract_block(&self, block: &str, catalog: &BrandCatalog, meta: &PageMeta) -> CouponRecord {
        let item_brand = self.matcher.resolve(block, catalog);
        let discount = self.fields.discount(block).unwrap_or_default();
        let discount_cleaned = FieldExtractor::discount_cleaned(&discount);
        let count_limit = self.fields.limit(block).unwrap_or_default();
        let item_original_price = self.fields.price(block).unwrap_or_default();
        let channel = if self.kind.is_hot_buy() {
            self.fields.channel(block)
        } else {
            Channel::Unspecified
        };
        let item_description = self.fields.description(block, &item_brand);
        let discount_period = meta
            .discount_period
            .clone()
            .unwrap_or_else(|| PERIOD_NOT_SPECIFIED.to_string());

        CouponRecord {
            scrape_timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            article_name: meta.article_name.clone(),
            publish_date: meta.publish_date.clone(),
            item_brand: fields::truncate_chars(&item_brand, 50),
            item_description,
            discount,
            discount_cleaned,
            count_limit,
            channel,
            discount_period,
            item_original_price,
            source_url: meta.source_url.clone(),
        }
    }
}
