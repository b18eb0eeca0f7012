//! The image-to-record extraction pipeline.
//!
//! One image is fully preprocessed, split, recognized, and parsed before the
//! next begins. Per-cell OCR failures are logged and skipped; only a missing
//! engine aborts a run.

pub mod engine;
pub mod grid;
pub mod preprocess;

pub use engine::{OcrEngine, TextRecognizer};

use tracing::{debug, warn};

use crate::config::{Config, FlyerKind, PipelineConfig};
use crate::error::PipelineError;
use crate::extract::{BlockParser, BrandCatalog};
use crate::record::{CouponRecord, PageMeta};

pub struct Pipeline {
    config: PipelineConfig,
    engine: Box<dyn TextRecognizer>,
    parser: BlockParser,
}

impl Pipeline {
    /// Builds the pipeline for one flyer kind. Fails fast with
    /// [`PipelineError::OcrNotAvailable`] so a run aborts before any image is
    /// fetched.
    pub fn new(config: &Config, kind: FlyerKind) -> Result<Pipeline, PipelineError> {
        let engine = OcrEngine::new(config.tesseract_path.as_deref())?;
        Ok(Pipeline::with_engine(config, kind, Box::new(engine)))
    }

    /// Builds the pipeline around an explicit recognizer.
    pub fn with_engine(
        config: &Config,
        kind: FlyerKind,
        engine: Box<dyn TextRecognizer>,
    ) -> Pipeline {
        Pipeline {
            config: config.pipeline.clone(),
            engine,
            parser: BlockParser::new(&config.pipeline, kind),
        }
    }

    /// Extracts coupon records from raw image bytes. Returns
    /// [`PipelineError::NotAnImage`] when the content type or bytes are not
    /// an image; OCR failures inside produce zero records, never an error.
    pub fn extract_from_bytes(
        &self,
        bytes: &[u8],
        content_type: Option<&str>,
        catalog: &BrandCatalog,
        meta: &PageMeta,
    ) -> Result<Vec<CouponRecord>, PipelineError> {
        let decoded = preprocess::decode_image(bytes, content_type)?;
        Ok(self.extract_from_image(&decoded, catalog, meta))
    }

    /// Runs preprocessing, grid splitting, OCR, and text extraction over one
    /// decoded image.
    pub fn extract_from_image(
        &self,
        img: &image::DynamicImage,
        catalog: &BrandCatalog,
        meta: &PageMeta,
    ) -> Vec<CouponRecord> {
        let prepared = preprocess::prepare_for_ocr(img, self.config.threshold, self.config.contrast);
        let cells = grid::split_image(&prepared, self.config.grid);
        debug!("processing {} cell(s) from {}", cells.len(), meta.source_url);

        let mut records = Vec::new();
        for (i, cell) in cells.iter().enumerate() {
            let text = match self.engine.recognize(cell) {
                Ok(text) => text,
                Err(e) => {
                    warn!("skipping cell {} of {}: {}", i + 1, meta.source_url, e);
                    continue;
                }
            };
            if text.chars().count() < self.config.min_text_len {
                debug!("cell {} has too little text ({} chars)", i + 1, text.chars().count());
                continue;
            }
            records.extend(self.parser.parse(&text, catalog, meta));
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Rgb};

    struct CannedText(&'static str);

    impl TextRecognizer for CannedText {
        fn recognize(&self, _img: &GrayImage) -> Result<String, PipelineError> {
            Ok(self.0.to_string())
        }
    }

    fn png_bytes() -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::ImageBuffer::from_fn(60, 30, |x, _| {
            if x < 30 { Rgb([0u8, 0, 0]) } else { Rgb([255u8, 255, 255]) }
        }));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn meta() -> PageMeta {
        PageMeta {
            article_name: "Costco April 2025 Coupon Book".to_string(),
            publish_date: "2025-04-01".to_string(),
            source_url: "https://example.com/page1.jpg".to_string(),
            discount_period: None,
        }
    }

    fn pipeline(text: &'static str) -> Pipeline {
        Pipeline::with_engine(
            &Config::default(),
            FlyerKind::CouponBook,
            Box::new(CannedText(text)),
        )
    }

    #[test]
    fn test_non_image_content_type_is_an_error_not_a_panic() {
        let p = pipeline("$5 OFF Kirkland Paper Towels Limit 2");
        let catalog = BrandCatalog::new(["Kirkland"]);
        let err = p
            .extract_from_bytes(b"<html></html>", Some("text/html"), &catalog, &meta())
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotAnImage(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_recognized_text_flows_into_records() {
        let p = pipeline("$5 OFF Kirkland Paper Towels Limit 2");
        let catalog = BrandCatalog::new(["Kirkland"]);
        let records = p
            .extract_from_bytes(&png_bytes(), Some("image/png"), &catalog, &meta())
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].item_brand, "Kirkland");
        assert_eq!(records[0].discount, "$5 OFF");
    }

    #[test]
    fn test_short_recognized_text_yields_no_records() {
        // Below the minimum text length the cell is dropped before parsing.
        let p = pipeline("$5 OFF soap");
        let catalog = BrandCatalog::new(["Kirkland"]);
        let records = p
            .extract_from_bytes(&png_bytes(), Some("image/png"), &catalog, &meta())
            .unwrap();
        assert!(records.is_empty());
    }
}
