//! Error taxonomy for the extraction pipeline.
//!
//! Per-image failures (`NotAnImage`, `OcrFailed`) are recoverable: the caller
//! skips the image and keeps going. A missing OCR engine is fatal to the run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The declared content type is not an image type, or the bytes do not
    /// decode as one.
    #[error("not an image: {0}")]
    NotAnImage(String),

    /// The OCR engine failed, exited non-zero, or returned no usable text.
    #[error("OCR failed: {0}")]
    OcrFailed(String),

    /// The OCR engine could not be located or probed at startup.
    #[error("OCR engine not available: {0}")]
    OcrNotAvailable(String),
}

impl PipelineError {
    /// True for errors that must abort the whole run rather than skip one image.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PipelineError::OcrNotAvailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_missing_engine_is_fatal() {
        assert!(!PipelineError::NotAnImage("text/html".into()).is_fatal());
        assert!(!PipelineError::OcrFailed("empty output".into()).is_fatal());
        assert!(PipelineError::OcrNotAvailable("not in PATH".into()).is_fatal());
    }
}
