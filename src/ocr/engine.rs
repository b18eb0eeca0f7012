//! Tesseract subprocess wrapper.
//!
//! The engine is treated as a pure `image -> text` function that may fail.
//! Availability is probed exactly once at construction; a missing engine is
//! fatal to the run, while per-image failures are skippable.

use image::GrayImage;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::PipelineError;

/// Well-known install locations checked after the configured path and PATH.
#[cfg(windows)]
const COMMON_PATHS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
];
#[cfg(not(windows))]
const COMMON_PATHS: &[&str] = &[
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
];

/// Image-to-text recognition seam. The production implementation shells out
/// to tesseract; tests substitute a canned recognizer.
pub trait TextRecognizer {
    fn recognize(&self, img: &GrayImage) -> Result<String, PipelineError>;
}

#[derive(Debug)]
pub struct OcrEngine {
    executable: PathBuf,
}

impl OcrEngine {
    /// Locates tesseract and probes it with `--version`.
    pub fn new(configured: Option<&Path>) -> Result<OcrEngine, PipelineError> {
        let executable = find_tesseract(configured).ok_or_else(|| {
            PipelineError::OcrNotAvailable(
                "tesseract executable not found; install Tesseract-OCR or set tesseract_path"
                    .to_string(),
            )
        })?;

        let probe = Command::new(&executable)
            .arg("--version")
            .output()
            .map_err(|e| PipelineError::OcrNotAvailable(e.to_string()))?;
        if !probe.status.success() {
            return Err(PipelineError::OcrNotAvailable(format!(
                "{} --version exited with {}",
                executable.display(),
                probe.status
            )));
        }

        let version = String::from_utf8_lossy(&probe.stdout);
        debug!(
            "using {} ({})",
            executable.display(),
            version.lines().next().unwrap_or("unknown version")
        );
        Ok(OcrEngine { executable })
    }
}

impl TextRecognizer for OcrEngine {
    /// Recognizes one preprocessed image. Page segmentation mode 6 assumes a
    /// single uniform block of text, which fits an isolated coupon cell.
    fn recognize(&self, img: &GrayImage) -> Result<String, PipelineError> {
        let input = NamedTempFile::with_suffix(".png")
            .map_err(|e| PipelineError::OcrFailed(e.to_string()))?;
        img.save(input.path())
            .map_err(|e| PipelineError::OcrFailed(e.to_string()))?;

        let output = Command::new(&self.executable)
            .arg(input.path())
            .arg("stdout")
            .arg("-l")
            .arg("eng")
            .arg("--oem")
            .arg("3")
            .arg("--psm")
            .arg("6")
            .arg("-c")
            .arg("preserve_interword_spaces=1")
            .output()
            .map_err(|e| PipelineError::OcrFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::OcrFailed(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            return Err(PipelineError::OcrFailed("engine returned empty text".to_string()));
        }
        Ok(text)
    }
}

/// Checks the configured path, then PATH, then common install locations.
fn find_tesseract(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        return None;
    }

    if Command::new("tesseract")
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
    {
        return Some(PathBuf::from("tesseract"));
    }

    COMMON_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}
