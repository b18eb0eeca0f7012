//! Blocking HTTP client with retries, delay, and jitter.
//!
//! The flyer site tolerates polite scrapers: every page request waits a fixed
//! delay plus random jitter, and image downloads carry the page URL as the
//! Referer. All timeouts live here; the extraction core never waits on the
//! network.

use anyhow::{Context, Result};
use rand::Rng;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, REFERER};
use std::time::Duration;
use tracing::{error, warn};

use crate::config::FetchConfig;

/// Raw downloaded image bytes plus the server's declared content type. The
/// pipeline, not the client, decides whether the content type is acceptable.
#[derive(Clone, Debug)]
pub struct DownloadedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    pub fn new(config: &FetchConfig) -> Result<FetchClient> {
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(FetchClient {
            http,
            config: config.clone(),
        })
    }

    /// Fetches a page body, retrying up to the configured attempt count.
    pub fn get_page(&self, url: &str) -> Result<String> {
        for attempt in 1..=self.config.max_retries {
            self.pause();
            match self.try_get_text(url) {
                Ok(body) => return Ok(body),
                Err(e) => {
                    warn!("attempt {}/{} failed for {}: {}", attempt, self.config.max_retries, url, e);
                }
            }
        }
        error!("failed to fetch {} after {} attempts", url, self.config.max_retries);
        anyhow::bail!("failed to fetch {url} after {} attempts", self.config.max_retries)
    }

    /// Downloads an image with the page URL as Referer. The declared content
    /// type is passed through untouched for the pipeline to judge.
    pub fn download_image(&self, url: &str, referer: &str) -> Result<DownloadedImage> {
        for attempt in 1..=self.config.max_retries {
            match self.try_get_image(url, referer) {
                Ok(img) => return Ok(img),
                Err(e) => {
                    warn!("attempt {}/{} failed for image {}: {}", attempt, self.config.max_retries, url, e);
                }
            }
        }
        anyhow::bail!("failed to download {url} after {} attempts", self.config.max_retries)
    }

    fn try_get_text(&self, url: &str) -> Result<String> {
        let response = self.http.get(url).send()?.error_for_status()?;
        Ok(response.text()?)
    }

    fn try_get_image(&self, url: &str, referer: &str) -> Result<DownloadedImage> {
        let response = self
            .http
            .get(url)
            .header(REFERER, referer)
            .send()?
            .error_for_status()?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes()?.to_vec();
        Ok(DownloadedImage { bytes, content_type })
    }

    /// Fixed delay plus uniform jitter before each page request.
    fn pause(&self) {
        let jitter = if self.config.jitter_ms > 0 {
            rand::rng().random_range(0..=self.config.jitter_ms)
        } else {
            0
        };
        std::thread::sleep(Duration::from_millis(self.config.delay_ms + jitter));
    }
}
