//! Iterative flyer traversal.
//!
//! Pagination follows "next" links with an explicit pending/visited pair,
//! never recursion: cyclic or self-referential links terminate after one
//! visit, and a hard page cap bounds even an unbounded chain of fresh URLs.

use std::collections::HashSet;
use tracing::{info, warn};

use crate::config::{Config, FlyerKind};
use crate::extract::BrandCatalog;
use crate::fetch::client::{DownloadedImage, FetchClient};
use crate::fetch::page::parse_page;
use crate::ocr::Pipeline;
use crate::record::{CouponRecord, PageMeta};

/// Abstraction over the network so the traversal logic is testable offline.
pub trait PageSource {
    fn fetch_page(&mut self, url: &str) -> Option<String>;
    fn fetch_image(&mut self, url: &str, referer: &str) -> Option<DownloadedImage>;
}

impl PageSource for FetchClient {
    fn fetch_page(&mut self, url: &str) -> Option<String> {
        match self.get_page(url) {
            Ok(body) => Some(body),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    fn fetch_image(&mut self, url: &str, referer: &str) -> Option<DownloadedImage> {
        match self.download_image(url, referer) {
            Ok(img) => Some(img),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }
}

/// One visited flyer page, ready for image processing.
#[derive(Clone, Debug)]
pub struct FlyerPage {
    pub url: String,
    pub discount_period: Option<String>,
    pub images: Vec<String>,
}

/// Walks a flyer's pages starting at `start_url`. Only hot-buy flyers
/// paginate; coupon books are single pages.
pub fn walk_pages<S: PageSource>(
    source: &mut S,
    config: &Config,
    kind: FlyerKind,
    start_url: &str,
) -> Vec<FlyerPage> {
    let selectors = config.image_selectors.for_kind(kind);
    let mut visited: HashSet<String> = HashSet::new();
    let mut pages = Vec::new();
    let mut next = Some(start_url.to_string());

    while let Some(url) = next.take() {
        if pages.len() >= config.fetch.max_pages {
            warn!("stopping pagination at {} pages", pages.len());
            break;
        }
        if !visited.insert(url.clone()) {
            warn!("already visited {}, stopping pagination", url);
            break;
        }
        let Some(html) = source.fetch_page(&url) else {
            break;
        };

        let parsed = parse_page(&html, &url, kind, selectors);
        info!("found {} images on {}", parsed.images.len(), url);
        if kind.is_hot_buy() {
            next = parsed.next_url.clone();
        }
        pages.push(FlyerPage {
            url,
            discount_period: parsed.discount_period,
            images: parsed.images,
        });
    }
    pages
}

/// Scrapes one whole flyer: walks its pages, downloads every discovered
/// image, and runs each through the pipeline. Per-image failures are logged
/// and skipped; the record order follows page then document order.
pub fn scrape_flyer<S: PageSource>(
    source: &mut S,
    pipeline: &Pipeline,
    config: &Config,
    kind: FlyerKind,
    start_url: &str,
    catalog: &BrandCatalog,
    article_name: &str,
    publish_date: &str,
    declared_period: Option<String>,
) -> Vec<CouponRecord> {
    let pages = walk_pages(source, config, kind, start_url);

    let mut records = Vec::new();
    for page in &pages {
        let period = declared_period
            .clone()
            .or_else(|| page.discount_period.clone());

        for image_url in &page.images {
            let Some(download) = source.fetch_image(image_url, &page.url) else {
                continue;
            };
            let meta = PageMeta {
                article_name: article_name.to_string(),
                publish_date: publish_date.to_string(),
                source_url: image_url.clone(),
                discount_period: period.clone(),
            };
            match pipeline.extract_from_bytes(
                &download.bytes,
                download.content_type.as_deref(),
                catalog,
                &meta,
            ) {
                Ok(found) => {
                    info!("{}: {} records", image_url, found.len());
                    records.extend(found);
                }
                Err(e) => warn!("skipping {}: {}", image_url, e),
            }
        }
    }
    info!("{}: {} records total", article_name, records.len());
    records
}
