//! Flyer page HTML analysis: image discovery, validity period, next link.

use regex::Regex;
use reqwest::Url;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::config::FlyerKind;

/// Everything the scraper needs from one fetched flyer page.
#[derive(Clone, Debug, Default)]
pub struct ParsedPage {
    /// Absolute coupon image URLs, in document order.
    pub images: Vec<String>,
    /// Absolute URL of the "next page" link, when present.
    pub next_url: Option<String>,
    /// Validity window scraped from the page text, e.g.
    /// "March 29th through April 6th".
    pub discount_period: Option<String>,
}

/// Parses one flyer page. Selectors are tried in order and the first one
/// with hits wins; a page matching none falls back to every `img` element.
pub fn parse_page(html: &str, base_url: &str, kind: FlyerKind, selectors: &[String]) -> ParsedPage {
    let doc = Html::parse_document(html);
    let base = Url::parse(base_url).ok();

    let mut images = Vec::new();
    for sel_str in selectors {
        let Ok(sel) = Selector::parse(sel_str) else {
            warn!("invalid image selector {:?}", sel_str);
            continue;
        };
        images = doc
            .select(&sel)
            .filter_map(|img| img.value().attr("src"))
            .filter_map(|src| resolve(base.as_ref(), src))
            .collect();
        if !images.is_empty() {
            debug!("{} images via selector {:?}", images.len(), sel_str);
            break;
        }
    }
    if images.is_empty() {
        let all_imgs = Selector::parse("img").expect("img is a valid selector");
        images = doc
            .select(&all_imgs)
            .filter_map(|img| img.value().attr("src"))
            .filter_map(|src| resolve(base.as_ref(), src))
            .collect();
    }

    ParsedPage {
        images,
        next_url: find_next_link(&doc, base.as_ref()),
        discount_period: find_discount_period(&doc, kind),
    }
}

/// Scans the page's visible text for a "valid/offer X through Y" phrase.
/// Hot-buy pages often end the phrase with "while supplies last".
pub fn find_discount_period(doc: &Html, kind: FlyerKind) -> Option<String> {
    let text = doc
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    let pattern = if kind.is_hot_buy() {
        r"(?i)(?:valid|offer)\s+(.+?)\s+through\s+(.+?)(?:\s+while\s+supplies\s+last|\.|$)"
    } else {
        r"(?i)(?:valid|offer)\s+(.+?)\s+through\s+(.+?)(?:\.|$)"
    };
    let re = Regex::new(pattern).expect("period pattern is valid");
    let caps = re.captures(&text)?;
    Some(format!("{} through {}", caps[1].trim(), caps[2].trim()))
}

/// First anchor whose text looks like a next-page control.
fn find_next_link(doc: &Html, base: Option<&Url>) -> Option<String> {
    let anchors = Selector::parse("a").expect("a is a valid selector");
    let next_re = Regex::new(r"(?i)next|›|>").expect("next pattern is valid");

    for a in doc.select(&anchors) {
        let label: String = a.text().collect::<String>().trim().to_string();
        if label.is_empty() || !next_re.is_match(&label) {
            continue;
        }
        if let Some(href) = a.value().attr("href") {
            return resolve(base, href);
        }
    }
    None
}

/// Makes `src` absolute against the page URL.
fn resolve(base: Option<&Url>, src: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }
    if src.starts_with("http://") || src.starts_with("https://") {
        return Some(src.to_string());
    }
    base.and_then(|b| b.join(src).ok()).map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.example.com/costco-april-2025-hot-buys-coupons/";

    fn hot_buy_selectors() -> Vec<String> {
        crate::config::ImageSelectors::default().hot_buy.clone()
    }

    #[test]
    fn test_selector_cascade_first_hit_wins() {
        let html = r#"
            <html><body>
              <img src="/banner/logo.png">
              <img src="/images/hotbuy-page1.jpg">
              <img src="/images/hotbuy-page2.jpg">
            </body></html>"#;
        let page = parse_page(html, BASE, FlyerKind::HotBuys, &hot_buy_selectors());
        assert_eq!(
            page.images,
            vec![
                "https://www.example.com/images/hotbuy-page1.jpg",
                "https://www.example.com/images/hotbuy-page2.jpg",
            ]
        );
    }

    #[test]
    fn test_fallback_to_all_images() {
        let html = r#"<html><body><img src="/a.jpg"><img src="/b.jpg"></body></html>"#;
        let page = parse_page(html, BASE, FlyerKind::HotBuys, &hot_buy_selectors());
        assert_eq!(page.images.len(), 2);
    }

    #[test]
    fn test_absolute_srcs_kept_verbatim() {
        let html = r#"<img src="https://cdn.example.net/hotbuy.jpg">"#;
        let page = parse_page(html, BASE, FlyerKind::HotBuys, &hot_buy_selectors());
        assert_eq!(page.images, vec!["https://cdn.example.net/hotbuy.jpg"]);
    }

    #[test]
    fn test_next_link_discovery() {
        let html = r#"
            <a href="/costco-april-2025-hot-buys-coupons/">Page 1</a>
            <a href="/costco-april-2025-hot-buys-coupons/2/">Next ›</a>"#;
        let page = parse_page(html, BASE, FlyerKind::HotBuys, &hot_buy_selectors());
        assert_eq!(
            page.next_url.as_deref(),
            Some("https://www.example.com/costco-april-2025-hot-buys-coupons/2/")
        );
    }

    #[test]
    fn test_no_next_link() {
        let html = r#"<a href="/about/">About us</a>"#;
        let page = parse_page(html, BASE, FlyerKind::CouponBook, &hot_buy_selectors());
        assert!(page.next_url.is_none());
    }

    #[test]
    fn test_discount_period_coupon_book() {
        let html = "<p>Coupons are valid April 9th through May 4th. Members only.</p>";
        let doc = Html::parse_document(html);
        assert_eq!(
            find_discount_period(&doc, FlyerKind::CouponBook).unwrap(),
            "April 9th through May 4th"
        );
    }

    #[test]
    fn test_discount_period_hot_buy_stops_at_supplies() {
        let html = "<p>Offer March 29th through April 6th while supplies last</p>";
        let doc = Html::parse_document(html);
        assert_eq!(
            find_discount_period(&doc, FlyerKind::HotBuys).unwrap(),
            "March 29th through April 6th"
        );
    }

    #[test]
    fn test_discount_period_absent() {
        let doc = Html::parse_document("<p>Nothing about dates here</p>");
        assert!(find_discount_period(&doc, FlyerKind::CouponBook).is_none());
    }
}
