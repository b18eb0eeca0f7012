//! Network side of the scraper: HTTP client, page analysis, and the
//! pagination walk that turns a flyer URL into coupon records.

pub mod client;
pub mod page;
pub mod scrape;

pub use client::FetchClient;
pub use scrape::scrape_flyer;
