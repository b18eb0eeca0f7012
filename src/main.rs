mod config;
mod error;
mod export;
mod extract;
mod fetch;
mod ocr;
mod record;

use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use config::{Config, FlyerKind};
use extract::BrandCatalog;
use fetch::FetchClient;
use ocr::Pipeline;
use record::PageMeta;

#[derive(Parser)]
#[command(name = "flyerscan", version, about = "Extracts coupon records from Costco flyer images")]
struct Cli {
    /// JSON configuration file; defaults apply when absent.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the current coupon book and hot buys flyers into CSV files.
    Scrape {
        /// Also scrape this many previous months.
        #[arg(long, default_value_t = 0)]
        months_back: u32,

        /// Directory the CSV files are written into.
        #[arg(long, default_value = "output")]
        out_dir: PathBuf,
    },
    /// Extract records from local flyer images without any network access.
    Extract {
        /// Flyer image files to process.
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Treat the images as hot-buy pages (enables channel extraction).
        #[arg(long)]
        hot_buys: bool,

        /// Brand catalog file; the kind's default file is tried when unset.
        #[arg(long)]
        brands: Option<PathBuf>,

        #[arg(long, default_value = "records.csv")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref());

    match cli.command {
        Commands::Scrape { months_back, out_dir } => scrape(&config, months_back, &out_dir),
        Commands::Extract { images, hot_buys, brands, out } => {
            extract_local(&config, &images, hot_buys, brands.as_deref(), &out)
        }
    }
}

/// Scrapes both flyer kinds for the current month and `months_back` previous
/// months. A flyer that fails entirely is logged and skipped so one missing
/// month never aborts the run.
fn scrape(config: &Config, months_back: u32, out_dir: &Path) -> Result<()> {
    let mut client = FetchClient::new(&config.fetch)?;
    let today = Local::now().date_naive();

    for kind in [FlyerKind::CouponBook, FlyerKind::HotBuys] {
        // A missing engine is fatal before any page is fetched; anything
        // else skips this flyer kind and lets the other proceed.
        let pipeline = match Pipeline::new(config, kind) {
            Ok(pipeline) => pipeline,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!("skipping {}: {}", kind_label(kind), e);
                continue;
            }
        };
        let catalog = BrandCatalog::load(Path::new(kind.brand_file()), &config.default_brands);

        for offset in 0..=months_back {
            let (year, month) = month_before(today, offset);
            let first = NaiveDate::from_ymd_opt(year, month, 1)
                .context("invalid flyer month")?;
            let month_name = first.format("%B").to_string();

            let url = config.flyer_url(kind, &month_name, year);
            let article_name = format!("Costco {} {} {}", month_name, year, kind_label(kind));
            info!("scraping {} from {}", article_name, url);

            let records = fetch::scrape_flyer(
                &mut client,
                &pipeline,
                config,
                kind,
                &url,
                &catalog,
                &article_name,
                &first.format("%Y-%m-%d").to_string(),
                None,
            );
            if records.is_empty() {
                warn!("{}: nothing extracted", article_name);
                continue;
            }

            let file = format!(
                "costco_{}_{}_{}.csv",
                kind_slug(kind),
                month_name.to_lowercase(),
                year
            );
            if let Err(e) = export::write_csv(&out_dir.join(file), &records) {
                error!("{}: {}", article_name, e);
            }
        }
    }
    Ok(())
}

/// Runs the pipeline over local image files, bypassing the fetch layer.
fn extract_local(
    config: &Config,
    images: &[PathBuf],
    hot_buys: bool,
    brands: Option<&Path>,
    out: &Path,
) -> Result<()> {
    let kind = if hot_buys {
        FlyerKind::HotBuys
    } else {
        FlyerKind::CouponBook
    };
    let pipeline = Pipeline::new(config, kind).map_err(anyhow::Error::new)?;
    let brand_file = brands.unwrap_or_else(|| Path::new(kind.brand_file()));
    let catalog = BrandCatalog::load(brand_file, &config.default_brands);
    let today = Local::now().date_naive().format("%Y-%m-%d").to_string();

    let mut records = Vec::new();
    for path in images {
        let img = match image::open(path) {
            Ok(img) => img,
            Err(e) => {
                warn!("skipping {}: {}", path.display(), e);
                continue;
            }
        };
        let meta = PageMeta {
            article_name: path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            publish_date: today.clone(),
            source_url: path.display().to_string(),
            discount_period: None,
        };
        records.extend(pipeline.extract_from_image(&img, &catalog, &meta));
    }

    export::write_csv(out, &records)
}

fn kind_label(kind: FlyerKind) -> &'static str {
    match kind {
        FlyerKind::CouponBook => "Coupon Book",
        FlyerKind::HotBuys => "Hot Buys",
    }
}

fn kind_slug(kind: FlyerKind) -> &'static str {
    match kind {
        FlyerKind::CouponBook => "coupon_book",
        FlyerKind::HotBuys => "hot_buys",
    }
}

/// Year and month of the calendar month `offset` months before `today`.
fn month_before(today: NaiveDate, offset: u32) -> (i32, u32) {
    let total = today.year() * 12 + today.month0() as i32 - offset as i32;
    (total.div_euclid(12), total.rem_euclid(12) as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_before_same_year() {
        let today = NaiveDate::from_ymd_opt(2025, 4, 10).unwrap();
        assert_eq!(month_before(today, 0), (2025, 4));
        assert_eq!(month_before(today, 2), (2025, 2));
    }

    #[test]
    fn test_month_before_crosses_year() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        assert_eq!(month_before(today, 1), (2024, 12));
        assert_eq!(month_before(today, 13), (2023, 12));
    }
}
