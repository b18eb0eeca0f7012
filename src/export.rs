//! CSV export of extracted records.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

use crate::record::CouponRecord;

/// CSV header written ahead of the serialized rows. Must stay aligned with
/// the field order of [`CouponRecord`].
pub const COLUMNS: [&str; 12] = [
    "scrape_timestamp",
    "article_name",
    "publish_date",
    "item_brand",
    "item_description",
    "discount",
    "discount_cleaned",
    "count_limit",
    "channel",
    "discount_period",
    "item_original_price",
    "source_url",
];

/// Writes the records to a CSV file. An empty record set writes nothing and
/// leaves no file behind; a zero-row CSV downstream is worse than no file.
pub fn write_csv(path: &Path, records: &[CouponRecord]) -> Result<()> {
    if records.is_empty() {
        warn!("no records to export, skipping {}", path.display());
        return Ok(());
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record(COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    info!("wrote {} records to {}", records.len(), path.display());
    Ok(())
}
