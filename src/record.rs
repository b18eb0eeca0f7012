//! Coupon record schema and page-level metadata.
//!
//! The field order of [`CouponRecord`] is the CSV column order. Downstream
//! spreadsheets key on these names and positions, so both are a compatibility
//! contract: absent values are empty strings, never omitted columns.

use serde::ser::Serializer;
use serde::Serialize;

/// Purchase venue a hot-buy discount applies to. Coupon-book flyers always
/// leave this unspecified.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Channel {
    #[default]
    Unspecified,
    InWarehouse,
    Online,
    InWarehouseAndOnline,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Unspecified => "",
            Channel::InWarehouse => "In-Warehouse",
            Channel::Online => "Online",
            Channel::InWarehouseAndOnline => "In-Warehouse + Online",
        }
    }
}

impl Serialize for Channel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One extracted coupon entry. Immutable once assembled; structural equality
/// is the only identity.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CouponRecord {
    pub scrape_timestamp: String,
    pub article_name: String,
    pub publish_date: String,
    pub item_brand: String,
    pub item_description: String,
    pub discount: String,
    pub discount_cleaned: String,
    pub count_limit: String,
    pub channel: Channel,
    pub discount_period: String,
    pub item_original_price: String,
    pub source_url: String,
}

/// Page-level metadata supplied by the caller. Opaque to extraction except
/// for the optional declared validity period, which overrides the
/// page-derived one.
#[derive(Clone, Debug, Default)]
pub struct PageMeta {
    pub article_name: String,
    pub publish_date: String,
    pub source_url: String,
    pub discount_period: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_strings() {
        assert_eq!(Channel::Unspecified.as_str(), "");
        assert_eq!(Channel::InWarehouse.as_str(), "In-Warehouse");
        assert_eq!(Channel::Online.as_str(), "Online");
        assert_eq!(Channel::InWarehouseAndOnline.as_str(), "In-Warehouse + Online");
    }

    #[test]
    fn test_channel_serializes_as_plain_string() {
        let json = serde_json::to_string(&Channel::InWarehouseAndOnline).unwrap();
        assert_eq!(json, "\"In-Warehouse + Online\"");
    }
}
