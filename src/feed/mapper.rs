//! Field mapper
//!
//! Converts a raw catalog record into the fixed eight-field item schema.
//! Defaulting is total: every canonical item has all fields populated.

use super::record::RawRecord;
use serde::Serialize;

/// Title used when a record has no usable `name`
pub const PLACEHOLDER_TITLE: &str = "Товар Розвідки Ноєм";
/// Constant `condition` value for every item
pub const ITEM_CONDITION: &str = "Новий";
/// Fallback for `id`
pub const DEFAULT_ID: &str = "N/A";
/// Fallback for `link` and `image_link`
pub const DEFAULT_LINK: &str = "#";
/// Fallback for `price`
pub const DEFAULT_PRICE: &str = "0 UAH";
/// Fallback for `availability`
pub const DEFAULT_AVAILABILITY: &str = "0 UAH";

/// How a present-but-empty source field is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyValuePolicy {
    /// An empty string is treated exactly like an absent field
    TreatAsMissing,
}

/// Policy applied by the feed pipeline
pub const EMPTY_VALUE_POLICY: EmptyValuePolicy = EmptyValuePolicy::TreatAsMissing;

impl EmptyValuePolicy {
    /// Returns the value if it counts as present under this policy
    pub fn resolve(self, value: Option<&str>) -> Option<&str> {
        match self {
            EmptyValuePolicy::TreatAsMissing => value.filter(|v| !v.is_empty()),
        }
    }
}

/// Canonical merchant-feed item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalItem {
    /// `g:id`, from `id`
    pub id: String,
    /// `g:title`, from `name`
    pub title: String,
    /// `g:description`, from `description`
    pub description: String,
    /// `g:link`, from `url`
    pub link: String,
    /// `g:image_link`, from `image`
    pub image_link: String,
    /// `g:price`, from `priceRUAH`
    pub price: String,
    /// `g:availability`, from `stock`
    pub availability: String,
    /// `g:condition`, always [`ITEM_CONDITION`]
    pub condition: String,
}

/// A record that could not be mapped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDefect {
    /// Why the record was rejected
    pub reason: String,
}

/// Maps raw records to canonical items
#[derive(Debug, Clone)]
pub struct FieldMapper<'a> {
    default_description: &'a str,
}

impl<'a> FieldMapper<'a> {
    /// Create a mapper that falls back to `default_description`
    pub fn new(default_description: &'a str) -> Self {
        Self {
            default_description,
        }
    }

    /// Map one record
    ///
    /// # Returns
    /// * `Ok(CanonicalItem)` - All eight fields populated
    /// * `Err(RecordDefect)` - The record could not be read intact and must be skipped
    pub fn map(&self, record: &RawRecord) -> Result<CanonicalItem, RecordDefect> {
        if let Some(reason) = record.defect() {
            return Err(RecordDefect {
                reason: reason.to_string(),
            });
        }

        let pick = |name: &str, fallback: &str| -> String {
            EMPTY_VALUE_POLICY
                .resolve(record.field(name))
                .unwrap_or(fallback)
                .to_string()
        };

        Ok(CanonicalItem {
            id: pick("id", DEFAULT_ID),
            title: pick("name", PLACEHOLDER_TITLE),
            description: pick("description", self.default_description),
            link: pick("url", DEFAULT_LINK),
            image_link: pick("image", DEFAULT_LINK),
            price: pick("priceRUAH", DEFAULT_PRICE),
            availability: pick("stock", DEFAULT_AVAILABILITY),
            condition: ITEM_CONDITION.to_string(),
        })
    }
}
