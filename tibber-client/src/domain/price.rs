use serde::Deserialize;
use time::OffsetDateTime;

use super::{epoch, null_as_default, rfc3339_or_epoch};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentSubscription {
    #[serde(default, deserialize_with = "null_as_default")]
    pub price_rating: PriceRating,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PriceRating {
    #[serde(default, deserialize_with = "null_as_default")]
    pub hourly: HourlyPriceRating,
}

/// Hourly price quotations. All entries share `currency`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyPriceRating {
    #[serde(default, deserialize_with = "null_as_default")]
    pub min_total: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub max_total: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub currency: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub min_energy: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub max_energy: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub entries: Vec<PriceEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PriceEntry {
    /// Deviation from the average price of the rating window.
    #[serde(default, deserialize_with = "null_as_default")]
    pub difference: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tax: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub energy: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: f64,
    #[serde(default = "epoch", deserialize_with = "rfc3339_or_epoch")]
    pub time: OffsetDateTime,
    /// Qualitative level such as `NORMAL`, `CHEAP` or `VERY_EXPENSIVE`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub level: String,
}
