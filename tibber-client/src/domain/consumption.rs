use serde::Deserialize;
use time::OffsetDateTime;

use super::{epoch, null_as_default, rfc3339_or_epoch};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Consumption {
    #[serde(default, deserialize_with = "null_as_default")]
    pub nodes: Vec<ConsumptionNode>,
}

/// One hourly consumption interval `[from, to)`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionNode {
    #[serde(default = "epoch", deserialize_with = "rfc3339_or_epoch")]
    pub from: OffsetDateTime,
    #[serde(default = "epoch", deserialize_with = "rfc3339_or_epoch")]
    pub to: OffsetDateTime,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cost: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub unit_price: f64,
    #[serde(default, rename = "unitPriceVAT", deserialize_with = "null_as_default")]
    pub unit_price_vat: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub currency: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub consumption: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub consumption_unit: String,
}
