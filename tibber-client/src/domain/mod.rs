//! Wire schema for the `viewer { homes { ... } }` query.
//!
//! Tibber returns `null` for values it has not settled yet (cost of the
//! current hour, an address line that was never filled in). Every field here
//! decodes a missing or `null` value to its empty value instead of rejecting
//! the whole response.

mod consumption;
mod home;
mod price;

use serde::{Deserialize, Deserializer};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

pub use consumption::{Consumption, ConsumptionNode};
pub use home::{Address, ContactInfo, Home, Owner};
pub use price::{CurrentSubscription, HourlyPriceRating, PriceEntry, PriceRating};

/// Result of one `viewer` query.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProviderResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub viewer: Viewer,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Viewer {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub homes: Vec<Home>,
}

pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn epoch() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH
}

/// RFC 3339 timestamp; `null` becomes the Unix epoch.
pub(crate) fn rfc3339_or_epoch<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(epoch()),
        Some(raw) => OffsetDateTime::parse(&raw, &Rfc3339)
            .map_err(|e| serde::de::Error::custom(format!("invalid timestamp '{raw}': {e}"))),
    }
}
