use serde::Deserialize;

use super::{null_as_default, Consumption, CurrentSubscription};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Home {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub time_zone: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: Address,
    #[serde(default, deserialize_with = "null_as_default")]
    pub owner: Owner,
    #[serde(default, deserialize_with = "null_as_default")]
    pub consumption: Consumption,
    #[serde(default, deserialize_with = "null_as_default")]
    pub current_subscription: CurrentSubscription,
}

/// Postal address. Latitude and longitude arrive as decimal strings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, deserialize_with = "null_as_default")]
    pub address1: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address2: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address3: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub city: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub postal_code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub country: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub latitude: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub longitude: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    #[serde(default, deserialize_with = "null_as_default")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub contact_info: ContactInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContactInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mobile: String,
}
