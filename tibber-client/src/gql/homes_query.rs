/// Number of hourly consumption records requested per fetch.
pub const CONSUMPTION_LOOKBACK: u32 = 48;

/// Viewer, homes, the last [`CONSUMPTION_LOOKBACK`] hourly consumption
/// records and the current hourly price rating.
pub const HOMES_QUERY: &str = r#"
{
  viewer {
    name
    homes {
      id
      timeZone
      address {
        address1
        address2
        address3
        city
        postalCode
        country
        latitude
        longitude
      }
      owner {
        firstName
        lastName
        contactInfo {
          email
          mobile
        }
      }
      consumption(resolution: HOURLY, last: 48) {
        nodes {
          from
          to
          cost
          unitPrice
          unitPriceVAT
          currency
          consumption
          consumptionUnit
        }
      }
      currentSubscription {
        priceRating {
          hourly {
            minTotal
            maxTotal
            currency
            minEnergy
            maxEnergy
            entries {
              difference
              tax
              energy
              total
              time
              level
            }
          }
        }
      }
    }
  }
}
"#;
