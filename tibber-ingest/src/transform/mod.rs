use tibber_client::domain::{ConsumptionNode, Home, PriceEntry, ProviderResponse};
use time::OffsetDateTime;

use crate::point::Point;

pub const CONSUMPTION_MEASUREMENT: &str = "consumption_nodes_wh";
pub const PRICE_MEASUREMENT: &str = "price";
pub const HOME_MEASUREMENT: &str = "home";

/// Only consumption reported in this unit is written.
pub const ENERGY_UNIT: &str = "kWh";

/// The store keeps consumption in Wh.
const WH_PER_KWH: f64 = 1000.0;

/// Flatten a provider response into points.
///
/// Per home: consumption points, then price points, each in response order.
/// Consumption records in any unit other than [`ENERGY_UNIT`] are skipped;
/// each skip is logged at warn level and counted in
/// `mapper_consumption_skipped_total`.
pub fn map_response(response: &ProviderResponse) -> Vec<Point> {
    map_homes(response, None)
}

/// Like [`map_response`], but each home additionally gets a `home` point
/// with `online=1` at `observed_at`, placed before its consumption points.
pub fn map_response_with_home_points(
    response: &ProviderResponse,
    observed_at: OffsetDateTime,
) -> Vec<Point> {
    map_homes(response, Some(observed_at))
}

fn map_homes(response: &ProviderResponse, home_point_at: Option<OffsetDateTime>) -> Vec<Point> {
    let mut points = Vec::new();

    for home in &response.viewer.homes {
        let tags = home_tags(home);

        if let Some(at) = home_point_at {
            points.push(
                Point::new(HOME_MEASUREMENT, at)
                    .tags(tags.iter().cloned())
                    .field("online", 1_i64),
            );
        }

        for node in &home.consumption.nodes {
            if node.consumption_unit != ENERGY_UNIT {
                tracing::warn!(
                    home_id = %home.id,
                    unit = %node.consumption_unit,
                    from = %node.from,
                    "skipping consumption record with unexpected unit"
                );
                metrics::counter!("mapper_consumption_skipped_total").increment(1);
                continue;
            }
            points.push(consumption_point(&tags, node));
        }

        let currency = &home.current_subscription.price_rating.hourly.currency;
        for entry in &home.current_subscription.price_rating.hourly.entries {
            points.push(price_point(&tags, currency, entry));
        }
    }

    points
}

/// Identity and address dimensions carried by every point of a home.
fn home_tags(home: &Home) -> Vec<(String, String)> {
    let a = &home.address;
    [
        ("home_id", &home.id),
        ("home_timezone", &home.time_zone),
        ("home_address_address1", &a.address1),
        ("home_address_address2", &a.address2),
        ("home_address_address3", &a.address3),
        ("home_address_city", &a.city),
        ("home_address_postal_code", &a.postal_code),
        ("home_address_country", &a.country),
        ("home_address_latitude", &a.latitude),
        ("home_address_longitude", &a.longitude),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.clone()))
    .collect()
}

fn consumption_point(home_tags: &[(String, String)], node: &ConsumptionNode) -> Point {
    Point::new(CONSUMPTION_MEASUREMENT, node.from)
        .tags(home_tags.iter().cloned())
        .tag("currency", node.currency.as_str())
        .field("cost", node.cost)
        .field("unit_price", node.unit_price)
        .field("unit_price_vat", node.unit_price_vat)
        .field("consumption", node.consumption * WH_PER_KWH)
}

fn price_point(home_tags: &[(String, String)], currency: &str, entry: &PriceEntry) -> Point {
    Point::new(PRICE_MEASUREMENT, entry.time)
        .tags(home_tags.iter().cloned())
        .tag("currency", currency)
        .tag("level", entry.level.as_str())
        .field("difference", entry.difference)
        .field("tax", entry.tax)
        .field("energy", entry.energy)
        .field("total", entry.total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::FieldValue;
    use tibber_client::domain::{
        Address, Consumption, CurrentSubscription, HourlyPriceRating, PriceRating, Viewer,
    };
    use time::macros::datetime;

    const T0: OffsetDateTime = datetime!(2024-01-01 00:00:00 UTC);

    fn node(from: OffsetDateTime, consumption: f64, unit: &str) -> ConsumptionNode {
        ConsumptionNode {
            from,
            to: from + time::Duration::HOUR,
            cost: 3.0,
            unit_price: 1.5,
            unit_price_vat: 0.25,
            currency: "NOK".to_string(),
            consumption,
            consumption_unit: unit.to_string(),
        }
    }

    fn entry(time: OffsetDateTime, total: f64, level: &str) -> PriceEntry {
        PriceEntry {
            difference: 0.1,
            tax: 0.25,
            energy: 1.0,
            total,
            time,
            level: level.to_string(),
        }
    }

    fn home(id: &str, currency: &str, nodes: Vec<ConsumptionNode>, entries: Vec<PriceEntry>) -> Home {
        Home {
            id: id.to_string(),
            time_zone: "Europe/Oslo".to_string(),
            address: Address {
                address1: "Storgata 1".to_string(),
                city: "Oslo".to_string(),
                postal_code: "0155".to_string(),
                country: "NO".to_string(),
                latitude: "59.913".to_string(),
                longitude: "10.752".to_string(),
                ..Address::default()
            },
            consumption: Consumption { nodes },
            current_subscription: CurrentSubscription {
                price_rating: PriceRating {
                    hourly: HourlyPriceRating {
                        currency: currency.to_string(),
                        entries,
                        ..HourlyPriceRating::default()
                    },
                },
            },
            ..Home::default()
        }
    }

    fn response(homes: Vec<Home>) -> ProviderResponse {
        ProviderResponse {
            viewer: Viewer {
                name: "Ola".to_string(),
                homes,
            },
        }
    }

    fn count(points: &[Point], measurement: &str) -> usize {
        points.iter().filter(|p| p.measurement == measurement).count()
    }

    #[test]
    fn single_home_scenario_yields_consumption_and_price_point() {
        let resp = response(vec![home(
            "H1",
            "NOK",
            vec![node(T0, 2.0, "kWh")],
            vec![entry(T0, 1.5, "NORMAL")],
        )]);

        let points = map_response(&resp);
        assert_eq!(points.len(), 2);

        let c = &points[0];
        assert_eq!(c.measurement, "consumption_nodes_wh");
        assert_eq!(c.timestamp, T0);
        assert_eq!(c.tag_value("home_id"), Some("H1"));
        assert_eq!(c.tag_value("home_address_city"), Some("Oslo"));
        assert_eq!(c.tag_value("currency"), Some("NOK"));
        assert_eq!(c.field_value("consumption"), Some(FieldValue::Float(2000.0)));
        assert_eq!(c.field_value("cost"), Some(FieldValue::Float(3.0)));
        assert_eq!(c.field_value("unit_price"), Some(FieldValue::Float(1.5)));
        assert_eq!(c.field_value("unit_price_vat"), Some(FieldValue::Float(0.25)));

        let p = &points[1];
        assert_eq!(p.measurement, "price");
        assert_eq!(p.timestamp, T0);
        assert_eq!(p.tag_value("level"), Some("NORMAL"));
        assert_eq!(p.tag_value("home_id"), Some("H1"));
        assert_eq!(p.field_value("total"), Some(FieldValue::Float(1.5)));
        assert_eq!(p.field_value("tax"), Some(FieldValue::Float(0.25)));
        assert_eq!(p.field_value("energy"), Some(FieldValue::Float(1.0)));
        assert_eq!(p.field_value("difference"), Some(FieldValue::Float(0.1)));
    }

    #[test]
    fn consumption_is_scaled_to_wh_exactly() {
        let resp = response(vec![home("H1", "NOK", vec![node(T0, 1.5, "kWh")], vec![])]);
        let points = map_response(&resp);
        assert_eq!(points[0].field_value("consumption"), Some(FieldValue::Float(1500.0)));
    }

    #[test]
    fn non_kwh_records_are_skipped_without_affecting_siblings() {
        let t1 = T0 + time::Duration::HOUR;
        let t2 = t1 + time::Duration::HOUR;
        let resp = response(vec![home(
            "H1",
            "NOK",
            vec![node(T0, 1.0, "kWh"), node(t1, 500.0, "Wh"), node(t2, 3.0, "kWh")],
            vec![entry(T0, 1.5, "NORMAL"), entry(t1, 2.5, "EXPENSIVE")],
        )]);

        let points = map_response(&resp);
        assert_eq!(count(&points, CONSUMPTION_MEASUREMENT), 2);
        assert_eq!(count(&points, PRICE_MEASUREMENT), 2);

        let consumption_times: Vec<OffsetDateTime> = points
            .iter()
            .filter(|p| p.measurement == CONSUMPTION_MEASUREMENT)
            .map(|p| p.timestamp)
            .collect();
        assert_eq!(consumption_times, [T0, t2]);
    }

    #[test]
    fn wh_only_home_still_emits_price_points() {
        let resp = response(vec![home(
            "H1",
            "NOK",
            vec![node(T0, 2000.0, "Wh")],
            vec![entry(T0, 1.5, "NORMAL")],
        )]);

        let points = map_response(&resp);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].measurement, PRICE_MEASUREMENT);
        assert_eq!(points[0].tag_value("level"), Some("NORMAL"));
    }

    #[test]
    fn price_currency_does_not_leak_across_homes() {
        let resp = response(vec![
            home("H1", "NOK", vec![], vec![entry(T0, 1.0, "CHEAP"), entry(T0, 1.1, "CHEAP")]),
            home("H2", "SEK", vec![], vec![entry(T0, 2.0, "NORMAL")]),
        ]);

        let points = map_response(&resp);
        assert_eq!(count(&points, PRICE_MEASUREMENT), 3);
        for p in &points {
            let expected = match p.tag_value("home_id") {
                Some("H1") => "NOK",
                Some("H2") => "SEK",
                other => panic!("unexpected home {other:?}"),
            };
            assert_eq!(p.tag_value("currency"), Some(expected));
        }
    }

    #[test]
    fn output_order_is_per_home_consumption_then_price() {
        let t1 = T0 + time::Duration::HOUR;
        let resp = response(vec![
            home("H1", "NOK", vec![node(t1, 1.0, "kWh"), node(T0, 1.0, "kWh")], vec![entry(T0, 1.0, "CHEAP")]),
            home("H2", "SEK", vec![node(T0, 1.0, "kWh")], vec![entry(t1, 1.0, "CHEAP")]),
        ]);

        let order: Vec<(String, String, OffsetDateTime)> = map_response(&resp)
            .into_iter()
            .map(|p| {
                let home = p.tag_value("home_id").unwrap_or_default().to_string();
                (home, p.measurement, p.timestamp)
            })
            .collect();

        assert_eq!(
            order,
            [
                ("H1".to_string(), CONSUMPTION_MEASUREMENT.to_string(), t1),
                ("H1".to_string(), CONSUMPTION_MEASUREMENT.to_string(), T0),
                ("H1".to_string(), PRICE_MEASUREMENT.to_string(), T0),
                ("H2".to_string(), CONSUMPTION_MEASUREMENT.to_string(), T0),
                ("H2".to_string(), PRICE_MEASUREMENT.to_string(), t1),
            ]
        );
    }

    #[test]
    fn every_point_carries_the_full_home_tag_set_including_empty_values() {
        let resp = response(vec![home(
            "H1",
            "NOK",
            vec![node(T0, 1.0, "kWh")],
            vec![entry(T0, 1.0, "CHEAP")],
        )]);

        let expected_keys = [
            "home_id",
            "home_timezone",
            "home_address_address1",
            "home_address_address2",
            "home_address_address3",
            "home_address_city",
            "home_address_postal_code",
            "home_address_country",
            "home_address_latitude",
            "home_address_longitude",
        ];

        for p in map_response(&resp) {
            let keys: Vec<&str> = p.tags.iter().take(expected_keys.len()).map(|(k, _)| k.as_str()).collect();
            assert_eq!(keys, expected_keys);
            assert_eq!(p.tag_value("home_address_address2"), Some(""));
        }
    }

    #[test]
    fn homes_without_records_contribute_nothing() {
        let resp = response(vec![home("H1", "NOK", vec![], vec![])]);
        assert!(map_response(&resp).is_empty());
        assert!(map_response(&ProviderResponse::default()).is_empty());
    }

    #[test]
    fn mapping_is_idempotent() {
        let resp = response(vec![home(
            "H1",
            "NOK",
            vec![node(T0, 2.0, "kWh"), node(T0, 2.0, "Wh")],
            vec![entry(T0, 1.5, "NORMAL")],
        )]);
        assert_eq!(map_response(&resp), map_response(&resp));
    }

    #[test]
    fn home_points_precede_each_homes_records() {
        let observed = datetime!(2024-01-02 12:00:00 UTC);
        let resp = response(vec![
            home("H1", "NOK", vec![node(T0, 1.0, "kWh")], vec![]),
            home("H2", "SEK", vec![], vec![entry(T0, 1.0, "CHEAP")]),
        ]);

        let points = map_response_with_home_points(&resp, observed);
        let measurements: Vec<&str> = points.iter().map(|p| p.measurement.as_str()).collect();
        assert_eq!(measurements, ["home", "consumption_nodes_wh", "home", "price"]);

        let h1 = &points[0];
        assert_eq!(h1.timestamp, observed);
        assert_eq!(h1.tag_value("home_id"), Some("H1"));
        assert_eq!(h1.tag_value("currency"), None);
        assert_eq!(h1.field_value("online"), Some(FieldValue::Integer(1)));
    }
}
