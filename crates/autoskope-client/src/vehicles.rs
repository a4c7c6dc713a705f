//! Vehicle list fetching and response parsing
//!
//! The info endpoint answers with a JSON object:
//!
//! - `cars`: list of vehicle entries (`id`, `name`, `ex_pow`, `bat_pow`,
//!   `hdop`, `support_infos`, `device_type_id`)
//! - `lastPos`: a GeoJSON `FeatureCollection`, usually JSON-encoded as a
//!   string, whose features link to vehicles through `properties.carid`

use std::collections::HashMap;

use reqwest::Method;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::TransportConfig;
use crate::constants::{model_for_device_type, APP_VERSION, VEHICLES_PATH};
use crate::error::{AutoskopeError, Result};
use crate::executor::RequestExecutor;
use crate::position::decode_position;
use crate::session::{AuthState, Session};
use crate::types::Vehicle;

/// Fetch all vehicles of the authenticated account.
///
/// Fails fast with `InvalidAuth`, without touching the network, when the
/// session has not logged in.
pub(crate) async fn list_vehicles(
    session: &mut Session,
    config: &TransportConfig,
) -> Result<Vec<Vehicle>> {
    if !session.is_authenticated() {
        return Err(AutoskopeError::invalid_auth(
            "Not authenticated, call login() first",
        ));
    }

    let response = {
        let executor = RequestExecutor::new(session, config)?;
        executor
            .execute(Method::POST, VEHICLES_PATH, &[("appversion", APP_VERSION)])
            .await
    };

    let data = match response {
        Ok(data) => data,
        Err(err @ AutoskopeError::InvalidAuth(_)) => {
            // The portal dropped our session cookie
            session.set_auth_state(AuthState::Unauthenticated);
            warn!("Authentication error during vehicle fetch");
            return Err(err);
        }
        Err(err) => {
            warn!(error = %err, "Failed to fetch vehicle data");
            return Err(err);
        }
    };

    let vehicles = parse_vehicles(&data)?;
    debug!(count = vehicles.len(), "Parsed vehicles");
    Ok(vehicles)
}

/// Parse the info endpoint payload into vehicles.
///
/// Only a `cars` member of the wrong type fails the whole batch. Entries
/// that cannot be parsed are skipped, and a bad location only costs that
/// vehicle its position.
pub(crate) fn parse_vehicles(data: &Value) -> Result<Vec<Vehicle>> {
    let cars = match data.get("cars") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(cars)) => cars,
        Some(_) => {
            warn!("Vehicle data 'cars' is not a list");
            return Err(AutoskopeError::cannot_connect(
                "Invalid vehicle data format in API response",
            ));
        }
    };
    debug!(count = cars.len(), "Received cars list");

    let features = index_features(data.get("lastPos"));

    Ok(cars
        .iter()
        .filter_map(|car| parse_vehicle(car, &features))
        .collect())
}

/// Map `carid` to its GeoJSON feature
fn index_features(last_pos: Option<&Value>) -> HashMap<String, Value> {
    let parsed;
    let collection = match last_pos {
        None | Some(Value::Null) => return HashMap::new(),
        Some(Value::String(raw)) if raw.trim().is_empty() => return HashMap::new(),
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(value) => {
                parsed = value;
                &parsed
            }
            Err(e) => {
                debug!(error = %e, "Failed to parse lastPos JSON string");
                return HashMap::new();
            }
        },
        Some(value @ Value::Object(_)) => value,
        Some(other) => {
            debug!(value = %other, "Ignoring lastPos of unexpected type");
            return HashMap::new();
        }
    };

    let features = match (
        collection.get("type").and_then(Value::as_str),
        collection.get("features").and_then(Value::as_array),
    ) {
        (Some("FeatureCollection"), Some(features)) => features,
        _ => {
            debug!("lastPos is not a valid FeatureCollection");
            return HashMap::new();
        }
    };

    let index: HashMap<String, Value> = features
        .iter()
        .filter_map(|feature| {
            let carid = feature.pointer("/properties/carid").and_then(id_string)?;
            Some((carid, feature.clone()))
        })
        .collect();
    debug!(count = index.len(), "Indexed position features");
    index
}

fn parse_vehicle(car: &Value, features: &HashMap<String, Value>) -> Option<Vehicle> {
    let Some(info) = car.as_object() else {
        warn!("Skipping non-object entry in cars list");
        return None;
    };

    match build_vehicle(info, features) {
        Ok(vehicle) => Some(vehicle),
        Err(reason) => {
            let vehicle_id = info.get("id").and_then(id_string);
            warn!(
                vehicle_id = vehicle_id.as_deref().unwrap_or("unknown"),
                %reason,
                "Skipping unparsable vehicle entry"
            );
            None
        }
    }
}

fn build_vehicle(
    info: &Map<String, Value>,
    features: &HashMap<String, Value>,
) -> std::result::Result<Vehicle, String> {
    let id = info
        .get("id")
        .and_then(id_string)
        .ok_or("missing or invalid 'id'")?;
    let name = info
        .get("name")
        .and_then(Value::as_str)
        .ok_or("missing or invalid 'name'")?
        .to_string();
    let external_voltage = number_field(info, "ex_pow")?;
    let battery_voltage = number_field(info, "bat_pow")?;
    let gps_quality = number_field(info, "hdop")?;

    let imei = info
        .get("support_infos")
        .and_then(|s| s.get("imei"))
        .and_then(id_string);
    let device_type = info
        .get("device_type_id")
        .and_then(id_string)
        .unwrap_or_default();

    let location = features.get(&id).cloned();
    let position = location
        .as_ref()
        .and_then(|feature| decode_position(&id, feature));

    Ok(Vehicle {
        id,
        name,
        position,
        location,
        external_voltage,
        battery_voltage,
        gps_quality,
        imei,
        model: model_for_device_type(&device_type).to_string(),
    })
}

/// Identifiers arrive as strings or bare numbers
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numeric telemetry arrives as numbers or numeric strings
fn number_field(info: &Map<String, Value>, key: &str) -> std::result::Result<f64, String> {
    let parsed = match info.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| format!("missing or non-numeric '{}'", key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn car(id: Value, name: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "ex_pow": "12.4",
            "bat_pow": 4.1,
            "hdop": "0.9",
            "support_infos": { "imei": "356938035643809" },
            "device_type_id": "10",
        })
    }

    fn point(carid: &str, coordinates: Value) -> Value {
        json!({
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": coordinates },
            "properties": { "carid": carid, "dt": "2024-05-01 12:00:00", "s": "0", "park_mode": true },
        })
    }

    fn last_pos(features: Vec<Value>) -> String {
        json!({ "type": "FeatureCollection", "features": features }).to_string()
    }

    #[test]
    fn test_vehicle_fields() {
        let data = json!({
            "cars": [car(json!("1"), "Transporter")],
            "lastPos": last_pos(vec![point("1", json!([13.405, 52.52]))]),
        });

        let vehicles = parse_vehicles(&data).unwrap();
        assert_eq!(vehicles.len(), 1);

        let vehicle = &vehicles[0];
        assert_eq!(vehicle.id, "1");
        assert_eq!(vehicle.name, "Transporter");
        assert_eq!(vehicle.external_voltage, 12.4);
        assert_eq!(vehicle.battery_voltage, 4.1);
        assert_eq!(vehicle.gps_quality, 0.9);
        assert_eq!(vehicle.imei.as_deref(), Some("356938035643809"));
        assert_eq!(vehicle.model, "Autoskope V3");
        assert!(vehicle.location.is_some());

        let position = vehicle.position.as_ref().unwrap();
        assert_eq!(position.longitude, 13.405);
        assert_eq!(position.latitude, 52.52);
        assert!(position.park_mode);
        assert_eq!(position.speed, Some(0.0));
    }

    #[test]
    fn test_malformed_location_isolated() {
        let data = json!({
            "cars": [car(json!(1), "a"), car(json!(2), "b"), car(json!(3), "c")],
            "lastPos": last_pos(vec![
                point("1", json!([1.0, 2.0])),
                point("2", json!(["not-a-number", 1.0])),
                point("3", json!([5.0, 6.0])),
            ]),
        });

        let vehicles = parse_vehicles(&data).unwrap();
        assert_eq!(vehicles.len(), 3);
        assert!(vehicles[0].position.is_some());
        assert!(vehicles[1].position.is_none());
        assert!(vehicles[1].location.is_some());
        assert!(vehicles[2].position.is_some());
    }

    #[test]
    fn test_numeric_carid_matches_string_id() {
        let mut feature = point("ignored", json!([1.0, 2.0]));
        feature["properties"]["carid"] = json!(77);
        let data = json!({
            "cars": [car(json!("77"), "boat")],
            "lastPos": last_pos(vec![feature]),
        });

        let vehicles = parse_vehicles(&data).unwrap();
        assert!(vehicles[0].position.is_some());
    }

    #[test]
    fn test_inline_last_pos_object() {
        let data = json!({
            "cars": [car(json!("5"), "bike")],
            "lastPos": { "type": "FeatureCollection", "features": [point("5", json!([1.0, 2.0]))] },
        });

        let vehicles = parse_vehicles(&data).unwrap();
        assert!(vehicles[0].position.is_some());
    }

    #[test]
    fn test_unusable_last_pos_means_no_positions() {
        for last_pos in [
            json!(""),
            json!("{not json"),
            json!(42),
            json!({"type": "Feature"}),
            json!(null),
        ] {
            let data = json!({ "cars": [car(json!("1"), "a")], "lastPos": last_pos });
            let vehicles = parse_vehicles(&data).unwrap();
            assert_eq!(vehicles.len(), 1);
            assert!(vehicles[0].position.is_none());
            assert!(vehicles[0].location.is_none());
        }
    }

    #[test]
    fn test_vehicle_without_feature() {
        let data = json!({
            "cars": [car(json!("1"), "a"), car(json!("2"), "b")],
            "lastPos": last_pos(vec![point("1", json!([1.0, 2.0]))]),
        });

        let vehicles = parse_vehicles(&data).unwrap();
        assert!(vehicles[0].position.is_some());
        assert!(vehicles[1].position.is_none());
    }

    #[test]
    fn test_empty_and_missing_cars() {
        assert!(parse_vehicles(&json!({"cars": []})).unwrap().is_empty());
        assert!(parse_vehicles(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn test_cars_wrong_type_is_cannot_connect() {
        let err = parse_vehicles(&json!({"cars": {"id": 1}})).unwrap_err();
        assert!(err.is_cannot_connect());
    }

    #[test]
    fn test_unparsable_entries_skipped() {
        let mut no_voltage = car(json!("2"), "b");
        no_voltage.as_object_mut().unwrap().remove("ex_pow");
        let data = json!({
            "cars": [car(json!("1"), "a"), "garbage", no_voltage, {"name": "no id"}],
        });

        let vehicles = parse_vehicles(&data).unwrap();
        assert_eq!(vehicles.len(), 1);
        assert_eq!(vehicles[0].id, "1");
    }

    #[test]
    fn test_unknown_device_type_and_missing_imei() {
        let data = json!({
            "cars": [{"id": 9, "name": "x", "ex_pow": 0, "bat_pow": 0, "hdop": 0}],
        });

        let vehicles = parse_vehicles(&data).unwrap();
        assert_eq!(vehicles[0].model, "Autoskope");
        assert_eq!(vehicles[0].imei, None);
    }
}
