//! GeoJSON location decoding
//!
//! The portal reports positions as GeoJSON point features:
//!
//! ```json
//! {
//!   "type": "Feature",
//!   "geometry": { "type": "Point", "coordinates": [13.405, 52.52] },
//!   "properties": { "carid": "42", "dt": "2024-05-01 12:00:00", "s": "0", "park_mode": true }
//! }
//! ```
//!
//! Coordinates keep GeoJSON order: longitude, latitude, optional elevation.
//! A structurally broken feature yields no position; a broken optional
//! property falls back to its default.

use std::collections::HashMap;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::Position;

/// Properties mapped onto typed [`Position`] fields rather than passed through
const TYPED_PROPERTIES: &[&str] = &["park_mode", "park", "dt", "s"];

/// Why a location payload could not be turned into a [`Position`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PositionDecodeError {
    #[error("location payload is not an object")]
    NotAnObject,

    #[error("missing geometry")]
    MissingGeometry,

    #[error("unsupported geometry type {0:?}")]
    UnsupportedGeometry(String),

    #[error("missing coordinates")]
    MissingCoordinates,

    #[error("expected 2 or 3 coordinates, got {0}")]
    CoordinateArity(usize),

    #[error("coordinate {0} is not a number")]
    NonNumericCoordinate(usize),

    #[error("properties is not an object")]
    MalformedProperties,
}

/// Decode a vehicle's location payload, logging and discarding it when malformed
pub fn decode_position(vehicle_id: &str, feature: &Value) -> Option<Position> {
    match try_decode_position(vehicle_id, feature) {
        Ok(position) => Some(position),
        Err(err) => {
            warn!(vehicle_id, kind = %err, "Discarding malformed location payload");
            None
        }
    }
}

/// Decode a vehicle's location payload
///
/// Only structural problems are errors; unusable optional properties are
/// logged against `vehicle_id` and replaced by their defaults.
pub fn try_decode_position(
    vehicle_id: &str,
    feature: &Value,
) -> Result<Position, PositionDecodeError> {
    let feature = feature
        .as_object()
        .ok_or(PositionDecodeError::NotAnObject)?;

    let (longitude, latitude, elevation) = decode_point(feature.get("geometry"))?;

    let empty = Map::new();
    let properties = match feature.get("properties") {
        None | Some(Value::Null) => &empty,
        Some(Value::Object(map)) => map,
        Some(_) => return Err(PositionDecodeError::MalformedProperties),
    };

    let attributes: HashMap<String, Value> = properties
        .iter()
        .filter(|(key, _)| !TYPED_PROPERTIES.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Ok(Position {
        latitude,
        longitude,
        elevation,
        timestamp: decode_timestamp(vehicle_id, properties),
        park_mode: decode_park_mode(vehicle_id, properties),
        speed: decode_speed(vehicle_id, properties),
        attributes,
    })
}

fn decode_point(
    geometry: Option<&Value>,
) -> Result<(f64, f64, Option<f64>), PositionDecodeError> {
    let geometry = geometry
        .and_then(Value::as_object)
        .ok_or(PositionDecodeError::MissingGeometry)?;

    match geometry.get("type").and_then(Value::as_str) {
        Some("Point") => {}
        Some(other) => return Err(PositionDecodeError::UnsupportedGeometry(other.to_string())),
        None => return Err(PositionDecodeError::UnsupportedGeometry(String::new())),
    }

    let coordinates = geometry
        .get("coordinates")
        .and_then(Value::as_array)
        .ok_or(PositionDecodeError::MissingCoordinates)?;
    if !(2..=3).contains(&coordinates.len()) {
        return Err(PositionDecodeError::CoordinateArity(coordinates.len()));
    }

    let mut numbers = [0.0_f64; 3];
    for (idx, value) in coordinates.iter().enumerate() {
        numbers[idx] = value
            .as_f64()
            .ok_or(PositionDecodeError::NonNumericCoordinate(idx))?;
    }

    let elevation = (coordinates.len() == 3).then_some(numbers[2]);
    Ok((numbers[0], numbers[1], elevation))
}

/// `park_mode` must be a boolean. Older firmware only sends `park`, which
/// counts as parked whenever it is truthy.
fn decode_park_mode(vehicle_id: &str, properties: &Map<String, Value>) -> bool {
    match properties.get("park_mode") {
        Some(Value::Bool(parked)) => *parked,
        Some(other) => {
            warn!(vehicle_id, value = %other, "park_mode is not a boolean, assuming false");
            false
        }
        None => properties.get("park").is_some_and(is_truthy),
    }
}

/// Numeric strings follow their value, so `"0"` is not parked
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => {
            let s = s.trim();
            match s.parse::<f64>() {
                Ok(n) => n != 0.0,
                Err(_) => !s.is_empty() && !s.eq_ignore_ascii_case("false"),
            }
        }
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn decode_timestamp(vehicle_id: &str, properties: &Map<String, Value>) -> Option<String> {
    match properties.get("dt") {
        None | Some(Value::Null) => None,
        Some(Value::String(dt)) => Some(dt.clone()),
        Some(other) => {
            debug!(vehicle_id, value = %other, "Ignoring non-string timestamp");
            None
        }
    }
}

/// Speed arrives as a number or as a numeric string
fn decode_speed(vehicle_id: &str, properties: &Map<String, Value>) -> Option<f64> {
    let value = properties.get("s")?;
    let speed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Null => return None,
        _ => None,
    };
    if speed.is_none() {
        debug!(vehicle_id, %value, "Ignoring non-numeric speed");
    }
    speed
}
