//! Vehicle and position records returned by the client

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tracked vehicle as reported by the portal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: String,
    pub name: String,
    /// Decoded last known position, if the portal sent a usable one
    #[serde(default)]
    pub position: Option<Position>,
    /// Raw GeoJSON feature the position was decoded from
    #[serde(default)]
    pub location: Option<Value>,
    /// External supply voltage (V)
    pub external_voltage: f64,
    /// Backup battery voltage (V)
    pub battery_voltage: f64,
    /// GPS horizontal dilution of precision; lower is better
    pub gps_quality: f64,
    #[serde(default)]
    pub imei: Option<String>,
    /// Model name derived from the device type
    pub model: String,
}

/// Decoded vehicle location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation: Option<f64>,
    /// Fix time as reported by the tracker
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub park_mode: bool,
    /// Speed in km/h
    #[serde(default)]
    pub speed: Option<f64>,
    /// Remaining telemetry properties, passed through untouched
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}
