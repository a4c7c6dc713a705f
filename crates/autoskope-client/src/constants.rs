//! Constants for the Autoskope portal API

use std::time::Duration;

/// Device manufacturer reported for every tracker
pub const MANUFACTURER: &str = "Autoskope GmbH";

/// App version announced to the portal on login and data requests
pub const APP_VERSION: &str = "2.40";

/// Fallback model name for unknown device types
pub const DEFAULT_MODEL: &str = "Autoskope";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Login endpoint (form POST)
pub const LOGIN_PATH: &str = "/scripts/ajax/login.php";

/// Vehicle info endpoint (form POST)
pub const VEHICLES_PATH: &str = "/scripts/ajax/app/info.php";

/// Device type id to model name
pub const DEVICE_TYPE_MODELS: &[(&str, &str)] = &[
    ("1", "AutoskopeX"),
    ("3", "Autoskope V2"),
    ("5", "Autoskope V2"),
    ("7", "Motoskope"),
    ("8", "Bootskope"),
    ("10", "Autoskope V3"),
    ("11", "Solarskope"),
];

/// Look up the model name for a device type id, falling back to [`DEFAULT_MODEL`]
pub fn model_for_device_type(device_type_id: &str) -> &'static str {
    DEVICE_TYPE_MODELS
        .iter()
        .find(|(id, _)| *id == device_type_id)
        .map(|(_, model)| *model)
        .unwrap_or(DEFAULT_MODEL)
}

/// User agent sent with every request
pub(crate) fn user_agent() -> String {
    format!("autoskope-client/{}", APP_VERSION)
}
