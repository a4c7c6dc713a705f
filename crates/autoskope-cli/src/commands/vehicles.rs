//! Vehicles command - list tracked vehicles with their last position

use anyhow::Result;
use autoskope_client::{AutoskopeClient, Vehicle};

use crate::output::{OutputContext, VehicleRow};

/// Log in, fetch all vehicles and print them
pub async fn vehicles(client: &mut AutoskopeClient, ctx: &OutputContext) -> Result<()> {
    let mut session = client.connect()?;
    session.login().await?;
    let vehicles = session.fetch_vehicles().await?;
    drop(session);

    if vehicles.is_empty() {
        ctx.info("No vehicles found");
        return Ok(());
    }

    let rows: Vec<VehicleRow> = vehicles.into_iter().map(VehicleRow::from).collect();
    ctx.print(&rows);
    Ok(())
}

impl From<Vehicle> for VehicleRow {
    fn from(v: Vehicle) -> Self {
        let (latitude, longitude, speed, parked, timestamp) = match &v.position {
            Some(p) => (
                format!("{:.6}", p.latitude),
                format!("{:.6}", p.longitude),
                p.speed
                    .map(|s| format!("{:.1}", s))
                    .unwrap_or_else(|| "-".to_string()),
                if p.park_mode { "Yes" } else { "No" }.to_string(),
                p.timestamp.clone().unwrap_or_else(|| "-".to_string()),
            ),
            None => (
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
            ),
        };

        VehicleRow {
            id: v.id,
            name: v.name,
            model: v.model,
            latitude,
            longitude,
            speed,
            parked,
            timestamp,
            external_voltage: format!("{:.2}", v.external_voltage),
            battery_voltage: format!("{:.2}", v.battery_voltage),
            gps_quality: format!("{:.1}", v.gps_quality),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoskope_client::Position;
    use std::collections::HashMap;

    fn vehicle(position: Option<Position>) -> Vehicle {
        Vehicle {
            id: "42".to_string(),
            name: "Sprinter".to_string(),
            position,
            location: None,
            external_voltage: 12.6,
            battery_voltage: 4.05,
            gps_quality: 0.9,
            imei: None,
            model: "Autoskope V3".to_string(),
        }
    }

    #[test]
    fn test_row_with_position() {
        let row = VehicleRow::from(vehicle(Some(Position {
            latitude: 52.52,
            longitude: 13.405,
            elevation: None,
            timestamp: Some("2024-01-01 12:00:00".to_string()),
            park_mode: true,
            speed: Some(0.0),
            attributes: HashMap::new(),
        })));

        assert_eq!(row.id, "42");
        assert_eq!(row.latitude, "52.520000");
        assert_eq!(row.longitude, "13.405000");
        assert_eq!(row.speed, "0.0");
        assert_eq!(row.parked, "Yes");
        assert_eq!(row.timestamp, "2024-01-01 12:00:00");
        assert_eq!(row.external_voltage, "12.60");
    }

    #[test]
    fn test_row_without_position() {
        let row = VehicleRow::from(vehicle(None));
        assert_eq!(row.latitude, "-");
        assert_eq!(row.parked, "-");
        assert_eq!(row.model, "Autoskope V3");
    }
}
