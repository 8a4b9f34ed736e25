use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CoreError, CoreResult};

/// A vehicle unit tracked by location, battery and availability
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AirBear {
    pub id: Uuid,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub heading: Option<f64>,
    pub battery_level: Option<i32>,
    pub is_available: bool,
    pub is_charging: bool,
    pub updated_at: DateTime<Utc>,
}

impl AirBear {
    /// Can be handed to a new ride
    pub fn is_assignable(&self) -> bool {
        self.is_available && !self.is_charging
    }

    pub fn apply_location(&mut self, update: &LocationUpdate) {
        self.latitude = update.latitude;
        self.longitude = update.longitude;
        if update.heading.is_some() {
            self.heading = update.heading;
        }
        if update.battery_level.is_some() {
            self.battery_level = update.battery_level;
        }
        self.updated_at = Utc::now();
    }

    pub fn apply_status(&mut self, update: &StatusUpdate) {
        if let Some(available) = update.is_available {
            self.is_available = available;
        }
        if let Some(charging) = update.is_charging {
            self.is_charging = charging;
        }
        self.updated_at = Utc::now();
    }
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> CoreResult<()> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(CoreError::ValidationError(
            "Latitude must be between -90 and 90".to_string(),
        ));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(CoreError::ValidationError(
            "Longitude must be between -180 and 180".to_string(),
        ));
    }
    Ok(())
}

/// A driver's position report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationUpdate {
    pub latitude: f64,
    pub longitude: f64,
    pub heading: Option<f64>,
    pub battery_level: Option<i32>,
}

impl LocationUpdate {
    pub fn validate(&self) -> CoreResult<()> {
        validate_coordinates(self.latitude, self.longitude)?;

        if let Some(heading) = self.heading {
            if !heading.is_finite() || !(0.0..=360.0).contains(&heading) {
                return Err(CoreError::ValidationError(
                    "Heading must be between 0 and 360".to_string(),
                ));
            }
        }
        if let Some(battery) = self.battery_level {
            if !(0..=100).contains(&battery) {
                return Err(CoreError::ValidationError(
                    "Battery level must be between 0 and 100".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Availability / charging toggle
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusUpdate {
    pub is_available: Option<bool>,
    pub is_charging: Option<bool>,
}

impl StatusUpdate {
    pub fn validate(&self) -> CoreResult<()> {
        if self.is_available.is_none() && self.is_charging.is_none() {
            return Err(CoreError::ValidationError(
                "Nothing to update: provide is_available or is_charging".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(latitude: f64, longitude: f64) -> LocationUpdate {
        LocationUpdate {
            latitude,
            longitude,
            heading: None,
            battery_level: None,
        }
    }

    #[test]
    fn test_coordinate_bounds() {
        assert!(update(40.7934, -77.86).validate().is_ok());
        assert!(update(90.0, 180.0).validate().is_ok());
        assert!(update(-90.0, -180.0).validate().is_ok());

        assert!(update(90.01, 0.0).validate().is_err());
        assert!(update(-91.0, 0.0).validate().is_err());
        assert!(update(0.0, 180.5).validate().is_err());
        assert!(update(0.0, -181.0).validate().is_err());
        assert!(update(f64::NAN, 0.0).validate().is_err());
    }

    #[test]
    fn test_heading_and_battery_bounds() {
        let mut report = update(40.0, -77.0);
        report.heading = Some(359.9);
        report.battery_level = Some(100);
        assert!(report.validate().is_ok());

        report.heading = Some(361.0);
        assert!(report.validate().is_err());

        report.heading = None;
        report.battery_level = Some(-1);
        assert!(report.validate().is_err());
    }

    #[test]
    fn test_status_update_needs_a_field() {
        assert!(StatusUpdate::default().validate().is_err());
        let charging = StatusUpdate { is_available: None, is_charging: Some(true) };
        assert!(charging.validate().is_ok());
    }
}
