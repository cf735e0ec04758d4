//! Geofenced attendance evaluation: great-circle distance to the hostel,
//! the Present/Away decision and the nightly submission window.

use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::err::Error;

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;
pub const DEFAULT_RADIUS_METERS: f64 = 500.0;
pub const DEFAULT_HOSTEL_LOCATION: GeoPoint = GeoPoint {
    latitude: 28.6139,
    longitude: 77.2090,
};

const NIGHTLY_OPENS: u32 = 22 * 3600;
const NIGHTLY_CLOSES: u32 = 23 * 3600 + 30 * 60;

pub const BEFORE_WINDOW: &str = "Attendance check-in allowed only between 10:00 PM and 11:30 PM.";
pub const AFTER_WINDOW: &str = "Attendance closed. It is past 11:30 PM.";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        GeoPoint {
            latitude,
            longitude,
        }
    }

    pub fn validate(self) -> Result<Self, Error> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Error::invalid(format!(
                "latitude {} is outside [-90, 90]",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(Error::invalid(format!(
                "longitude {} is outside [-180, 180]",
                self.longitude
            )));
        }
        Ok(self)
    }

    /// Haversine distance in meters.
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        let phi1 = self.latitude.to_radians();
        let phi2 = other.latitude.to_radians();
        let d_phi = (other.latitude - self.latitude).to_radians();
        let d_lambda = (other.longitude - self.longitude).to_radians();

        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// Resolves the hostel location from the two stored setting values.
    /// Either value missing or unparsable yields the built-in default pair.
    pub fn from_settings(lat: Option<&str>, lng: Option<&str>) -> GeoPoint {
        match (lat, lng) {
            (Some(lat), Some(lng)) => match (lat.trim().parse::<f64>(), lng.trim().parse::<f64>()) {
                (Ok(latitude), Ok(longitude)) => GeoPoint::new(latitude, longitude),
                _ => {
                    log::warn!(
                        "stored hostel location ({:?}, {:?}) is not numeric, using default",
                        lat,
                        lng
                    );
                    DEFAULT_HOSTEL_LOCATION
                }
            },
            _ => DEFAULT_HOSTEL_LOCATION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceStatus {
    Present,
    Away,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Away => "Away",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When attendance submissions are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttendanceWindow {
    /// 22:00:00 through 23:30:00 inclusive.
    #[default]
    Nightly,
    /// Rejects hours 7..=21 and 23:31 onwards; everything else passes,
    /// including the small hours of the morning.
    Legacy,
    /// No restriction.
    Open,
}

impl AttendanceWindow {
    pub fn check(&self, now: NaiveTime) -> Result<(), Error> {
        match self {
            AttendanceWindow::Open => Ok(()),
            AttendanceWindow::Legacy => {
                let hour = now.hour();
                if hour > 6 && hour < 22 {
                    return Err(outside(BEFORE_WINDOW));
                }
                if hour == 23 && now.minute() > 30 {
                    return Err(outside(AFTER_WINDOW));
                }
                Ok(())
            }
            AttendanceWindow::Nightly => {
                let seconds = now.num_seconds_from_midnight();
                if seconds < NIGHTLY_OPENS {
                    Err(outside(BEFORE_WINDOW))
                } else if seconds > NIGHTLY_CLOSES {
                    Err(outside(AFTER_WINDOW))
                } else {
                    Ok(())
                }
            }
        }
    }
}

fn outside(detail: &str) -> Error {
    Error::OutsideWindow {
        detail: detail.to_string(),
    }
}

impl FromStr for AttendanceWindow {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nightly" => Ok(AttendanceWindow::Nightly),
            "legacy" => Ok(AttendanceWindow::Legacy),
            "open" => Ok(AttendanceWindow::Open),
            other => bail!(
                "unknown attendance window `{}`, expected nightly, legacy or open",
                other
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttendancePolicy {
    pub window: AttendanceWindow,
    pub radius_meters: f64,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        AttendancePolicy {
            window: AttendanceWindow::default(),
            radius_meters: DEFAULT_RADIUS_METERS,
        }
    }
}

impl AttendancePolicy {
    pub fn status_for(&self, distance_meters: f64) -> AttendanceStatus {
        if distance_meters <= self.radius_meters {
            AttendanceStatus::Present
        } else {
            AttendanceStatus::Away
        }
    }

    /// Distance and status of a report against the hostel location.
    pub fn evaluate(&self, reported: &GeoPoint, hostel: &GeoPoint) -> (f64, AttendanceStatus) {
        let distance = reported.distance_to(hostel);
        (distance, self.status_for(distance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn identical_points_are_present() {
        let policy = AttendancePolicy::default();
        let (distance, status) = policy.evaluate(&DEFAULT_HOSTEL_LOCATION, &DEFAULT_HOSTEL_LOCATION);
        assert_eq!(distance, 0.0);
        assert_eq!(status, AttendanceStatus::Present);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = GeoPoint::new(28.6139, 77.2090);
        let b = GeoPoint::new(12.9716, 77.5946);
        assert!((a.distance_to(&b) - b.distance_to(&a)).abs() < 1e-6);
    }

    #[test]
    fn nearby_report_is_present() {
        let policy = AttendancePolicy::default();
        let (distance, status) =
            policy.evaluate(&GeoPoint::new(28.6140, 77.2091), &DEFAULT_HOSTEL_LOCATION);
        assert!(distance > 13.0 && distance < 15.0, "got {}", distance);
        assert_eq!(status, AttendanceStatus::Present);
    }

    #[test]
    fn distant_report_is_away() {
        let policy = AttendancePolicy::default();
        let (distance, status) =
            policy.evaluate(&GeoPoint::new(29.0, 78.0), &DEFAULT_HOSTEL_LOCATION);
        assert!(distance > 50_000.0);
        assert_eq!(status, AttendanceStatus::Away);
    }

    #[test]
    fn radius_boundary_is_inclusive() {
        let policy = AttendancePolicy::default();
        assert_eq!(policy.status_for(500.0), AttendanceStatus::Present);
        assert_eq!(policy.status_for(500.001), AttendanceStatus::Away);
    }

    #[test]
    fn settings_fall_back_to_default() {
        assert_eq!(GeoPoint::from_settings(None, None), DEFAULT_HOSTEL_LOCATION);
        assert_eq!(GeoPoint::from_settings(Some("12.5"), None), DEFAULT_HOSTEL_LOCATION);
        assert_eq!(GeoPoint::from_settings(Some("north"), Some("1.0")), DEFAULT_HOSTEL_LOCATION);
        assert_eq!(
            GeoPoint::from_settings(Some("12.5"), Some("-3.25")),
            GeoPoint::new(12.5, -3.25)
        );
    }

    #[test]
    fn coordinates_are_range_checked() {
        assert!(GeoPoint::new(91.0, 0.0).validate().is_err());
        assert!(GeoPoint::new(0.0, -180.5).validate().is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).validate().is_err());
        assert!(GeoPoint::new(-90.0, 180.0).validate().is_ok());
    }

    #[test]
    fn nightly_window_bounds() {
        let window = AttendanceWindow::Nightly;
        assert!(window.check(at(21, 59, 59)).is_err());
        assert!(window.check(at(22, 0, 0)).is_ok());
        assert!(window.check(at(23, 15, 0)).is_ok());
        assert!(window.check(at(23, 30, 0)).is_ok());
        assert_eq!(
            window.check(at(23, 30, 1)),
            Err(Error::OutsideWindow {
                detail: AFTER_WINDOW.to_string()
            })
        );
        assert_eq!(
            window.check(at(2, 0, 0)),
            Err(Error::OutsideWindow {
                detail: BEFORE_WINDOW.to_string()
            })
        );
    }

    #[test]
    fn legacy_window_matches_hour_checks() {
        let window = AttendanceWindow::Legacy;
        assert!(window.check(at(3, 0, 0)).is_ok());
        assert!(window.check(at(6, 59, 0)).is_ok());
        assert!(window.check(at(7, 0, 0)).is_err());
        assert!(window.check(at(21, 59, 0)).is_err());
        assert!(window.check(at(22, 0, 0)).is_ok());
        assert!(window.check(at(23, 30, 59)).is_ok());
        assert!(window.check(at(23, 31, 0)).is_err());
    }

    #[test]
    fn open_window_accepts_anything() {
        assert!(AttendanceWindow::Open.check(at(12, 0, 0)).is_ok());
    }

    #[test]
    fn window_names_parse() {
        assert_eq!("Nightly".parse::<AttendanceWindow>().unwrap(), AttendanceWindow::Nightly);
        assert_eq!(" open ".parse::<AttendanceWindow>().unwrap(), AttendanceWindow::Open);
        assert!("sometimes".parse::<AttendanceWindow>().is_err());
    }
}
