//! Environment-driven server configuration.

use std::env;
use std::net::SocketAddr;

use anyhow::{bail, Context};

use crate::geofence::{AttendancePolicy, AttendanceWindow, DEFAULT_RADIUS_METERS};

pub const DATABASE_URL: &str = "DATABASE_URL";
pub const BIND_ADDR: &str = "HOSTEL_BIND_ADDR";
pub const DB_MAX_CONNECTIONS: &str = "HOSTEL_DB_MAX_CONNECTIONS";
pub const ATTENDANCE_WINDOW: &str = "HOSTEL_ATTENDANCE_WINDOW";
pub const GEOFENCE_RADIUS: &str = "HOSTEL_GEOFENCE_RADIUS_METERS";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    pub attendance: AttendancePolicy,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup, so tests can
    /// avoid touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup(DATABASE_URL)
            .filter(|url| !url.trim().is_empty())
            .with_context(|| format!("`{}` must be set", DATABASE_URL))?;

        let bind_addr = lookup(BIND_ADDR)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .with_context(|| format!("`{}` is not a socket address", BIND_ADDR))?;

        let max_connections = match lookup(DB_MAX_CONNECTIONS) {
            Some(raw) => raw
                .parse::<u32>()
                .with_context(|| format!("`{}` must be a positive integer", DB_MAX_CONNECTIONS))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        if max_connections == 0 {
            bail!("`{}` must be at least 1", DB_MAX_CONNECTIONS);
        }

        let window = match lookup(ATTENDANCE_WINDOW) {
            Some(raw) => raw.parse::<AttendanceWindow>()?,
            None => AttendanceWindow::default(),
        };

        let radius_meters = match lookup(GEOFENCE_RADIUS) {
            Some(raw) => raw
                .parse::<f64>()
                .with_context(|| format!("`{}` must be a number", GEOFENCE_RADIUS))?,
            None => DEFAULT_RADIUS_METERS,
        };
        if !radius_meters.is_finite() || radius_meters <= 0.0 {
            bail!("`{}` must be a positive distance", GEOFENCE_RADIUS);
        }

        Ok(Config {
            database_url,
            bind_addr,
            max_connections,
            attendance: AttendancePolicy {
                window,
                radius_meters,
            },
        })
    }
}
