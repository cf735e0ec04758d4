//! Key-value system settings. Read on every request so updates are visible
//! immediately.

use sqlx::{PgPool, Postgres, Transaction};

use crate::err::Error;
use crate::geofence::GeoPoint;
use crate::models::SystemSetting;

pub const HOSTEL_LAT: &str = "HOSTEL_LAT";
pub const HOSTEL_LNG: &str = "HOSTEL_LNG";

pub async fn get_setting(pg: &PgPool, key: &str) -> Result<Option<String>, Error> {
    let setting = sqlx::query_as::<_, SystemSetting>(
        "SELECT key, value FROM system_settings WHERE key = $1",
    )
    .bind(key)
    .fetch_optional(pg)
    .await?;
    Ok(setting.map(|s| s.value))
}

pub async fn put_setting(
    tx: &mut Transaction<'_, Postgres>,
    key: &str,
    value: &str,
) -> Result<(), Error> {
    sqlx::query(
        "INSERT INTO system_settings (key, value) VALUES ($1, $2) \
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
    )
    .bind(key)
    .bind(value)
    .execute(&mut *tx)
    .await?;
    Ok(())
}

/// The hostel reference point, falling back to the built-in default when it
/// has not been configured.
pub async fn hostel_location(pg: &PgPool) -> Result<GeoPoint, Error> {
    let lat = get_setting(pg, HOSTEL_LAT).await?;
    let lng = get_setting(pg, HOSTEL_LNG).await?;
    Ok(GeoPoint::from_settings(lat.as_deref(), lng.as_deref()))
}

pub async fn store_hostel_location(pg: &PgPool, location: GeoPoint) -> Result<(), Error> {
    let mut tx = pg.begin().await?;
    put_setting(&mut tx, HOSTEL_LAT, &location.latitude.to_string()).await?;
    put_setting(&mut tx, HOSTEL_LNG, &location.longitude.to_string()).await?;
    tx.commit().await?;
    Ok(())
}
