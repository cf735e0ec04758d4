use anyhow::Context;
use serde::Deserialize;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};

use crate::config::Config;
use crate::err::Error;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Advisory lock classes; the second key is always the student id.
pub const GATE_LOCK: i32 = 1;
pub const ATTENDANCE_LOCK: i32 = 2;

const MAX_PAGE: i64 = 500;

pub async fn prepare_database(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("connecting to the database")?;
    MIGRATOR
        .run(&pool)
        .await
        .context("applying database migrations")?;
    log::info!("database ready ({} max connections)", config.max_connections);
    Ok(pool)
}

/// A pool that only connects on first use.
pub fn lazy_pool(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(1)
        .connect_lazy(database_url)
        .context("parsing database url")
}

/// Serializes read-modify-write sequences for one student until the
/// surrounding transaction ends.
pub async fn lock_student(
    tx: &mut Transaction<'_, Postgres>,
    class: i32,
    student_id: i32,
) -> Result<(), Error> {
    sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
        .bind(class)
        .bind(student_id)
        .execute(&mut *tx)
        .await?;
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    /// Returns `(offset, limit)`.
    pub fn resolve(&self, default_limit: i64) -> Result<(i64, i64), Error> {
        let skip = self.skip.unwrap_or(0);
        let limit = self.limit.unwrap_or(default_limit);
        if skip < 0 {
            return Err(Error::invalid("`skip` must not be negative"));
        }
        if limit < 0 {
            return Err(Error::invalid("`limit` must not be negative"));
        }
        Ok((skip, limit.min(MAX_PAGE)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_caps() {
        assert_eq!(Pagination::default().resolve(100).unwrap(), (0, 100));
        let page = Pagination {
            skip: Some(20),
            limit: Some(10_000),
        };
        assert_eq!(page.resolve(50).unwrap(), (20, MAX_PAGE));
    }

    #[test]
    fn pagination_rejects_negatives() {
        let page = Pagination {
            skip: Some(-1),
            limit: None,
        };
        assert!(page.resolve(50).is_err());
        let page = Pagination {
            skip: None,
            limit: Some(-5),
        };
        assert!(page.resolve(50).is_err());
    }
}
