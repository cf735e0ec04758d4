//! Gate entry/exit log. The direction of each scan is never supplied by the
//! caller: it is the opposite of the student's previous scan, starting with
//! `OUT` for a student without history.

use std::fmt;
use std::str::FromStr;

use axum::Extension;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::clock::Clock;
use crate::db::{self, Pagination, GATE_LOCK};
use crate::err::Error;
use crate::extract::Query;
use crate::models::GateEntry;
use crate::students::fetch_student;
use crate::{breaks, proceeds, Payload};

pub const DEFAULT_RETENTION_DAYS: i64 = 60;
const DEFAULT_LOG_LIMIT: i64 = 50;
/// Cutoffs further back than this delete nothing anyway.
const MAX_RETENTION_DAYS: i64 = 36_500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "OUT")]
    Out,
}

impl Direction {
    /// The direction of the next scan given the latest recorded one.
    pub fn next(prior: Option<Direction>) -> Direction {
        match prior {
            None | Some(Direction::In) => Direction::Out,
            Some(Direction::Out) => Direction::In,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "IN",
            Direction::Out => "OUT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN" => Ok(Direction::In),
            "OUT" => Ok(Direction::Out),
            other => Err(Error::internal(
                "CorruptRecord",
                format!("unknown gate event type `{}`", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanQuery {
    pub student_id: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CleanupQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanupReport {
    pub message: String,
    pub deleted: u64,
}

pub async fn scan(
    Extension(pg): Extension<PgPool>,
    Extension(clock): Extension<Clock>,
    Query(ScanQuery { student_id }): Query<ScanQuery>,
) -> Payload<GateEntry> {
    let student = fetch_student(&pg, student_id).await?;

    let mut tx = pg.begin().await?;
    db::lock_student(&mut tx, GATE_LOCK, student_id).await?;

    let last: Option<(String,)> = sqlx::query_as(
        "SELECT event_type FROM gate_entries WHERE student_id = $1 \
         ORDER BY recorded_at DESC, id DESC LIMIT 1",
    )
    .bind(student_id)
    .fetch_optional(&mut tx)
    .await?;
    let prior = match last {
        Some((event_type,)) => Some(event_type.parse::<Direction>()?),
        None => None,
    };
    let direction = Direction::next(prior);

    let mut entry = sqlx::query_as::<_, GateEntry>(
        "INSERT INTO gate_entries (student_id, recorded_at, event_type) VALUES ($1, $2, $3) \
         RETURNING id, student_id, recorded_at, event_type, NULL::TEXT AS student_name",
    )
    .bind(student_id)
    .bind(clock.now())
    .bind(direction.as_str())
    .fetch_one(&mut tx)
    .await?;
    tx.commit().await?;

    log::info!("gate scan: student {} went {}", student_id, direction);
    entry.student_name = Some(student.name);
    proceeds(entry)
}

pub async fn list_logs(
    Extension(pg): Extension<PgPool>,
    Query(page): Query<Pagination>,
) -> Payload<Vec<GateEntry>> {
    let (skip, limit) = page.resolve(DEFAULT_LOG_LIMIT)?;
    let logs = sqlx::query_as::<_, GateEntry>(
        "SELECT g.id, g.student_id, g.recorded_at, g.event_type, s.name AS student_name \
         FROM gate_entries g LEFT JOIN students s ON s.id = g.student_id \
         ORDER BY g.recorded_at DESC, g.id DESC OFFSET $1 LIMIT $2",
    )
    .bind(skip)
    .bind(limit)
    .fetch_all(&pg)
    .await?;
    proceeds(logs)
}

pub async fn cleanup(
    Extension(pg): Extension<PgPool>,
    Extension(clock): Extension<Clock>,
    Query(CleanupQuery { days }): Query<CleanupQuery>,
) -> Payload<CleanupReport> {
    let days = days.unwrap_or(DEFAULT_RETENTION_DAYS);
    if days < 1 {
        return breaks(Error::invalid("Days must be positive"));
    }
    let cutoff = clock.now() - Duration::days(days.min(MAX_RETENTION_DAYS));

    let deleted = sqlx::query("DELETE FROM gate_entries WHERE recorded_at < $1")
        .bind(cutoff)
        .execute(&pg)
        .await?
        .rows_affected();

    log::info!("gate cleanup removed {} entries older than {} days", deleted, days);
    proceeds(CleanupReport {
        message: format!("Deleted {} logs older than {} days", deleted, days),
        deleted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_scan_is_out() {
        assert_eq!(Direction::next(None), Direction::Out);
    }

    #[test]
    fn scans_alternate() {
        let mut last = None;
        let mut seen = Vec::new();
        for _ in 0..7 {
            let next = Direction::next(last);
            seen.push(next);
            last = Some(next);
        }
        let expected: Vec<Direction> = (0..7)
            .map(|i| if i % 2 == 0 { Direction::Out } else { Direction::In })
            .collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn stored_names_round_trip() {
        assert_eq!("IN".parse::<Direction>().unwrap(), Direction::In);
        assert_eq!(Direction::Out.to_string(), "OUT");
        assert!("in".parse::<Direction>().is_err());
    }

    #[test]
    fn serializes_as_stored_names() {
        assert_eq!(serde_json::to_value(Direction::In).unwrap(), "IN");
    }
}
