use axum::Extension;
use chrono::NaiveDateTime;
use serde::Deserialize;
use sqlx::PgPool;

use crate::clock::Clock;
use crate::db::Pagination;
use crate::err::Error;
use crate::extract::{Json, Query};
use crate::models::DisciplineLog;
use crate::students::fetch_student;
use crate::{breaks, proceeds, Payload};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDisciplineLog {
    pub student_id: i32,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub penalty_amount: f64,
    pub incident_date: Option<NaiveDateTime>,
}

pub async fn create_log(
    Extension(pg): Extension<PgPool>,
    Extension(clock): Extension<Clock>,
    Json(entry): Json<CreateDisciplineLog>,
) -> Payload<DisciplineLog> {
    if entry.category.trim().is_empty() {
        return breaks(Error::invalid("`category` must not be empty"));
    }
    if !entry.penalty_amount.is_finite() || entry.penalty_amount < 0.0 {
        return breaks(Error::invalid("`penalty_amount` must not be negative"));
    }
    fetch_student(&pg, entry.student_id).await?;

    let created = sqlx::query_as::<_, DisciplineLog>(
        "INSERT INTO discipline_logs (student_id, incident_date, category, description, penalty_amount) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(entry.student_id)
    .bind(entry.incident_date.unwrap_or_else(|| clock.now()))
    .bind(entry.category.trim())
    .bind(&entry.description)
    .bind(entry.penalty_amount)
    .fetch_one(&pg)
    .await?;
    log::info!(
        "discipline: {} incident recorded for student {}",
        created.category,
        created.student_id
    );
    proceeds(created)
}

pub async fn list_logs(
    Extension(pg): Extension<PgPool>,
    Query(page): Query<Pagination>,
) -> Payload<Vec<DisciplineLog>> {
    let (skip, limit) = page.resolve(100)?;
    let logs = sqlx::query_as::<_, DisciplineLog>(
        "SELECT * FROM discipline_logs ORDER BY incident_date DESC, id DESC OFFSET $1 LIMIT $2",
    )
    .bind(skip)
    .bind(limit)
    .fetch_all(&pg)
    .await?;
    proceeds(logs)
}
