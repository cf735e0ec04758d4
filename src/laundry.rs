use axum::Extension;
use serde::Deserialize;
use sqlx::PgPool;

use crate::attendance::parse_date;
use crate::clock::Clock;
use crate::db::Pagination;
use crate::err::Error;
use crate::extract::{Json, Query};
use crate::models::LaundryUsage;
use crate::students::fetch_student;
use crate::{breaks, proceeds, Payload};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLaundryUsage {
    pub student_id: i32,
    pub machine_id: i32,
    pub slot: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LaundryQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub date: Option<String>,
}

pub async fn log_usage(
    Extension(pg): Extension<PgPool>,
    Extension(clock): Extension<Clock>,
    Json(usage): Json<CreateLaundryUsage>,
) -> Payload<LaundryUsage> {
    if usage.machine_id < 1 {
        return breaks(Error::invalid("`machine_id` must be positive"));
    }
    if usage.slot.trim().is_empty() {
        return breaks(Error::invalid("`slot` must not be empty"));
    }
    fetch_student(&pg, usage.student_id).await?;

    let created = sqlx::query_as::<_, LaundryUsage>(
        "INSERT INTO laundry_usage (student_id, machine_id, usage_date, slot) \
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(usage.student_id)
    .bind(usage.machine_id)
    .bind(clock.now())
    .bind(usage.slot.trim())
    .fetch_one(&pg)
    .await?;
    proceeds(created)
}

pub async fn list_usage(
    Extension(pg): Extension<PgPool>,
    Query(query): Query<LaundryQuery>,
) -> Payload<Vec<LaundryUsage>> {
    let page = Pagination {
        skip: query.skip,
        limit: query.limit,
    };
    let (skip, limit) = page.resolve(100)?;
    let date = query.date.as_deref().map(parse_date).transpose()?;

    let usage = sqlx::query_as::<_, LaundryUsage>(
        "SELECT * FROM laundry_usage \
         WHERE ($1::DATE IS NULL OR usage_date::DATE = $1) \
         ORDER BY usage_date, id OFFSET $2 LIMIT $3",
    )
    .bind(date)
    .bind(skip)
    .bind(limit)
    .fetch_all(&pg)
    .await?;
    proceeds(usage)
}
