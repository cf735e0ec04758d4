use axum::Extension;
use chrono::NaiveDateTime;
use serde::Deserialize;
use sqlx::PgPool;

use crate::clock::Clock;
use crate::db::Pagination;
use crate::err::Error;
use crate::extract::{Json, Path, Query};
use crate::models::Complaint;
use crate::students::fetch_student;
use crate::{breaks, proceeds, Payload};

pub const OPEN: &str = "open";
pub const RESOLVED: &str = "resolved";

#[derive(Debug, Clone, Deserialize)]
pub struct CreateComplaint {
    pub student_id: i32,
    pub category: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateComplaint {
    pub status: String,
    pub resolved_at: Option<NaiveDateTime>,
}

/// A resolved complaint always carries a resolution time; reopening clears it.
pub fn resolution_time(
    status: &str,
    requested: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> Result<Option<NaiveDateTime>, Error> {
    match status {
        RESOLVED => Ok(Some(requested.unwrap_or(now))),
        OPEN => Ok(None),
        other => Err(Error::invalid(format!(
            "`{}` is not a complaint status, expected `{}` or `{}`",
            other, OPEN, RESOLVED
        ))),
    }
}

pub async fn create_complaint(
    Extension(pg): Extension<PgPool>,
    Extension(clock): Extension<Clock>,
    Json(complaint): Json<CreateComplaint>,
) -> Payload<Complaint> {
    if complaint.category.trim().is_empty() {
        return breaks(Error::invalid("`category` must not be empty"));
    }
    fetch_student(&pg, complaint.student_id).await?;

    let created = sqlx::query_as::<_, Complaint>(
        "INSERT INTO complaints (student_id, category, description, status, created_at) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(complaint.student_id)
    .bind(complaint.category.trim())
    .bind(&complaint.description)
    .bind(OPEN)
    .bind(clock.now())
    .fetch_one(&pg)
    .await?;
    proceeds(created)
}

pub async fn list_complaints(
    Extension(pg): Extension<PgPool>,
    Query(page): Query<Pagination>,
) -> Payload<Vec<Complaint>> {
    let (skip, limit) = page.resolve(100)?;
    let complaints = sqlx::query_as::<_, Complaint>(
        "SELECT * FROM complaints ORDER BY created_at DESC, id DESC OFFSET $1 LIMIT $2",
    )
    .bind(skip)
    .bind(limit)
    .fetch_all(&pg)
    .await?;
    proceeds(complaints)
}

pub async fn update_complaint(
    Extension(pg): Extension<PgPool>,
    Extension(clock): Extension<Clock>,
    Path(complaint_id): Path<i32>,
    Json(update): Json<UpdateComplaint>,
) -> Payload<Complaint> {
    let status = update.status.trim().to_ascii_lowercase();
    let resolved_at = resolution_time(&status, update.resolved_at, clock.now())?;

    let updated = sqlx::query_as::<_, Complaint>(
        "UPDATE complaints SET status = $2, resolved_at = $3 WHERE id = $1 RETURNING *",
    )
    .bind(complaint_id)
    .bind(&status)
    .bind(resolved_at)
    .fetch_optional(&pg)
    .await?;

    match updated {
        Some(complaint) => {
            log::info!("complaint {} is now {}", complaint.id, complaint.status);
            proceeds(complaint)
        }
        None => breaks(Error::not_found("Complaint not found")),
    }
}
