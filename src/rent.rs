use axum::Extension;
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;

use crate::db::Pagination;
use crate::err::Error;
use crate::extract::{Json, Query};
use crate::models::RentPayment;
use crate::students::fetch_student;
use crate::{breaks, proceeds, Payload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RentStatus {
    Paid,
    Unpaid,
    Late,
}

impl RentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RentStatus::Paid => "paid",
            RentStatus::Unpaid => "unpaid",
            RentStatus::Late => "late",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRentPayment {
    pub student_id: i32,
    pub amount: f64,
    pub month: String,
    pub status: RentStatus,
    pub payment_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Billing months are written `YYYY-MM`.
pub fn validate_month(month: &str) -> Result<(), Error> {
    let well_formed = month.len() == 7
        && NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d").is_ok();
    if well_formed {
        Ok(())
    } else {
        Err(Error::invalid(format!("`{}` is not a YYYY-MM month", month)))
    }
}

pub async fn create_payment(
    Extension(pg): Extension<PgPool>,
    Json(payment): Json<CreateRentPayment>,
) -> Payload<RentPayment> {
    validate_month(&payment.month)?;
    if !payment.amount.is_finite() || payment.amount < 0.0 {
        return breaks(Error::invalid("`amount` must not be negative"));
    }
    fetch_student(&pg, payment.student_id).await?;

    let created = sqlx::query_as::<_, RentPayment>(
        "INSERT INTO rent_payments (student_id, amount, month, status, payment_date, notes) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(payment.student_id)
    .bind(payment.amount)
    .bind(&payment.month)
    .bind(payment.status.as_str())
    .bind(payment.payment_date)
    .bind(&payment.notes)
    .fetch_one(&pg)
    .await?;
    proceeds(created)
}

pub async fn list_payments(
    Extension(pg): Extension<PgPool>,
    Query(page): Query<Pagination>,
) -> Payload<Vec<RentPayment>> {
    let (skip, limit) = page.resolve(100)?;
    let payments =
        sqlx::query_as::<_, RentPayment>("SELECT * FROM rent_payments ORDER BY id OFFSET $1 LIMIT $2")
            .bind(skip)
            .bind(limit)
            .fetch_all(&pg)
            .await?;
    proceeds(payments)
}

pub async fn pending_payments(Extension(pg): Extension<PgPool>) -> Payload<Vec<RentPayment>> {
    let payments = sqlx::query_as::<_, RentPayment>(
        "SELECT * FROM rent_payments WHERE status <> $1 ORDER BY month, id",
    )
    .bind(RentStatus::Paid.as_str())
    .fetch_all(&pg)
    .await?;
    proceeds(payments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn months_are_year_and_month() {
        assert!(validate_month("2026-09").is_ok());
        assert!(validate_month("2026-13").is_err());
        assert!(validate_month("2026-9").is_err());
        assert!(validate_month("September").is_err());
    }

    #[test]
    fn status_names_are_lowercase() {
        let status: RentStatus = serde_json::from_str("\"late\"").unwrap();
        assert_eq!(status, RentStatus::Late);
        assert!(serde_json::from_str::<RentStatus>("\"overdue\"").is_err());
    }
}
