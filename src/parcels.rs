use axum::Extension;
use rand::Rng;
use serde::Deserialize;
use sqlx::PgPool;

use crate::clock::Clock;
use crate::err::Error;
use crate::extract::{Json, OptionalJson, Path};
use crate::models::Parcel;
use crate::students::fetch_student;
use crate::{breaks, proceeds, Message, Payload};

pub const WAITING: &str = "Waiting";
pub const COLLECTED: &str = "Collected";

#[derive(Debug, Clone, Deserialize)]
pub struct ReceiveParcel {
    pub student_id: i32,
    pub courier: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectParcel {
    pub pickup_code: Option<String>,
}

/// Four-digit code the student quotes at the mailroom.
pub fn pickup_code<R: Rng>(rng: &mut R) -> String {
    rng.gen_range(1000..=9999).to_string()
}

pub async fn receive_parcel(
    Extension(pg): Extension<PgPool>,
    Extension(clock): Extension<Clock>,
    Json(parcel): Json<ReceiveParcel>,
) -> Payload<Parcel> {
    if parcel.courier.trim().is_empty() {
        return breaks(Error::invalid("`courier` must not be empty"));
    }
    fetch_student(&pg, parcel.student_id).await?;

    let code = pickup_code(&mut rand::thread_rng());
    let created = sqlx::query_as::<_, Parcel>(
        "INSERT INTO parcels (student_id, courier, pickup_code, status, arrival_time) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(parcel.student_id)
    .bind(parcel.courier.trim())
    .bind(&code)
    .bind(WAITING)
    .bind(clock.now())
    .fetch_one(&pg)
    .await?;
    log::info!("parcel {} from {} waiting for student {}", created.id, created.courier, created.student_id);
    proceeds(created)
}

pub async fn pending_parcels(Extension(pg): Extension<PgPool>) -> Payload<Vec<Parcel>> {
    let parcels = sqlx::query_as::<_, Parcel>(
        "SELECT * FROM parcels WHERE status = $1 ORDER BY arrival_time, id",
    )
    .bind(WAITING)
    .fetch_all(&pg)
    .await?;
    proceeds(parcels)
}

pub async fn student_parcels(
    Extension(pg): Extension<PgPool>,
    Path(student_id): Path<i32>,
) -> Payload<Vec<Parcel>> {
    let parcels = sqlx::query_as::<_, Parcel>(
        "SELECT * FROM parcels WHERE student_id = $1 AND status = $2 ORDER BY arrival_time, id",
    )
    .bind(student_id)
    .bind(WAITING)
    .fetch_all(&pg)
    .await?;
    proceeds(parcels)
}

pub async fn collect_parcel(
    Extension(pg): Extension<PgPool>,
    Extension(clock): Extension<Clock>,
    Path(parcel_id): Path<i32>,
    OptionalJson(body): OptionalJson<CollectParcel>,
) -> Payload<Message> {
    let parcel = sqlx::query_as::<_, Parcel>("SELECT * FROM parcels WHERE id = $1")
        .bind(parcel_id)
        .fetch_optional(&pg)
        .await?
        .ok_or_else(|| Error::not_found("Parcel not found"))?;

    if parcel.status == COLLECTED {
        return breaks(Error::invalid("Parcel was already collected"));
    }
    if let Some(CollectParcel {
        pickup_code: Some(code),
    }) = body
    {
        if code.trim() != parcel.pickup_code {
            return breaks(Error::invalid("Pickup code does not match"));
        }
    }

    let updated = sqlx::query(
        "UPDATE parcels SET status = $2, collected_at = $3 WHERE id = $1 AND status = $4",
    )
    .bind(parcel_id)
    .bind(COLLECTED)
    .bind(clock.now())
    .bind(WAITING)
    .execute(&pg)
    .await?;
    if updated.rows_affected() == 0 {
        return breaks(Error::invalid("Parcel was already collected"));
    }

    log::info!("parcel {} collected by student {}", parcel.id, parcel.student_id);
    proceeds(Message::new("Parcel marked as collected"))
}
