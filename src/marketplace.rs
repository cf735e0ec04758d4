use axum::Extension;
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::ActingStudent;
use crate::clock::Clock;
use crate::err::Error;
use crate::extract::{Json, Path};
use crate::models::MarketplaceListing;
use crate::{breaks, proceeds, Message, Payload};

pub const AVAILABLE: &str = "Available";
pub const SOLD: &str = "Sold";

const LISTING_COLUMNS: &str = "i.id, i.seller_id, i.title, i.description, i.price, i.item_condition, \
    i.status, i.image_url, i.created_at, s.name AS seller_name, s.room_number AS seller_room";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Condition {
    New,
    #[serde(rename = "Like New")]
    LikeNew,
    Used,
    Damaged,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "New",
            Condition::LikeNew => "Like New",
            Condition::Used => "Used",
            Condition::Damaged => "Damaged",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateItem {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub condition: Condition,
    pub image_url: Option<String>,
}

/// Only the seller may change or withdraw a listing.
pub fn ensure_seller(seller_id: i32, acting_id: i32) -> Result<(), Error> {
    if seller_id != acting_id {
        return Err(Error::forbidden("Not authorized"));
    }
    Ok(())
}

pub async fn available_items(Extension(pg): Extension<PgPool>) -> Payload<Vec<MarketplaceListing>> {
    let items = sqlx::query_as::<_, MarketplaceListing>(&format!(
        "SELECT {} FROM marketplace_items i JOIN students s ON s.id = i.seller_id \
         WHERE i.status = $1 ORDER BY i.created_at DESC, i.id DESC",
        LISTING_COLUMNS
    ))
    .bind(AVAILABLE)
    .fetch_all(&pg)
    .await?;
    proceeds(items)
}

pub async fn my_items(
    Extension(pg): Extension<PgPool>,
    ActingStudent(student): ActingStudent,
) -> Payload<Vec<MarketplaceListing>> {
    let items = sqlx::query_as::<_, MarketplaceListing>(&format!(
        "SELECT {} FROM marketplace_items i JOIN students s ON s.id = i.seller_id \
         WHERE i.seller_id = $1 ORDER BY i.created_at DESC, i.id DESC",
        LISTING_COLUMNS
    ))
    .bind(student.id)
    .fetch_all(&pg)
    .await?;
    proceeds(items)
}

pub async fn create_item(
    Extension(pg): Extension<PgPool>,
    Extension(clock): Extension<Clock>,
    ActingStudent(student): ActingStudent,
    Json(item): Json<CreateItem>,
) -> Payload<MarketplaceListing> {
    if item.title.trim().is_empty() {
        return breaks(Error::invalid("`title` must not be empty"));
    }
    if !item.price.is_finite() || item.price < 0.0 {
        return breaks(Error::invalid("`price` must not be negative"));
    }

    let created = sqlx::query_as::<_, MarketplaceListing>(&format!(
        "WITH i AS ( \
            INSERT INTO marketplace_items \
                (seller_id, title, description, price, item_condition, status, image_url, created_at) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *) \
         SELECT {} FROM i JOIN students s ON s.id = i.seller_id",
        LISTING_COLUMNS
    ))
    .bind(student.id)
    .bind(item.title.trim())
    .bind(&item.description)
    .bind(item.price)
    .bind(item.condition.as_str())
    .bind(AVAILABLE)
    .bind(&item.image_url)
    .bind(clock.now())
    .fetch_one(&pg)
    .await?;
    log::info!("student {} listed item {}", student.id, created.id);
    proceeds(created)
}

async fn seller_of(pg: &PgPool, item_id: i32) -> Result<i32, Error> {
    let seller: Option<(i32,)> =
        sqlx::query_as("SELECT seller_id FROM marketplace_items WHERE id = $1")
            .bind(item_id)
            .fetch_optional(pg)
            .await?;
    seller
        .map(|(id,)| id)
        .ok_or_else(|| Error::not_found("Item not found"))
}

pub async fn mark_sold(
    Extension(pg): Extension<PgPool>,
    ActingStudent(student): ActingStudent,
    Path(item_id): Path<i32>,
) -> Payload<Message> {
    ensure_seller(seller_of(&pg, item_id).await?, student.id)?;
    sqlx::query("UPDATE marketplace_items SET status = $2 WHERE id = $1")
        .bind(item_id)
        .bind(SOLD)
        .execute(&pg)
        .await?;
    proceeds(Message::new("Marked as sold"))
}

pub async fn delete_item(
    Extension(pg): Extension<PgPool>,
    ActingStudent(student): ActingStudent,
    Path(item_id): Path<i32>,
) -> Payload<Message> {
    ensure_seller(seller_of(&pg, item_id).await?, student.id)?;
    sqlx::query("DELETE FROM marketplace_items WHERE id = $1")
        .bind(item_id)
        .execute(&pg)
        .await?;
    proceeds(Message::new("Deleted"))
}
