use axum::Extension;
use serde::Deserialize;
use sqlx::PgPool;

use crate::db::Pagination;
use crate::err::Error;
use crate::extract::{Json, Path, Query};
use crate::models::Room;
use crate::{breaks, proceeds, Message, Payload};

/// Occupancy is always derived from the active students assigned to the room.
const ROOM_COLUMNS: &str = "r.id, r.number, r.capacity, \
    (SELECT COUNT(*) FROM students s WHERE s.room_number = r.number AND s.is_active)::INTEGER AS current_occupancy";

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoom {
    pub number: String,
    pub capacity: i32,
}

pub async fn create_room(
    Extension(pg): Extension<PgPool>,
    Json(room): Json<CreateRoom>,
) -> Payload<Room> {
    if room.number.trim().is_empty() {
        return breaks(Error::invalid("`number` must not be empty"));
    }
    if room.capacity < 1 {
        return breaks(Error::invalid("`capacity` must be at least 1"));
    }

    let (id,): (i32,) =
        sqlx::query_as("INSERT INTO rooms (number, capacity) VALUES ($1, $2) RETURNING id")
            .bind(room.number.trim())
            .bind(room.capacity)
            .fetch_one(&pg)
            .await?;
    proceeds(fetch_room(&pg, id).await?)
}

pub async fn list_rooms(
    Extension(pg): Extension<PgPool>,
    Query(page): Query<Pagination>,
) -> Payload<Vec<Room>> {
    let (skip, limit) = page.resolve(100)?;
    let rooms = sqlx::query_as::<_, Room>(&format!(
        "SELECT {} FROM rooms r ORDER BY r.id OFFSET $1 LIMIT $2",
        ROOM_COLUMNS
    ))
    .bind(skip)
    .bind(limit)
    .fetch_all(&pg)
    .await?;
    proceeds(rooms)
}

pub async fn read_room(
    Extension(pg): Extension<PgPool>,
    Path(room_id): Path<i32>,
) -> Payload<Room> {
    proceeds(fetch_room(&pg, room_id).await?)
}

async fn fetch_room(pg: &PgPool, room_id: i32) -> Result<Room, Error> {
    sqlx::query_as::<_, Room>(&format!("SELECT {} FROM rooms r WHERE r.id = $1", ROOM_COLUMNS))
        .bind(room_id)
        .fetch_optional(pg)
        .await?
        .ok_or_else(|| Error::not_found("Room not found"))
}

/// `(number, capacity)` for the default three-floor layout.
pub fn default_layout() -> Vec<(String, i32)> {
    let mut rooms = Vec::with_capacity(15);
    for (floor, capacity) in [(1, 2), (2, 2), (3, 1)] {
        for door in 1..=5 {
            rooms.push((format!("{}0{}", floor, door), capacity));
        }
    }
    rooms
}

/// Seeds the default rooms into an empty table. Failures are logged and
/// reported as a generic error rather than the raw database fault.
pub async fn seed_rooms(Extension(pg): Extension<PgPool>) -> Payload<Message> {
    match insert_default_rooms(&pg).await {
        Ok(0) => proceeds(Message::new("Rooms already seeded!")),
        Ok(count) => {
            log::info!("seeded {} rooms", count);
            proceeds(Message::new(format!("Successfully added {} rooms!", count)))
        }
        Err(err) => {
            log::error!("seeding rooms failed: {:?}", err);
            breaks(Error::internal("SeedError", "Could not seed rooms"))
        }
    }
}

async fn insert_default_rooms(pg: &PgPool) -> Result<usize, sqlx::Error> {
    let mut tx = pg.begin().await?;
    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rooms")
        .fetch_one(&mut tx)
        .await?;
    if existing > 0 {
        return Ok(0);
    }

    let layout = default_layout();
    for (number, capacity) in &layout {
        sqlx::query("INSERT INTO rooms (number, capacity) VALUES ($1, $2)")
            .bind(number)
            .bind(capacity)
            .execute(&mut tx)
            .await?;
    }
    tx.commit().await?;
    Ok(layout.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_has_three_floors() {
        let layout = default_layout();
        assert_eq!(layout.len(), 15);
        assert_eq!(layout[0], ("101".to_string(), 2));
        assert_eq!(layout[9], ("205".to_string(), 2));
        assert_eq!(layout[14], ("305".to_string(), 1));
    }
}
