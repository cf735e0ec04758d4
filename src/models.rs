use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Student {
    pub id: i32,
    pub name: String,
    pub phone: String,
    pub room_number: String,
    pub move_in_date: NaiveDate,
    pub move_out_date: Option<NaiveDate>,
    pub is_active: bool,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub meal_credits: i32,
    #[serde(skip_serializing)]
    pub face_encoding: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Room {
    pub id: i32,
    pub number: String,
    pub capacity: i32,
    pub current_occupancy: i32,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RentPayment {
    pub id: i32,
    pub student_id: i32,
    pub amount: f64,
    pub month: String,
    pub status: String,
    pub payment_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DisciplineLog {
    pub id: i32,
    pub student_id: i32,
    pub incident_date: NaiveDateTime,
    pub category: String,
    pub description: String,
    pub penalty_amount: f64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LaundryUsage {
    pub id: i32,
    pub student_id: i32,
    pub machine_id: i32,
    pub usage_date: NaiveDateTime,
    pub slot: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Complaint {
    pub id: i32,
    pub student_id: i32,
    pub category: String,
    pub description: String,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub resolved_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GateEntry {
    pub id: i32,
    pub student_id: i32,
    #[serde(rename = "timestamp")]
    pub recorded_at: NaiveDateTime,
    pub event_type: String,
    pub student_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ElectricityReading {
    pub id: i32,
    pub room_number: String,
    pub reading_date: NaiveDate,
    pub units_kwh: f64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AttendanceLog {
    pub id: i32,
    pub student_id: i32,
    #[serde(rename = "date")]
    pub log_date: NaiveDate,
    #[serde(rename = "time")]
    pub logged_at: NaiveDateTime,
    pub status: String,
    pub latitude: f64,
    pub longitude: f64,
    pub distance_meters: f64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SystemSetting {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Parcel {
    pub id: i32,
    pub student_id: i32,
    pub courier: String,
    pub pickup_code: String,
    pub status: String,
    pub arrival_time: NaiveDateTime,
    pub collected_at: Option<NaiveDateTime>,
}

/// A marketplace item joined with its seller's name and room.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MarketplaceListing {
    pub id: i32,
    pub seller_id: i32,
    pub title: String,
    pub description: String,
    pub price: f64,
    #[sqlx(rename = "item_condition")]
    pub condition: String,
    pub status: String,
    pub image_url: Option<String>,
    pub created_at: NaiveDateTime,
    pub seller_name: String,
    pub seller_room: String,
}
