pub mod attendance;
pub mod auth;
pub mod clock;
pub mod complaints;
pub mod config;
pub mod db;
pub mod discipline;
pub mod err;
pub mod extract;
pub mod gate;
pub mod geofence;
pub mod laundry;
pub mod marketplace;
pub mod mess;
pub mod models;
pub mod monitoring;
pub mod parcels;
pub mod rent;
pub mod rooms;
pub mod settings;
pub mod students;

use axum::handler::Handler;
use axum::http::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, post, put};
use axum::{Extension, Json, Router};
use serde::Serialize;
use sqlx::PgPool;
use tokio::time::Instant;
use tower_http::cors::{Any, CorsLayer};

use crate::clock::Clock;
use crate::err::Error;
use crate::geofence::AttendancePolicy;

pub type Payload<T> = Result<Json<T>, Error>;

pub fn proceeds<V>(value: V) -> Payload<V>
where
    V: Serialize,
{
    Ok(Json(value))
}

pub fn breaks<V>(err: Error) -> Payload<V>
where
    V: Serialize,
{
    Err(err)
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Message {
            message: message.into(),
        }
    }
}

async fn index() -> Json<Message> {
    Json(Message::new("Hostel Management System API is running"))
}

async fn log_requests<B>(req: Request<B>, next: Next<B>) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(req).await;
    log::info!(
        "{} {} -> {} in {:?}",
        method,
        path,
        response.status().as_u16(),
        started.elapsed()
    );
    response
}

pub fn app(pg: PgPool, policy: AttendancePolicy, clock: Clock) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/seed", post(rooms::seed_rooms))
        .route("/auth/login", post(auth::login_student))
        .route(
            "/students",
            get(students::list_students).post(students::create_student),
        )
        .route(
            "/students/:student_id",
            get(students::read_student).put(students::update_student),
        )
        .route("/rooms", get(rooms::list_rooms).post(rooms::create_room))
        .route("/rooms/:room_id", get(rooms::read_room))
        .route("/rent", get(rent::list_payments).post(rent::create_payment))
        .route("/rent/pending", get(rent::pending_payments))
        .route(
            "/discipline",
            get(discipline::list_logs).post(discipline::create_log),
        )
        .route("/laundry", get(laundry::list_usage).post(laundry::log_usage))
        .route(
            "/complaints",
            get(complaints::list_complaints).post(complaints::create_complaint),
        )
        .route("/complaints/:complaint_id", put(complaints::update_complaint))
        .route("/gate/scan", post(gate::scan))
        .route("/gate/logs", get(gate::list_logs))
        .route("/gate/cleanup", delete(gate::cleanup))
        .route("/monitoring/simulate", post(monitoring::simulate))
        .route("/monitoring/stats/:student_id", get(monitoring::student_stats))
        .route("/monitoring/admin-stats", get(monitoring::admin_stats))
        .route("/attendance/set-location", post(attendance::set_location))
        .route("/attendance/location", get(attendance::get_location))
        .route("/attendance/mark", post(attendance::mark_attendance))
        .route("/attendance/report", get(attendance::report))
        .route("/attendance/today/:student_id", get(attendance::today_status))
        .route("/parcels/receive", post(parcels::receive_parcel))
        .route("/parcels/pending", get(parcels::pending_parcels))
        .route("/parcels/my-parcels/:student_id", get(parcels::student_parcels))
        .route("/parcels/collect/:parcel_id", post(parcels::collect_parcel))
        .route("/mess/credits/:student_id", get(mess::get_credits))
        .route("/mess/enroll/:student_id", post(mess::enroll_face))
        .route("/mess/verify", post(mess::verify_face))
        .route(
            "/marketplace/items",
            get(marketplace::available_items).post(marketplace::create_item),
        )
        .route("/marketplace/my-items", get(marketplace::my_items))
        .route("/marketplace/items/:item_id", delete(marketplace::delete_item))
        .route("/marketplace/items/:item_id/sold", put(marketplace::mark_sold))
        .fallback(err::handler404.into_service())
        .layer(Extension(pg))
        .layer(Extension(policy))
        .layer(Extension(clock))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(middleware::from_fn(log_requests))
}
