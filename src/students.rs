use axum::Extension;
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::hash_password;
use crate::db::Pagination;
use crate::err::Error;
use crate::extract::{Json, Path, Query};
use crate::models::Student;
use crate::{breaks, proceeds, Payload};

pub const DEFAULT_MEAL_CREDITS: i32 = 30;

pub async fn fetch_student(pg: &PgPool, student_id: i32) -> Result<Student, Error> {
    sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1")
        .bind(student_id)
        .fetch_optional(pg)
        .await?
        .ok_or_else(|| Error::not_found("Student not found"))
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStudent {
    pub name: String,
    pub phone: String,
    pub room_number: String,
    pub move_in_date: NaiveDate,
    pub password: String,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStudent {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub room_number: Option<String>,
    pub move_out_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

fn require(field: &str, value: &str) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(Error::invalid(format!("`{}` must not be empty", field)));
    }
    Ok(())
}

pub async fn create_student(
    Extension(pg): Extension<PgPool>,
    Json(student): Json<CreateStudent>,
) -> Payload<Student> {
    require("name", &student.name)?;
    require("phone", &student.phone)?;
    require("room_number", &student.room_number)?;
    if student.password.is_empty() {
        return breaks(Error::invalid("Provided password was empty!"));
    }

    let existing = sqlx::query_as::<_, (i32,)>("SELECT id FROM students WHERE phone = $1")
        .bind(&student.phone)
        .fetch_optional(&pg)
        .await?;
    if existing.is_some() {
        return breaks(Error::invalid(format!(
            "Student with phone `{}` already exists",
            student.phone
        )));
    }

    let password_hash = hash_password(&student.password)?;
    let created = sqlx::query_as::<_, Student>(
        "INSERT INTO students (name, phone, room_number, move_in_date, is_active, password_hash, meal_credits) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(student.name.trim())
    .bind(student.phone.trim())
    .bind(student.room_number.trim())
    .bind(student.move_in_date)
    .bind(student.is_active)
    .bind(password_hash)
    .bind(DEFAULT_MEAL_CREDITS)
    .fetch_one(&pg)
    .await?;

    log::info!("registered student {} in room {}", created.id, created.room_number);
    proceeds(created)
}

pub async fn list_students(
    Extension(pg): Extension<PgPool>,
    Query(page): Query<Pagination>,
) -> Payload<Vec<Student>> {
    let (skip, limit) = page.resolve(100)?;
    let students =
        sqlx::query_as::<_, Student>("SELECT * FROM students ORDER BY id OFFSET $1 LIMIT $2")
            .bind(skip)
            .bind(limit)
            .fetch_all(&pg)
            .await?;
    proceeds(students)
}

pub async fn read_student(
    Extension(pg): Extension<PgPool>,
    Path(student_id): Path<i32>,
) -> Payload<Student> {
    proceeds(fetch_student(&pg, student_id).await?)
}

pub async fn update_student(
    Extension(pg): Extension<PgPool>,
    Path(student_id): Path<i32>,
    Json(update): Json<UpdateStudent>,
) -> Payload<Student> {
    for (field, value) in [
        ("name", &update.name),
        ("phone", &update.phone),
        ("room_number", &update.room_number),
    ] {
        if let Some(value) = value {
            require(field, value)?;
        }
    }

    let updated = sqlx::query_as::<_, Student>(
        "UPDATE students SET \
            name = COALESCE($2, name), \
            phone = COALESCE($3, phone), \
            room_number = COALESCE($4, room_number), \
            move_out_date = COALESCE($5, move_out_date), \
            is_active = COALESCE($6, is_active) \
         WHERE id = $1 RETURNING *",
    )
    .bind(student_id)
    .bind(update.name.as_deref().map(str::trim))
    .bind(update.phone.as_deref().map(str::trim))
    .bind(update.room_number.as_deref().map(str::trim))
    .bind(update.move_out_date)
    .bind(update.is_active)
    .fetch_optional(&pg)
    .await?;

    match updated {
        Some(student) => proceeds(student),
        None => breaks(Error::not_found("Student not found")),
    }
}
