use std::collections::HashMap;

use axum::Extension;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use sqlx::PgPool;

use crate::clock::Clock;
use crate::db::{self, ATTENDANCE_LOCK};
use crate::err::Error;
use crate::extract::{Json, Path, Query};
use crate::geofence::{AttendancePolicy, AttendanceStatus, GeoPoint};
use crate::models::{AttendanceLog, Student};
use crate::settings;
use crate::students::fetch_student;
use crate::{proceeds, Message, Payload};

#[derive(Debug, Clone, Deserialize)]
pub struct MarkQuery {
    pub student_id: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportQuery {
    #[serde(alias = "date")]
    pub date_str: Option<String>,
}

pub async fn set_location(
    Extension(pg): Extension<PgPool>,
    Json(location): Json<GeoPoint>,
) -> Payload<Message> {
    let location = location.validate()?;
    settings::store_hostel_location(&pg, location).await?;
    log::info!(
        "hostel location set to ({}, {})",
        location.latitude,
        location.longitude
    );
    proceeds(Message::new("Hostel location updated successfully"))
}

pub async fn get_location(Extension(pg): Extension<PgPool>) -> Payload<GeoPoint> {
    proceeds(settings::hostel_location(&pg).await?)
}

pub async fn mark_attendance(
    Extension(pg): Extension<PgPool>,
    Extension(clock): Extension<Clock>,
    Extension(policy): Extension<AttendancePolicy>,
    Query(MarkQuery { student_id }): Query<MarkQuery>,
    Json(location): Json<GeoPoint>,
) -> Payload<AttendanceLog> {
    let now = clock.now();
    policy.window.check(now.time())?;
    let reported = location.validate()?;
    fetch_student(&pg, student_id).await?;

    let hostel = settings::hostel_location(&pg).await?;
    let (distance, status) = policy.evaluate(&reported, &hostel);

    let mut tx = pg.begin().await?;
    db::lock_student(&mut tx, ATTENDANCE_LOCK, student_id).await?;
    let entry = sqlx::query_as::<_, AttendanceLog>(
        "INSERT INTO attendance_logs \
            (student_id, log_date, logged_at, status, latitude, longitude, distance_meters) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (student_id, log_date) DO UPDATE SET \
            logged_at = EXCLUDED.logged_at, \
            status = EXCLUDED.status, \
            latitude = EXCLUDED.latitude, \
            longitude = EXCLUDED.longitude, \
            distance_meters = EXCLUDED.distance_meters \
         RETURNING *",
    )
    .bind(student_id)
    .bind(now.date())
    .bind(now)
    .bind(status.as_str())
    .bind(reported.latitude)
    .bind(reported.longitude)
    .bind(distance)
    .fetch_one(&mut tx)
    .await?;
    tx.commit().await?;

    log::info!(
        "attendance: student {} is {} ({:.1} m from hostel)",
        student_id,
        status,
        distance
    );
    proceeds(entry)
}

pub async fn today_status(
    Extension(pg): Extension<PgPool>,
    Extension(clock): Extension<Clock>,
    Path(student_id): Path<i32>,
) -> Payload<Option<AttendanceLog>> {
    let entry = sqlx::query_as::<_, AttendanceLog>(
        "SELECT * FROM attendance_logs WHERE student_id = $1 AND log_date = $2",
    )
    .bind(student_id)
    .bind(clock.today())
    .fetch_optional(&pg)
    .await?;
    proceeds(entry)
}

pub async fn report(
    Extension(pg): Extension<PgPool>,
    Extension(clock): Extension<Clock>,
    Query(query): Query<ReportQuery>,
) -> Payload<AttendanceReport> {
    let date = match query.date_str.as_deref() {
        Some(raw) => parse_date(raw)?,
        None => clock.today(),
    };

    let students =
        sqlx::query_as::<_, Student>("SELECT * FROM students WHERE is_active ORDER BY id")
            .fetch_all(&pg)
            .await?;
    let logs = sqlx::query_as::<_, AttendanceLog>("SELECT * FROM attendance_logs WHERE log_date = $1")
        .bind(date)
        .fetch_all(&pg)
        .await?;

    proceeds(AttendanceReport::build(date, &students, &logs))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, Error> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| Error::invalid(format!("`{}` is not a YYYY-MM-DD date", raw)))
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub id: i32,
    pub name: String,
    pub room_number: String,
    pub phone: String,
    pub time: Option<NaiveDateTime>,
    pub distance: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportStats {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceReport {
    pub date: NaiveDate,
    pub stats: ReportStats,
    pub present_list: Vec<ReportEntry>,
    pub absent_list: Vec<ReportEntry>,
}

impl AttendanceReport {
    /// Every student lands in exactly one list; only a `Present` log for the
    /// date counts as present.
    pub fn build(date: NaiveDate, students: &[Student], logs: &[AttendanceLog]) -> Self {
        let present: HashMap<i32, &AttendanceLog> = logs
            .iter()
            .filter(|log| log.log_date == date && log.status == AttendanceStatus::Present.as_str())
            .map(|log| (log.student_id, log))
            .collect();

        let mut present_list = Vec::new();
        let mut absent_list = Vec::new();
        for student in students {
            let mut entry = ReportEntry {
                id: student.id,
                name: student.name.clone(),
                room_number: student.room_number.clone(),
                phone: student.phone.clone(),
                time: None,
                distance: None,
            };
            match present.get(&student.id) {
                Some(log) => {
                    entry.time = Some(log.logged_at);
                    entry.distance = Some(log.distance_meters);
                    present_list.push(entry);
                }
                None => absent_list.push(entry),
            }
        }

        AttendanceReport {
            date,
            stats: ReportStats {
                total: students.len(),
                present: present_list.len(),
                absent: absent_list.len(),
            },
            present_list,
            absent_list,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    fn student(id: i32) -> Student {
        Student {
            id,
            name: format!("Student {}", id),
            phone: format!("98000000{:02}", id),
            room_number: "101".to_string(),
            move_in_date: day(),
            move_out_date: None,
            is_active: true,
            password_hash: String::new(),
            meal_credits: 30,
            face_encoding: None,
        }
    }

    fn log(student_id: i32, status: AttendanceStatus, distance: f64) -> AttendanceLog {
        AttendanceLog {
            id: student_id * 10,
            student_id,
            log_date: day(),
            logged_at: day().and_hms_opt(22, 15, 0).unwrap(),
            status: status.as_str().to_string(),
            latitude: 28.6139,
            longitude: 77.2090,
            distance_meters: distance,
        }
    }

    #[test]
    fn report_partitions_every_student() {
        let students: Vec<Student> = (1..=5).map(student).collect();
        let logs = vec![
            log(1, AttendanceStatus::Present, 12.0),
            log(2, AttendanceStatus::Away, 4_000.0),
            log(4, AttendanceStatus::Present, 480.0),
        ];
        let report = AttendanceReport::build(day(), &students, &logs);

        assert_eq!(report.stats, ReportStats { total: 5, present: 2, absent: 3 });
        assert_eq!(report.stats.present + report.stats.absent, report.stats.total);
        let present: Vec<i32> = report.present_list.iter().map(|e| e.id).collect();
        let absent: Vec<i32> = report.absent_list.iter().map(|e| e.id).collect();
        assert_eq!(present, vec![1, 4]);
        assert_eq!(absent, vec![2, 3, 5]);
        assert_eq!(report.present_list[1].distance, Some(480.0));
    }

    #[test]
    fn absent_entries_omit_time_and_distance() {
        let report = AttendanceReport::build(day(), &[student(7)], &[]);
        let json = serde_json::to_value(&report).unwrap();
        let entry = &json["absent_list"][0];
        assert_eq!(entry["id"], 7);
        assert!(entry.get("time").is_none());
        assert!(entry.get("distance").is_none());
        assert_eq!(json["date"], "2026-03-14");
    }

    #[test]
    fn logs_from_other_days_are_ignored() {
        let mut stale = log(1, AttendanceStatus::Present, 3.0);
        stale.log_date = day().pred_opt().unwrap();
        let report = AttendanceReport::build(day(), &[student(1)], &[stale]);
        assert_eq!(report.stats.present, 0);
    }

    #[test]
    fn dates_must_be_iso() {
        assert_eq!(parse_date("2026-03-14").unwrap(), day());
        assert!(parse_date("14/03/2026").is_err());
        assert!(parse_date("2026-02-30").is_err());
    }
}
