//! Simulated electricity metering and billing per room.

use std::collections::HashMap;

use axum::Extension;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use sqlx::PgPool;

use crate::clock::Clock;
use crate::extract::Path;
use crate::models::ElectricityReading;
use crate::students::fetch_student;
use crate::{proceeds, Message, Payload};

pub const RATE_PER_UNIT: f64 = 10.0;
pub const SIMULATED_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub room_number: String,
    pub reading_date: NaiveDate,
    pub units_kwh: f64,
}

/// Daily usage for the last `SIMULATED_DAYS` days (today included) for
/// every room: 2-12 kWh, with an extra 1-3 kWh on weekends.
pub fn simulate_readings<R: Rng>(rooms: &[String], today: NaiveDate, rng: &mut R) -> Vec<NewReading> {
    let mut readings = Vec::with_capacity(rooms.len() * SIMULATED_DAYS as usize);
    for room in rooms {
        for offset in 0..SIMULATED_DAYS {
            let day = today - Duration::days(offset);
            let mut usage = rng.gen_range(2.0..=12.0);
            if matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                usage += rng.gen_range(1.0..=3.0);
            }
            readings.push(NewReading {
                room_number: room.clone(),
                reading_date: day,
                units_kwh: round2(usage),
            });
        }
    }
    readings
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentUsage {
    pub room_number: String,
    pub readings: Vec<ElectricityReading>,
    pub total_units: f64,
    pub current_bill: f64,
    pub projected_bill: f64,
    pub avg_daily: f64,
}

impl StudentUsage {
    pub fn from_readings(room_number: String, readings: Vec<ElectricityReading>) -> Self {
        let total: f64 = readings.iter().map(|r| r.units_kwh).sum();
        let avg_daily = if readings.is_empty() {
            0.0
        } else {
            total / readings.len() as f64
        };
        let projected = avg_daily * SIMULATED_DAYS as f64;
        StudentUsage {
            room_number,
            readings,
            total_units: round2(total),
            current_bill: round2(total * RATE_PER_UNIT),
            projected_bill: round2(projected * RATE_PER_UNIT),
            avg_daily: round2(avg_daily),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomUsage {
    pub room_number: String,
    pub total_units: f64,
    pub bill: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostelUsage {
    pub total_units: f64,
    pub total_bill: f64,
    pub room_breakdown: Vec<RoomUsage>,
}

impl HostelUsage {
    /// Aggregates per room, heaviest consumers first.
    pub fn from_readings(readings: &[ElectricityReading]) -> Self {
        let mut per_room: HashMap<&str, f64> = HashMap::new();
        for reading in readings {
            *per_room.entry(reading.room_number.as_str()).or_default() += reading.units_kwh;
        }
        let total: f64 = readings.iter().map(|r| r.units_kwh).sum();

        let mut room_breakdown: Vec<RoomUsage> = per_room
            .into_iter()
            .map(|(room, units)| RoomUsage {
                room_number: room.to_string(),
                total_units: round2(units),
                bill: round2(units * RATE_PER_UNIT),
            })
            .collect();
        room_breakdown.sort_by(|a, b| {
            b.total_units
                .total_cmp(&a.total_units)
                .then_with(|| a.room_number.cmp(&b.room_number))
        });

        HostelUsage {
            total_units: round2(total),
            total_bill: round2(total * RATE_PER_UNIT),
            room_breakdown,
        }
    }
}

pub async fn simulate(
    Extension(pg): Extension<PgPool>,
    Extension(clock): Extension<Clock>,
) -> Payload<Message> {
    let rooms: Vec<(String,)> = sqlx::query_as(
        "SELECT DISTINCT room_number FROM students WHERE room_number <> '' ORDER BY room_number",
    )
    .fetch_all(&pg)
    .await?;
    let rooms: Vec<String> = rooms.into_iter().map(|(room,)| room).collect();

    let mut rng = StdRng::from_entropy();
    let readings = simulate_readings(&rooms, clock.today(), &mut rng);

    let mut tx = pg.begin().await?;
    sqlx::query("DELETE FROM electricity_readings")
        .execute(&mut tx)
        .await?;
    for reading in &readings {
        sqlx::query(
            "INSERT INTO electricity_readings (room_number, reading_date, units_kwh) VALUES ($1, $2, $3)",
        )
        .bind(&reading.room_number)
        .bind(reading.reading_date)
        .bind(reading.units_kwh)
        .execute(&mut tx)
        .await?;
    }
    tx.commit().await?;

    log::info!("simulated {} readings for {} rooms", readings.len(), rooms.len());
    proceeds(Message::new(format!(
        "Simulated {} readings for {} rooms",
        readings.len(),
        rooms.len()
    )))
}

pub async fn student_stats(
    Extension(pg): Extension<PgPool>,
    Path(student_id): Path<i32>,
) -> Payload<StudentUsage> {
    let student = fetch_student(&pg, student_id).await?;
    let readings = sqlx::query_as::<_, ElectricityReading>(
        "SELECT * FROM electricity_readings WHERE room_number = $1 ORDER BY reading_date",
    )
    .bind(&student.room_number)
    .fetch_all(&pg)
    .await?;
    proceeds(StudentUsage::from_readings(student.room_number, readings))
}

pub async fn admin_stats(Extension(pg): Extension<PgPool>) -> Payload<HostelUsage> {
    let readings = sqlx::query_as::<_, ElectricityReading>("SELECT * FROM electricity_readings")
        .fetch_all(&pg)
        .await?;
    proceeds(HostelUsage::from_readings(&readings))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(room: &str, day: u32, units: f64) -> ElectricityReading {
        ElectricityReading {
            id: day as i32,
            room_number: room.to_string(),
            reading_date: NaiveDate::from_ymd_opt(2026, 6, day).unwrap(),
            units_kwh: units,
        }
    }

    #[test]
    fn simulation_covers_thirty_days_per_room() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 30).unwrap();
        let rooms = vec!["101".to_string(), "202".to_string()];
        let mut rng = StdRng::seed_from_u64(7);
        let readings = simulate_readings(&rooms, today, &mut rng);

        assert_eq!(readings.len(), 60);
        assert_eq!(readings[0].reading_date, today);
        assert_eq!(readings[29].reading_date, today - Duration::days(29));
        for r in &readings {
            let weekend = matches!(r.reading_date.weekday(), Weekday::Sat | Weekday::Sun);
            let max = if weekend { 15.0 } else { 12.0 };
            assert!(r.units_kwh >= 2.0 && r.units_kwh <= max, "{:?}", r);
            if weekend {
                assert!(r.units_kwh >= 3.0);
            }
        }
    }

    #[test]
    fn student_usage_projects_a_month() {
        let usage = StudentUsage::from_readings(
            "101".to_string(),
            vec![reading("101", 1, 4.0), reading("101", 2, 6.0)],
        );
        assert_eq!(usage.total_units, 10.0);
        assert_eq!(usage.current_bill, 100.0);
        assert_eq!(usage.avg_daily, 5.0);
        assert_eq!(usage.projected_bill, 1500.0);
    }

    #[test]
    fn student_usage_without_readings_is_zero() {
        let usage = StudentUsage::from_readings("303".to_string(), Vec::new());
        assert_eq!(usage.total_units, 0.0);
        assert_eq!(usage.projected_bill, 0.0);
    }

    #[test]
    fn hostel_usage_sorts_rooms_by_consumption() {
        let usage = HostelUsage::from_readings(&[
            reading("101", 1, 3.0),
            reading("202", 1, 9.5),
            reading("101", 2, 2.25),
        ]);
        assert_eq!(usage.total_units, 14.75);
        assert_eq!(usage.total_bill, 147.5);
        let order: Vec<&str> = usage
            .room_breakdown
            .iter()
            .map(|r| r.room_number.as_str())
            .collect();
        assert_eq!(order, vec!["202", "101"]);
        assert_eq!(usage.room_breakdown[1].bill, 52.5);
    }
}
