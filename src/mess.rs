//! Meal credits and the simulated face-recognition gate at the mess.

use axum::extract::Multipart;
use axum::Extension;
use rand::Rng;
use serde::Serialize;
use sqlx::PgPool;

use crate::err::Error;
use crate::extract::Path;
use crate::students::fetch_student;
use crate::{proceeds, Message, Payload};

pub const SIMULATED_ENCODING: &str = "simulated_encoding_123";

/// Chance that the simulated recognizer matches a face.
const MATCH_NUMERATOR: u32 = 5;
const MATCH_DENOMINATOR: u32 = 7;

#[derive(Debug, Clone, Serialize)]
pub struct Credits {
    pub credits: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Verification {
    Authorized { student: String, credits: i32 },
    Denied { reason: String },
}

impl Verification {
    fn denied(reason: &str) -> Self {
        Verification::Denied {
            reason: reason.to_string(),
        }
    }
}

pub fn recognize<R: Rng>(rng: &mut R) -> bool {
    rng.gen_ratio(MATCH_NUMERATOR, MATCH_DENOMINATOR)
}

/// Drains the upload and returns the size of the first non-empty file part.
async fn read_image(mut multipart: Multipart) -> Result<usize, Error> {
    while let Some(field) = multipart.next_field().await? {
        let has_file = field.file_name().is_some();
        let bytes = field.bytes().await?;
        if has_file && !bytes.is_empty() {
            return Ok(bytes.len());
        }
    }
    Err(Error::invalid("An image file is required"))
}

pub async fn get_credits(
    Extension(pg): Extension<PgPool>,
    Path(student_id): Path<i32>,
) -> Payload<Credits> {
    let credits: Option<(i32,)> = sqlx::query_as("SELECT meal_credits FROM students WHERE id = $1")
        .bind(student_id)
        .fetch_optional(&pg)
        .await?;
    proceeds(Credits {
        credits: credits.map(|(c,)| c).unwrap_or(0),
    })
}

pub async fn enroll_face(
    Extension(pg): Extension<PgPool>,
    Path(student_id): Path<i32>,
    multipart: Multipart,
) -> Payload<Message> {
    fetch_student(&pg, student_id).await?;
    let size = read_image(multipart).await?;

    sqlx::query("UPDATE students SET face_encoding = $2 WHERE id = $1")
        .bind(student_id)
        .bind(SIMULATED_ENCODING)
        .execute(&pg)
        .await?;
    log::info!("enrolled face for student {} ({} bytes)", student_id, size);
    proceeds(Message::new("Face enrolled successfully (Simulation Mode)"))
}

pub async fn verify_face(
    Extension(pg): Extension<PgPool>,
    multipart: Multipart,
) -> Payload<Verification> {
    read_image(multipart).await?;

    let matched = recognize(&mut rand::thread_rng());
    if !matched {
        return proceeds(Verification::denied("Face Not Recognized"));
    }

    let charged: Option<(String, i32)> = sqlx::query_as(
        "UPDATE students SET meal_credits = meal_credits - 1 \
         WHERE id = ( \
            SELECT id FROM students \
            WHERE face_encoding IS NOT NULL AND meal_credits > 0 AND is_active \
            ORDER BY id LIMIT 1 FOR UPDATE SKIP LOCKED) \
         RETURNING name, meal_credits",
    )
    .fetch_optional(&pg)
    .await?;

    match charged {
        Some((student, credits)) => {
            log::info!("meal served to {}, {} credits left", student, credits);
            proceeds(Verification::Authorized { student, credits })
        }
        None => proceeds(Verification::denied("No students with credits found")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn recognizer_matches_most_faces() {
        let mut rng = StdRng::seed_from_u64(1);
        let matches = (0..7_000).filter(|_| recognize(&mut rng)).count();
        assert!(matches > 4_700 && matches < 5_300, "{}", matches);
    }

    #[test]
    fn verification_serializes_with_status() {
        let ok = serde_json::to_value(Verification::Authorized {
            student: "Asha".to_string(),
            credits: 29,
        })
        .unwrap();
        assert_eq!(ok["status"], "authorized");
        assert_eq!(ok["credits"], 29);

        let denied = serde_json::to_value(Verification::denied("Face Not Recognized")).unwrap();
        assert_eq!(denied["status"], "denied");
        assert_eq!(denied["reason"], "Face Not Recognized");
    }
}
