use axum::async_trait;
use axum::extract::{FromRequest, RequestParts};
use axum::Extension;
use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::Pbkdf2;
use rand_core::OsRng;
use serde::Deserialize;
use sqlx::PgPool;

use crate::err::Error;
use crate::extract::Json;
use crate::models::Student;
use crate::students::fetch_student;
use crate::{breaks, proceeds, Payload};

pub const STUDENT_HEADER: &str = "x-student-id";

pub fn hash_password(password: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Pbkdf2
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, Error> {
    let hash = PasswordHash::new(stored_hash)?;
    Ok(Pbkdf2.verify_password(password.as_bytes(), &hash).is_ok())
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginStudent {
    pub phone: String,
    pub password: String,
}

pub async fn login_student(
    Extension(pg): Extension<PgPool>,
    Json(login): Json<LoginStudent>,
) -> Payload<Student> {
    if login.password.is_empty() {
        return breaks(Error::invalid("`password` parameter was empty"));
    }

    let student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE phone = $1 LIMIT 1")
        .bind(&login.phone)
        .fetch_optional(&pg)
        .await?;

    let student = match student {
        Some(student) => student,
        None => return breaks(Error::invalid("Incorrect phone number")),
    };

    if !verify_password(&login.password, &student.password_hash)? {
        log::debug!("failed login for student {}", student.id);
        return breaks(Error::invalid("Incorrect password"));
    }

    proceeds(student)
}

/// The student a request acts on behalf of, identified by the
/// `X-Student-ID` header.
#[derive(Debug, Clone)]
pub struct ActingStudent(pub Student);

#[async_trait]
impl<B> FromRequest<B> for ActingStudent
where
    B: Send,
{
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let raw = req
            .headers()
            .get(STUDENT_HEADER)
            .ok_or_else(|| Error::Unauthorized {
                detail: "Missing `X-Student-ID` header".to_string(),
            })?
            .to_str()
            .map_err(|_| Error::invalid("`X-Student-ID` header is not valid text"))?;
        let student_id = raw
            .trim()
            .parse::<i32>()
            .map_err(|_| Error::invalid(format!("`{}` is not a student id", raw)))?;

        let Extension(pg) = Extension::<PgPool>::from_request(req)
            .await
            .map_err(|_| Error::internal("MissingExtension", "Database pool is not configured"))?;

        Ok(ActingStudent(fetch_student(&pg, student_id).await?))
    }
}
