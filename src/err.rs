use axum::extract::multipart::MultipartError;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;

use serde::Serialize;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

pub async fn handler404(path: Uri) -> Error {
    Error::NotFound {
        detail: format!("Invalid path: {}", path),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "error")]
pub enum Error {
    NotFound { detail: String },
    InvalidPayload { detail: String },
    OutsideWindow { detail: String },
    Unauthorized { detail: String },
    Forbidden { detail: String },
    InternalError { kind: &'static str, detail: String },
}

impl Error {
    pub fn not_found<S: Into<String>>(msg: S) -> Error {
        Error::NotFound { detail: msg.into() }
    }

    pub fn invalid<S: Into<String>>(msg: S) -> Error {
        Error::InvalidPayload { detail: msg.into() }
    }

    pub fn forbidden<S: Into<String>>(msg: S) -> Error {
        Error::Forbidden { detail: msg.into() }
    }

    pub fn internal<S: Into<String>>(kind: &'static str, msg: S) -> Error {
        Error::InternalError {
            kind,
            detail: msg.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::InvalidPayload { .. } | Error::OutsideWindow { .. } => StatusCode::BAD_REQUEST,
            Error::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = err {
            return Error::not_found("Requested record does not exist");
        }
        if let Some(code) = err.as_database_error().and_then(|db| db.code()) {
            match &*code {
                UNIQUE_VIOLATION => return Error::invalid("Record already exists"),
                FOREIGN_KEY_VIOLATION => return Error::not_found("Referenced record does not exist"),
                _ => {}
            }
        }
        log::error!("database failure: {:?}", err);
        Error::internal("DatabaseError", "Database operation failed")
    }
}

impl From<pbkdf2::password_hash::Error> for Error {
    fn from(err: pbkdf2::password_hash::Error) -> Self {
        log::error!("password hashing failure: {}", err);
        Error::internal("HashingError", "Could not process credentials")
    }
}

impl From<MultipartError> for Error {
    fn from(err: MultipartError) -> Self {
        Error::invalid(format!("Malformed upload: {}", err))
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        log::error!("unexpected failure: {:#}", err);
        Error::internal("Unknown", err.to_string())
    }
}
