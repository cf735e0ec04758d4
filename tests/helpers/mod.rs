//! Helpers to drive the router in-process without a listening socket.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{NaiveDate, NaiveDateTime};
use hostel_server::clock::Clock;
use hostel_server::geofence::{AttendancePolicy, AttendanceWindow};
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

pub const STUDENT_HEADER: &str = "X-Student-ID";

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

pub fn router(pool: PgPool, window: AttendanceWindow, now: NaiveDateTime) -> Router {
    let policy = AttendancePolicy {
        window,
        ..AttendancePolicy::default()
    };
    hostel_server::app(pool, policy, Clock::fixed(now))
}

pub struct TestRequest {
    method: Method,
    uri: String,
    headers: Vec<(String, String)>,
    body: Option<String>,
}

impl TestRequest {
    fn new(method: Method, uri: &str) -> Self {
        TestRequest {
            method,
            uri: uri.to_owned(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn post(uri: &str) -> Self {
        Self::new(Method::POST, uri)
    }

    pub fn put(uri: &str) -> Self {
        Self::new(Method::PUT, uri)
    }

    pub fn delete(uri: &str) -> Self {
        Self::new(Method::DELETE, uri)
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_owned(), value.to_owned()));
        self
    }

    /// Raw body without a content type.
    pub fn body(mut self, raw: &str) -> Self {
        self.body = Some(raw.to_owned());
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body.to_string());
        self.headers.push((
            header::CONTENT_TYPE.as_str().to_owned(),
            "application/json".to_owned(),
        ));
        self
    }

    pub async fn send(self, app: &Router) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        for (key, value) in self.headers {
            builder = builder.header(key, value);
        }
        let request = builder
            .body(Body::from(self.body.unwrap_or_default()))
            .expect("request builds");

        let response = app.clone().oneshot(request).await.expect("router responds");
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body())
            .await
            .expect("body reads");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }
}
