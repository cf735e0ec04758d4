//! Request extractors whose rejections render through `err::Error`, so a
//! malformed query, path or body still answers with the JSON error envelope.

use axum::async_trait;
use axum::body::{Bytes, HttpBody};
use axum::extract::{self, FromRequest, RequestParts};
use axum::BoxError;
use serde::de::DeserializeOwned;

use crate::err::Error;

#[derive(Debug, Clone, Copy, Default)]
pub struct Query<T>(pub T);

#[async_trait]
impl<T, B> FromRequest<B> for Query<T>
where
    T: DeserializeOwned,
    B: Send,
{
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        match extract::Query::<T>::from_request(req).await {
            Ok(extract::Query(value)) => Ok(Query(value)),
            Err(rejection) => Err(Error::invalid(rejection.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Path<T>(pub T);

#[async_trait]
impl<T, B> FromRequest<B> for Path<T>
where
    T: DeserializeOwned + Send,
    B: Send,
{
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        match extract::Path::<T>::from_request(req).await {
            Ok(extract::Path(value)) => Ok(Path(value)),
            Err(rejection) => Err(Error::invalid(rejection.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

#[async_trait]
impl<T, B> FromRequest<B> for Json<T>
where
    T: DeserializeOwned,
    B: HttpBody + Send,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req).await {
            Ok(axum::Json(value)) => Ok(Json(value)),
            Err(rejection) => Err(Error::invalid(rejection.to_string())),
        }
    }
}

/// A JSON body that may be left out entirely. An empty body yields `None`;
/// anything else must parse, whatever the content type says.
#[derive(Debug, Clone, Default)]
pub struct OptionalJson<T>(pub Option<T>);

#[async_trait]
impl<T, B> FromRequest<B> for OptionalJson<T>
where
    T: DeserializeOwned,
    B: HttpBody + Send,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req)
            .await
            .map_err(|rejection| Error::invalid(rejection.to_string()))?;
        parse_optional(&bytes).map(OptionalJson)
    }
}

fn parse_optional<T: DeserializeOwned>(bytes: &[u8]) -> Result<Option<T>, Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(bytes)
        .map(Some)
        .map_err(|err| Error::invalid(format!("Failed to parse the request body as JSON: {}", err)))
}
