use std::ops::Deref;

use async_trait::async_trait;
use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, RequestParts},
    BoxError,
};
use serde::de::DeserializeOwned;

use crate::problem::{self, Problem};

#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

#[derive(Debug, Clone, Copy, Default)]
pub struct Query<T>(pub T);

#[derive(Debug, Clone, Copy, Default)]
pub struct Path<T>(pub T);

#[async_trait]
impl<B, T> FromRequest<B> for Json<T>
where
    // these trait bounds are copied from `impl FromRequest for axum::Json`
    T: DeserializeOwned,
    B: axum::body::HttpBody + Send,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Rejection = Problem;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req).await {
            Ok(value) => Ok(Self(value.0)),
            Err(rejection) => {
                let problem = match rejection {
                    JsonRejection::JsonDataError(err) => {
                        tracing::debug!("Rejected request JSON: {}", err);
                        Problem::InvalidJson
                    }
                    JsonRejection::JsonSyntaxError(_) => Problem::InvalidJson,
                    JsonRejection::MissingJsonContentType(_) => problem::UNSUPPORTED_MEDIA_TYPE,
                    _err => problem::INTERNAL_SERVER_ERROR,
                };
                Err(problem)
            }
        }
    }
}

#[async_trait]
impl<B, T> FromRequest<B> for Query<T>
where
    // these trait bounds are copied from `impl FromRequest for axum::extract::Query`
    T: DeserializeOwned,
    B: Send,
{
    type Rejection = Problem;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        match axum::extract::Query::<T>::from_request(req).await {
            Ok(value) => Ok(Self(value.0)),
            Err(_rejection) => Err(problem::BAD_REQUEST),
        }
    }
}

/// Path parameters that do not parse name a resource that cannot exist, so they are rejected as
/// not found.
#[async_trait]
impl<B, T> FromRequest<B> for Path<T>
where
    T: DeserializeOwned + Send,
    B: Send,
{
    type Rejection = Problem;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        match axum::extract::Path::<T>::from_request(req).await {
            Ok(value) => Ok(Self(value.0)),
            Err(_rejection) => Err(problem::NOT_FOUND),
        }
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> Deref for Query<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> Deref for Path<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
