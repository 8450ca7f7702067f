//! Request extractors whose rejections use the JSON error body
//!
//! Drop-in replacements for axum's `Query` and `Path`. A missing or
//! malformed parameter becomes a `ServerError` instead of axum's plain-text
//! rejection.

use axum::{
    async_trait,
    extract::{rejection::PathRejection, rejection::QueryRejection, FromRequestParts},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use super::error::ServerError;

pub struct Query<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Query(value) = axum::extract::Query::<T>::from_request_parts(parts, state).await?;
        Ok(Query(value))
    }
}

pub struct Path<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Path(value) = axum::extract::Path::<T>::from_request_parts(parts, state).await?;
        Ok(Path(value))
    }
}

impl From<QueryRejection> for ServerError {
    fn from(rejection: QueryRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ServerError {
    fn from(rejection: PathRejection) -> Self {
        // A route/handler mismatch is our bug, not the caller's
        if rejection.status().is_server_error() {
            ServerError::Internal(rejection.body_text())
        } else {
            ServerError::BadRequest(rejection.body_text())
        }
    }
}
