use crate::{errors::ServiceError, ApiResponse};
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use validator::Validate;

/// `Json` whose rejections (bad syntax, wrong content type, unknown enum
/// values) come back in the standard error envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// `Path` that reports malformed ids through the error envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for AppPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// `Query` that reports unparseable parameters through the error envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// 200 with the `{success, message, data}` envelope
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

/// 200 with a message alongside the data
pub fn success_with_message<T: Serialize>(message: &str, data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::with_message(message, data))).into_response()
}

/// 201 with the `{success, message, data}` envelope
pub fn created_response<T: Serialize>(message: &str, data: T) -> Response {
    (
        StatusCode::CREATED,
        Json(ApiResponse::with_message(message, data)),
    )
        .into_response()
}

/// 200 carrying only a message
pub fn message_response(message: &str) -> Response {
    (StatusCode::OK, Json(ApiResponse::<()>::message(message))).into_response()
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input.validate().map_err(ServiceError::from)
}
