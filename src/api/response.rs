//! API response helpers
//!
//! Every response is wrapped in the same envelope: `{ "data": .., "error": .., "success": .. }`

use core::fmt::Display;

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde::Serialize;

/// The envelope around all responses
#[derive(Serialize)]
struct Envelope<D, E>
where
    D: Serialize,
    E: Serialize,
{
    data: Option<D>,
    error: Option<E>,
    success: bool,
}

/// Hold data for a successful API interaction
pub struct Success<V>
where
    V: Serialize,
{
    status_code: StatusCode,
    data: V,
}

impl<V> Success<V>
where
    V: Serialize,
{
    pub fn ok(data: V) -> Self {
        Self {
            status_code: StatusCode::OK,
            data,
        }
    }

    pub fn created(data: V) -> Self {
        Self {
            status_code: StatusCode::CREATED,
            data,
        }
    }
}

impl<V> IntoResponse for Success<V>
where
    V: Serialize,
{
    fn into_response(self) -> Response {
        (
            self.status_code,
            Json(Envelope::<V, ErrorBody> {
                data: Some(self.data),
                error: None,
                success: true,
            }),
        )
            .into_response()
    }
}

/// A plain message as response data
#[derive(Debug, Serialize)]
pub struct Message {
    message: &'static str,
}

impl Message {
    pub fn new(message: &'static str) -> Self {
        Self { message }
    }
}

/// Hold data for a failed API interaction
#[derive(Debug)]
pub struct Error {
    status_code: StatusCode,
    message: String,
    description: Option<String>,
}

impl Error {
    /// Malformed input, a taken email address or bad credentials
    pub fn bad_request<M>(message: M) -> Self
    where
        M: ToString,
    {
        Self {
            status_code: StatusCode::BAD_REQUEST,
            message: message.to_string(),
            description: None,
        }
    }

    /// No valid session
    pub fn unauthenticated() -> Self {
        Self {
            status_code: StatusCode::UNAUTHORIZED,
            message: "Unauthorized".to_string(),
            description: None,
        }
    }

    /// A valid session, but not for this resource
    pub fn unauthorized<M>(message: M) -> Self
    where
        M: ToString,
    {
        Self {
            status_code: StatusCode::UNAUTHORIZED,
            message: message.to_string(),
            description: None,
        }
    }

    pub fn not_found<M>(message: M) -> Self
    where
        M: ToString,
    {
        Self {
            status_code: StatusCode::NOT_FOUND,
            message: message.to_string(),
            description: None,
        }
    }

    /// Something broke, the details only end up in the logs
    pub fn internal_server_error<E>(err: E) -> Self
    where
        E: Display,
    {
        tracing::error!("Internal server error: {err}");

        Self {
            status_code: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Internal server error".to_string(),
            description: None,
        }
    }

    #[must_use]
    pub fn with_description<M>(self, description: M) -> Self
    where
        M: ToString,
    {
        Self {
            description: Some(description.to_string()),
            ..self
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (
            self.status_code,
            Json(Envelope::<(), ErrorBody> {
                data: None,
                error: Some(ErrorBody {
                    message: self.message,
                    description: self.description,
                }),
                success: false,
            }),
        )
            .into_response()
    }
}

/// Fallback for unknown routes
pub async fn not_found() -> Error {
    Error::not_found("Not found")
}
