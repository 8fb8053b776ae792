//! API request helpers
//!
//! Extractors that turn rejections into API errors and validate their payload before a handler
//! gets to see it

use axum::extract::FromRequest;
use axum::extract::FromRequestParts;
use axum::extract::Json;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::Request;
use axum::extract::rejection::JsonRejection;
use axum::extract::rejection::PathRejection;
use axum::extract::rejection::QueryRejection;
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use super::Error;

/// Payloads that can check themselves
///
/// The first failing check ends up as the error message
pub trait Validate {
    fn validate(&self) -> Result<(), Error>;
}

/// Check a minimum length, in characters, of a trimmed value
pub fn validate_min_length(value: &str, min_length: usize, message: &str) -> Result<(), Error> {
    if value.trim().chars().count() < min_length {
        return Err(Error::bad_request(message));
    }

    Ok(())
}

/// Check the shape of an email address
///
/// ```rust
/// assert!(validate_email("someone@example.com").is_ok())
/// ```
pub fn validate_email(email: &str) -> Result<(), Error> {
    let invalid = || Error::bad_request("Invalid email");

    let (local, domain) = email.trim().split_once('@').ok_or_else(invalid)?;

    let valid = !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
        && !email.trim().chars().any(char::is_whitespace);

    if valid { Ok(()) } else { Err(invalid()) }
}

/// Normalize an email address for storage and lookups
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn parse_json<J>(json: Result<Json<J>, JsonRejection>) -> Result<J, Error> {
    match json {
        Ok(Json(json)) => Ok(json),
        Err(err) => match err {
            JsonRejection::JsonDataError(err) => {
                Err(Error::bad_request("Data error").with_description(source_message(&err)))
            }
            JsonRejection::JsonSyntaxError(err) => {
                Err(Error::bad_request("JSON syntax error").with_description(source_message(&err)))
            }
            JsonRejection::MissingJsonContentType(_err) => Err(Error::bad_request(
                "Missing `application/json` content type",
            )),
            JsonRejection::BytesRejection(err) => {
                Err(Error::bad_request("Invalid characters in JSON").with_description(err))
            }
            err => Err(Error::bad_request("Unknown JSON error").with_description(err)),
        },
    }
}

/// The message of the underlying error, or the error itself when there is none
fn source_message<E>(err: &E) -> String
where
    E: std::error::Error,
{
    err.source()
        .map_or_else(|| err.to_string(), ToString::to_string)
}

/// Wrapper for the JSON extractor, validates the payload
pub struct Form<F>(pub F);

impl<S, F> FromRequest<S> for Form<F>
where
    S: Send + Sync,
    F: DeserializeOwned + Validate,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let form = parse_json(Json::<F>::from_request(req, state).await)?;

        form.validate()?;

        Ok(Form(form))
    }
}

fn parse_path<P>(path: Result<Path<P>, PathRejection>) -> Result<P, Error> {
    match path {
        Ok(Path(path)) => Ok(path),
        Err(err) => match err {
            PathRejection::FailedToDeserializePathParams(err) => {
                Err(Error::bad_request("Invalid path parameter").with_description(err))
            }
            PathRejection::MissingPathParams(err) => {
                Err(Error::bad_request("Missing path parameter").with_description(err))
            }
            err => Err(Error::bad_request("Unknown path error").with_description(err)),
        },
    }
}

/// Wrapper for the path extractor
pub struct PathParameters<P>(pub P);

impl<S, P> FromRequestParts<S> for PathParameters<P>
where
    S: Send + Sync,
    P: DeserializeOwned + Send,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        parse_path(Path::<P>::from_request_parts(parts, state).await).map(PathParameters)
    }
}

/// Wrapper for the query string extractor, validates the parameters
pub struct QueryParameters<Q>(pub Q);

impl<S, Q> FromRequestParts<S> for QueryParameters<Q>
where
    S: Send + Sync,
    Q: DeserializeOwned + Validate,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let query = Query::<Q>::from_request_parts(parts, state)
            .await
            .map_err(|err: QueryRejection| {
                Error::bad_request("Invalid query parameter").with_description(source_message(&err))
            })?;

        query.0.validate()?;

        Ok(QueryParameters(query.0))
    }
}
