//! Authentication API
//!
//! Sign up, sign in and out, and who am I

use axum::Extension;
use axum_extra::extract::CookieJar;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::password::hash;
use crate::password::verify;
use crate::storage;
use crate::storage::CreateUserValues;
use crate::storage::Storage;
use crate::users::User;

use super::CurrentUser;
use super::Error;
use super::Form;
use super::Message;
use super::Sessions;
use super::Success;
use super::request::Validate;
use super::request::normalize_email;
use super::request::validate_email;
use super::request::validate_min_length;

/// The user response information
///
/// A subset of all the information, the password hash never leaves the building
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    /// The user ID
    pub id: Uuid,

    /// The display name
    pub name: String,

    /// The email address
    pub email: String,

    /// Creation date
    pub created_at: NaiveDateTime,

    /// Last updated at
    pub updated_at: NaiveDateTime,
}

impl UserResponse {
    /// Create a user response from a [`User`](User)
    fn from_user(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Sign up form
#[derive(Debug, Deserialize)]
pub struct SignUpForm {
    /// Display name, at least 3 characters
    name: String,
    /// Email address
    email: String,
    /// Password, at least 6 characters
    password: String,
}

impl Validate for SignUpForm {
    fn validate(&self) -> Result<(), Error> {
        validate_min_length(&self.name, 3, "name should be more than 3 characters")?;
        validate_email(&self.email)?;
        validate_min_length(&self.password, 6, "password should be more than 6 characters")
    }
}

/// Create a user and start a session for it
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -d '{ "name": "Someone", "email": "someone@example.com", "password": "verysecret" }' \
///     http://localhost:8000/api/auth/sign-up
/// ```
///
/// Response (with a `Set-Cookie` header):
/// ```json
/// { "data": { "id": "<uuid>", "name": "Someone", "email": "someone@example.com", ... },
///   "error": null, "success": true }
/// ```
pub async fn sign_up<S: Storage>(
    Extension(sessions): Extension<Sessions>,
    Extension(storage): Extension<S>,
    jar: CookieJar,
    Form(form): Form<SignUpForm>,
) -> Result<(CookieJar, Success<UserResponse>), Error> {
    let email = normalize_email(&form.email);

    let existing_user = storage
        .find_single_user_by_email(&email)
        .await
        .map_err(Error::internal_server_error)?;

    if existing_user.is_some() {
        return Err(Error::bad_request("User already exists"));
    }

    let hashed_password = hash(&form.password).map_err(Error::internal_server_error)?;

    let values = CreateUserValues {
        name: form.name.trim(),
        email: &email,
        hashed_password: &hashed_password,
    };

    let user = storage.create_user(&values).await.map_err(|err| match err {
        storage::Error::Conflict(_) => Error::bad_request("User already exists"),
        err @ storage::Error::Connection(_) => Error::internal_server_error(err),
    })?;

    tracing::debug!("Signed up user {}", user.id);

    let jar = sessions.issue(jar, &user.id)?;

    Ok((jar, Success::created(UserResponse::from_user(user))))
}

/// Sign in form
#[derive(Debug, Deserialize)]
pub struct SignInForm {
    /// Email address
    email: String,
    /// Password
    password: String,
}

impl Validate for SignInForm {
    fn validate(&self) -> Result<(), Error> {
        validate_email(&self.email)?;
        validate_min_length(&self.password, 6, "password should be more than 6 characters")
    }
}

/// Start a session for an existing user
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -d '{ "email": "someone@example.com", "password": "verysecret" }' \
///     http://localhost:8000/api/auth/sign-in
/// ```
pub async fn sign_in<S: Storage>(
    Extension(sessions): Extension<Sessions>,
    Extension(storage): Extension<S>,
    jar: CookieJar,
    Form(form): Form<SignInForm>,
) -> Result<(CookieJar, Success<UserResponse>), Error> {
    let user = storage
        .find_single_user_by_email(&normalize_email(&form.email))
        .await
        .map_err(Error::internal_server_error)?
        .filter(|user| verify(&user.hashed_password, &form.password))
        .ok_or_else(|| Error::bad_request("Invalid email or password"))?;

    let jar = sessions.issue(jar, &user.id)?;

    Ok((jar, Success::ok(UserResponse::from_user(user))))
}

/// End the session, whether there is one or not
pub async fn sign_out(
    Extension(sessions): Extension<Sessions>,
    jar: CookieJar,
) -> (CookieJar, Success<Message>) {
    (
        sessions.clear(jar),
        Success::ok(Message::new("Signed out successfully")),
    )
}

/// Get the user of the current session
///
/// Request:
/// ```sh
/// curl -v --cookie 'noteSphereSession=<token>' http://localhost:8000/api/auth/me
/// ```
pub async fn me<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
) -> Result<Success<UserResponse>, Error> {
    storage
        .find_single_user_by_id(&current_user.id)
        .await
        .map_err(Error::internal_server_error)?
        .map(|user| Success::ok(UserResponse::from_user(user)))
        .ok_or_else(|| Error::not_found("User not found"))
}
