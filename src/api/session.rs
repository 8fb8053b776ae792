//! Session service
//!
//! Sessions are stateless: the cookie carries a signed token with the user ID, which gets resolved
//! to an existing user on every protected request

use std::marker::PhantomData;

use axum::Extension;
use axum::RequestPartsExt;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::Cookie;
use axum_extra::extract::cookie::SameSite;
use uuid::Uuid;

use crate::api::Error;
use crate::config::Config;
use crate::storage::Storage;
use crate::token::JwtKeys;
use crate::token::TOKEN_VALIDITY_DAYS;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "noteSphereSession";

/// Issues and clears session cookies
#[derive(Clone)]
pub struct Sessions {
    /// Keys to sign and verify tokens with
    jwt_keys: JwtKeys,

    /// Only send the cookie over HTTPS
    secure: bool,
}

impl Sessions {
    /// Create the session service from the configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            jwt_keys: JwtKeys::new(config.jwt_secret.as_bytes()),
            secure: config.secure_cookies(),
        }
    }

    /// Add a fresh session cookie for the user to the jar
    pub fn issue(&self, jar: CookieJar, user_id: &Uuid) -> Result<CookieJar, Error> {
        let token = self
            .jwt_keys
            .encode(user_id)
            .map_err(Error::internal_server_error)?;

        let cookie = Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(self.secure)
            .max_age(time::Duration::days(TOKEN_VALIDITY_DAYS));

        Ok(jar.add(cookie))
    }

    /// Remove the session cookie, even when the request did not carry one
    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        let mut cookie = Cookie::build((SESSION_COOKIE, ""))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(self.secure)
            .build();

        cookie.make_removal();

        jar.add(cookie)
    }
}

/// The user behind the session of the current request
///
/// Rejects the request when there is no valid session or the user no longer exists
pub struct CurrentUser<S: Storage> {
    /// ID of the resolved user
    pub id: Uuid,

    /// The storage the user was resolved with
    storage: PhantomData<S>,
}

impl<B, S> FromRequestParts<B> for CurrentUser<S>
where
    B: Send + Sync,
    S: Storage,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &B) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);

        let token = jar
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty())
            .ok_or_else(Error::unauthenticated)?;

        let Extension(sessions) = parts
            .extract::<Extension<Sessions>>()
            .await
            .map_err(Error::internal_server_error)?;

        let Extension(storage) = parts
            .extract::<Extension<S>>()
            .await
            .map_err(Error::internal_server_error)?;

        let id = sessions.jwt_keys.decode(&token).map_err(|err| {
            tracing::debug!("Rejected session: {err}");
            Error::unauthenticated()
        })?;

        let user = storage
            .find_single_user_by_id(&id)
            .await
            .map_err(Error::internal_server_error)?;

        if user.is_none() {
            return Err(Error::not_found("User not found"));
        }

        Ok(Self {
            id,
            storage: PhantomData,
        })
    }
}
