//! Session token codec
//!
//! Signs and verifies the `{id}` claim carried by the session cookie

use core::fmt;

use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;
use jsonwebtoken::errors::ErrorKind;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// How long a token stays valid
pub const TOKEN_VALIDITY_DAYS: i64 = 20;

/// Token validity in seconds
pub const TOKEN_VALIDITY_SECONDS: i64 = TOKEN_VALIDITY_DAYS * 24 * 60 * 60;

/// Token errors
#[derive(Debug, PartialEq, Eq)]
pub enum TokenError {
    /// The token could not be signed
    Encoding(String),

    /// The token is malformed or the signature does not match
    Invalid(String),

    /// The token is past its expiry
    Expired,
}

impl std::error::Error for TokenError {}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TokenError::Encoding(error) => write!(f, "Could not sign token: {error}"),
            TokenError::Invalid(error) => write!(f, "Invalid token: {error}"),
            TokenError::Expired => write!(f, "Token expired"),
        }
    }
}

/// The keys used for encoding/decoding JWT tokens
#[derive(Clone)]
pub struct JwtKeys {
    /// The encoding key
    encoding: EncodingKey,

    /// The decoding key
    decoding: DecodingKey,
}

impl JwtKeys {
    /// Create new encoding/decoding keys, derived from a secret
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Sign a token for the given user ID, valid from now on
    pub fn encode(&self, id: &Uuid) -> Result<String, TokenError> {
        self.encode_at(id, chrono::Utc::now().timestamp())
    }

    /// Sign a token for the given user ID, as if issued at `issued_at`
    fn encode_at(&self, id: &Uuid, issued_at: i64) -> Result<String, TokenError> {
        let claims = Claims {
            id: *id,
            iat: issued_at,
            exp: issued_at + TOKEN_VALIDITY_SECONDS,
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .map_err(|err| TokenError::Encoding(err.to_string()))
    }

    /// Verify a token and get the user ID out of it
    pub fn decode(&self, token: &str) -> Result<Uuid, TokenError> {
        let token_data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(err.to_string()),
            })?;

        Ok(token_data.claims.id)
    }
}

/// The JWT claims to identify a user
#[derive(Debug, Deserialize, Serialize)]
struct Claims {
    /// The user ID
    id: Uuid,

    /// When the token was issued
    iat: i64,

    /// When the token expires
    exp: i64,
}
