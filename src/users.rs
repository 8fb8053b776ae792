//! Users

use chrono::naive::NaiveDateTime;
use uuid::Uuid;

/// A registered user
#[derive(Clone, Debug)]
pub struct User {
    /// User ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Email address, unique and lowercased
    pub email: String,

    /// Argon2 hash of the password
    pub hashed_password: String,

    /// Creation date
    pub created_at: NaiveDateTime,

    /// Last updated at
    pub updated_at: NaiveDateTime,
}
