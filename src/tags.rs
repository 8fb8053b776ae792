//! Tags

use uuid::Uuid;

/// Color of a tag created without one
pub const DEFAULT_TAG_COLOR: &str = "gray";

/// A tag, owned by a user and linked to any number of their notes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    /// Tag ID
    pub id: Uuid,

    /// Name, unique per user
    pub name: String,

    /// Free-form color
    pub color: String,
}
