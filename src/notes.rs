//! Notes

use chrono::naive::NaiveDateTime;
use uuid::Uuid;

use crate::tags::Tag;

/// A note with its tags
#[derive(Clone, Debug)]
pub struct Note {
    /// Note ID
    pub id: Uuid,

    /// The owner of the note
    pub user_id: Uuid,

    /// Title
    pub title: String,

    /// Slug derived from the title, not unique
    pub slug: String,

    /// Optional body
    pub body: Option<String>,

    /// Is the note archived?
    pub archived: bool,

    /// Tags of the note, ordered by name
    pub tags: Vec<Tag>,

    /// Creation date
    pub created_at: NaiveDateTime,

    /// Last updated at
    pub updated_at: NaiveDateTime,
}
