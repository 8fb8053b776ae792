//! All things related to the storage of users and notes

use std::cmp::Ordering;
use std::future::Future;

use serde::Deserialize;
use uuid::Uuid;

use crate::notes::Note;
use crate::pagination::Pagination;
use crate::users::User;

pub use memory::Memory;
pub use postgres::Postgres;

mod memory;
mod postgres;

/// Storage errors
#[derive(Debug)]
pub enum Error {
    /// A connection error with the storage
    Connection(String),

    /// A uniqueness constraint was violated
    Conflict(String),
}

impl std::error::Error for Error {}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Error::Connection(error) => write!(f, "Connection error: {error}"),
            Error::Conflict(error) => write!(f, "Conflict: {error}"),
        }
    }
}

/// Result type for all storage interactions
pub type Result<T> = core::result::Result<T, Error>;

/// Values to create a User
pub struct CreateUserValues<'a> {
    /// The display name
    pub name: &'a str,

    /// The email address, already normalized
    pub email: &'a str,

    /// The hashed password
    pub hashed_password: &'a str,
}

/// Values to attach a tag to a note
///
/// Tags are looked up by name within the tags of the note owner
pub struct TagValues<'a> {
    /// Name of the tag
    pub name: &'a str,

    /// Color of the tag, keeps the current color (or the default for new tags) when absent
    pub color: Option<&'a str>,
}

/// Values to create a Note
pub struct CreateNoteValues<'a> {
    /// Owner of the note
    pub user_id: &'a Uuid,

    /// Title of the note
    pub title: &'a str,

    /// Slug derived from the title
    pub slug: &'a str,

    /// Optional body
    pub body: Option<&'a str>,

    /// Tags to attach
    pub tags: &'a [TagValues<'a>],
}

/// Values to update a Note
///
/// Only the fields that are set get changed
#[derive(Default)]
pub struct UpdateNoteValues<'a> {
    /// New title
    pub title: Option<&'a str>,

    /// New slug, goes together with a new title
    pub slug: Option<&'a str>,

    /// New body
    pub body: Option<&'a str>,

    /// New archived state
    pub archived: Option<bool>,

    /// Replacement of the full tag set
    pub tags: Option<&'a [TagValues<'a>]>,
}

/// Column to sort notes by
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    /// Creation date
    #[default]
    CreatedAt,

    /// Last update date
    UpdatedAt,

    /// Title, alphabetically
    Title,
}

/// Direction to sort notes in
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Smallest first
    Asc,

    /// Largest first
    #[default]
    Desc,
}

/// Sorting of notes
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Sort {
    /// Column to sort by
    #[serde(default)]
    pub sort_by: SortBy,

    /// Direction
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl Sort {
    /// Compare two notes, ties are broken by ID to keep pages stable
    pub fn compare(&self, a: &Note, b: &Note) -> Ordering {
        let ordering = match self.sort_by {
            SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
            SortBy::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortBy::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        }
        .then_with(|| a.id.cmp(&b.id));

        match self.sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// Filter for listing and searching the notes of a single owner
///
/// The text conditions (`query`, `tag_name`, `color`) are OR-ed together, the result is AND-ed
/// with the owner, `archived` and `slug`
#[derive(Clone, Debug, Default)]
pub struct NoteFilter {
    /// Owner of the notes
    pub user_id: Uuid,

    /// Only (un)archived notes
    pub archived: Option<bool>,

    /// Case-insensitive substring of the title or the body
    pub query: Option<String>,

    /// Case-insensitive name of any tag of the note
    pub tag_name: Option<String>,

    /// Color of any tag of the note
    pub color: Option<String>,

    /// Exact slug
    pub slug: Option<String>,

    /// Sorting of the results
    pub sort: Sort,
}

impl NoteFilter {
    /// Filter for all notes of a user
    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }

    /// Are there any text conditions to OR together?
    pub fn has_text_conditions(&self) -> bool {
        self.query.is_some() || self.tag_name.is_some() || self.color.is_some()
    }

    /// Does the note match the filter?
    pub fn matches(&self, note: &Note) -> bool {
        if note.user_id != self.user_id {
            return false;
        }

        if self.archived.is_some_and(|archived| archived != note.archived) {
            return false;
        }

        if self.slug.as_ref().is_some_and(|slug| slug != &note.slug) {
            return false;
        }

        if !self.has_text_conditions() {
            return true;
        }

        let query_matches = self.query.as_ref().is_some_and(|query| {
            let query = query.to_lowercase();

            note.title.to_lowercase().contains(&query)
                || note
                    .body
                    .as_ref()
                    .is_some_and(|body| body.to_lowercase().contains(&query))
        });

        let tag_name_matches = self.tag_name.as_ref().is_some_and(|tag_name| {
            note.tags
                .iter()
                .any(|tag| tag.name.to_lowercase() == tag_name.to_lowercase())
        });

        let color_matches = self
            .color
            .as_ref()
            .is_some_and(|color| note.tags.iter().any(|tag| &tag.color == color));

        query_matches || tag_name_matches || color_matches
    }
}

/// Storage with all supported operations
///
/// Every note operation is scoped by the owner, notes of other users are invisible
pub trait Storage: Clone + Send + Sync + 'static {
    /// Finds a single user by its ID
    fn find_single_user_by_id(&self, id: &Uuid)
    -> impl Future<Output = Result<Option<User>>> + Send;

    /// Finds a single user by its (normalized) email address
    fn find_single_user_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<User>>> + Send;

    /// Create a single user
    ///
    /// Returns a [`Error::Conflict`](Error::Conflict) when the email address is taken
    fn create_user(
        &self,
        values: &CreateUserValues<'_>,
    ) -> impl Future<Output = Result<User>> + Send;

    /// Find the owner of a note, regardless of who is asking
    fn find_note_owner(&self, note_id: &Uuid) -> impl Future<Output = Result<Option<Uuid>>> + Send;

    /// Find a single note of a user
    fn find_single_note_by_id(
        &self,
        user_id: &Uuid,
        note_id: &Uuid,
    ) -> impl Future<Output = Result<Option<Note>>> + Send;

    /// Find a page of notes matching the filter
    fn find_notes(
        &self,
        filter: &NoteFilter,
        pagination: &Pagination,
    ) -> impl Future<Output = Result<Vec<Note>>> + Send;

    /// Count all notes matching the filter
    fn count_notes(&self, filter: &NoteFilter) -> impl Future<Output = Result<u64>> + Send;

    /// Create a note
    fn create_note(
        &self,
        values: &CreateNoteValues<'_>,
    ) -> impl Future<Output = Result<Note>> + Send;

    /// Update a note
    ///
    /// Returns `None` when the note no longer exists
    fn update_note(
        &self,
        note: &Note,
        values: &UpdateNoteValues<'_>,
    ) -> impl Future<Output = Result<Option<Note>>> + Send;

    /// Flip the archived state of a note of a user, in a single write
    ///
    /// Returns `None` when the user has no such note
    fn toggle_note_archived(
        &self,
        user_id: &Uuid,
        note_id: &Uuid,
    ) -> impl Future<Output = Result<Option<Note>>> + Send;

    /// Delete a note
    fn delete_note(&self, note: &Note) -> impl Future<Output = Result<()>> + Send;
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::tags::Tag;

    fn note(user_id: Uuid, title: &str, body: Option<&str>, archived: bool) -> Note {
        Note {
            id: Uuid::new_v4(),
            user_id,
            title: title.to_string(),
            slug: crate::slug::title_to_slug(title),
            body: body.map(ToString::to_string),
            archived,
            tags: vec![Tag {
                id: Uuid::new_v4(),
                name: "Work".to_string(),
                color: "blue".to_string(),
            }],
            created_at: Utc::now().naive_utc(),
            updated_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_filter_owner() {
        let user_id = Uuid::new_v4();
        let note = note(user_id, "Groceries", None, false);

        assert!(NoteFilter::for_user(user_id).matches(&note));
        assert!(!NoteFilter::for_user(Uuid::new_v4()).matches(&note));
    }

    #[test]
    fn test_filter_query_and_archived() {
        let user_id = Uuid::new_v4();
        let archived = note(user_id, "Groceries", Some("milk and eggs"), true);
        let active = note(user_id, "Groceries", Some("milk"), false);

        let filter = NoteFilter {
            query: Some("MILK".to_string()),
            archived: Some(true),
            ..NoteFilter::for_user(user_id)
        };

        assert!(filter.matches(&archived));
        assert!(!filter.matches(&active));
    }

    #[test]
    fn test_filter_text_conditions_are_ored() {
        let user_id = Uuid::new_v4();
        let note = note(user_id, "Groceries", None, false);

        let filter = NoteFilter {
            query: Some("nothing like it".to_string()),
            tag_name: Some("work".to_string()),
            ..NoteFilter::for_user(user_id)
        };
        assert!(filter.matches(&note));

        let filter = NoteFilter {
            query: Some("nothing like it".to_string()),
            color: Some("red".to_string()),
            ..NoteFilter::for_user(user_id)
        };
        assert!(!filter.matches(&note));
    }

    #[test]
    fn test_filter_slug() {
        let user_id = Uuid::new_v4();
        let note = note(user_id, "Hello World!!", None, false);

        let filter = NoteFilter {
            slug: Some("hello-world".to_string()),
            ..NoteFilter::for_user(user_id)
        };
        assert!(filter.matches(&note));

        let filter = NoteFilter {
            slug: Some("hello".to_string()),
            ..NoteFilter::for_user(user_id)
        };
        assert!(!filter.matches(&note));
    }

    #[test]
    fn test_sort_by_title() {
        let user_id = Uuid::new_v4();
        let apple = note(user_id, "apple", None, false);
        let banana = note(user_id, "Banana", None, false);

        let sort = Sort {
            sort_by: SortBy::Title,
            sort_order: SortOrder::Asc,
        };
        assert_eq!(Ordering::Less, sort.compare(&apple, &banana));

        let sort = Sort {
            sort_by: SortBy::Title,
            sort_order: SortOrder::Desc,
        };
        assert_eq!(Ordering::Greater, sort.compare(&apple, &banana));
    }
}
