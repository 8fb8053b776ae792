//! Memory storage
//!
//! Will be destroyed on system shutdown

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::notes::Note;
use crate::pagination::Pagination;
use crate::tags::DEFAULT_TAG_COLOR;
use crate::tags::Tag;
use crate::users::User;

use super::CreateNoteValues;
use super::CreateUserValues;
use super::Error;
use super::NoteFilter;
use super::Result;
use super::Storage;
use super::TagValues;
use super::UpdateNoteValues;

/// A stored note, tags are kept by ID
#[derive(Clone, Debug)]
struct StoredNote {
    note: Note,
    tag_ids: Vec<Uuid>,
}

/// A stored tag with its owner
#[derive(Clone, Debug)]
struct StoredTag {
    user_id: Uuid,
    tag: Tag,
}

/// Everything in storage, behind a single lock
#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, User>,
    notes: HashMap<Uuid, StoredNote>,
    tags: HashMap<Uuid, StoredTag>,
}

impl State {
    /// Resolve the tags of a stored note, ordered by name
    fn note_with_tags(&self, stored: &StoredNote) -> Note {
        let mut tags = stored
            .tag_ids
            .iter()
            .filter_map(|tag_id| self.tags.get(tag_id))
            .map(|stored_tag| stored_tag.tag.clone())
            .collect::<Vec<Tag>>();

        tags.sort_by(|a, b| a.name.cmp(&b.name));

        Note {
            tags,
            ..stored.note.clone()
        }
    }

    /// Find or create the tags of a user by name, updating colors when given
    fn resolve_tags(&mut self, user_id: &Uuid, values: &[TagValues<'_>]) -> Vec<Uuid> {
        let mut tag_ids = Vec::with_capacity(values.len());

        for value in values {
            let existing = self
                .tags
                .values_mut()
                .find(|stored| &stored.user_id == user_id && stored.tag.name == value.name);

            let tag_id = if let Some(stored) = existing {
                if let Some(color) = value.color {
                    stored.tag.color = color.to_string();
                }

                stored.tag.id
            } else {
                let tag = Tag {
                    id: Uuid::new_v4(),
                    name: value.name.to_string(),
                    color: value.color.unwrap_or(DEFAULT_TAG_COLOR).to_string(),
                };
                let tag_id = tag.id;

                self.tags.insert(
                    tag_id,
                    StoredTag {
                        user_id: *user_id,
                        tag,
                    },
                );

                tag_id
            };

            if !tag_ids.contains(&tag_id) {
                tag_ids.push(tag_id);
            }
        }

        tag_ids
    }

    /// All notes matching the filter, sorted
    fn matching_notes(&self, filter: &NoteFilter) -> Vec<Note> {
        let mut notes = self
            .notes
            .values()
            .map(|stored| self.note_with_tags(stored))
            .filter(|note| filter.matches(note))
            .collect::<Vec<Note>>();

        notes.sort_by(|a, b| filter.sort.compare(a, b));

        notes
    }
}

/// An in-memory storage
///
/// Will be destroyed on system shutdown
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// All users, notes and tags in storage
    state: Arc<Mutex<State>>,
}

impl Memory {
    /// Create a new empty Memory storage
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for Memory {
    async fn find_single_user_by_id(&self, id: &Uuid) -> Result<Option<User>> {
        Ok(self.state.lock().await.users.get(id).cloned())
    }

    async fn find_single_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn create_user(&self, values: &CreateUserValues<'_>) -> Result<User> {
        let mut state = self.state.lock().await;

        if state.users.values().any(|user| user.email == values.email) {
            return Err(Error::Conflict(format!(
                "User with email {} already exists",
                values.email
            )));
        }

        let now = Utc::now().naive_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: values.name.to_string(),
            email: values.email.to_string(),
            hashed_password: values.hashed_password.to_string(),
            created_at: now,
            updated_at: now,
        };

        state.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_note_owner(&self, note_id: &Uuid) -> Result<Option<Uuid>> {
        Ok(self
            .state
            .lock()
            .await
            .notes
            .get(note_id)
            .map(|stored| stored.note.user_id))
    }

    async fn find_single_note_by_id(&self, user_id: &Uuid, note_id: &Uuid) -> Result<Option<Note>> {
        let state = self.state.lock().await;

        Ok(state
            .notes
            .get(note_id)
            .filter(|stored| &stored.note.user_id == user_id)
            .map(|stored| state.note_with_tags(stored)))
    }

    async fn find_notes(&self, filter: &NoteFilter, pagination: &Pagination) -> Result<Vec<Note>> {
        let offset = usize::try_from(pagination.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(pagination.limit).unwrap_or(usize::MAX);

        Ok(self
            .state
            .lock()
            .await
            .matching_notes(filter)
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn count_notes(&self, filter: &NoteFilter) -> Result<u64> {
        let state = self.state.lock().await;

        let count = state
            .notes
            .values()
            .filter(|stored| filter.matches(&state.note_with_tags(stored)))
            .count();

        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn create_note(&self, values: &CreateNoteValues<'_>) -> Result<Note> {
        let mut state = self.state.lock().await;

        let tag_ids = state.resolve_tags(values.user_id, values.tags);

        let now = Utc::now().naive_utc();
        let stored = StoredNote {
            note: Note {
                id: Uuid::new_v4(),
                user_id: *values.user_id,
                title: values.title.to_string(),
                slug: values.slug.to_string(),
                body: values.body.map(ToString::to_string),
                archived: false,
                tags: Vec::new(),
                created_at: now,
                updated_at: now,
            },
            tag_ids,
        };

        let note = state.note_with_tags(&stored);
        state.notes.insert(note.id, stored);

        Ok(note)
    }

    async fn update_note(
        &self,
        note: &Note,
        values: &UpdateNoteValues<'_>,
    ) -> Result<Option<Note>> {
        let mut state = self.state.lock().await;

        if !state
            .notes
            .get(&note.id)
            .is_some_and(|stored| stored.note.user_id == note.user_id)
        {
            return Ok(None);
        }

        let tag_ids = values
            .tags
            .map(|tags| state.resolve_tags(&note.user_id, tags));

        let Some(stored) = state.notes.get_mut(&note.id) else {
            return Ok(None);
        };

        if let Some(title) = values.title {
            stored.note.title = title.to_string();
        }
        if let Some(slug) = values.slug {
            stored.note.slug = slug.to_string();
        }
        if let Some(body) = values.body {
            stored.note.body = Some(body.to_string());
        }
        if let Some(archived) = values.archived {
            stored.note.archived = archived;
        }
        if let Some(tag_ids) = tag_ids {
            stored.tag_ids = tag_ids;
        }
        stored.note.updated_at = Utc::now().naive_utc();

        let stored = stored.clone();

        Ok(Some(state.note_with_tags(&stored)))
    }

    async fn toggle_note_archived(&self, user_id: &Uuid, note_id: &Uuid) -> Result<Option<Note>> {
        let mut state = self.state.lock().await;

        let Some(stored) = state
            .notes
            .get_mut(note_id)
            .filter(|stored| &stored.note.user_id == user_id)
        else {
            return Ok(None);
        };

        stored.note.archived = !stored.note.archived;
        stored.note.updated_at = Utc::now().naive_utc();

        let stored = stored.clone();

        Ok(Some(state.note_with_tags(&stored)))
    }

    async fn delete_note(&self, note: &Note) -> Result<()> {
        let mut state = self.state.lock().await;

        if state
            .notes
            .get(&note.id)
            .is_some_and(|stored| stored.note.user_id == note.user_id)
        {
            state.notes.remove(&note.id);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn create_user(storage: &Memory, email: &str) -> User {
        storage
            .create_user(&CreateUserValues {
                name: "Some name",
                email,
                hashed_password: "hashed",
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_user_conflict() {
        let storage = Memory::new();

        create_user(&storage, "someone@example.com").await;

        let result = storage
            .create_user(&CreateUserValues {
                name: "Someone else",
                email: "someone@example.com",
                hashed_password: "hashed",
            })
            .await;

        assert!(matches!(result, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn test_tags_are_reused_per_user() {
        let storage = Memory::new();
        let user = create_user(&storage, "someone@example.com").await;
        let other_user = create_user(&storage, "someone-else@example.com").await;

        let tags = [TagValues {
            name: "work",
            color: Some("blue"),
        }];

        let note_one = storage
            .create_note(&CreateNoteValues {
                user_id: &user.id,
                title: "One",
                slug: "one",
                body: None,
                tags: &tags,
            })
            .await
            .unwrap();

        let without_color = [TagValues {
            name: "work",
            color: None,
        }];

        let note_two = storage
            .create_note(&CreateNoteValues {
                user_id: &user.id,
                title: "Two",
                slug: "two",
                body: None,
                tags: &without_color,
            })
            .await
            .unwrap();

        let note_three = storage
            .create_note(&CreateNoteValues {
                user_id: &other_user.id,
                title: "Three",
                slug: "three",
                body: None,
                tags: &without_color,
            })
            .await
            .unwrap();

        assert_eq!(note_one.tags, note_two.tags);
        assert_eq!("blue", note_two.tags[0].color);
        assert_ne!(note_one.tags[0].id, note_three.tags[0].id);
        assert_eq!(DEFAULT_TAG_COLOR, note_three.tags[0].color);
    }

    #[tokio::test]
    async fn test_note_is_scoped_by_owner() {
        let storage = Memory::new();
        let user = create_user(&storage, "someone@example.com").await;
        let other_user = create_user(&storage, "someone-else@example.com").await;

        let note = storage
            .create_note(&CreateNoteValues {
                user_id: &user.id,
                title: "Mine",
                slug: "mine",
                body: Some("all mine"),
                tags: &[],
            })
            .await
            .unwrap();

        assert!(
            storage
                .find_single_note_by_id(&other_user.id, &note.id)
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(
            Some(user.id),
            storage.find_note_owner(&note.id).await.unwrap()
        );
        assert!(
            storage
                .toggle_note_archived(&other_user.id, &note.id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_update_of_deleted_note() {
        let storage = Memory::new();
        let user = create_user(&storage, "someone@example.com").await;

        let note = storage
            .create_note(&CreateNoteValues {
                user_id: &user.id,
                title: "Gone soon",
                slug: "gone-soon",
                body: None,
                tags: &[],
            })
            .await
            .unwrap();

        storage.delete_note(&note).await.unwrap();

        let values = UpdateNoteValues {
            body: Some("too late"),
            ..UpdateNoteValues::default()
        };

        assert!(storage.update_note(&note, &values).await.unwrap().is_none());
        assert!(
            storage
                .toggle_note_archived(&user.id, &note.id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_concurrent_toggles_are_not_lost() {
        let storage = Memory::new();
        let user = create_user(&storage, "someone@example.com").await;

        let note = storage
            .create_note(&CreateNoteValues {
                user_id: &user.id,
                title: "Flip flop",
                slug: "flip-flop",
                body: None,
                tags: &[],
            })
            .await
            .unwrap();

        let toggles = (0..10)
            .map(|_| {
                let storage = storage.clone();
                let user_id = user.id;
                let note_id = note.id;

                tokio::spawn(async move { storage.toggle_note_archived(&user_id, &note_id).await })
            })
            .collect::<Vec<_>>();

        for toggle in toggles {
            toggle.await.unwrap().unwrap();
        }

        let note = storage
            .find_single_note_by_id(&user.id, &note.id)
            .await
            .unwrap()
            .unwrap();

        assert!(!note.archived);
    }
}
