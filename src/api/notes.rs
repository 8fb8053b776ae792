//! Note API management
//!
//! All notes are private to their owner

use axum::Extension;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::notes::Note;
use crate::pagination::MAX_LIMIT;
use crate::pagination::Pagination;
use crate::pagination::PaginationResponse;
use crate::slug::title_to_slug;
use crate::storage::CreateNoteValues;
use crate::storage::NoteFilter;
use crate::storage::Sort;
use crate::storage::Storage;
use crate::storage::TagValues;
use crate::storage::UpdateNoteValues;
use crate::tags::Tag;

use super::CurrentUser;
use super::Error;
use super::Form;
use super::Message;
use super::PathParameters;
use super::QueryParameters;
use super::Success;
use super::request::Validate;
use super::request::validate_min_length;
use super::utils::fetch_owned_note;

const TITLE_MESSAGE: &str = "title should be more than 3 characters";

#[derive(Debug, Serialize)]
pub struct TagResponse {
    pub id: Uuid,
    pub name: String,
    pub color: String,
}

impl TagResponse {
    fn from_tag(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            color: tag.color,
        }
    }
}

/// A full note
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteResponse {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub body: Option<String>,
    pub archived: bool,
    pub tags: Vec<TagResponse>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl NoteResponse {
    fn from_note(note: Note) -> Self {
        Self {
            id: note.id,
            title: note.title,
            slug: note.slug,
            body: note.body,
            archived: note.archived,
            tags: note.tags.into_iter().map(TagResponse::from_tag).collect(),
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

/// A note in a listing, without its body and with only the tag names
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteSummaryResponse {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub archived: bool,
    pub tags: Vec<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl NoteSummaryResponse {
    fn from_note(note: Note) -> Self {
        Self {
            id: note.id,
            title: note.title,
            slug: note.slug,
            archived: note.archived,
            tags: note.tags.into_iter().map(|tag| tag.name).collect(),
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }

    fn from_note_multiple(notes: Vec<Note>) -> Vec<Self> {
        notes.into_iter().map(Self::from_note).collect::<Vec<Self>>()
    }
}

/// A page of notes
#[derive(Debug, Serialize)]
pub struct NotesPageResponse {
    pub notes: Vec<NoteSummaryResponse>,
    pub pagination: PaginationResponse,
}

/// A tag to attach to a note, by name
#[derive(Debug, Deserialize)]
pub struct TagForm {
    name: String,
    color: Option<String>,
}

impl TagForm {
    fn as_values(&self) -> TagValues<'_> {
        TagValues {
            name: self.name.trim(),
            color: self.color.as_deref().map(str::trim),
        }
    }

    fn as_values_multiple(tags: &[TagForm]) -> Vec<TagValues<'_>> {
        tags.iter().map(Self::as_values).collect()
    }
}

fn validate_tags(tags: &[TagForm]) -> Result<(), Error> {
    for tag in tags {
        validate_min_length(&tag.name, 1, "tag name should not be empty")?;

        if let Some(color) = &tag.color {
            validate_min_length(color, 1, "tag color should not be empty")?;
        }
    }

    Ok(())
}

fn validate_pagination(page: Option<u32>, limit: Option<u32>) -> Result<(), Error> {
    if page.is_some_and(|page| page < 1) {
        return Err(Error::bad_request("page should be at least 1"));
    }

    if limit.is_some_and(|limit| !(1..=MAX_LIMIT).contains(&limit)) {
        return Err(Error::bad_request(format!(
            "limit should be between 1 and {MAX_LIMIT}"
        )));
    }

    Ok(())
}

/// Non-empty, trimmed version of an optional filter value
fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

/// Fetch a page of notes together with the total count
async fn find_page<S: Storage>(
    storage: &S,
    filter: &NoteFilter,
    pagination: &Pagination,
) -> Result<NotesPageResponse, Error> {
    let (notes, total_notes) = tokio::try_join!(
        storage.find_notes(filter, pagination),
        storage.count_notes(filter),
    )
    .map_err(Error::internal_server_error)?;

    Ok(NotesPageResponse {
        pagination: PaginationResponse::new(pagination, total_notes, notes.len()),
        notes: NoteSummaryResponse::from_note_multiple(notes),
    })
}

/// Create note form
#[derive(Debug, Deserialize)]
pub struct CreateNoteForm {
    title: String,
    body: Option<String>,
    #[serde(default)]
    tags: Vec<TagForm>,
}

impl Validate for CreateNoteForm {
    fn validate(&self) -> Result<(), Error> {
        validate_min_length(&self.title, 3, TITLE_MESSAGE)?;
        validate_tags(&self.tags)
    }
}

/// Create a note based on the [`CreateNoteForm`](CreateNoteForm) form
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     --cookie 'noteSphereSession=<token>' \
///     -d '{ "title": "Groceries", "body": "Milk" }' \
///     http://localhost:8000/api/notes
/// ```
///
/// Response:
/// ```json
/// { "data": { "message": "Note created successfully" }, "error": null, "success": true }
/// ```
pub async fn create<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    Form(form): Form<CreateNoteForm>,
) -> Result<Success<Message>, Error> {
    let title = form.title.trim();
    let slug = title_to_slug(title);
    let tags = TagForm::as_values_multiple(&form.tags);

    let values = CreateNoteValues {
        user_id: &current_user.id,
        title,
        slug: &slug,
        body: form.body.as_deref(),
        tags: &tags,
    };

    let note = storage
        .create_note(&values)
        .await
        .map_err(Error::internal_server_error)?;

    tracing::debug!("Created note {} for user {}", note.id, current_user.id);

    Ok(Success::created(Message::new("Note created successfully")))
}

/// Query parameters of the note listing
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    page: Option<u32>,
    limit: Option<u32>,
    archived: Option<bool>,
}

impl Validate for ListQuery {
    fn validate(&self) -> Result<(), Error> {
        validate_pagination(self.page, self.limit)
    }
}

/// List the notes of the current user, a page at a time
///
/// Request:
/// ```sh
/// curl -v --cookie 'noteSphereSession=<token>' \
///     'http://localhost:8000/api/notes?page=1&limit=10&archived=false'
/// ```
///
/// Response:
/// ```json
/// { "data": { "notes": [ { "id": "<uuid>", "title": "Groceries", ... } ],
///   "pagination": { "currentPage": 1, "totalPages": 1, "totalNotes": 1 } },
///   "error": null, "success": true }
/// ```
pub async fn list<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    QueryParameters(query): QueryParameters<ListQuery>,
) -> Result<Success<NotesPageResponse>, Error> {
    let filter = NoteFilter {
        archived: query.archived,
        ..NoteFilter::for_user(current_user.id)
    };
    let pagination = Pagination::new(query.page, query.limit);

    find_page(&storage, &filter, &pagination).await.map(Success::ok)
}

/// Get a single note of the current user
pub async fn single<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    PathParameters(note_id): PathParameters<Uuid>,
) -> Result<Success<NoteResponse>, Error> {
    fetch_owned_note(&storage, &current_user.id, &note_id)
        .await
        .map(|note| Success::ok(NoteResponse::from_note(note)))
}

/// Update note form
///
/// Absent fields are left alone
#[derive(Debug, Deserialize)]
pub struct UpdateNoteForm {
    title: Option<String>,
    body: Option<String>,
    archived: Option<bool>,
    tags: Option<Vec<TagForm>>,
}

impl Validate for UpdateNoteForm {
    fn validate(&self) -> Result<(), Error> {
        if let Some(title) = &self.title {
            validate_min_length(title, 3, TITLE_MESSAGE)?;
        }

        if let Some(tags) = &self.tags {
            validate_tags(tags)?;
        }

        Ok(())
    }
}

/// Update a note based on the [`UpdateNoteForm`](UpdateNoteForm) form
///
/// Request:
/// ```sh
/// curl -v -XPUT -H 'Content-Type: application/json' \
///     --cookie 'noteSphereSession=<token>' \
///     -d '{ "body": "Milk and eggs", "tags": [ { "name": "shopping", "color": "green" } ] }' \
///     http://localhost:8000/api/notes/<uuid>
/// ```
pub async fn update<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    PathParameters(note_id): PathParameters<Uuid>,
    Form(form): Form<UpdateNoteForm>,
) -> Result<Success<NoteResponse>, Error> {
    let note = fetch_owned_note(&storage, &current_user.id, &note_id).await?;

    let title = form.title.as_deref().map(str::trim);
    let slug = title.map(title_to_slug);
    let tags = form.tags.as_deref().map(TagForm::as_values_multiple);

    let values = UpdateNoteValues {
        title,
        slug: slug.as_deref(),
        body: form.body.as_deref(),
        archived: form.archived,
        tags: tags.as_deref(),
    };

    // deleted since the ownership check
    let note = storage
        .update_note(&note, &values)
        .await
        .map_err(Error::internal_server_error)?
        .ok_or_else(|| Error::not_found("Note not found"))?;

    Ok(Success::ok(NoteResponse::from_note(note)))
}

/// Flip the archived state of a note
pub async fn toggle_archive<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    PathParameters(note_id): PathParameters<Uuid>,
) -> Result<Success<NoteResponse>, Error> {
    storage
        .toggle_note_archived(&current_user.id, &note_id)
        .await
        .map_err(Error::internal_server_error)?
        .map(|note| Success::ok(NoteResponse::from_note(note)))
        .ok_or_else(|| Error::not_found("Note not found"))
}

/// Delete a note
///
/// Request:
/// ```sh
/// curl -v -XDELETE --cookie 'noteSphereSession=<token>' \
///     http://localhost:8000/api/notes/<uuid>
/// ```
pub async fn delete<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    PathParameters(note_id): PathParameters<Uuid>,
) -> Result<Success<Message>, Error> {
    let note = fetch_owned_note(&storage, &current_user.id, &note_id).await?;

    storage
        .delete_note(&note)
        .await
        .map_err(Error::internal_server_error)?;

    tracing::debug!("Deleted note {} of user {}", note.id, current_user.id);

    Ok(Success::ok(Message::new("Note deleted successfully")))
}

/// Search form
///
/// Every field is optional, an empty form lists all notes
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchForm {
    query: Option<String>,
    archived: Option<bool>,
    tag_name: Option<String>,
    color: Option<String>,
    slug: Option<String>,
    sort: Option<Sort>,
    page: Option<u32>,
    limit: Option<u32>,
}

impl Validate for SearchForm {
    fn validate(&self) -> Result<(), Error> {
        validate_pagination(self.page, self.limit)
    }
}

impl SearchForm {
    fn to_filter(&self, user_id: Uuid) -> NoteFilter {
        NoteFilter {
            user_id,
            archived: self.archived,
            query: non_empty(self.query.as_ref()),
            tag_name: non_empty(self.tag_name.as_ref()),
            color: non_empty(self.color.as_ref()),
            slug: non_empty(self.slug.as_ref()),
            sort: self.sort.unwrap_or_default(),
        }
    }
}

/// Search the notes of the current user
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     --cookie 'noteSphereSession=<token>' \
///     -d '{ "query": "milk", "archived": false, "sort": { "sortBy": "title", "sortOrder": "asc" } }' \
///     http://localhost:8000/api/notes/search
/// ```
pub async fn search<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    Form(form): Form<SearchForm>,
) -> Result<Success<NotesPageResponse>, Error> {
    let filter = form.to_filter(current_user.id);
    let pagination = Pagination::new(form.page, form.limit);

    find_page(&storage, &filter, &pagination).await.map(Success::ok)
}
