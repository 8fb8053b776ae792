//! Postgres storage

use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveDateTime;
use sqlx::PgPool;
use sqlx::Postgres as Pg;
use sqlx::QueryBuilder;
use sqlx::Transaction;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
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
use super::SortBy;
use super::SortOrder;
use super::Storage;
use super::TagValues;
use super::UpdateNoteValues;

/// Migrator to run migrations on startup
static MIGRATOR: Migrator = sqlx::migrate!();

/// Columns of a note, without its tags
const NOTE_COLUMNS: &str = "notes.id, notes.user_id, notes.title, notes.slug, notes.body, \
    notes.archived, notes.created_at, notes.updated_at";

/// Postgres storage
#[derive(Clone)]
pub struct Postgres {
    /// Pool of connections
    connection_pool: PgPool,
}

impl Postgres {
    /// Connect to Postgres
    ///
    /// Migrations will be run
    pub async fn connect(database_url: &str) -> Result<Self> {
        let connection_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
            .map_err(connection_error)?;

        Self::new_with_pool(connection_pool).await
    }

    /// Create Postgres storage with existing pool
    ///
    /// Migrations will be run
    pub async fn new_with_pool(connection_pool: PgPool) -> Result<Self> {
        MIGRATOR
            .run(&connection_pool)
            .await
            .map_err(|err| Error::Connection(format!("Migrations could not run: {err}")))?;

        Ok(Self { connection_pool })
    }

    /// Attach the tags to the notes, in a single query
    async fn with_tags(&self, notes: Vec<PostgresNote>) -> Result<Vec<Note>> {
        if notes.is_empty() {
            return Ok(Vec::new());
        }

        let note_tags = sqlx::query_as::<_, PostgresNoteTag>(
            r"
            SELECT note_tags.note_id, tags.id, tags.name, tags.color
            FROM note_tags
            JOIN tags ON tags.id = note_tags.tag_id
            WHERE note_tags.note_id = ANY($1)
            ORDER BY tags.name",
        )
        .bind(notes.iter().map(|note| note.id).collect::<Vec<Uuid>>())
        .fetch_all(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        let mut tags_by_note = HashMap::<Uuid, Vec<Tag>>::new();
        for note_tag in note_tags {
            tags_by_note
                .entry(note_tag.note_id)
                .or_default()
                .push(note_tag.into_tag());
        }

        Ok(notes
            .into_iter()
            .map(|note| {
                let tags = tags_by_note.remove(&note.id).unwrap_or_default();
                note.into_note(tags)
            })
            .collect())
    }

    /// Fetch a single note of a user with its tags
    async fn fetch_note(&self, user_id: &Uuid, note_id: &Uuid) -> Result<Option<Note>> {
        let note = sqlx::query_as::<_, PostgresNote>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE notes.user_id = $1 AND notes.id = $2 LIMIT 1"
        ))
        .bind(user_id)
        .bind(note_id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(self.with_tags(note.into_iter().collect()).await?.pop())
    }
}

/// Postgres version of user
#[derive(sqlx::FromRow)]
struct PostgresUser {
    id: Uuid,
    name: String,
    email: String,
    hashed_password: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl PostgresUser {
    fn into_user(self) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            hashed_password: self.hashed_password,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Postgres version of note, without tags
#[derive(sqlx::FromRow)]
struct PostgresNote {
    id: Uuid,
    user_id: Uuid,
    title: String,
    slug: String,
    body: Option<String>,
    archived: bool,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl PostgresNote {
    fn into_note(self, tags: Vec<Tag>) -> Note {
        Note {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            slug: self.slug,
            body: self.body,
            archived: self.archived,
            tags,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A tag joined with the note it belongs to
#[derive(sqlx::FromRow)]
struct PostgresNoteTag {
    note_id: Uuid,
    id: Uuid,
    name: String,
    color: String,
}

impl PostgresNoteTag {
    fn into_tag(self) -> Tag {
        Tag {
            id: self.id,
            name: self.name,
            color: self.color,
        }
    }
}

impl Storage for Postgres {
    async fn find_single_user_by_id(&self, id: &Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, PostgresUser>(
            r"
            SELECT id, name, email, hashed_password, created_at, updated_at
            FROM users
            WHERE id = $1
            LIMIT 1",
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(user.map(PostgresUser::into_user))
    }

    async fn find_single_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, PostgresUser>(
            r"
            SELECT id, name, email, hashed_password, created_at, updated_at
            FROM users
            WHERE email = $1
            LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(user.map(PostgresUser::into_user))
    }

    async fn create_user(&self, values: &CreateUserValues<'_>) -> Result<User> {
        let user = sqlx::query_as::<_, PostgresUser>(
            r"
            INSERT INTO users (id, name, email, hashed_password)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, hashed_password, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(values.name)
        .bind(values.email)
        .bind(values.hashed_password)
        .fetch_one(&self.connection_pool)
        .await
        .map_err(write_error)?;

        Ok(user.into_user())
    }

    async fn find_note_owner(&self, note_id: &Uuid) -> Result<Option<Uuid>> {
        sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM notes WHERE id = $1 LIMIT 1")
            .bind(note_id)
            .fetch_optional(&self.connection_pool)
            .await
            .map_err(connection_error)
    }

    async fn find_single_note_by_id(&self, user_id: &Uuid, note_id: &Uuid) -> Result<Option<Note>> {
        self.fetch_note(user_id, note_id).await
    }

    async fn find_notes(&self, filter: &NoteFilter, pagination: &Pagination) -> Result<Vec<Note>> {
        let mut builder = QueryBuilder::<Pg>::new(format!("SELECT {NOTE_COLUMNS} FROM notes"));

        push_filter(&mut builder, filter);

        builder.push(" ORDER BY ");
        builder.push(match filter.sort.sort_by {
            SortBy::CreatedAt => "notes.created_at",
            SortBy::UpdatedAt => "notes.updated_at",
            SortBy::Title => "LOWER(notes.title)",
        });
        let direction = match filter.sort.sort_order {
            SortOrder::Asc => " ASC",
            SortOrder::Desc => " DESC",
        };
        builder.push(direction);
        builder.push(", notes.id");
        builder.push(direction);

        builder
            .push(" LIMIT ")
            .push_bind(i64::from(pagination.limit))
            .push(" OFFSET ")
            .push_bind(i64::try_from(pagination.offset()).unwrap_or(i64::MAX));

        let notes = builder
            .build_query_as::<PostgresNote>()
            .fetch_all(&self.connection_pool)
            .await
            .map_err(connection_error)?;

        self.with_tags(notes).await
    }

    async fn count_notes(&self, filter: &NoteFilter) -> Result<u64> {
        let mut builder = QueryBuilder::<Pg>::new("SELECT COUNT(*) FROM notes");

        push_filter(&mut builder, filter);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.connection_pool)
            .await
            .map_err(connection_error)?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn create_note(&self, values: &CreateNoteValues<'_>) -> Result<Note> {
        let mut transaction = self
            .connection_pool
            .begin()
            .await
            .map_err(connection_error)?;

        let note_id = sqlx::query_scalar::<_, Uuid>(
            r"
            INSERT INTO notes (id, user_id, title, slug, body)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(values.user_id)
        .bind(values.title)
        .bind(values.slug)
        .bind(values.body)
        .fetch_one(&mut *transaction)
        .await
        .map_err(connection_error)?;

        replace_tags(&mut transaction, values.user_id, &note_id, values.tags).await?;

        transaction.commit().await.map_err(connection_error)?;

        self.fetch_note(values.user_id, &note_id)
            .await?
            .ok_or_else(|| Error::Connection(format!("Note {note_id} vanished after creation")))
    }

    async fn update_note(
        &self,
        note: &Note,
        values: &UpdateNoteValues<'_>,
    ) -> Result<Option<Note>> {
        let mut transaction = self
            .connection_pool
            .begin()
            .await
            .map_err(connection_error)?;

        let updated = sqlx::query(
            r"
            UPDATE notes
            SET title = COALESCE($1, title),
                slug = COALESCE($2, slug),
                body = COALESCE($3, body),
                archived = COALESCE($4, archived),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $5 AND user_id = $6",
        )
        .bind(values.title)
        .bind(values.slug)
        .bind(values.body)
        .bind(values.archived)
        .bind(note.id)
        .bind(note.user_id)
        .execute(&mut *transaction)
        .await
        .map_err(connection_error)?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        if let Some(tags) = values.tags {
            replace_tags(&mut transaction, &note.user_id, &note.id, tags).await?;
        }

        transaction.commit().await.map_err(connection_error)?;

        self.fetch_note(&note.user_id, &note.id).await
    }

    async fn toggle_note_archived(&self, user_id: &Uuid, note_id: &Uuid) -> Result<Option<Note>> {
        let note = sqlx::query_as::<_, PostgresNote>(&format!(
            r"
            UPDATE notes
            SET archived = NOT archived,
                updated_at = CURRENT_TIMESTAMP
            WHERE notes.id = $1 AND notes.user_id = $2
            RETURNING {NOTE_COLUMNS}"
        ))
        .bind(note_id)
        .bind(user_id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(self.with_tags(note.into_iter().collect()).await?.pop())
    }

    async fn delete_note(&self, note: &Note) -> Result<()> {
        sqlx::query("DELETE FROM notes WHERE id = $1 AND user_id = $2")
            .bind(note.id)
            .bind(note.user_id)
            .execute(&self.connection_pool)
            .await
            .map_err(connection_error)?;

        Ok(())
    }
}

/// Append the `WHERE` clause of the filter
fn push_filter(builder: &mut QueryBuilder<'_, Pg>, filter: &NoteFilter) {
    builder
        .push(" WHERE notes.user_id = ")
        .push_bind(filter.user_id);

    if let Some(archived) = filter.archived {
        builder.push(" AND notes.archived = ").push_bind(archived);
    }

    if let Some(slug) = &filter.slug {
        builder.push(" AND notes.slug = ").push_bind(slug.clone());
    }

    if !filter.has_text_conditions() {
        return;
    }

    builder.push(" AND (");
    let mut conditions = builder.separated(" OR ");

    if let Some(query) = &filter.query {
        let pattern = format!("%{}%", escape_like(query));

        conditions
            .push("notes.title ILIKE ")
            .push_bind_unseparated(pattern.clone());
        conditions
            .push("notes.body ILIKE ")
            .push_bind_unseparated(pattern);
    }

    if let Some(tag_name) = &filter.tag_name {
        conditions
            .push(
                "EXISTS (SELECT 1 FROM note_tags JOIN tags ON tags.id = note_tags.tag_id \
                WHERE note_tags.note_id = notes.id AND LOWER(tags.name) = LOWER(",
            )
            .push_bind_unseparated(tag_name.clone())
            .push_unseparated("))");
    }

    if let Some(color) = &filter.color {
        conditions
            .push(
                "EXISTS (SELECT 1 FROM note_tags JOIN tags ON tags.id = note_tags.tag_id \
                WHERE note_tags.note_id = notes.id AND tags.color = ",
            )
            .push_bind_unseparated(color.clone())
            .push_unseparated(")");
    }

    builder.push(")");
}

/// Replace the tag set of a note, creating missing tags for the owner
async fn replace_tags(
    transaction: &mut Transaction<'_, Pg>,
    user_id: &Uuid,
    note_id: &Uuid,
    tags: &[TagValues<'_>],
) -> Result<()> {
    sqlx::query("DELETE FROM note_tags WHERE note_id = $1")
        .bind(note_id)
        .execute(&mut **transaction)
        .await
        .map_err(connection_error)?;

    for tag in tags {
        let tag_id = sqlx::query_scalar::<_, Uuid>(
            r"
            INSERT INTO tags (id, user_id, name, color)
            VALUES ($1, $2, $3, COALESCE($4, $5))
            ON CONFLICT (user_id, name)
            DO UPDATE SET color = COALESCE($4, tags.color), updated_at = CURRENT_TIMESTAMP
            RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(tag.name)
        .bind(tag.color)
        .bind(DEFAULT_TAG_COLOR)
        .fetch_one(&mut **transaction)
        .await
        .map_err(connection_error)?;

        sqlx::query(
            r"
            INSERT INTO note_tags (note_id, tag_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING",
        )
        .bind(note_id)
        .bind(tag_id)
        .execute(&mut **transaction)
        .await
        .map_err(connection_error)?;
    }

    Ok(())
}

/// Escape the wildcards of a `LIKE` pattern
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());

    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }

    escaped
}

/// Convert `SQLx` to storage connection error
fn connection_error<E>(err: E) -> Error
where
    E: std::error::Error,
{
    Error::Connection(err.to_string())
}

/// Convert `SQLx` to storage error, keeping unique violations apart
fn write_error(err: sqlx::Error) -> Error {
    match &err {
        sqlx::Error::Database(database_error) if database_error.is_unique_violation() => {
            Error::Conflict(database_error.message().to_string())
        }
        _ => connection_error(err),
    }
}
