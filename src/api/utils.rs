//! Utility functions for the API

use uuid::Uuid;

use crate::api::Error;
use crate::notes::Note;
use crate::storage::Storage;

/// Make sure the note exists and belongs to the user
///
/// A missing note is `404 Not Found`, a note of somebody else is `401 Unauthorized`
pub async fn ensure_note_owner<S: Storage>(
    storage: &S,
    user_id: &Uuid,
    note_id: &Uuid,
) -> Result<(), Error> {
    let owner_id = storage
        .find_note_owner(note_id)
        .await
        .map_err(Error::internal_server_error)?
        .ok_or_else(|| Error::not_found("Note not found"))?;

    if &owner_id != user_id {
        return Err(Error::unauthorized("Not allowed to access this note"));
    }

    Ok(())
}

/// Fetch a note of the user from storage
pub async fn fetch_note<S: Storage>(
    storage: &S,
    user_id: &Uuid,
    note_id: &Uuid,
) -> Result<Note, Error> {
    storage
        .find_single_note_by_id(user_id, note_id)
        .await
        .map_err(Error::internal_server_error)?
        .map_or_else(|| Err(Error::not_found("Note not found")), Ok)
}

/// Fetch a note after checking its ownership
pub async fn fetch_owned_note<S: Storage>(
    storage: &S,
    user_id: &Uuid,
    note_id: &Uuid,
) -> Result<Note, Error> {
    ensure_note_owner(storage, user_id, note_id).await?;

    fetch_note(storage, user_id, note_id).await
}
