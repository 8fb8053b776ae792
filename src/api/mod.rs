//! All API endpoint setup

use axum::Router;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;

pub use request::Form;
pub use request::PathParameters;
pub use request::QueryParameters;
pub use response::Error;
pub use response::Message;
pub use response::Success;
pub use response::not_found;
pub use session::CurrentUser;
pub use session::Sessions;

mod auth;
mod notes;
mod request;
mod response;
mod session;
mod utils;

/// Get the Axum router for all API routes
pub fn router<S: crate::storage::Storage>() -> Router {
    let auth = Router::new()
        .route("/sign-up", post(auth::sign_up::<S>))
        .route("/sign-in", post(auth::sign_in::<S>))
        .route("/sign-out", get(auth::sign_out).post(auth::sign_out))
        .route("/me", get(auth::me::<S>));

    // the collection is served with and without trailing slash
    let notes_collection = get(notes::list::<S>).post(notes::create::<S>);

    let notes = Router::new()
        .route("/notes", notes_collection.clone())
        .route("/notes/", notes_collection)
        .route("/notes/search", post(notes::search::<S>))
        .route(
            "/notes/{note_id}",
            get(notes::single::<S>)
                .put(notes::update::<S>)
                .delete(notes::delete::<S>),
        )
        .route("/notes/{note_id}/archive", put(notes::toggle_archive::<S>));

    Router::new().nest("/auth", auth).merge(notes)
}
