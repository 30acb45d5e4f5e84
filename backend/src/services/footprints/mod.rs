//! # Footprint Service Module
//!
//! Read access to every stored footprint and editing of locally owned ones.
//! Records fetched from partners are read-only here; `duplicate` turns one
//! into an editable local draft.
//!
//! ## Sub-modules:
//! - `list` / `get`: read stored records, optionally filtered by origin.
//! - `save`: create and update local records.
//! - `delete`: remove any record.
//! - `duplicate`: deep copy into a local draft.
//! - `breakdown_check`: consistency of carbon totals against the breakdown.

mod breakdown_check;
mod delete;
mod duplicate;
mod get;
mod list;
mod save;

use actix_web::web::{delete as delete_route, get, post, put, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/footprints";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", get().to(list::process))
        .route("", post().to(save::create))
        .route("/{id}", get().to(get::process))
        .route("/{id}", put().to(save::update))
        .route("/{id}", delete_route().to(delete::process))
        .route("/{id}/duplicate", post().to(duplicate::process))
        .route("/{id}/breakdown_check", get().to(breakdown_check::process))
}
