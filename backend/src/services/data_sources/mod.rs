//! # Data Source Service Module
//!
//! Registration and lifecycle of partner data sources, plus the endpoints that
//! start sync runs against them.
//!
//! ## Sub-modules:
//! - `list` / `get`: read registered sources. Secrets are always redacted.
//! - `register`: create a source from a registration payload.
//! - `update`: partial update; credential or Authenticate URL changes drop the
//!   cached token.
//! - `remove`: drop the cached token, then the record.
//! - `sync`: start a background sync job for every source or a single one.

mod get;
mod list;
mod register;
mod remove;
mod sync;
mod update;

use actix_web::web::{delete, get, post, put, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/data_sources";

/// Configures and returns the Actix `Scope` for data source routes.
///
/// `/sync` is registered before `/{data_source_id}` so that it is never read
/// as an id.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", get().to(list::process))
        .route("", post().to(register::process))
        .route("/sync", post().to(sync::process_all))
        .route("/{data_source_id}", get().to(get::process))
        .route("/{data_source_id}", put().to(update::process))
        .route("/{data_source_id}", delete().to(remove::process))
        .route("/{data_source_id}/sync", post().to(sync::process_one))
}
