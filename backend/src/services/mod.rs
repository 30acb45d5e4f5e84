//! HTTP API consumed by the UI and by partner webhooks.
//!
//! Each sub-module owns one `/api/...` scope and exposes it through
//! `configure_routes()`. Handlers return `Result<HttpResponse, ExchangeError>`,
//! so failures reach the client through `ExchangeError`'s status mapping.

pub mod data_sources;
pub mod events;
pub mod footprints;
pub mod identifiers;
pub mod jobs;

use actix_web::web;

/// Registers every API scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(data_sources::configure_routes())
        .service(footprints::configure_routes())
        .service(identifiers::configure_routes())
        .service(events::configure_routes())
        .service(jobs::configure_routes());
}
