//! # Partner Event Webhook
//!
//! Partners push UpdateEvent notifications to
//! `POST /api/events/{data_source_id}`. The handler hands the event to the
//! ingestor and answers right away; any refetch it schedules runs as a
//! background job.

mod receive;

use actix_web::web::{post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/events";

pub fn configure_routes() -> Scope {
    scope(API_PATH).route("/{data_source_id}", post().to(receive::process))
}
