//! # Data Source Registration
//!
//! `POST /api/data_sources` stores a new partner. The payload may carry a full
//! `endpoints` list, the convenience fields `authenticateUrl`,
//! `footprintsUrl` and `eventsUrl`, or both; convenience fields are upserted
//! over the list by action kind. A missing `dataSourceId` is generated.
//!
//! Responds `201 Created` with the stored record (secret redacted), or `400`
//! when the payload is invalid or the id is taken.

use crate::error::ExchangeError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use common::requests::RegisterDataSourceRequest;

pub(crate) async fn process(
    state: web::Data<AppState>,
    payload: web::Json<RegisterDataSourceRequest>,
) -> Result<HttpResponse, ExchangeError> {
    let source = state.orchestrator.register(payload.into_inner())?;
    Ok(HttpResponse::Created().json(source))
}
