//! # Data Source Update
//!
//! `PUT /api/data_sources/{data_source_id}` applies a partial update. Fields
//! left out keep their stored value. `endpoints`, when present, replaces the
//! whole endpoint set before the convenience URLs are upserted.
//!
//! Changing the credentials or the Authenticate URL discards the cached token,
//! so the next partner call authenticates with the new settings.

use crate::error::ExchangeError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use common::requests::UpdateDataSourceRequest;

pub(crate) async fn process(
    data_source_id: web::Path<String>,
    state: web::Data<AppState>,
    payload: web::Json<UpdateDataSourceRequest>,
) -> Result<HttpResponse, ExchangeError> {
    let source = state
        .orchestrator
        .update(&data_source_id, payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(source))
}
