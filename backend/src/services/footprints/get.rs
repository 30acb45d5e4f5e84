use crate::error::ExchangeError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use common::model::footprint::{Footprint, FootprintId};

pub(crate) async fn process(
    id: web::Path<FootprintId>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ExchangeError> {
    let footprint = load(&state, *id)?;
    Ok(HttpResponse::Ok().json(footprint))
}

pub(super) fn load(state: &AppState, id: FootprintId) -> Result<Footprint, ExchangeError> {
    state
        .footprints
        .get(id)?
        .ok_or_else(|| ExchangeError::not_found(format!("footprint {}", id)))
}
