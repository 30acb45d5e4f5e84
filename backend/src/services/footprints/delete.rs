use crate::error::ExchangeError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use common::model::footprint::FootprintId;
use log::info;

pub(crate) async fn process(
    id: web::Path<FootprintId>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ExchangeError> {
    let id = id.into_inner();
    if !state.footprints.delete(id)? {
        return Err(ExchangeError::not_found(format!("footprint {}", id)));
    }
    info!("Deleted footprint #{}", id);
    Ok(HttpResponse::NoContent().finish())
}
