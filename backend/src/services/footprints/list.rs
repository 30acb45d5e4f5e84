use crate::error::ExchangeError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use common::requests::FootprintListQuery;

/// `GET /api/footprints[?dataSourceId=...]`
pub(crate) async fn process(
    state: web::Data<AppState>,
    query: web::Query<FootprintListQuery>,
) -> Result<HttpResponse, ExchangeError> {
    let footprints = state.footprints.list(query.data_source_id.as_deref())?;
    Ok(HttpResponse::Ok().json(footprints))
}
