use super::get::load;
use crate::error::ExchangeError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use common::model::footprint::FootprintId;
use log::info;

/// `POST /api/footprints/{id}/duplicate`: stores a deep copy of the record as
/// a new local draft and returns it. The source record is left as is.
pub(crate) async fn process(
    id: web::Path<FootprintId>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ExchangeError> {
    let original = load(&state, *id)?;
    let copy = state.footprints.insert(original.duplicate_for_edit())?;
    info!(
        "Duplicated footprint #{} into local draft #{}",
        id,
        copy.id.unwrap_or_default()
    );
    Ok(HttpResponse::Created().json(copy))
}
