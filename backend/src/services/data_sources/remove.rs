use crate::error::ExchangeError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};

/// `DELETE /api/data_sources/{data_source_id}`. Footprints fetched from the
/// source are kept.
pub(crate) async fn process(
    data_source_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ExchangeError> {
    state.orchestrator.remove(&data_source_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
