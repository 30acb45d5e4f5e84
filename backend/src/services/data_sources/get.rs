use crate::error::ExchangeError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};

pub(crate) async fn process(
    data_source_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ExchangeError> {
    let source = state.orchestrator.get(&data_source_id)?;
    Ok(HttpResponse::Ok().json(source))
}
