use crate::error::ExchangeError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};

/// `GET /api/data_sources`. Secrets are redacted by the `DataSource`
/// serializer.
pub(crate) async fn process(state: web::Data<AppState>) -> Result<HttpResponse, ExchangeError> {
    let sources = state.orchestrator.list()?;
    Ok(HttpResponse::Ok().json(sources))
}
