use crate::error::ExchangeError;
use crate::exchange::ingestor::IngestOutcome;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use common::model::event::InboundEvent;
use log::debug;

/// `202 Accepted` when a refetch was queued, `200 OK` when the store already
/// holds the announced version.
pub(crate) async fn process(
    data_source_id: web::Path<String>,
    state: web::Data<AppState>,
    payload: web::Json<InboundEvent>,
) -> Result<HttpResponse, ExchangeError> {
    let event = payload.into_inner();
    debug!(
        "Event '{}' of type '{}' from data source '{}'",
        event.id, event.event_type, data_source_id
    );
    let outcome = state.ingestor.ingest(&data_source_id, &event).await?;
    let response = match outcome {
        IngestOutcome::RefetchScheduled { .. } => HttpResponse::Accepted().json(outcome),
        IngestOutcome::UpToDate { .. } => HttpResponse::Ok().json(outcome),
    };
    Ok(response)
}
