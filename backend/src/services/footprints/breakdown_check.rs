use super::get::load;
use crate::error::ExchangeError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use common::model::breakdown::{check_breakdown, BreakdownIssue};
use common::model::footprint::FootprintId;
use serde::Serialize;

#[derive(Serialize)]
struct BreakdownReport {
    id: FootprintId,
    consistent: bool,
    issues: Vec<BreakdownIssue>,
}

/// `GET /api/footprints/{id}/breakdown_check`
pub(crate) async fn process(
    id: web::Path<FootprintId>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ExchangeError> {
    let footprint = load(&state, *id)?;
    let issues = check_breakdown(&footprint, state.breakdown_tolerance);
    Ok(HttpResponse::Ok().json(BreakdownReport {
        id: *id,
        consistent: issues.is_empty(),
        issues,
    }))
}
