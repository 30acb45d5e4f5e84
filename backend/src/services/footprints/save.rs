//! # Local Footprint Save Service
//!
//! `POST /api/footprints` creates a locally owned footprint and
//! `PUT /api/footprints/{id}` overwrites one.
//!
//! ## Rules:
//!
//! - Local identity is server-assigned: any `id`, `productFootprintId` or
//!   `dataSourceId` in the body is ignored.
//! - Records fetched from a partner cannot be overwritten; edit a duplicate
//!   instead (`POST /api/footprints/{id}/duplicate`).
//! - Structural problems (empty `dataId`, inverted validity period,
//!   identifiers not matching their scheme) reject the request with `400`.
//! - Breakdown inconsistencies are returned beside the saved record and
//!   logged, the save still goes through.

use crate::error::ExchangeError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use common::model::breakdown::{check_breakdown, BreakdownIssue};
use common::model::footprint::{Footprint, FootprintId};
use log::{info, warn};
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SavedFootprint {
    footprint: Footprint,
    breakdown_issues: Vec<BreakdownIssue>,
}

pub(crate) async fn create(
    state: web::Data<AppState>,
    payload: web::Json<Footprint>,
) -> Result<HttpResponse, ExchangeError> {
    let draft = as_local(payload.into_inner())?;
    let issues = breakdown_issues(&state, &draft);
    let saved = state.footprints.insert(draft)?;
    info!(
        "Created local footprint #{} ({} v{})",
        saved.id.unwrap_or_default(),
        saved.data_id,
        saved.version
    );
    Ok(HttpResponse::Created().json(SavedFootprint {
        footprint: saved,
        breakdown_issues: issues,
    }))
}

pub(crate) async fn update(
    id: web::Path<FootprintId>,
    state: web::Data<AppState>,
    payload: web::Json<Footprint>,
) -> Result<HttpResponse, ExchangeError> {
    let id = id.into_inner();
    let stored = state
        .footprints
        .get(id)?
        .ok_or_else(|| ExchangeError::not_found(format!("footprint {}", id)))?;
    if stored.is_external() {
        return Err(ExchangeError::validation(format!(
            "footprint {} was fetched from data source '{}' and is read-only; duplicate it to edit",
            id,
            stored.data_source_id.as_deref().unwrap_or("?")
        )));
    }

    let mut footprint = as_local(payload.into_inner())?;
    footprint.id = Some(id);
    let issues = breakdown_issues(&state, &footprint);
    state.footprints.update(&footprint)?;
    info!("Updated local footprint #{}", id);
    Ok(HttpResponse::Ok().json(SavedFootprint {
        footprint,
        breakdown_issues: issues,
    }))
}

fn as_local(mut footprint: Footprint) -> Result<Footprint, ExchangeError> {
    footprint.id = None;
    footprint.product_footprint_id = None;
    footprint.data_source_id = None;
    let problems = footprint.structural_problems();
    if !problems.is_empty() {
        return Err(ExchangeError::validation(problems.join("; ")));
    }
    Ok(footprint)
}

fn breakdown_issues(state: &AppState, footprint: &Footprint) -> Vec<BreakdownIssue> {
    let issues = check_breakdown(footprint, state.breakdown_tolerance);
    for issue in &issues {
        warn!("Local footprint {}: {}", footprint.data_id, issue);
    }
    issues
}
