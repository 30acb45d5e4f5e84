//! # Sync Job Service
//!
//! Starts background jobs that pull footprints from partners into the store.
//!
//! ## Workflow:
//!
//! 1.  **HTTP Request**: `POST /api/data_sources/sync` (every source) or
//!     `POST /api/data_sources/{data_source_id}/sync` (one source).
//!
//! 2.  **Job Scheduling**: a job id is registered as `Pending` and returned at
//!     once with `202 Accepted`. The client polls `GET /api/jobs/{job_id}`.
//!
//! 3.  **Background Processing**: a spawned task runs the sync. For a full run
//!     each finished source bumps the job to `InProgress(n)`.
//!
//! 4.  **Result**: the job completes with a JSON object keyed by data source
//!     id, one `{"status": "synced", ...report}` or
//!     `{"status": "failed", "kind", "message"}` per source. A failing source
//!     never turns the whole job into `Failed`; only an error before any source
//!     was started does.

use crate::error::ExchangeError;
use crate::exchange::orchestrator::SourceOutcome;
use crate::job_controller::state::JobsState;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use common::jobs::JobStatus;
use common::requests::JobStarted;
use log::{error, info};
use std::collections::BTreeMap;

pub(crate) async fn process_all(
    state: web::Data<AppState>,
    jobs: web::Data<JobsState>,
) -> Result<HttpResponse, ExchangeError> {
    let job_id = jobs.register().await;
    let orchestrator = state.orchestrator.clone();
    let jobs = jobs.get_ref().clone();
    let task_job_id = job_id.clone();

    tokio::spawn(async move {
        let progress_jobs = jobs.clone();
        let progress_job_id = task_job_id.clone();
        let run = orchestrator
            .sync_all_reporting(move |done, _total| {
                progress_jobs.try_report(&progress_job_id, JobStatus::InProgress(done as u32));
            })
            .await;

        let status = match run {
            Ok(results) => {
                let outcomes: BTreeMap<String, SourceOutcome> = results
                    .into_iter()
                    .map(|(id, result)| (id, SourceOutcome::from(result)))
                    .collect();
                completed(&outcomes)
            }
            Err(e) => {
                error!("Sync job {} could not start: {}", task_job_id, e);
                JobStatus::Failed(e.to_string())
            }
        };
        jobs.report(&task_job_id, status).await;
    });

    info!("Scheduled sync of all data sources as job {}", job_id);
    Ok(HttpResponse::Accepted().json(JobStarted { job_id }))
}

pub(crate) async fn process_one(
    data_source_id: web::Path<String>,
    state: web::Data<AppState>,
    jobs: web::Data<JobsState>,
) -> Result<HttpResponse, ExchangeError> {
    let data_source_id = data_source_id.into_inner();
    // Unknown ids fail the request rather than the job.
    state.orchestrator.get(&data_source_id)?;

    let job_id = jobs.register().await;
    let orchestrator = state.orchestrator.clone();
    let jobs = jobs.get_ref().clone();
    let task_job_id = job_id.clone();

    tokio::spawn(async move {
        jobs.report(&task_job_id, JobStatus::InProgress(0)).await;
        let result = orchestrator.sync_one(&data_source_id).await;
        if let Err(e) = &result {
            error!("Sync of data source '{}' failed: {}", data_source_id, e);
        }
        let outcome = BTreeMap::from([(data_source_id, SourceOutcome::from(result))]);
        jobs.report(&task_job_id, completed(&outcome)).await;
    });

    info!("Scheduled single-source sync as job {}", job_id);
    Ok(HttpResponse::Accepted().json(JobStarted { job_id }))
}

fn completed(outcomes: &BTreeMap<String, SourceOutcome>) -> JobStatus {
    match serde_json::to_string(outcomes) {
        Ok(json) => JobStatus::Completed(json),
        Err(e) => JobStatus::Failed(format!("could not encode sync result: {}", e)),
    }
}
