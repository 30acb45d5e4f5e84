//! Tracks background jobs: sync runs started from the API and refetches
//! triggered by partner events.
//!
//! - `JobsState`: clonable handle shared as `web::Data`. Holds the job map and
//!   the sender side of the update channel.
//! - `JobUpdate`: a status change sent by a running job.
//! - `start_job_updater`: the single task that applies updates to the map.
//!
//! Jobs never write the map directly; they report through the channel so the
//! map has exactly one writer after registration.

use common::jobs::JobStatus;
use log::{debug, warn};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

#[derive(Clone)]
pub struct JobsState {
    /// Job id to current status. Read by `GET /api/jobs/{job_id}`.
    pub jobs: Arc<RwLock<HashMap<String, JobStatus>>>,

    pub tx: mpsc::Sender<JobUpdate>,
}

#[derive(Debug)]
pub struct JobUpdate {
    pub(crate) job_id: String,
    pub(crate) status: JobStatus,
}

impl JobsState {
    /// Creates the state and the receiver `start_job_updater` consumes.
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<JobUpdate>) {
        let (tx, rx) = mpsc::channel(buffer);
        let state = JobsState {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            tx,
        };
        (state, rx)
    }

    /// Registers a new job as `Pending` and returns its id.
    pub async fn register(&self) -> String {
        let job_id = Uuid::new_v4().to_string();
        self.jobs
            .write()
            .await
            .insert(job_id.clone(), JobStatus::Pending);
        job_id
    }

    pub async fn report(&self, job_id: &str, status: JobStatus) {
        let update = JobUpdate {
            job_id: job_id.to_string(),
            status,
        };
        if self.tx.send(update).await.is_err() {
            warn!("Job updater is gone, dropping update for job {}", job_id);
        }
    }

    /// Non-blocking variant for progress reports from synchronous callbacks.
    /// Dropped when the channel is full; a later report supersedes it anyway.
    pub fn try_report(&self, job_id: &str, status: JobStatus) {
        let update = JobUpdate {
            job_id: job_id.to_string(),
            status,
        };
        if let Err(e) = self.tx.try_send(update) {
            debug!("Skipped progress update for job {}: {}", job_id, e);
        }
    }

    pub async fn status(&self, job_id: &str) -> Option<JobStatus> {
        self.jobs.read().await.get(job_id).cloned()
    }
}

/// Applies job updates until every sender is dropped. Spawned once from
/// `main.rs`.
pub async fn start_job_updater(state: JobsState, mut rx: mpsc::Receiver<JobUpdate>) {
    while let Some(update) = rx.recv().await {
        debug!("Job {} is now {:?}", update.job_id, update.status);
        let mut jobs = state.jobs.write().await;
        jobs.insert(update.job_id, update.status);
    }
}
