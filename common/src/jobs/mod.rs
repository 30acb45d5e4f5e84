use serde::{Deserialize, Serialize};

/// Lifecycle of a background job (a data source sync run or an
/// event-triggered refetch), as reported by `GET /api/jobs/{job_id}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    /// Number of data sources finished so far.
    InProgress(u32),
    /// JSON-encoded result of the job.
    Completed(String),
    Failed(String),
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Completed(_) | JobStatus::Failed(_))
    }
}
