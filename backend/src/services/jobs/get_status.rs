use crate::error::ExchangeError;
use crate::job_controller::state::JobsState;
use actix_web::{web, HttpResponse};

pub(crate) async fn process(
    job_id: web::Path<String>,
    state: web::Data<JobsState>,
) -> Result<HttpResponse, ExchangeError> {
    get_job_status(&job_id, &state).await
}

async fn get_job_status(job_id: &str, state: &JobsState) -> Result<HttpResponse, ExchangeError> {
    match state.status(job_id).await {
        Some(status) => Ok(HttpResponse::Ok().json(status)),
        None => Err(ExchangeError::not_found(format!("job '{}'", job_id))),
    }
}
