mod config;
mod error;
mod exchange;
mod http;
mod job_controller;
mod services;
mod state;
mod store;

use crate::config::ServerConfig;
use crate::http::ReqwestClient;
use crate::job_controller::state::JobsState;
use crate::state::AppState;
use crate::store::SqliteStore;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use env_logger::Env;
use log::{error, info};
use std::io;
use std::sync::Arc;

fn io_error(message: impl Into<String>) -> io::Error {
    io::Error::other(message.into())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = ServerConfig::parse();
    env_logger::init_from_env(Env::default().default_filter_or(config.log_level.as_str()));
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(io_error(e));
    }

    let store = Arc::new(
        SqliteStore::open(&config.database_path).map_err(|e| io_error(e.to_string()))?,
    );
    let client = ReqwestClient::new(config.connect_timeout(), config.request_timeout())
        .map_err(|e| io_error(e.to_string()))?;
    let (app_state, refetch_worker) = AppState::new(
        store,
        Arc::new(client),
        config.token_settings(),
        config.page_limit,
        config.breakdown_tolerance,
    );

    // Job controller: one updater task owns writes to the job map.
    let (jobs_state, rx) = JobsState::new(100);
    let updater_state = jobs_state.clone();
    tokio::spawn(async move {
        job_controller::state::start_job_updater(updater_state, rx).await;
    });
    tokio::spawn(refetch_worker.run(jobs_state.clone()));

    let body_limit = config.body_limit;
    info!("Server running at {}", config.listen_url());

    HttpServer::new(move || {
        App::new()
            .app_data(web::JsonConfig::default().limit(body_limit))
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::Data::new(jobs_state.clone()))
            .configure(services::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
