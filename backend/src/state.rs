//! Wiring of the exchange components shared by the HTTP handlers.

use crate::exchange::fetcher::FootprintFetcher;
use crate::exchange::ingestor::{
    run_refetch_worker, EventIngestor, PendingRefetches, RefetchRequest,
};
use crate::exchange::orchestrator::Orchestrator;
use crate::exchange::token_manager::{TokenManager, TokenSettings};
use crate::http::HttpClient;
use crate::job_controller::state::JobsState;
use crate::store::{DataSourceStore, FootprintStore};
use common::model::quantity::Quantity;
use std::sync::Arc;
use tokio::sync::mpsc;

const REFETCH_QUEUE: usize = 256;

/// Shared as `web::Data<AppState>` next to `JobsState`.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub ingestor: Arc<EventIngestor>,
    pub footprints: Arc<dyn FootprintStore>,
    pub breakdown_tolerance: Quantity,
}

/// Receiving side of the event refetch queue, to be driven by
/// [`RefetchWorker::run`] once the job controller is up.
pub struct RefetchWorker {
    rx: mpsc::Receiver<RefetchRequest>,
    fetcher: FootprintFetcher,
    footprints: Arc<dyn FootprintStore>,
    pending: PendingRefetches,
    tolerance: Quantity,
}

impl RefetchWorker {
    pub async fn run(self, jobs: JobsState) {
        run_refetch_worker(
            self.rx,
            self.fetcher,
            self.footprints,
            self.pending,
            jobs,
            self.tolerance,
        )
        .await
    }
}

impl AppState {
    pub fn new<S>(
        store: Arc<S>,
        http: Arc<dyn HttpClient>,
        token_settings: TokenSettings,
        page_limit: u32,
        breakdown_tolerance: Quantity,
    ) -> (Self, RefetchWorker)
    where
        S: DataSourceStore + FootprintStore + 'static,
    {
        let sources: Arc<dyn DataSourceStore> = store.clone();
        let footprints: Arc<dyn FootprintStore> = store;

        let tokens = Arc::new(TokenManager::new(
            Arc::clone(&http),
            Arc::clone(&sources),
            token_settings,
        ));
        let fetcher = FootprintFetcher::new(http, Arc::clone(&sources), tokens.clone(), page_limit);
        let orchestrator = Orchestrator::new(
            Arc::clone(&sources),
            Arc::clone(&footprints),
            tokens,
            fetcher.clone(),
            breakdown_tolerance,
        );

        let (refetch_tx, rx) = mpsc::channel(REFETCH_QUEUE);
        let pending = PendingRefetches::default();
        let ingestor = EventIngestor::new(
            sources,
            Arc::clone(&footprints),
            refetch_tx,
            pending.clone(),
        );

        let state = AppState {
            orchestrator: Arc::new(orchestrator),
            ingestor: Arc::new(ingestor),
            footprints: Arc::clone(&footprints),
            breakdown_tolerance,
        };
        let worker = RefetchWorker {
            rx,
            fetcher,
            footprints,
            pending,
            tolerance: breakdown_tolerance,
        };
        (state, worker)
    }
}
