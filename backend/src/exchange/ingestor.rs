//! Inbound UpdateEvent handling.
//!
//! An event only says "record `dataId` is now at `version`". It is compared
//! with what is stored; when the partner is ahead, a refetch is queued and
//! the full record is pulled through GetFootprints later. Event payloads are
//! never written to the store.

use crate::error::{ExchangeError, Result};
use crate::exchange::fetcher::FootprintFetcher;
use crate::exchange::reconcile::reconcile;
use crate::job_controller::state::JobsState;
use crate::store::{DataSourceStore, FootprintStore};
use common::jobs::JobStatus;
use common::model::datasource::DataSourceId;
use common::model::event::InboundEvent;
use common::model::quantity::Quantity;
use log::{error, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefetchRequest {
    pub data_source_id: DataSourceId,
    pub data_id: String,
    pub version: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum IngestOutcome {
    /// The partner is ahead of the store (or the record is unknown locally).
    #[serde(rename_all = "camelCase")]
    RefetchScheduled { local_version: Option<u32> },
    /// The stored version already covers the event.
    #[serde(rename_all = "camelCase")]
    UpToDate { local_version: u32 },
}

/// Refetches queued or running, keyed by record, holding the highest
/// announced version. Shared between the ingestor and the refetch worker.
#[derive(Clone, Default)]
pub struct PendingRefetches {
    entries: Arc<Mutex<HashMap<(DataSourceId, String), u32>>>,
}

impl PendingRefetches {
    /// Returns false when a refetch covering `request.version` is already
    /// pending for the same record.
    async fn claim(&self, request: &RefetchRequest) -> bool {
        let mut entries = self.entries.lock().await;
        let key = (request.data_source_id.clone(), request.data_id.clone());
        match entries.get(&key) {
            Some(pending) if *pending >= request.version => false,
            _ => {
                entries.insert(key, request.version);
                true
            }
        }
    }

    /// Drops the entry unless a newer version was claimed meanwhile.
    async fn release(&self, request: &RefetchRequest) {
        let mut entries = self.entries.lock().await;
        let key = (request.data_source_id.clone(), request.data_id.clone());
        if entries.get(&key).is_some_and(|pending| *pending <= request.version) {
            entries.remove(&key);
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

pub struct EventIngestor {
    sources: Arc<dyn DataSourceStore>,
    footprints: Arc<dyn FootprintStore>,
    refetch_tx: mpsc::Sender<RefetchRequest>,
    pending: PendingRefetches,
}

impl EventIngestor {
    pub fn new(
        sources: Arc<dyn DataSourceStore>,
        footprints: Arc<dyn FootprintStore>,
        refetch_tx: mpsc::Sender<RefetchRequest>,
        pending: PendingRefetches,
    ) -> Self {
        Self {
            sources,
            footprints,
            refetch_tx,
            pending,
        }
    }

    pub async fn ingest(&self, data_source_id: &str, event: &InboundEvent) -> Result<IngestOutcome> {
        let (data_id, version) = event.footprint_ref().ok_or_else(|| {
            ExchangeError::validation("event must reference a footprint by dataId and version")
        })?;
        if self.sources.get(data_source_id)?.is_none() {
            return Err(ExchangeError::not_found(format!("data source '{}'", data_source_id)));
        }

        let local_version = self
            .footprints
            .find_by_data_id(data_source_id, data_id)?
            .map(|fp| fp.version);
        if let Some(local) = local_version {
            if local >= version {
                info!(
                    "Event for {}/{} v{} ignored, v{} already stored",
                    data_source_id, data_id, version, local
                );
                return Ok(IngestOutcome::UpToDate {
                    local_version: local,
                });
            }
        }

        let request = RefetchRequest {
            data_source_id: data_source_id.to_string(),
            data_id: data_id.to_string(),
            version,
        };
        if !self.pending.claim(&request).await {
            info!(
                "Event for {}/{} v{} already has a refetch pending",
                data_source_id, data_id, version
            );
            return Ok(IngestOutcome::RefetchScheduled { local_version });
        }
        if let Err(mpsc::error::SendError(request)) = self.refetch_tx.send(request).await {
            self.pending.release(&request).await;
            return Err(ExchangeError::internal("refetch worker is not running"));
        }
        info!(
            "Event for {}/{} v{} queued a refetch (stored: {:?})",
            data_source_id, data_id, version, local_version
        );
        Ok(IngestOutcome::RefetchScheduled { local_version })
    }
}

/// Consumes refetch requests until the channel closes. Each request runs as
/// its own tracked job so a slow partner does not hold up the queue.
pub async fn run_refetch_worker(
    mut rx: mpsc::Receiver<RefetchRequest>,
    fetcher: FootprintFetcher,
    footprints: Arc<dyn FootprintStore>,
    pending: PendingRefetches,
    jobs: JobsState,
    tolerance: Quantity,
) {
    while let Some(request) = rx.recv().await {
        let job_id = jobs.register().await;
        let fetcher = fetcher.clone();
        let footprints = Arc::clone(&footprints);
        let pending = pending.clone();
        let jobs = jobs.clone();
        tokio::spawn(async move {
            let result = refetch(&fetcher, footprints.as_ref(), &request, tolerance).await;
            pending.release(&request).await;
            let status = match result {
                Ok(summary) => JobStatus::Completed(summary),
                Err(e) => {
                    error!(
                        "Refetch of {}/{} failed: {}",
                        request.data_source_id, request.data_id, e
                    );
                    JobStatus::Failed(e.to_string())
                }
            };
            jobs.report(&job_id, status).await;
        });
    }
}

async fn refetch(
    fetcher: &FootprintFetcher,
    footprints: &dyn FootprintStore,
    request: &RefetchRequest,
    tolerance: Quantity,
) -> Result<String> {
    let footprint = fetcher
        .fetch_one(&request.data_source_id, &request.data_id)
        .await?;
    if footprint.version < request.version {
        warn!(
            "Data source '{}' announced {} v{} but served v{}",
            request.data_source_id, request.data_id, request.version, footprint.version
        );
    }
    let reconciled = reconcile(footprints, footprint, tolerance)?;
    Ok(serde_json::json!({
        "dataSourceId": request.data_source_id,
        "dataId": request.data_id,
        "result": reconciled.outcome,
        "breakdownIssues": reconciled.issues,
    })
    .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::fetcher::tests::{fetcher_for, partner, partner_record, FOOTPRINTS_URL};
    use crate::http::HttpResponse;
    use crate::job_controller::state::tests::{running_jobs, wait_finished};
    use crate::store::tests::{data_source, footprint};
    use crate::store::{MemoryStore, PutOutcome};
    use common::model::event::EventData;
    use serde_json::json;

    fn ingestor() -> (EventIngestor, Arc<MemoryStore>, mpsc::Receiver<RefetchRequest>) {
        let store = Arc::new(MemoryStore::new());
        store.put(&data_source("ds-1")).unwrap();
        let (tx, rx) = mpsc::channel(8);
        let ingestor =
            EventIngestor::new(store.clone(), store.clone(), tx, PendingRefetches::default());
        (ingestor, store, rx)
    }

    #[tokio::test]
    async fn unknown_record_schedules_a_refetch() {
        let (ingestor, _, mut rx) = ingestor();
        let outcome = ingestor.ingest("ds-1", &InboundEvent::new("coil", 1)).await.unwrap();
        assert_eq!(outcome, IngestOutcome::RefetchScheduled { local_version: None });
        assert_eq!(
            rx.try_recv().unwrap(),
            RefetchRequest {
                data_source_id: "ds-1".into(),
                data_id: "coil".into(),
                version: 1
            }
        );
    }

    #[tokio::test]
    async fn newer_event_schedules_exactly_one_refetch() {
        let (ingestor, store, mut rx) = ingestor();
        store.put_if_newer(footprint("coil", 2)).unwrap();

        let outcome = ingestor.ingest("ds-1", &InboundEvent::new("coil", 3)).await.unwrap();
        assert_eq!(outcome, IngestOutcome::RefetchScheduled { local_version: Some(2) });
        assert_eq!(rx.try_recv().unwrap().version, 3);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn redelivered_event_is_queued_once_while_pending() {
        let (ingestor, store, mut rx) = ingestor();
        store.put_if_newer(footprint("coil", 2)).unwrap();

        for _ in 0..2 {
            let outcome = ingestor.ingest("ds-1", &InboundEvent::new("coil", 3)).await.unwrap();
            assert_eq!(outcome, IngestOutcome::RefetchScheduled { local_version: Some(2) });
        }
        assert_eq!(rx.try_recv().unwrap().version, 3);
        assert!(rx.try_recv().is_err());

        ingestor.ingest("ds-1", &InboundEvent::new("coil", 4)).await.unwrap();
        assert_eq!(rx.try_recv().unwrap().version, 4);
        assert_eq!(ingestor.pending.len().await, 1);
    }

    #[tokio::test]
    async fn stopped_worker_is_an_internal_error() {
        let (ingestor, _, rx) = ingestor();
        drop(rx);
        let result = ingestor.ingest("ds-1", &InboundEvent::new("coil", 1)).await;
        assert!(matches!(result, Err(ExchangeError::Internal(_))));
        assert_eq!(ingestor.pending.len().await, 0);
    }

    #[tokio::test]
    async fn equal_or_older_events_are_no_ops() {
        let (ingestor, store, mut rx) = ingestor();
        store.put_if_newer(footprint("coil", 2)).unwrap();
        let before = store.find_by_data_id("ds-1", "coil").unwrap();

        for version in [2, 2, 1] {
            let outcome = ingestor
                .ingest("ds-1", &InboundEvent::new("coil", version))
                .await
                .unwrap();
            assert_eq!(outcome, IngestOutcome::UpToDate { local_version: 2 });
        }
        assert!(rx.try_recv().is_err());
        assert_eq!(store.find_by_data_id("ds-1", "coil").unwrap(), before);
    }

    #[tokio::test]
    async fn events_without_a_reference_are_rejected() {
        let (ingestor, _, mut rx) = ingestor();
        let mut event = InboundEvent::new("", 1);
        assert!(matches!(
            ingestor.ingest("ds-1", &event).await,
            Err(ExchangeError::Validation(_))
        ));

        event.data = EventData {
            data_id: Some("coil".into()),
            version: None,
        };
        assert!(matches!(
            ingestor.ingest("ds-1", &event).await,
            Err(ExchangeError::Validation(_))
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unknown_source_is_not_found() {
        let (ingestor, _, _rx) = ingestor();
        assert!(matches!(
            ingestor.ingest("ds-404", &InboundEvent::new("coil", 1)).await,
            Err(ExchangeError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn worker_pulls_the_record_and_stores_it() {
        let client = partner();
        client.on(&format!("{FOOTPRINTS_URL}/coil"), |_| {
            Ok(HttpResponse::new(200, json!({ "data": partner_record("coil", 5) }).to_string()))
        });
        let (fetcher, _) = fetcher_for(client);
        let store = Arc::new(MemoryStore::new());
        store.put_if_newer(footprint("coil", 4)).unwrap();
        let jobs = running_jobs();

        let (tx, rx) = mpsc::channel(8);
        let pending = PendingRefetches::default();
        tokio::spawn(run_refetch_worker(
            rx,
            fetcher,
            store.clone(),
            pending.clone(),
            jobs.clone(),
            Quantity::ZERO,
        ));
        let request = RefetchRequest {
            data_source_id: "ds-1".into(),
            data_id: "coil".into(),
            version: 5,
        };
        assert!(pending.claim(&request).await);
        tx.send(request).await.unwrap();

        let job_id = loop {
            if let Some(id) = jobs.jobs.read().await.keys().next().cloned() {
                break id;
            }
            tokio::task::yield_now().await;
        };
        let JobStatus::Completed(summary) = wait_finished(&jobs, &job_id).await else {
            panic!("refetch job failed");
        };
        let summary: serde_json::Value = serde_json::from_str(&summary).unwrap();
        assert_eq!(summary["result"]["outcome"], "replaced");
        assert_eq!(pending.len().await, 0);

        let stored = store.find_by_data_id("ds-1", "coil").unwrap().unwrap();
        assert_eq!(stored.version, 5);
        assert_eq!(
            store.put_if_newer(footprint("coil", 4)).unwrap(),
            PutOutcome::Stale {
                id: stored.id.unwrap(),
                stored_version: 5
            }
        );
    }
}
