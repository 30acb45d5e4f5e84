//! Data source lifecycle and sync runs.
//!
//! Syncing walks every registered source concurrently. Each source runs
//! authenticate-then-pages strictly in sequence and ends in its own slot of
//! the result map, so one partner failing never touches another's result.

use crate::error::{ExchangeError, Result};
use crate::exchange::fetcher::{FetchedItem, FootprintFetcher, FootprintFilter, RejectedItem};
use crate::exchange::reconcile::reconcile;
use crate::exchange::token_manager::TokenManager;
use crate::store::{DataSourceStore, FootprintStore, PutOutcome};
use common::model::breakdown::BreakdownIssue;
use common::model::datasource::{ActionKind, DataSource, DataSourceId};
use common::model::quantity::Quantity;
use common::requests::{RegisterDataSourceRequest, UpdateDataSourceRequest};
use futures_util::stream::{FuturesUnordered, StreamExt};
use log::{error, info};
use reqwest::Url;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Per-source summary of one sync run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Records received, accepted or not.
    pub fetched: usize,
    pub stored: usize,
    /// Records older than what was already stored.
    pub stale: usize,
    pub rejected: Vec<RejectedItem>,
    /// Breakdown issues by `dataId`. Affected records were stored anyway.
    pub breakdown_issues: BTreeMap<String, Vec<BreakdownIssue>>,
}

/// JSON form of one source's slot in a sync result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SourceOutcome {
    Synced(SyncReport),
    Failed { kind: String, message: String },
}

impl From<Result<SyncReport>> for SourceOutcome {
    fn from(result: Result<SyncReport>) -> Self {
        match result {
            Ok(report) => SourceOutcome::Synced(report),
            Err(e) => SourceOutcome::Failed {
                kind: e.kind().to_string(),
                message: e.to_string(),
            },
        }
    }
}

pub struct Orchestrator {
    sources: Arc<dyn DataSourceStore>,
    footprints: Arc<dyn FootprintStore>,
    tokens: Arc<TokenManager>,
    fetcher: FootprintFetcher,
    tolerance: Quantity,
}

impl Orchestrator {
    pub fn new(
        sources: Arc<dyn DataSourceStore>,
        footprints: Arc<dyn FootprintStore>,
        tokens: Arc<TokenManager>,
        fetcher: FootprintFetcher,
        tolerance: Quantity,
    ) -> Self {
        Self {
            sources,
            footprints,
            tokens,
            fetcher,
            tolerance,
        }
    }

    pub fn list(&self) -> Result<Vec<DataSource>> {
        self.sources.list()
    }

    pub fn get(&self, id: &str) -> Result<DataSource> {
        self.sources
            .get(id)?
            .ok_or_else(|| ExchangeError::not_found(format!("data source '{}'", id)))
    }

    pub fn register(&self, request: RegisterDataSourceRequest) -> Result<DataSource> {
        let id = match request.data_source_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        if self.sources.get(&id)?.is_some() {
            return Err(ExchangeError::validation(format!(
                "data source '{}' is already registered",
                id
            )));
        }

        let mut source = DataSource {
            data_source_id: id,
            data_source_name: request.data_source_name,
            source_type: request.source_type,
            credentials: request.credentials,
            endpoints: Vec::new(),
        };
        source
            .replace_endpoints(request.endpoints)
            .map_err(ExchangeError::validation)?;
        source.apply_urls(&request.urls);
        check_source(&source)?;

        self.sources.put(&source)?;
        info!(
            "Registered data source '{}' ({}) with {} endpoint(s)",
            source.data_source_id,
            source.data_source_name,
            source.endpoints.len()
        );
        Ok(source)
    }

    /// Applies a partial update. A change of credentials or of the
    /// Authenticate endpoint drops the cached token.
    pub async fn update(&self, id: &str, request: UpdateDataSourceRequest) -> Result<DataSource> {
        let mut source = self.get(id)?;
        let previous_credentials = source.credentials.clone();
        let previous_auth_url = source.endpoint(ActionKind::Authenticate).map(str::to_string);

        if let Some(name) = request.data_source_name {
            source.data_source_name = name;
        }
        if let Some(credentials) = request.credentials {
            source.credentials = credentials;
        }
        if let Some(endpoints) = request.endpoints {
            source
                .replace_endpoints(endpoints)
                .map_err(ExchangeError::validation)?;
        }
        source.apply_urls(&request.urls);
        check_source(&source)?;

        self.sources.put(&source)?;
        let auth_changed = source.credentials != previous_credentials
            || source.endpoint(ActionKind::Authenticate) != previous_auth_url.as_deref();
        if auth_changed {
            self.tokens.invalidate(id).await;
        }
        info!(
            "Updated data source '{}'{}",
            id,
            if auth_changed { ", authentication changed" } else { "" }
        );
        Ok(source)
    }

    /// Drops the cached token, then the record. Footprints fetched from the
    /// source stay in the store.
    pub async fn remove(&self, id: &str) -> Result<()> {
        if self.sources.get(id)?.is_none() {
            return Err(ExchangeError::not_found(format!("data source '{}'", id)));
        }
        self.tokens.invalidate(id).await;
        self.sources.delete(id)?;
        info!("Removed data source '{}'", id);
        Ok(())
    }

    /// Pulls every footprint of one source into the store.
    pub async fn sync_one(&self, id: &str) -> Result<SyncReport> {
        let mut items = self.fetcher.fetch_all(id, FootprintFilter::default());
        let mut report = SyncReport::default();

        while let Some(item) = items.next().await {
            report.fetched += 1;
            match item? {
                FetchedItem::Footprint(footprint) => {
                    let data_id = footprint.data_id.clone();
                    let reconciled = reconcile(self.footprints.as_ref(), *footprint, self.tolerance)?;
                    match reconciled.outcome {
                        PutOutcome::Stale { .. } => report.stale += 1,
                        PutOutcome::Inserted { .. } | PutOutcome::Replaced { .. } => report.stored += 1,
                    }
                    if !reconciled.issues.is_empty() {
                        report.breakdown_issues.insert(data_id, reconciled.issues);
                    }
                }
                FetchedItem::Rejected(rejected) => report.rejected.push(rejected),
            }
        }

        info!(
            "Synced data source '{}': {} fetched, {} stored, {} stale, {} rejected",
            id,
            report.fetched,
            report.stored,
            report.stale,
            report.rejected.len()
        );
        Ok(report)
    }

    pub async fn sync_all(&self) -> Result<BTreeMap<DataSourceId, Result<SyncReport>>> {
        self.sync_all_reporting(|_, _| {}).await
    }

    /// Like [`Orchestrator::sync_all`], calling `progress(done, total)` each
    /// time a source finishes.
    pub async fn sync_all_reporting<F>(
        &self,
        mut progress: F,
    ) -> Result<BTreeMap<DataSourceId, Result<SyncReport>>>
    where
        F: FnMut(usize, usize),
    {
        let ids: Vec<DataSourceId> = self
            .sources
            .list()?
            .into_iter()
            .map(|source| source.data_source_id)
            .collect();
        let total = ids.len();
        info!("Starting sync of {} data source(s)", total);

        let mut running: FuturesUnordered<_> = ids
            .into_iter()
            .map(|id| async move {
                let result = self.sync_one(&id).await;
                (id, result)
            })
            .collect();

        let mut results = BTreeMap::new();
        while let Some((id, result)) = running.next().await {
            if let Err(e) = &result {
                error!("Sync of data source '{}' failed: {}", id, e);
            }
            results.insert(id, result);
            progress(results.len(), total);
        }
        Ok(results)
    }
}

fn check_source(source: &DataSource) -> Result<()> {
    if source.data_source_name.trim().is_empty() {
        return Err(ExchangeError::validation("dataSourceName must not be empty"));
    }
    if source.credentials.username.trim().is_empty() {
        return Err(ExchangeError::validation("credentials.username must not be empty"));
    }
    for endpoint in &source.endpoints {
        let url = Url::parse(&endpoint.url).map_err(|e| {
            ExchangeError::validation(format!(
                "{} endpoint URL '{}' is invalid: {}",
                endpoint.action, endpoint.url, e
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ExchangeError::validation(format!(
                "{} endpoint URL '{}' must use http or https",
                endpoint.action, endpoint.url
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::fetcher::tests::{page, partner_record};
    use crate::exchange::token_manager::TokenSettings;
    use crate::http::fake::ScriptedClient;
    use crate::http::HttpResponse;
    use crate::store::MemoryStore;
    use common::model::datasource::{Credentials, DataSourceType, Endpoint, EndpointUrls, Secret};
    use serde_json::{json, Value};
    use std::sync::Mutex;

    struct Harness {
        orchestrator: Orchestrator,
        client: Arc<ScriptedClient>,
        store: Arc<MemoryStore>,
        tokens: Arc<TokenManager>,
    }

    fn harness() -> Harness {
        let client = Arc::new(ScriptedClient::new());
        let store = Arc::new(MemoryStore::new());
        let tokens = Arc::new(TokenManager::new(
            client.clone(),
            store.clone(),
            TokenSettings::default(),
        ));
        let fetcher = FootprintFetcher::new(client.clone(), store.clone(), tokens.clone(), 50);
        let orchestrator = Orchestrator::new(
            store.clone(),
            store.clone(),
            tokens.clone(),
            fetcher,
            Quantity::ZERO,
        );
        Harness {
            orchestrator,
            client,
            store,
            tokens,
        }
    }

    fn auth_url(id: &str) -> String {
        format!("https://{id}.example/auth/token")
    }

    fn footprints_url(id: &str) -> String {
        format!("https://{id}.example/2/footprints")
    }

    fn registration(id: &str) -> RegisterDataSourceRequest {
        RegisterDataSourceRequest {
            data_source_id: Some(id.to_string()),
            data_source_name: format!("Partner {id}"),
            source_type: DataSourceType::Pathfinder,
            credentials: Credentials {
                username: "client".into(),
                secret: Secret::new("s3cret"),
            },
            endpoints: Vec::new(),
            urls: EndpointUrls {
                authenticate_url: Some(auth_url(id)),
                footprints_url: Some(footprints_url(id)),
                events_url: None,
            },
        }
    }

    fn script_partner(client: &ScriptedClient, id: &str, accepts: bool, records: Vec<Value>) {
        client.on(&auth_url(id), move |_| {
            Ok(if accepts {
                HttpResponse::new(200, r#"{"access_token":"t","expires_in":600}"#)
            } else {
                HttpResponse::new(401, "invalid_client")
            })
        });
        let body = page(records);
        client.on(&footprints_url(id), move |_| Ok(HttpResponse::new(200, body.clone())));
    }

    #[tokio::test]
    async fn one_failing_source_leaves_the_others_intact() {
        let h = harness();
        for id in ["ds-a", "ds-b", "ds-c"] {
            h.orchestrator.register(registration(id)).unwrap();
        }
        script_partner(&h.client, "ds-a", true, vec![partner_record("a1", 1), partner_record("a2", 1)]);
        script_partner(&h.client, "ds-b", false, vec![partner_record("b1", 1)]);
        script_partner(&h.client, "ds-c", true, vec![partner_record("c1", 1)]);

        let calls = Mutex::new(Vec::new());
        let results = h
            .orchestrator
            .sync_all_reporting(|done, total| calls.lock().unwrap().push((done, total)))
            .await
            .unwrap();

        assert_eq!(results.keys().collect::<Vec<_>>(), ["ds-a", "ds-b", "ds-c"]);
        assert_eq!(results["ds-a"].as_ref().unwrap().stored, 2);
        assert!(matches!(
            &results["ds-b"],
            Err(ExchangeError::Auth { data_source_id, .. }) if data_source_id == "ds-b"
        ));
        assert_eq!(results["ds-c"].as_ref().unwrap().stored, 1);
        assert_eq!(*calls.lock().unwrap(), [(1, 3), (2, 3), (3, 3)]);

        assert_eq!(FootprintStore::list(h.store.as_ref(), Some("ds-a")).unwrap().len(), 2);
        assert!(FootprintStore::list(h.store.as_ref(), Some("ds-b")).unwrap().is_empty());
    }

    #[tokio::test]
    async fn sync_counts_stale_rejected_and_breakdown_issues() {
        let h = harness();
        h.orchestrator.register(registration("ds-a")).unwrap();
        h.store.put_if_newer({
            let mut newer = crate::store::tests::footprint("old", 9);
            newer.data_source_id = Some("ds-a".into());
            newer
        })
        .unwrap();

        let mut unbalanced = partner_record("unbalanced", 1);
        unbalanced["breakdown"] = json!([{ "pcfExcludingBiogenic": "1" }]);
        let mut broken = partner_record("broken", 1);
        broken["version"] = json!("one");
        script_partner(
            &h.client,
            "ds-a",
            true,
            vec![partner_record("old", 3), unbalanced, broken, partner_record("fresh", 1)],
        );

        let report = h.orchestrator.sync_one("ds-a").await.unwrap();
        assert_eq!(report.fetched, 4);
        assert_eq!(report.stored, 2);
        assert_eq!(report.stale, 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].data_id.as_deref(), Some("broken"));
        assert_eq!(report.breakdown_issues["unbalanced"].len(), 1);
        assert_eq!(
            h.store.find_by_data_id("ds-a", "old").unwrap().unwrap().version,
            9
        );

        let outcome = SourceOutcome::from(Ok(report));
        assert_eq!(serde_json::to_value(&outcome).unwrap()["status"], "synced");
    }

    #[tokio::test]
    async fn registration_maps_urls_and_validates() {
        let h = harness();
        let mut request = registration("ds-a");
        request.endpoints = vec![Endpoint {
            action: ActionKind::UpdateEvent,
            url: "https://ds-a.example/2/events".into(),
        }];
        let source = h.orchestrator.register(request).unwrap();
        assert_eq!(source.endpoints.len(), 3);
        assert_eq!(
            source.endpoint(ActionKind::GetFootprints),
            Some(footprints_url("ds-a").as_str())
        );

        assert!(matches!(
            h.orchestrator.register(registration("ds-a")),
            Err(ExchangeError::Validation(_))
        ));

        let mut generated = registration("ignored");
        generated.data_source_id = None;
        let source = h.orchestrator.register(generated).unwrap();
        assert!(Uuid::parse_str(&source.data_source_id).is_ok());

        let mut bad_url = registration("ds-bad");
        bad_url.urls.footprints_url = Some("ftp://ds-bad.example/fp".into());
        assert!(matches!(
            h.orchestrator.register(bad_url),
            Err(ExchangeError::Validation(_))
        ));
        assert!(DataSourceStore::get(h.store.as_ref(), "ds-bad").unwrap().is_none());
    }

    #[tokio::test]
    async fn update_invalidates_token_only_when_authentication_changes() {
        let h = harness();
        h.orchestrator.register(registration("ds-a")).unwrap();
        script_partner(&h.client, "ds-a", true, vec![]);
        h.tokens.get_token("ds-a").await.unwrap();

        let rename = UpdateDataSourceRequest {
            data_source_name: Some("Renamed".into()),
            ..Default::default()
        };
        let updated = h.orchestrator.update("ds-a", rename).await.unwrap();
        assert_eq!(updated.data_source_name, "Renamed");
        assert_eq!(updated.endpoints.len(), 2);
        assert_eq!(h.tokens.cached_count().await, 1);

        let rotate = UpdateDataSourceRequest {
            credentials: Some(Credentials {
                username: "client".into(),
                secret: Secret::new("rotated"),
            }),
            ..Default::default()
        };
        h.orchestrator.update("ds-a", rotate).await.unwrap();
        assert_eq!(h.tokens.cached_count().await, 0);
        assert_eq!(
            DataSourceStore::get(h.store.as_ref(), "ds-a").unwrap().unwrap().credentials.secret.expose(),
            "rotated"
        );

        h.tokens.get_token("ds-a").await.unwrap();
        let move_auth = UpdateDataSourceRequest {
            urls: EndpointUrls {
                authenticate_url: Some("https://ds-a.example/v2/token".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        h.orchestrator.update("ds-a", move_auth).await.unwrap();
        assert_eq!(h.tokens.cached_count().await, 0);

        assert!(matches!(
            h.orchestrator.update("missing", UpdateDataSourceRequest::default()).await,
            Err(ExchangeError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn remove_drops_token_and_record_but_keeps_footprints() {
        let h = harness();
        h.orchestrator.register(registration("ds-a")).unwrap();
        script_partner(&h.client, "ds-a", true, vec![partner_record("a1", 1)]);
        h.orchestrator.sync_one("ds-a").await.unwrap();

        h.orchestrator.remove("ds-a").await.unwrap();
        assert_eq!(h.tokens.cached_count().await, 0);
        assert!(matches!(h.orchestrator.get("ds-a"), Err(ExchangeError::NotFound(_))));
        assert_eq!(FootprintStore::list(h.store.as_ref(), Some("ds-a")).unwrap().len(), 1);

        assert!(matches!(
            h.orchestrator.remove("ds-a").await,
            Err(ExchangeError::NotFound(_))
        ));
    }
}
