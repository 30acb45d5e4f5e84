//! GetFootprints client.
//!
//! [`FootprintFetcher::fetch_all`] returns a lazy stream over every footprint
//! a partner exposes. Pages are requested one at a time in cursor order, the
//! next one only once the previous page has been drained by the consumer.
//! Records that fail to parse or validate are yielded as
//! [`FetchedItem::Rejected`] beside their siblings; errors that make further
//! pages unreachable are yielded once and end the stream. A next-page link
//! that leaves the GetFootprints origin or returns to a page already read is
//! such an error.

use crate::error::{ExchangeError, Result};
use crate::exchange::token_manager::{AuthToken, TokenManager};
use crate::http::{HttpClient, HttpRequest, HttpResponse};
use crate::store::DataSourceStore;
use common::model::datasource::{ActionKind, DataSourceId};
use common::model::footprint::Footprint;
use futures_util::stream::{self, BoxStream, StreamExt};
use log::{debug, info, warn};
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Query options for GetFootprints. `limit` falls back to the configured page
/// size; `filter` is passed through verbatim as `$filter`.
#[derive(Debug, Clone, Default)]
pub struct FootprintFilter {
    pub limit: Option<u32>,
    pub filter: Option<String>,
}

#[derive(Debug, Clone)]
pub enum FetchedItem {
    Footprint(Box<Footprint>),
    Rejected(RejectedItem),
}

/// A record from a partner page that could not be accepted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedItem {
    pub data_source_id: DataSourceId,
    /// `dataId` as sent, when the record carried a readable one.
    pub data_id: Option<String>,
    pub reason: String,
}

enum Cursor {
    First(FootprintFilter),
    Next(String),
}

struct PageWalk {
    fetcher: FootprintFetcher,
    data_source_id: DataSourceId,
    cursor: Option<Cursor>,
    token: Option<AuthToken>,
    /// GetFootprints endpoint, known once the first page URL is built.
    endpoint: Option<Url>,
    visited: HashSet<String>,
    /// Raised while reading a page, yielded after that page's items.
    failure: Option<ExchangeError>,
}

#[derive(Clone)]
pub struct FootprintFetcher {
    http: Arc<dyn HttpClient>,
    sources: Arc<dyn DataSourceStore>,
    tokens: Arc<TokenManager>,
    page_limit: u32,
}

impl FootprintFetcher {
    pub fn new(
        http: Arc<dyn HttpClient>,
        sources: Arc<dyn DataSourceStore>,
        tokens: Arc<TokenManager>,
        page_limit: u32,
    ) -> Self {
        Self {
            http,
            sources,
            tokens,
            page_limit,
        }
    }

    pub fn fetch_all(
        &self,
        data_source_id: &str,
        filter: FootprintFilter,
    ) -> BoxStream<'static, Result<FetchedItem>> {
        let walk = PageWalk {
            fetcher: self.clone(),
            data_source_id: data_source_id.to_string(),
            cursor: Some(Cursor::First(filter)),
            token: None,
            endpoint: None,
            visited: HashSet::new(),
            failure: None,
        };

        stream::unfold(walk, |mut walk| async move {
            if let Some(cursor) = walk.cursor.take() {
                let page = walk.next_page(cursor).await;
                return Some((page, walk));
            }
            let failure = walk.failure.take()?;
            Some((Err(failure), walk))
        })
        .flat_map(|page| {
            let items: Vec<Result<FetchedItem>> = match page {
                Ok(items) => items.into_iter().map(Ok).collect(),
                Err(e) => vec![Err(e)],
            };
            stream::iter(items)
        })
        .boxed()
    }

    /// Fetches a single footprint by `dataId` from `{GetFootprints}/{dataId}`.
    pub async fn fetch_one(&self, data_source_id: &str, data_id: &str) -> Result<Footprint> {
        let base = self.footprints_url(data_source_id)?;
        let mut url = parse_url(data_source_id, &base)?;
        url.path_segments_mut()
            .map_err(|_| {
                ExchangeError::validation(format!(
                    "GetFootprints URL of '{}' cannot carry a path",
                    data_source_id
                ))
            })?
            .pop_if_empty()
            .push(data_id);

        let mut token = self.tokens.get_token(data_source_id).await?;
        let response = self
            .authorized_get(data_source_id, url.as_str(), &mut token)
            .await?;
        if response.status == 404 {
            return Err(ExchangeError::not_found(format!(
                "footprint '{}' at data source '{}'",
                data_id, data_source_id
            )));
        }
        expect_success(data_source_id, &response)?;

        let body: Value = serde_json::from_str(&response.body).map_err(|e| {
            ExchangeError::network(data_source_id, format!("malformed footprint response: {}", e))
        })?;
        let Some(record) = body.get("data").cloned() else {
            return Err(ExchangeError::network(
                data_source_id,
                "footprint response has no data member",
            ));
        };
        match parse_record(data_source_id, record) {
            FetchedItem::Footprint(fp) => Ok(*fp),
            FetchedItem::Rejected(rejected) => Err(ExchangeError::validation(format!(
                "footprint '{}' from data source '{}' rejected: {}",
                data_id, data_source_id, rejected.reason
            ))),
        }
    }

    fn footprints_url(&self, data_source_id: &str) -> Result<String> {
        let source = self
            .sources
            .get(data_source_id)?
            .ok_or_else(|| ExchangeError::not_found(format!("data source '{}'", data_source_id)))?;
        source
            .endpoint(ActionKind::GetFootprints)
            .map(str::to_string)
            .ok_or_else(|| {
                ExchangeError::validation(format!(
                    "data source '{}' has no GetFootprints endpoint",
                    data_source_id
                ))
            })
    }

    /// GET with the bearer token. A rejected token is refreshed once and the
    /// request repeated; a second rejection drops the cached token and is an
    /// authentication failure.
    async fn authorized_get(
        &self,
        data_source_id: &str,
        url: &str,
        token: &mut AuthToken,
    ) -> Result<HttpResponse> {
        let response = self.get_with(data_source_id, url, token).await?;
        if !response.is_unauthorized() {
            return Ok(response);
        }

        warn!(
            "Data source '{}' rejected the token with HTTP {}, re-authenticating",
            data_source_id, response.status
        );
        *token = self.tokens.refresh(data_source_id, token).await?;
        let retry = self.get_with(data_source_id, url, token).await?;
        if retry.is_unauthorized() {
            self.tokens.invalidate(data_source_id).await;
            return Err(ExchangeError::auth(
                data_source_id,
                format!("token rejected with HTTP {} after refresh", retry.status),
            ));
        }
        Ok(retry)
    }

    async fn get_with(&self, data_source_id: &str, url: &str, token: &AuthToken) -> Result<HttpResponse> {
        let request = HttpRequest::get(url)
            .header("Authorization", token.bearer_header())
            .header("Accept", "application/json");
        self.http
            .request(request)
            .await
            .map_err(|e| ExchangeError::network(data_source_id, e.to_string()))
    }
}

impl PageWalk {
    async fn next_page(&mut self, cursor: Cursor) -> Result<Vec<FetchedItem>> {
        let url = match cursor {
            Cursor::First(filter) => self.first_page_url(&filter)?,
            Cursor::Next(url) => url,
        };
        let mut token = match self.token.take() {
            Some(token) => token,
            None => self.fetcher.tokens.get_token(&self.data_source_id).await?,
        };

        self.visited.insert(url.clone());
        debug!("Fetching footprints of '{}' from {}", self.data_source_id, url);
        let response = self
            .fetcher
            .authorized_get(&self.data_source_id, &url, &mut token)
            .await?;
        self.token = Some(token);
        expect_success(&self.data_source_id, &response)?;

        let items = parse_page(&self.data_source_id, &response.body)?;
        self.cursor = match response.header("link").and_then(next_link) {
            None => None,
            Some(next) => match self.follow(&url, &next) {
                Ok(next_url) => Some(Cursor::Next(next_url)),
                Err(e) => {
                    warn!("Stopping footprint walk of '{}': {}", self.data_source_id, e);
                    self.failure = Some(e);
                    None
                }
            },
        };

        info!(
            "Data source '{}' returned a page of {} footprint(s){}",
            self.data_source_id,
            items.len(),
            if self.cursor.is_some() { ", more to follow" } else { "" }
        );
        Ok(items)
    }

    /// Resolves a next-page link against the page it came from. The target
    /// must share the GetFootprints origin and must not have been read yet.
    fn follow(&self, current: &str, next: &str) -> Result<String> {
        let target = resolve(current, next).ok_or_else(|| {
            ExchangeError::network(
                &self.data_source_id,
                format!("unusable next-page link '{}'", next),
            )
        })?;
        if let Some(endpoint) = &self.endpoint {
            if target.origin() != endpoint.origin() {
                return Err(ExchangeError::network(
                    &self.data_source_id,
                    format!(
                        "next-page link {} leaves the GetFootprints origin {}",
                        target,
                        endpoint.origin().ascii_serialization()
                    ),
                ));
            }
        }
        if self.visited.contains(target.as_str()) {
            return Err(ExchangeError::network(
                &self.data_source_id,
                format!("next-page link {} returns to a page already read", target),
            ));
        }
        Ok(target.into())
    }

    fn first_page_url(&mut self, filter: &FootprintFilter) -> Result<String> {
        let base = self.fetcher.footprints_url(&self.data_source_id)?;
        let mut url = parse_url(&self.data_source_id, &base)?;
        self.endpoint = Some(url.clone());
        {
            let mut query = url.query_pairs_mut();
            query.append_pair(
                "limit",
                &filter.limit.unwrap_or(self.fetcher.page_limit).to_string(),
            );
            if let Some(expr) = filter.filter.as_deref().filter(|f| !f.is_empty()) {
                query.append_pair("$filter", expr);
            }
        }
        Ok(url.into())
    }
}

fn parse_url(data_source_id: &str, raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| {
        ExchangeError::validation(format!(
            "data source '{}' has an invalid GetFootprints URL '{}': {}",
            data_source_id, raw, e
        ))
    })
}

fn expect_success(data_source_id: &str, response: &HttpResponse) -> Result<()> {
    if response.is_success() {
        Ok(())
    } else {
        Err(ExchangeError::network(
            data_source_id,
            format!("GetFootprints returned HTTP {}", response.status),
        ))
    }
}

/// Extracts the `rel="next"` target from a `Link` header.
fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|param| {
            let param = param.trim();
            param == r#"rel="next""# || param == "rel=next"
        });
        let url = target.strip_prefix('<')?.strip_suffix('>')?;
        is_next.then(|| url.to_string())
    })
}

/// Partners may send the cursor relative to the page it came from.
fn resolve(current: &str, next: &str) -> Option<Url> {
    Url::parse(current).ok()?.join(next).ok()
}

fn parse_page(data_source_id: &str, body: &str) -> Result<Vec<FetchedItem>> {
    let mut page: Value = serde_json::from_str(body).map_err(|e| {
        ExchangeError::network(data_source_id, format!("malformed GetFootprints page: {}", e))
    })?;
    match page.get_mut("data").map(Value::take) {
        Some(Value::Array(records)) => Ok(records
            .into_iter()
            .map(|record| parse_record(data_source_id, record))
            .collect()),
        _ => Err(ExchangeError::network(
            data_source_id,
            "GetFootprints page has no data array",
        )),
    }
}

fn parse_record(data_source_id: &str, record: Value) -> FetchedItem {
    let reject = |data_id: Option<String>, reason: String| {
        warn!(
            "Rejected footprint {:?} from data source '{}': {}",
            data_id.as_deref().unwrap_or("?"),
            data_source_id,
            reason
        );
        FetchedItem::Rejected(RejectedItem {
            data_source_id: data_source_id.to_string(),
            data_id,
            reason,
        })
    };

    let Value::Object(mut fields) = record else {
        return reject(None, "record is not a JSON object".to_string());
    };
    let data_id = fields
        .get("dataId")
        .and_then(Value::as_str)
        .map(str::to_string);
    // Local key and origin are ours to assign.
    fields.remove("id");
    fields.remove("dataSourceId");

    let mut footprint: Footprint = match serde_json::from_value(Value::Object(fields)) {
        Ok(fp) => fp,
        Err(e) => return reject(data_id, e.to_string()),
    };
    footprint.data_source_id = Some(data_source_id.to_string());

    let mut problems = footprint.structural_problems();
    if footprint
        .product_footprint_id
        .as_deref()
        .map_or(true, |id| id.trim().is_empty())
    {
        problems.push("productFootprintId is missing".to_string());
    }
    if !problems.is_empty() {
        return reject(data_id, problems.join("; "));
    }
    FetchedItem::Footprint(Box::new(footprint))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::exchange::token_manager::TokenSettings;
    use crate::http::fake::ScriptedClient;
    use crate::http::TransportError;
    use crate::store::tests::data_source;
    use crate::store::MemoryStore;
    use futures_util::TryStreamExt;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) const FOOTPRINTS_URL: &str = "https://ds-1.example/2/footprints";
    const AUTH_URL: &str = "https://ds-1.example/auth/token";

    pub(crate) fn partner_record(data_id: &str, version: u32) -> Value {
        json!({
            "id": 77,
            "dataId": data_id,
            "version": version,
            "productFootprintId": format!("pf-{data_id}"),
            "status": "Active",
            "companyName": "Partner Corp",
            "companyIds": [{ "scheme": "LEI", "code": "5493001KJTIIGC8Y1R12" }],
            "productDescription": format!("{data_id} v{version}"),
            "declaredUnit": "kilogram",
            "pcfExcludingBiogenic": "1.5"
        })
    }

    pub(crate) fn page(records: Vec<Value>) -> String {
        json!({ "data": records }).to_string()
    }

    /// Client that issues `token-N` on every authentication.
    pub(crate) fn partner() -> Arc<ScriptedClient> {
        let client = Arc::new(ScriptedClient::new());
        let issued = AtomicUsize::new(0);
        client.on(AUTH_URL, move |_| {
            let n = issued.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(HttpResponse::new(
                200,
                format!(r#"{{"access_token":"token-{n}","expires_in":3600}}"#),
            ))
        });
        client
    }

    pub(crate) fn fetcher_for(client: Arc<ScriptedClient>) -> (FootprintFetcher, Arc<TokenManager>) {
        let store = Arc::new(MemoryStore::new());
        let mut source = data_source("ds-1");
        source.upsert_endpoint(ActionKind::GetFootprints, FOOTPRINTS_URL);
        store.put(&source).unwrap();
        let tokens = Arc::new(TokenManager::new(
            client.clone(),
            store.clone(),
            TokenSettings::default(),
        ));
        (
            FootprintFetcher::new(client, store, tokens.clone(), 50),
            tokens,
        )
    }

    fn data_ids(items: &[FetchedItem]) -> Vec<String> {
        items
            .iter()
            .filter_map(|item| match item {
                FetchedItem::Footprint(fp) => Some(fp.data_id.clone()),
                FetchedItem::Rejected(_) => None,
            })
            .collect()
    }

    #[test]
    fn link_header_parsing() {
        assert_eq!(
            next_link(r#"<https://p/fp?cursor=2>; rel="next""#),
            Some("https://p/fp?cursor=2".to_string())
        );
        assert_eq!(
            next_link(r#"<https://p/fp?c=1>; rel="prev", <https://p/fp?c=3>; rel="next""#),
            Some("https://p/fp?c=3".to_string())
        );
        assert_eq!(next_link(r#"<https://p/fp>; rel="last""#), None);
        assert_eq!(
            resolve("https://p/a/fp?c=1", "fp?c=2").unwrap().as_str(),
            "https://p/a/fp?c=2"
        );
    }

    #[tokio::test]
    async fn follows_cursors_in_partner_order() {
        let client = partner();
        let next = format!(r#"<{FOOTPRINTS_URL}/page2>; rel="next""#);
        client.on(FOOTPRINTS_URL, move |req| {
            assert!(req.url.contains("limit=50"));
            Ok(HttpResponse::new(
                200,
                page(vec![partner_record("a", 1), partner_record("b", 1)]),
            )
            .with_header("Link", next.clone()))
        });
        client.on(&format!("{FOOTPRINTS_URL}/page2"), |_| {
            Ok(HttpResponse::new(200, page(vec![partner_record("c", 1)])))
        });
        let (fetcher, _) = fetcher_for(client.clone());

        let items: Vec<FetchedItem> = fetcher
            .fetch_all("ds-1", FootprintFilter::default())
            .try_collect()
            .await
            .unwrap();

        assert_eq!(data_ids(&items), ["a", "b", "c"]);
        assert_eq!(client.calls(AUTH_URL), 1);
        let FetchedItem::Footprint(first) = &items[0] else {
            panic!("expected a footprint");
        };
        assert_eq!(first.id, None);
        assert_eq!(first.data_source_id.as_deref(), Some("ds-1"));
    }

    #[tokio::test]
    async fn passes_limit_and_filter_through() {
        let client = partner();
        client.on(FOOTPRINTS_URL, |_| Ok(HttpResponse::new(200, page(vec![]))));
        let (fetcher, _) = fetcher_for(client.clone());

        let filter = FootprintFilter {
            limit: Some(5),
            filter: Some("productIds/any(id: id eq 'x')".to_string()),
        };
        let items: Vec<FetchedItem> = fetcher.fetch_all("ds-1", filter).try_collect().await.unwrap();
        assert!(items.is_empty());

        let url = Url::parse(&client.requests()[1].url).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("limit".to_string(), "5".to_string()),
                ("$filter".to_string(), "productIds/any(id: id eq 'x')".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn unauthorized_page_triggers_one_refresh_and_retry() {
        let client = partner();
        client.on(FOOTPRINTS_URL, |req| {
            if req.header_value("Authorization") == Some("Bearer token-1") {
                Ok(HttpResponse::new(401, "expired"))
            } else {
                Ok(HttpResponse::new(200, page(vec![partner_record("a", 1)])))
            }
        });
        let (fetcher, _) = fetcher_for(client.clone());

        let items: Vec<FetchedItem> = fetcher
            .fetch_all("ds-1", FootprintFilter::default())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(data_ids(&items), ["a"]);
        assert_eq!(client.calls(AUTH_URL), 2);
        assert_eq!(client.calls(FOOTPRINTS_URL), 2);
    }

    #[tokio::test]
    async fn second_rejection_is_an_auth_error() {
        let client = partner();
        client.on(FOOTPRINTS_URL, |_| Ok(HttpResponse::new(403, "forbidden")));
        let (fetcher, tokens) = fetcher_for(client.clone());

        let results: Vec<Result<FetchedItem>> = fetcher
            .fetch_all("ds-1", FootprintFilter::default())
            .collect()
            .await;
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(ExchangeError::Auth { .. })));
        assert_eq!(client.calls(AUTH_URL), 2);
        assert_eq!(tokens.cached_count().await, 0);
    }

    #[tokio::test]
    async fn cursor_back_to_a_read_page_ends_the_walk() {
        let client = partner();
        let page2 = format!("{FOOTPRINTS_URL}/page2");
        let to_page2 = format!(r#"<{page2}>; rel="next""#);
        let back_to_page2 = to_page2.clone();
        client.on(FOOTPRINTS_URL, move |_| {
            Ok(HttpResponse::new(200, page(vec![partner_record("a", 1)]))
                .with_header("Link", to_page2.clone()))
        });
        client.on(&page2, move |_| {
            Ok(HttpResponse::new(200, page(vec![partner_record("b", 1)]))
                .with_header("Link", back_to_page2.clone()))
        });
        let (fetcher, _) = fetcher_for(client.clone());

        let results: Vec<Result<FetchedItem>> = fetcher
            .fetch_all("ds-1", FootprintFilter::default())
            .collect()
            .await;
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok() && results[1].is_ok());
        assert!(matches!(results[2], Err(ExchangeError::Network { .. })));
        assert_eq!(client.calls(&page2), 1);
    }

    #[tokio::test]
    async fn cursor_to_another_origin_is_not_followed() {
        let client = partner();
        client.on(FOOTPRINTS_URL, |_| {
            Ok(HttpResponse::new(200, page(vec![partner_record("a", 1)]))
                .with_header("Link", r#"<https://elsewhere.example/collect>; rel="next""#))
        });
        client.on("https://elsewhere.example/collect", |_| {
            Ok(HttpResponse::new(200, page(vec![])))
        });
        let (fetcher, _) = fetcher_for(client.clone());

        let results: Vec<Result<FetchedItem>> = fetcher
            .fetch_all("ds-1", FootprintFilter::default())
            .collect()
            .await;
        assert_eq!(results.len(), 2);
        assert!(matches!(results[1], Err(ExchangeError::Network { .. })));
        assert_eq!(client.calls("https://elsewhere.example/collect"), 0);
    }

    #[tokio::test]
    async fn malformed_record_is_rejected_beside_its_siblings() {
        let client = partner();
        let mut no_pfid = partner_record("c", 1);
        no_pfid.as_object_mut().unwrap().remove("productFootprintId");
        let mut bad_lei = partner_record("d", 1);
        bad_lei["companyIds"] = json!([{ "scheme": "LEI", "code": "lowercase-not-valid" }]);
        let numeric_quantity = json!({ "dataId": "e", "version": 1, "status": "Active",
            "productFootprintId": "pf-e", "pcfExcludingBiogenic": 1.5 });
        client.on(FOOTPRINTS_URL, move |_| {
            Ok(HttpResponse::new(
                200,
                page(vec![
                    partner_record("a", 1),
                    json!("not an object"),
                    no_pfid.clone(),
                    bad_lei.clone(),
                    numeric_quantity.clone(),
                    partner_record("b", 2),
                ]),
            ))
        });
        let (fetcher, _) = fetcher_for(client);

        let items: Vec<FetchedItem> = fetcher
            .fetch_all("ds-1", FootprintFilter::default())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(items.len(), 6);
        assert_eq!(data_ids(&items), ["a", "b"]);

        let rejected: Vec<&RejectedItem> = items
            .iter()
            .filter_map(|item| match item {
                FetchedItem::Rejected(r) => Some(r),
                FetchedItem::Footprint(_) => None,
            })
            .collect();
        assert_eq!(rejected[0].data_id, None);
        assert_eq!(rejected[1].data_id.as_deref(), Some("c"));
        assert!(rejected[1].reason.contains("productFootprintId"));
        assert!(rejected[2].reason.contains("LEI:lowercase-not-valid"));
        assert_eq!(rejected[3].data_id.as_deref(), Some("e"));
    }

    #[tokio::test]
    async fn transport_failure_mid_walk_ends_the_stream() {
        let client = partner();
        let next = format!(r#"<{FOOTPRINTS_URL}/page2>; rel="next""#);
        client.on(FOOTPRINTS_URL, move |_| {
            Ok(HttpResponse::new(200, page(vec![partner_record("a", 1)])).with_header("Link", next.clone()))
        });
        client.on(&format!("{FOOTPRINTS_URL}/page2"), |_| {
            Err(TransportError("timed out".into()))
        });
        let (fetcher, _) = fetcher_for(client);

        let results: Vec<Result<FetchedItem>> = fetcher
            .fetch_all("ds-1", FootprintFilter::default())
            .collect()
            .await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(ExchangeError::Network { .. })));
    }

    #[tokio::test]
    async fn page_without_data_array_is_a_network_error() {
        let client = partner();
        client.on(FOOTPRINTS_URL, |_| Ok(HttpResponse::new(200, r#"{"items":[]}"#)));
        let (fetcher, _) = fetcher_for(client);

        let err = fetcher
            .fetch_all("ds-1", FootprintFilter::default())
            .try_collect::<Vec<_>>()
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::Network { .. }));
    }

    #[tokio::test]
    async fn fetch_one_reads_a_single_record() {
        let client = partner();
        client.on(&format!("{FOOTPRINTS_URL}/coil"), |_| {
            Ok(HttpResponse::new(200, json!({ "data": partner_record("coil", 4) }).to_string()))
        });
        let (fetcher, _) = fetcher_for(client);

        let fp = fetcher.fetch_one("ds-1", "coil").await.unwrap();
        assert_eq!(fp.version, 4);
        assert_eq!(fp.data_source_id.as_deref(), Some("ds-1"));

        assert!(matches!(
            fetcher.fetch_one("ds-1", "missing").await,
            Err(ExchangeError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn unknown_source_is_not_found() {
        let (fetcher, _) = fetcher_for(partner());
        let results: Vec<Result<FetchedItem>> = fetcher
            .fetch_all("nope", FootprintFilter::default())
            .collect()
            .await;
        assert!(matches!(results[..], [Err(ExchangeError::NotFound(_))]));
    }
}
