//! Bearer token lifecycle per data source.
//!
//! Tokens live in a map of per-source slots. Each slot sits behind its own
//! async mutex, held for the whole authentication call, so concurrent callers
//! for one source wait for the single in-flight exchange and then reuse its
//! token. Slots of different sources never contend with each other.

use crate::error::{ExchangeError, Result};
use crate::http::{HttpClient, HttpRequest};
use crate::store::DataSourceStore;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use chrono::{DateTime, TimeDelta, Utc};
use common::model::datasource::{ActionKind, DataSourceId};
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// Access token issued by a data source's Authenticate endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub data_source_id: DataSourceId,
    value: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn new(data_source_id: impl Into<String>, value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            data_source_id: data_source_id.into(),
            value: value.into(),
            expires_at,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.value)
    }

    /// True if the token expires within `margin` from now (or already has).
    pub fn expires_within(&self, margin: Duration) -> bool {
        let margin = TimeDelta::from_std(margin).unwrap_or(TimeDelta::MAX);
        match Utc::now().checked_add_signed(margin) {
            Some(deadline) => deadline >= self.expires_at,
            None => true,
        }
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("data_source_id", &self.data_source_id)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct TokenSettings {
    /// Tokens this close to expiry are treated as expired.
    pub safety_margin: Duration,
    /// Lifetime assumed when the partner sends no `expires_in`.
    pub default_lifetime: Duration,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            safety_margin: Duration::from_secs(30),
            default_lifetime: Duration::from_secs(3600),
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

type TokenSlot = Arc<Mutex<Option<AuthToken>>>;

pub struct TokenManager {
    http: Arc<dyn HttpClient>,
    sources: Arc<dyn DataSourceStore>,
    settings: TokenSettings,
    slots: RwLock<HashMap<DataSourceId, TokenSlot>>,
}

impl TokenManager {
    pub fn new(
        http: Arc<dyn HttpClient>,
        sources: Arc<dyn DataSourceStore>,
        settings: TokenSettings,
    ) -> Self {
        Self {
            http,
            sources,
            settings,
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Returns a token that is valid beyond the safety margin, authenticating
    /// if the cached one is missing or about to expire.
    pub async fn get_token(&self, data_source_id: &str) -> Result<AuthToken> {
        let slot = self.slot(data_source_id).await;
        let mut cached = slot.lock().await;
        if let Some(token) = cached.as_ref() {
            if !token.expires_within(self.settings.safety_margin) {
                return Ok(token.clone());
            }
            debug!("Token for data source '{}' is expiring, renewing", data_source_id);
        }
        self.authenticate_into(data_source_id, &mut cached).await
    }

    /// Re-authenticates after the partner rejected `rejected`. When another
    /// caller already replaced that token, the replacement is returned instead
    /// of authenticating again.
    pub async fn refresh(&self, data_source_id: &str, rejected: &AuthToken) -> Result<AuthToken> {
        let slot = self.slot(data_source_id).await;
        let mut cached = slot.lock().await;
        if let Some(current) = cached.as_ref() {
            if current.value != rejected.value
                && !current.expires_within(self.settings.safety_margin)
            {
                return Ok(current.clone());
            }
        }
        self.authenticate_into(data_source_id, &mut cached).await
    }

    /// Drops any cached token for the source.
    pub async fn invalidate(&self, data_source_id: &str) {
        if self.slots.write().await.remove(data_source_id).is_some() {
            debug!("Invalidated cached token for data source '{}'", data_source_id);
        }
    }

    pub async fn cached_count(&self) -> usize {
        self.slots.read().await.len()
    }

    async fn slot(&self, data_source_id: &str) -> TokenSlot {
        if let Some(slot) = self.slots.read().await.get(data_source_id) {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().await;
        Arc::clone(slots.entry(data_source_id.to_string()).or_default())
    }

    async fn authenticate_into(
        &self,
        data_source_id: &str,
        cached: &mut Option<AuthToken>,
    ) -> Result<AuthToken> {
        *cached = None;
        let token = self.authenticate(data_source_id).await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    async fn authenticate(&self, data_source_id: &str) -> Result<AuthToken> {
        let source = self
            .sources
            .get(data_source_id)?
            .ok_or_else(|| ExchangeError::auth(data_source_id, "data source is not registered"))?;
        let url = source
            .endpoint(ActionKind::Authenticate)
            .ok_or_else(|| ExchangeError::auth(data_source_id, "no Authenticate endpoint registered"))?;

        let basic = BASE64_STANDARD.encode(format!(
            "{}:{}",
            source.credentials.username,
            source.credentials.secret.expose()
        ));
        let request = HttpRequest::post(url, "grant_type=client_credentials")
            .header("Authorization", format!("Basic {}", basic))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Accept", "application/json");

        info!("Authenticating against data source '{}' at {}", data_source_id, url);
        let response = self.http.request(request).await.map_err(|e| {
            warn!("Authenticate endpoint of '{}' unreachable: {}", data_source_id, e);
            ExchangeError::auth(data_source_id, format!("Authenticate endpoint unreachable: {}", e))
        })?;

        if !response.is_success() {
            warn!(
                "Data source '{}' refused authentication with HTTP {}",
                data_source_id, response.status
            );
            return Err(ExchangeError::auth(
                data_source_id,
                format!("Authenticate returned HTTP {}", response.status),
            ));
        }

        let parsed: TokenResponse = serde_json::from_str(&response.body).map_err(|e| {
            ExchangeError::auth(data_source_id, format!("malformed token response: {}", e))
        })?;
        if parsed.access_token.trim().is_empty() {
            return Err(ExchangeError::auth(data_source_id, "token response has an empty access_token"));
        }

        let lifetime = parsed
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(self.settings.default_lifetime);
        let expires_at = TimeDelta::from_std(lifetime)
            .ok()
            .and_then(|delta| Utc::now().checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        debug!("Data source '{}' issued a token valid until {}", data_source_id, expires_at);
        Ok(AuthToken::new(data_source_id, parsed.access_token, expires_at))
    }
}
