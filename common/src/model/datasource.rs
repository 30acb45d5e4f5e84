use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub type DataSourceId = String;

/// A registered partner system the exchange talks to.
///
/// Serializes to the record shape the UI reads; the credential secret is
/// always written out redacted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    pub data_source_id: DataSourceId,
    pub data_source_name: String,
    #[serde(rename = "type", default)]
    pub source_type: DataSourceType,
    pub credentials: Credentials,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataSourceType {
    #[default]
    Pathfinder,
}

/// Protocol actions a partner exposes, one endpoint each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActionKind {
    Authenticate,
    GetFootprints,
    UpdateEvent,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionKind::Authenticate => "Authenticate",
            ActionKind::GetFootprints => "GetFootprints",
            ActionKind::UpdateEvent => "UpdateEvent",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(rename = "type")]
    pub action: ActionKind,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub secret: Secret,
}

/// Credential secret. Never printed: `Debug`, `Display` and `Serialize`
/// all emit a mask, only [`Secret::expose`] yields the value.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Secret(String);

const MASK: &str = "********";

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({MASK})")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MASK)
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(MASK)
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Secret)
    }
}

/// Convenience URL fields accepted on registration and update, collapsed into
/// the endpoint list before storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointUrls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticate_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footprints_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events_url: Option<String>,
}

impl EndpointUrls {
    pub fn iter(&self) -> impl Iterator<Item = (ActionKind, &str)> {
        [
            (ActionKind::Authenticate, self.authenticate_url.as_deref()),
            (ActionKind::GetFootprints, self.footprints_url.as_deref()),
            (ActionKind::UpdateEvent, self.events_url.as_deref()),
        ]
        .into_iter()
        .filter_map(|(action, url)| url.map(|url| (action, url)))
    }
}

impl DataSource {
    pub fn endpoint(&self, action: ActionKind) -> Option<&str> {
        self.endpoints
            .iter()
            .find(|e| e.action == action)
            .map(|e| e.url.as_str())
    }

    /// Replaces the URL of the endpoint for `action` in place, or appends a
    /// new endpoint when the source has none for that action.
    pub fn upsert_endpoint(&mut self, action: ActionKind, url: impl Into<String>) {
        let url = url.into();
        match self.endpoints.iter_mut().find(|e| e.action == action) {
            Some(existing) => existing.url = url,
            None => self.endpoints.push(Endpoint { action, url }),
        }
    }

    /// Upserts every present convenience URL; absent ones leave the current
    /// endpoint untouched.
    pub fn apply_urls(&mut self, urls: &EndpointUrls) {
        for (action, url) in urls.iter() {
            self.upsert_endpoint(action, url);
        }
    }

    /// Replaces the whole endpoint set. Fails when two entries share an action.
    pub fn replace_endpoints(&mut self, endpoints: Vec<Endpoint>) -> Result<(), String> {
        if let Some(action) = duplicate_action(&endpoints) {
            return Err(format!("more than one {} endpoint", action));
        }
        self.endpoints = endpoints;
        Ok(())
    }
}

fn duplicate_action(endpoints: &[Endpoint]) -> Option<ActionKind> {
    endpoints.iter().enumerate().find_map(|(idx, endpoint)| {
        endpoints[..idx]
            .iter()
            .any(|earlier| earlier.action == endpoint.action)
            .then_some(endpoint.action)
    })
}
