use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Notification pushed by a partner that footprint data changed.
///
/// Only the `(dataId, version)` reference is used; any other payload the
/// partner attaches is ignored, the event is a freshness signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data: EventData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

impl InboundEvent {
    pub fn new(data_id: impl Into<String>, version: u32) -> Self {
        Self {
            event_type: "ProductFootprint.Published".to_string(),
            id: String::new(),
            source: None,
            time: None,
            data: EventData {
                data_id: Some(data_id.into()),
                version: Some(version),
            },
        }
    }

    /// The referenced footprint, if the event names one.
    pub fn footprint_ref(&self) -> Option<(&str, u32)> {
        let data_id = self.data.data_id.as_deref().filter(|id| !id.trim().is_empty())?;
        Some((data_id, self.data.version?))
    }
}
