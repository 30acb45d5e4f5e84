use crate::model::datasource::{Credentials, DataSourceType, Endpoint, EndpointUrls};
use serde::{Deserialize, Serialize};

/// Request payload for `POST /api/data_sources`.
///
/// `endpoints` seeds the endpoint list; the convenience URLs are then upserted
/// over it by action kind.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDataSourceRequest {
    /// Generated when omitted.
    #[serde(default)]
    pub data_source_id: Option<String>,
    pub data_source_name: String,
    #[serde(rename = "type", default)]
    pub source_type: DataSourceType,
    pub credentials: Credentials,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    #[serde(flatten)]
    pub urls: EndpointUrls,
}

/// Request payload for `PUT /api/data_sources/{id}`. Every field is optional;
/// what is left out stays as stored.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDataSourceRequest {
    #[serde(default)]
    pub data_source_name: Option<String>,
    #[serde(default)]
    pub credentials: Option<Credentials>,
    /// Replaces the whole endpoint set before the convenience URLs apply.
    #[serde(default)]
    pub endpoints: Option<Vec<Endpoint>>,
    #[serde(flatten)]
    pub urls: EndpointUrls,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValidateIdentifierRequest {
    pub scheme: String,
    pub code: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValidateIdentifierResponse {
    pub valid: bool,
}

/// Query string of `GET /api/footprints`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FootprintListQuery {
    #[serde(default)]
    pub data_source_id: Option<String>,
}

/// Body returned when a background job is started.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobStarted {
    pub job_id: String,
}
