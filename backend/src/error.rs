//! Error taxonomy of the exchange.
//!
//! Messages carry data source ids, URLs and HTTP statuses. Credentials and
//! token values never reach them.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExchangeError>;

#[derive(Debug, Clone, Error)]
pub enum ExchangeError {
    /// Bad identifier, malformed event or record, invalid registration.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Credentials rejected or the Authenticate endpoint unusable.
    #[error("Authentication with data source '{data_source_id}' failed: {cause}")]
    Auth {
        data_source_id: String,
        cause: String,
    },

    /// Timeout, connection failure or unusable response on an action call.
    #[error("Request to data source '{data_source_id}' failed: {cause}")]
    Network {
        data_source_id: String,
        cause: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// Poisoned lock, stopped worker or similar broken process state.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExchangeError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn auth(data_source_id: &str, cause: impl Into<String>) -> Self {
        Self::Auth {
            data_source_id: data_source_id.to_string(),
            cause: cause.into(),
        }
    }

    pub fn network(data_source_id: &str, cause: impl Into<String>) -> Self {
        Self::Network {
            data_source_id: data_source_id.to_string(),
            cause: cause.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Short machine-readable tag used in API bodies and sync reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ExchangeError::Validation(_) => "validation",
            ExchangeError::Auth { .. } => "auth",
            ExchangeError::Network { .. } => "network",
            ExchangeError::NotFound(_) => "notFound",
            ExchangeError::Storage(_) => "storage",
            ExchangeError::Internal(_) => "internal",
        }
    }
}

impl From<rusqlite::Error> for ExchangeError {
    fn from(e: rusqlite::Error) -> Self {
        ExchangeError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(e: serde_json::Error) -> Self {
        ExchangeError::Storage(format!("record encoding: {}", e))
    }
}

impl ResponseError for ExchangeError {
    fn status_code(&self) -> StatusCode {
        match self {
            ExchangeError::Validation(_) => StatusCode::BAD_REQUEST,
            ExchangeError::NotFound(_) => StatusCode::NOT_FOUND,
            ExchangeError::Auth { .. } => StatusCode::BAD_GATEWAY,
            ExchangeError::Network { .. } => StatusCode::GATEWAY_TIMEOUT,
            ExchangeError::Storage(_) | ExchangeError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }))
    }
}
