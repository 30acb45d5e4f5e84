//! Server configuration
//!
//! Every option can be given as a flag or through its `PCF_*` environment
//! variable.

use crate::exchange::token_manager::TokenSettings;
use clap::Parser;
use common::model::quantity::Quantity;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "pcf-exchange", about = "PCF data exchange with Pathfinder partners")]
pub struct ServerConfig {
    // === HTTP API ===
    #[arg(long, env = "PCF_LISTEN_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "PCF_LISTEN_PORT", default_value = "8080")]
    pub port: u16,

    /// Maximum accepted JSON body (bytes)
    #[arg(long, env = "PCF_BODY_LIMIT", default_value = "10485760")]
    pub body_limit: usize,

    // === Storage ===
    #[arg(long, env = "PCF_DATABASE_PATH", default_value = "pcf_exchange.sqlite")]
    pub database_path: PathBuf,

    // === Partner calls ===
    /// Connect timeout per partner request (s)
    #[arg(long, env = "PCF_CONNECT_TIMEOUT_SECS", default_value = "10")]
    pub connect_timeout_secs: u64,

    /// Total timeout per partner request (s)
    #[arg(long, env = "PCF_REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    /// Tokens expiring within this window are renewed before use (s)
    #[arg(long, env = "PCF_TOKEN_SAFETY_MARGIN_SECS", default_value = "30")]
    pub token_safety_margin_secs: u64,

    /// Token lifetime assumed when a partner omits expires_in (s)
    #[arg(long, env = "PCF_DEFAULT_TOKEN_LIFETIME_SECS", default_value = "3600")]
    pub default_token_lifetime_secs: u64,

    /// Page size requested from GetFootprints
    #[arg(long, env = "PCF_PAGE_LIMIT", default_value = "100")]
    pub page_limit: u32,

    /// Accepted difference between a carbon total and its breakdown sum
    #[arg(long, env = "PCF_BREAKDOWN_TOLERANCE", default_value = "0.000001")]
    pub breakdown_tolerance: Quantity,

    // === Logging ===
    /// Default log filter, overridden by RUST_LOG
    #[arg(long, env = "PCF_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl ServerConfig {
    /// Validate the configuration at startup
    pub fn validate(&self) -> Result<(), String> {
        if self.page_limit == 0 {
            return Err("page_limit must be > 0".to_string());
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be > 0".to_string());
        }
        if self.connect_timeout_secs > self.request_timeout_secs {
            return Err("connect_timeout_secs must be <= request_timeout_secs".to_string());
        }
        if self.default_token_lifetime_secs <= self.token_safety_margin_secs {
            return Err(
                "default_token_lifetime_secs must be > token_safety_margin_secs".to_string(),
            );
        }
        if self.breakdown_tolerance < Quantity::ZERO {
            return Err("breakdown_tolerance must not be negative".to_string());
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings {
            safety_margin: Duration::from_secs(self.token_safety_margin_secs),
            default_lifetime: Duration::from_secs(self.default_token_lifetime_secs),
        }
    }

    pub fn listen_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}
