//! The data exchange core: tokens, footprint retrieval, inbound events and
//! the orchestration of registered data sources.

pub mod fetcher;
pub mod ingestor;
pub mod orchestrator;
pub mod reconcile;
pub mod token_manager;
