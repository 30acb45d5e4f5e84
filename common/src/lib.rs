//! Data model shared by the PCF exchange backend and its clients: data
//! sources and their endpoints, footprints with their breakdown tree,
//! identifiers, inbound events and API payloads.

pub mod jobs;
pub mod model;
pub mod requests;
