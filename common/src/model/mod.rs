pub mod breakdown;
pub mod datasource;
pub mod event;
pub mod field_state;
pub mod footprint;
pub mod identifier;
pub mod quantity;
