pub mod client;
pub mod compliance;
pub mod config;
pub mod domain;
pub mod error;
pub mod integrations;
pub mod marketplace;
pub mod telemetry;
