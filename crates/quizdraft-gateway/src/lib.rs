//! quizdraft-gateway: persistence gateways.
//!
//! Implements the `PersistenceGateway` trait for the assessment REST API and
//! for a local JSON file store, plus an in-memory mock for tests.

pub mod config;
pub mod file;
pub mod http;
pub mod mock;

pub use config::{create_gateway, load_config, load_config_from, GatewayConfig, QuizdraftConfig};
pub use file::{FileGateway, StoreDocument};
pub use http::HttpGateway;
pub use mock::MockGateway;
