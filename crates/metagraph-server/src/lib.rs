//! Metagraph server library.
//!
//! Service lifecycle around one process-wide type registry: configuration,
//! HA identity, bootstrap schema loading and lineage ingestion.

pub mod config;
pub mod error;
pub mod ha;
pub mod lineage;
pub mod service;

pub use config::{Args, ServerConfig};
pub use error::Error;
pub use ha::{HaConfig, ZookeeperProperties};
pub use lineage::{lineage_type_definitions, LineageIngestor, LineageRecord};
pub use service::TypeService;
