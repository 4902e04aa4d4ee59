pub mod collector;
pub mod config;
pub mod database;
pub mod error;
pub mod heuristic;
pub mod sync;
pub mod worker;

pub use collector::VsCodeCollector;
pub use config::{resolve_config_path, GulpConfig, ObsidianConfig, PlatformConfig};
pub use database::ConversationStore;
pub use error::GulpError;
pub use heuristic::{ConversationProcessor, HeuristicEnricher};
pub use sync::{SyncWorker, TickReport};
pub use worker::IngestionWorker;
