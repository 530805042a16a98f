//! Domain types, inbound query validation and application configuration shared
//! by the livesent pipeline, server and CLI.

pub mod app_config;
pub mod config;
pub mod events;
pub mod query;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, InferenceBackend, StoreBackend};
pub use config::{load_app_config, load_app_config_from_env};
pub use events::{
    event_identity, location_filter, Article, Emotion, EnrichedEvent, SimilarityResult,
};
pub use query::{LocationQuery, QueryError, MAX_DAYS_AGO};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
