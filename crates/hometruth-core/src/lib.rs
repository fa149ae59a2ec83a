pub mod app_config;
pub mod config;
pub mod property;
pub mod sources;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use property::{
    CanonicalProperty, EpcRating, ExtractionOutcome, FailureKind, FloorArea, ListingIdentity,
    PartialFailureRecord, RawPayload, Tenure,
};
pub use sources::{default_sources, load_sources, SourceConfig, SourcesFile};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for env var {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sources file {path}: {source}")]
    SourcesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sources file: {0}")]
    SourcesFileParse(#[source] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}
