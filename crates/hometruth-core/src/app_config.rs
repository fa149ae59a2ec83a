use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Process-level settings for hosts that embed the extraction engine.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    /// Default `tracing` filter directive when `RUST_LOG` is not set.
    pub log_level: String,
    /// YAML source table. `None` selects the built-in portal table.
    pub sources_path: Option<PathBuf>,
    /// Capacity of the in-memory error report history.
    pub report_history: usize,
    /// Scrub postcodes and listing ids from error reports.
    pub redact_reports: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env: Environment::Development,
            log_level: "info".to_string(),
            sources_path: None,
            report_history: 50,
            redact_reports: false,
        }
    }
}
