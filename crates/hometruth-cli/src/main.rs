use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use hometruth_core::{AppConfig, SourcesFile};
use hometruth_extractor::{
    ErrorReporter, FanoutReporter, ListingExtractor, MemoryReporter, Redactor, SourceRegistry,
    TracingReporter,
};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "hometruth-cli")]
#[command(about = "Classify UK property listing URLs and normalize scraped listing payloads")]
struct Cli {
    /// YAML source table; overrides `HOMETRUTH_SOURCES_PATH`
    #[arg(long, global = true)]
    sources: Option<PathBuf>,

    /// Print the recorded error reports to stderr as JSON when done
    #[arg(long, global = true)]
    report_history: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show source, listing flag, and identity for each URL
    Classify {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Normalize a single JSON payload file
    Extract {
        /// Listing URL the payload was scraped from
        #[arg(long)]
        url: String,
        /// Path to the JSON payload
        #[arg(long)]
        payload: PathBuf,
        /// Skip host resolution and use this source id
        #[arg(long)]
        source: Option<String>,
    },
    /// Normalize a JSONL file of `{"url": ..., "payload": ...}` lines
    Batch {
        file: PathBuf,
        /// Emit each listing identity at most once
        #[arg(long)]
        dedupe: bool,
    },
    /// List the active source table
    Sources,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = hometruth_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let sources = load_source_table(cli.sources.as_ref().or(config.sources_path.as_ref()))?;
    let registry = Arc::new(SourceRegistry::from_sources(&sources)?);
    let history = Arc::new(build_memory_reporter(&config, &registry));
    let extractor = ListingExtractor::new(
        Arc::clone(&registry),
        build_reporter(&config, &registry, Arc::clone(&history)),
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Some(Commands::Classify { urls }) => commands::run_classify(&extractor, &urls, &mut out)?,
        Some(Commands::Extract {
            url,
            payload,
            source,
        }) => commands::run_extract(&extractor, &url, &payload, source.as_deref(), &mut out)?,
        Some(Commands::Batch { file, dedupe }) => {
            let summary = commands::run_batch(&extractor, &file, dedupe, &mut out)?;
            tracing::info!(
                lines = summary.lines,
                extracted = summary.extracted,
                failed = summary.failed,
                duplicates = summary.duplicates,
                malformed = summary.malformed,
                "batch complete"
            );
        }
        Some(Commands::Sources) => commands::run_sources(&registry, &mut out)?,
        None => println!("hometruth-cli: no command given, try --help"),
    }

    if cli.report_history {
        let reports = history.history(config.report_history);
        eprintln!("{}", serde_json::to_string_pretty(&reports)?);
    }

    Ok(())
}

fn load_source_table(path: Option<&PathBuf>) -> anyhow::Result<SourcesFile> {
    match path {
        Some(path) => hometruth_core::load_sources(path)
            .with_context(|| format!("loading source table from {}", path.display())),
        None => Ok(hometruth_core::default_sources()),
    }
}

fn redactor_for(config: &AppConfig, registry: &SourceRegistry) -> Option<Redactor> {
    config
        .redact_reports
        .then(|| Redactor::new(registry.source_ids()))
}

fn build_memory_reporter(config: &AppConfig, registry: &SourceRegistry) -> MemoryReporter {
    let reporter = MemoryReporter::new(config.report_history);
    match redactor_for(config, registry) {
        Some(redactor) => reporter.with_redactor(redactor),
        None => reporter,
    }
}

/// Logs every report and keeps the recent ones for `--report-history`.
fn build_reporter(
    config: &AppConfig,
    registry: &SourceRegistry,
    history: Arc<MemoryReporter>,
) -> Arc<dyn ErrorReporter> {
    let logger = match redactor_for(config, registry) {
        Some(redactor) => TracingReporter::new().with_redactor(redactor),
        None => TracingReporter::new(),
    };
    let reporters: Vec<Arc<dyn ErrorReporter>> = vec![Arc::new(logger), history];
    Arc::new(FanoutReporter::new(reporters))
}

#[cfg(test)]
mod tests;
