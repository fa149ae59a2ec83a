use std::path::PathBuf;

use serde_json::Value;

use super::*;

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "hometruth-cli-{}-{name}",
        std::process::id()
    ));
    std::fs::write(&path, contents).expect("write temp file");
    path
}

fn extractor() -> (ListingExtractor, Arc<MemoryReporter>) {
    let history = Arc::new(MemoryReporter::new(10));
    let extractor = ListingExtractor::new(Arc::new(SourceRegistry::builtin()), history.clone());
    (extractor, history)
}

/// Panics on its first call only, so the first extraction of a listing fails.
#[derive(Default)]
struct FailOnce {
    tripped: std::sync::atomic::AtomicBool,
}

impl hometruth_extractor::PropertyNormalizer for FailOnce {
    fn price(
        &self,
        payload: &hometruth_core::RawPayload,
    ) -> Result<Option<u64>, hometruth_extractor::ExtractorError> {
        if !self.tripped.swap(true, std::sync::atomic::Ordering::SeqCst) {
            panic!("transient normalizer fault");
        }
        Ok(hometruth_extractor::normalize::extract_price(payload))
    }
}

fn lines(out: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(out)
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line is JSON"))
        .collect()
}

// ---------------------------------------------------------------------------
// argument parsing
// ---------------------------------------------------------------------------

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["hometruth-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
    assert!(!cli.report_history);
}

#[test]
fn parses_classify_with_multiple_urls() {
    let cli = Cli::try_parse_from([
        "hometruth-cli",
        "classify",
        "https://www.rightmove.co.uk/properties/1",
        "https://www.zoopla.co.uk/for-sale/details/2/",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Classify { ref urls }) if urls.len() == 2
    ));
}

#[test]
fn help_parses_without_app_config() {
    let err = Cli::try_parse_from(["hometruth-cli", "--help"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
}

#[test]
fn classify_requires_a_url() {
    assert!(Cli::try_parse_from(["hometruth-cli", "classify"]).is_err());
}

#[test]
fn parses_extract_with_source() {
    let cli = Cli::try_parse_from([
        "hometruth-cli",
        "extract",
        "--url",
        "https://www.rightmove.co.uk/properties/1",
        "--payload",
        "listing.json",
        "--source",
        "rightmove",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Extract {
            source: Some(ref s),
            ..
        }) if s == "rightmove"
    ));
}

#[test]
fn parses_batch_dedupe_and_global_flags() {
    let cli = Cli::try_parse_from([
        "hometruth-cli",
        "batch",
        "listings.jsonl",
        "--dedupe",
        "--report-history",
        "--sources",
        "config/sources.yaml",
    ])
    .unwrap();
    assert!(cli.report_history);
    assert_eq!(cli.sources, Some(PathBuf::from("config/sources.yaml")));
    assert!(matches!(
        cli.command,
        Some(Commands::Batch { dedupe: true, .. })
    ));
}

// ---------------------------------------------------------------------------
// handlers
// ---------------------------------------------------------------------------

#[test]
fn classify_prints_one_row_per_url() {
    let (extractor, _) = extractor();
    let urls = vec![
        "https://www.rightmove.co.uk/properties/123456".to_string(),
        "https://www.zoopla.co.uk/for-sale/property/london/".to_string(),
        "https://www.example.com/".to_string(),
    ];
    let mut out = Vec::new();
    commands::run_classify(&extractor, &urls, &mut out).unwrap();

    let rows = lines(&out);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["source"], "rightmove");
    assert_eq!(rows[0]["isListing"], true);
    assert_eq!(rows[0]["identity"], "rightmove-123456");
    assert_eq!(rows[1]["source"], "zoopla");
    assert_eq!(rows[1]["isListing"], false);
    assert_eq!(rows[1]["identity"], Value::Null);
    assert_eq!(rows[2]["source"], Value::Null);
}

#[test]
fn extract_prints_outcome_json() {
    let (extractor, _) = extractor();
    let payload = temp_file("extract.json", r#"{"price": "£425,000", "bedrooms": 2}"#);
    let mut out = Vec::new();
    commands::run_extract(
        &extractor,
        "https://www.rightmove.co.uk/properties/42",
        &payload,
        None,
        &mut out,
    )
    .unwrap();
    std::fs::remove_file(&payload).ok();

    let value: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(value["id"], "rightmove-42");
    assert_eq!(value["price"], 425_000);
    assert_eq!(value["rawData"]["price"], "£425,000");
}

#[test]
fn extract_missing_payload_file_is_an_error() {
    let (extractor, _) = extractor();
    let mut out = Vec::new();
    let err = commands::run_extract(
        &extractor,
        "https://www.rightmove.co.uk/properties/42",
        std::path::Path::new("/nonexistent/payload.json"),
        None,
        &mut out,
    )
    .unwrap_err();
    assert!(err.to_string().contains("reading payload"));
}

#[test]
fn batch_dedupes_by_identity() {
    let (extractor, _) = extractor();
    let contents = [
        r#"{"url": "https://www.rightmove.co.uk/properties/1", "payload": {"price": 100000}}"#,
        r#"{"url": "https://www.rightmove.co.uk/properties/1?utm=feed", "payload": {"price": 100000}}"#,
        "",
        r#"{"url": "https://www.zoopla.co.uk/for-sale/details/9/", "payload": {"bedrooms": 1}}"#,
        r#"not json"#,
        r#"{"url": "https://www.example.com/x"}"#,
    ]
    .join("\n");
    let path = temp_file("batch.jsonl", &contents);

    let mut out = Vec::new();
    let summary = commands::run_batch(&extractor, &path, true, &mut out).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(
        summary,
        commands::BatchSummary {
            lines: 5,
            extracted: 2,
            failed: 1,
            duplicates: 1,
            malformed: 1,
        }
    );
    let rows = lines(&out);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["id"], "rightmove-1");
    assert_eq!(rows[1]["id"], "zoopla-9");
    assert_eq!(rows[2]["extractionError"], true);
}

#[test]
fn batch_without_dedupe_keeps_duplicates() {
    let (extractor, _) = extractor();
    let line = r#"{"url": "https://www.rightmove.co.uk/properties/1", "payload": {}}"#;
    let path = temp_file("batch-nodedupe.jsonl", &format!("{line}\n{line}\n"));

    let mut out = Vec::new();
    let summary = commands::run_batch(&extractor, &path, false, &mut out).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(summary.extracted, 2);
    assert_eq!(summary.duplicates, 0);
}

#[test]
fn batch_dedupe_lets_success_follow_a_failure() {
    let (extractor, _) = extractor();
    let contents = [
        r#"{"url": "https://www.rightmove.co.uk/properties/7", "payload": {}}"#,
        r#"{"url": "https://www.rightmove.co.uk/properties/7", "payload": {"price": 250000}}"#,
        r#"{"url": "https://www.rightmove.co.uk/properties/7", "payload": {"price": 250000}}"#,
    ]
    .join("\n");
    let path = temp_file("batch-retry.jsonl", &contents);

    let failing = extractor.clone().with_normalizer(Arc::new(FailOnce::default()));
    let mut out = Vec::new();
    let summary = commands::run_batch(&failing, &path, true, &mut out).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.extracted, 1);
    assert_eq!(summary.duplicates, 1);
    let rows = lines(&out);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["extractionError"], true);
    assert_eq!(rows[1]["id"], "rightmove-7");
    assert_eq!(rows[1]["price"], 250_000);
}

#[test]
fn sources_lists_registry_in_order() {
    let registry = SourceRegistry::builtin();
    let mut out = Vec::new();
    commands::run_sources(&registry, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let ids: Vec<_> = text
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .collect();
    assert_eq!(ids, ["rightmove", "zoopla", "onthemarket", "primelocation"]);
}

#[test]
fn reporter_fans_out_to_history() {
    let config = AppConfig {
        redact_reports: true,
        ..AppConfig::default()
    };
    let registry = SourceRegistry::builtin();
    let history = Arc::new(build_memory_reporter(&config, &registry));
    let reporter = build_reporter(&config, &registry, Arc::clone(&history));
    let extractor = ListingExtractor::new(Arc::new(registry), reporter);

    assert_eq!(extractor.identify_source("not a url"), None);
    assert_eq!(history.len(), 1);
}
