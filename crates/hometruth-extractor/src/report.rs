//! Fire-and-forget sink for classification and assembly failures.
//!
//! The engine never waits on a reporter and never changes its output based on
//! one. Remote telemetry backends plug in by implementing [`ErrorReporter`].

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::redact::Redactor;

/// Default history size for [`MemoryReporter`].
pub const DEFAULT_REPORT_HISTORY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportCategory {
    Extraction,
}

/// Pipeline step that produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStage {
    SourceIdentification,
    PageClassification,
    IdentityDerivation,
    DataProcessing,
}

impl fmt::Display for ExtractionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionStage::SourceIdentification => write!(f, "source_identification"),
            ExtractionStage::PageClassification => write!(f, "page_classification"),
            ExtractionStage::IdentityDerivation => write!(f, "identity_derivation"),
            ExtractionStage::DataProcessing => write!(f, "data_processing"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportContext {
    pub url: String,
    pub source_id: Option<String>,
    pub listing_id: Option<String>,
    /// Serialized size of the raw payload.
    pub payload_bytes: Option<usize>,
    /// Hex SHA-256 of the serialized raw payload.
    pub payload_digest: Option<String>,
}

impl ReportContext {
    #[must_use]
    pub fn for_url(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_source(mut self, source_id: &str) -> Self {
        self.source_id = Some(source_id.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub category: ReportCategory,
    pub stage: ExtractionStage,
    pub message: String,
    pub context: ReportContext,
}

impl ErrorReport {
    #[must_use]
    pub fn new(stage: ExtractionStage, message: impl Into<String>, context: ReportContext) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            category: ReportCategory::Extraction,
            stage,
            message: message.into(),
            context,
        }
    }
}

/// Receives `(error, context)` reports. Implementations must not block and
/// must not panic.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, report: ErrorReport);
}

/// Logs every report through `tracing`.
///
/// Data-processing failures log at `error`; classification failures at `warn`.
#[derive(Debug, Default)]
pub struct TracingReporter {
    redactor: Option<Redactor>,
}

impl TracingReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_redactor(mut self, redactor: Redactor) -> Self {
        self.redactor = Some(redactor);
        self
    }
}

impl ErrorReporter for TracingReporter {
    fn report(&self, report: ErrorReport) {
        let report = match &self.redactor {
            Some(redactor) => redactor.apply(report),
            None => report,
        };
        let ctx = &report.context;

        if report.stage == ExtractionStage::DataProcessing {
            tracing::error!(
                report_id = %report.id,
                stage = %report.stage,
                url = %ctx.url,
                source_id = ?ctx.source_id,
                listing_id = ?ctx.listing_id,
                payload_bytes = ?ctx.payload_bytes,
                payload_digest = ?ctx.payload_digest,
                "{}",
                report.message
            );
        } else {
            tracing::warn!(
                report_id = %report.id,
                stage = %report.stage,
                url = %ctx.url,
                source_id = ?ctx.source_id,
                "{}",
                report.message
            );
        }
    }
}

/// Keeps the most recent reports in memory, newest first.
#[derive(Debug)]
pub struct MemoryReporter {
    capacity: usize,
    redactor: Option<Redactor>,
    history: Mutex<VecDeque<ErrorReport>>,
}

impl MemoryReporter {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            redactor: None,
            history: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    #[must_use]
    pub fn with_redactor(mut self, redactor: Redactor) -> Self {
        self.redactor = Some(redactor);
        self
    }

    /// Up to `limit` reports, newest first.
    #[must_use]
    pub fn history(&self, limit: usize) -> Vec<ErrorReport> {
        self.lock().iter().take(limit).cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<ErrorReport>> {
        // A poisoned history is still a usable history.
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryReporter {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_HISTORY)
    }
}

impl ErrorReporter for MemoryReporter {
    fn report(&self, report: ErrorReport) {
        if self.capacity == 0 {
            return;
        }
        let report = match &self.redactor {
            Some(redactor) => redactor.apply(report),
            None => report,
        };
        let mut history = self.lock();
        history.push_front(report);
        history.truncate(self.capacity);
    }
}

/// Forwards every report to each inner reporter in order.
#[derive(Default)]
pub struct FanoutReporter {
    reporters: Vec<std::sync::Arc<dyn ErrorReporter>>,
}

impl FanoutReporter {
    #[must_use]
    pub fn new(reporters: Vec<std::sync::Arc<dyn ErrorReporter>>) -> Self {
        Self { reporters }
    }
}

impl ErrorReporter for FanoutReporter {
    fn report(&self, report: ErrorReport) {
        if let Some((last, rest)) = self.reporters.split_last() {
            for reporter in rest {
                reporter.report(report.clone());
            }
            last.report(report);
        }
    }
}
