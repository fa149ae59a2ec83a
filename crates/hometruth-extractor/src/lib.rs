pub mod assemble;
pub mod classify;
pub mod error;
pub mod extractor;
pub mod identity;
pub mod normalize;
pub mod normalizer;
pub mod redact;
pub mod registry;
pub mod report;
pub mod tenure;

pub use error::ExtractorError;
pub use extractor::ListingExtractor;
pub use normalizer::{PropertyNormalizer, StandardNormalizer};
pub use redact::Redactor;
pub use registry::{SourceDescriptor, SourceRegistry};
pub use report::{
    ErrorReport, ErrorReporter, ExtractionStage, FanoutReporter, MemoryReporter, ReportContext,
    TracingReporter, DEFAULT_REPORT_HISTORY,
};
pub use tenure::infer_tenure;
