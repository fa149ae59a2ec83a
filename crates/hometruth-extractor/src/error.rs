use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid {field} pattern for source {source_id}: {source}")]
    InvalidPattern {
        source_id: String,
        field: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("invalid source registry: {0}")]
    InvalidRegistry(String),

    #[error("could not coerce field {field}: {reason}")]
    FieldCoercion { field: &'static str, reason: String },
}
