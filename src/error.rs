use thiserror::Error;

/// The error type shared across the whole engine.
///
/// A flat enum of `#[error("...")]` variants, with `#[from]` wrapping for the
/// couple of lower-level errors callers actually need to inspect.
#[derive(Debug, Error)]
pub enum TabqlError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("type error: {0}")]
    TypeError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("dependency missing: {0}")]
    DependencyMissing(String),
}

pub type Result<T> = std::result::Result<T, TabqlError>;
