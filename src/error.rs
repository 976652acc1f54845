use thiserror::Error;

/// A money token that could not be turned into a number.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AmountError {
    #[error("empty amount token")]
    Empty,
    #[error("invalid amount: {0:?}")]
    Invalid(String),
}

/// A date token that is not a real `MM/DD/YYYY` date.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DateError {
    #[error("not a MM/DD/YYYY token: {0:?}")]
    Shape(String),
    #[error("year must have four digits: {0:?}")]
    ShortYear(String),
    #[error("no such calendar date: {0:?}")]
    Calendar(String),
}

/// Why a classification rule that applied to a line produced no fact.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LineMiss {
    #[error(transparent)]
    Date(#[from] DateError),
    #[error(transparent)]
    Amount(#[from] AmountError),
    #[error("deposit amount {0} is not positive")]
    NotPositive(f64),
}

/// Native text-layer failures. These only ever trigger the OCR fallback.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to parse PDF: {0}")]
    Load(#[from] lopdf::Error),
    #[error("PDF pages are image-only")]
    ImageOnly,
    #[error("text extraction failed: {0}")]
    Text(String),
}

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{program} exited with {status}: {stderr}")]
    Command {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

#[derive(Debug, Error)]
pub enum TaggerError {
    #[error("entity tagger unavailable: {0}")]
    Unavailable(String),
    #[error("entity tagging failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}
