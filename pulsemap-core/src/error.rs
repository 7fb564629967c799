use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Corpus unavailable: {0}")]
    Corpus(#[from] CorpusError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Topic model error: {0}")]
    TopicModel(#[from] TopicModelError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Failures to produce the corpus snapshot. Every variant is fatal at startup.
#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("Corpus source not found: {path}")]
    SourceMissing { path: String },

    #[error("Corpus source unreadable: {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("Missing required column: {column}")]
    MissingColumn { column: String },

    #[error("Malformed value in row {row}, column {column}: {value:?}")]
    MalformedValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Model loading failed: {model_path}: {reason}")]
    ModelLoadingFailed { model_path: String, reason: String },

    #[error("Tokenization failed: {text_length} characters: {reason}")]
    TokenizationFailed { text_length: usize, reason: String },

    #[error("Model inference failed: {reason}")]
    InferenceFailed { reason: String },

    #[error("Classifier returned unknown label ordinal {ordinal}")]
    InvalidLabel { ordinal: i64 },
}

#[derive(Error, Debug)]
pub enum TopicModelError {
    #[error("Topic count must be positive")]
    NoTopicsRequested,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Configuration file unreadable: {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A single corpus record that could not be coerced to text while filtering.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Record {position} text could not be coerced: {reason}")]
pub struct RecordCoercionError {
    pub position: usize,
    pub reason: String,
}
