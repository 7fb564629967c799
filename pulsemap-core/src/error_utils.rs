use crate::error::*;
use tracing::{error, info, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn is_fatal(&self) -> bool;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::Corpus(e) => {
                error!("Corpus error details: {:?}", e);
            }
            CoreError::Classifier(e) => {
                error!("Classifier error details: {:?}", e);
            }
            CoreError::TopicModel(e) => {
                error!("Topic model error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn is_fatal(&self) -> bool {
        match self {
            CoreError::Corpus(_) | CoreError::Config(_) => true,
            CoreError::Classifier(e) => e.is_fatal(),
            CoreError::TopicModel(e) => e.is_fatal(),
            _ => false,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::Corpus(e) => e.user_friendly_message(),
            CoreError::Classifier(e) => e.user_friendly_message(),
            CoreError::TopicModel(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::InvalidInput { message } => {
                format!("Invalid input: {}. Please check the query and try again.", message)
            }
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::Corpus(_) => "CORPUS".to_string(),
            CoreError::Classifier(_) => "CLASSIFIER".to_string(),
            CoreError::TopicModel(_) => "TOPIC_MODEL".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }
}

impl ErrorExt for CorpusError {
    fn log_error(&self) -> &Self {
        error!("CorpusError: {}", self);
        self
    }

    fn is_fatal(&self) -> bool {
        true // the corpus is loaded once; there is nothing to fall back to
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CorpusError::SourceMissing { path } => {
                format!("Post data file '{}' was not found.", path)
            }
            CorpusError::MissingColumn { column } => {
                format!("Post data is missing the required '{}' column.", column)
            }
            CorpusError::MalformedValue { row, column, .. } => format!(
                "Post data has an invalid '{}' value on row {}.",
                column, row
            ),
            _ => "Post data could not be loaded.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CorpusError::SourceMissing { .. } => "CORPUS_SOURCE_MISSING".to_string(),
            CorpusError::Unreadable { .. } => "CORPUS_UNREADABLE".to_string(),
            CorpusError::MissingColumn { .. } => "CORPUS_MISSING_COLUMN".to_string(),
            CorpusError::MalformedValue { .. } => "CORPUS_MALFORMED_VALUE".to_string(),
            CorpusError::Csv(_) => "CORPUS_CSV_ERROR".to_string(),
        }
    }
}

impl ErrorExt for ClassifierError {
    fn log_error(&self) -> &Self {
        error!("ClassifierError: {}", self);
        self
    }

    fn is_fatal(&self) -> bool {
        matches!(self, ClassifierError::ModelLoadingFailed { .. })
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ClassifierError::ModelLoadingFailed { .. } => {
                "Failed to load the emotion model. Please check the model directory.".to_string()
            }
            ClassifierError::InvalidLabel { ordinal } => format!(
                "The emotion model returned an unknown label ({}).",
                ordinal
            ),
            _ => "Emotion classification failed. Please try again.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            ClassifierError::ModelLoadingFailed { .. } => "CLASSIFIER_MODEL_LOAD_FAILED".to_string(),
            ClassifierError::TokenizationFailed { .. } => {
                "CLASSIFIER_TOKENIZATION_FAILED".to_string()
            }
            ClassifierError::InferenceFailed { .. } => "CLASSIFIER_INFERENCE_FAILED".to_string(),
            ClassifierError::InvalidLabel { .. } => "CLASSIFIER_INVALID_LABEL".to_string(),
        }
    }
}

impl ErrorExt for TopicModelError {
    fn log_error(&self) -> &Self {
        error!("TopicModelError: {}", self);
        self
    }

    fn is_fatal(&self) -> bool {
        false
    }

    fn user_friendly_message(&self) -> String {
        "Topic extraction failed for this selection.".to_string()
    }

    fn error_code(&self) -> String {
        match self {
            TopicModelError::NoTopicsRequested => "TOPIC_NONE_REQUESTED".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn is_fatal(&self) -> bool {
        true
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file '{}' not found.", path)
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            _ => "Configuration error occurred. Please check your settings.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::Unreadable { .. } => "CONFIG_UNREADABLE".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

/// Logs failures that reach the binary. Fatal errors go out at error level,
/// errors that only sink one query at warn level.
#[derive(Debug, Default)]
pub struct ErrorReporter;

impl ErrorReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn report(&self, error: &CoreError) {
        if error.is_fatal() {
            self.report_error(error);
        } else {
            self.report_warning(error);
        }
    }

    fn report_error(&self, error: &CoreError) {
        error.log_error();
        info!("Error code: {}", error.error_code());
        info!("User message: {}", error.user_friendly_message());
        info!("Error is fatal; the process cannot continue serving queries");
    }

    fn report_warning(&self, error: &CoreError) {
        warn!("Query failed [{}]: {}", error.error_code(), error);
        info!("User message: {}", error.user_friendly_message());
    }
}
