use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub corpus: CorpusConfig,
    pub classifier: ClassifierConfig,
    pub topics: TopicConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub path: PathBuf,
    pub max_rows: usize,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/posts.csv"),
            max_rows: 100_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the whole query on the first classification failure.
    #[default]
    FailFast,
    /// Drop the post and record a diagnostic.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub model_dir: PathBuf,
    pub max_tokens: usize,
    pub truncate_chars: usize,
    pub serialize_inference: bool,
    pub failure_policy: FailurePolicy,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models/bert-emotions"),
            max_tokens: 512,
            truncate_chars: 300,
            serialize_inference: false,
            failure_policy: FailurePolicy::FailFast,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    pub min_documents: usize,
    pub max_topics: usize,
    pub words_per_topic: usize,
    pub iterations: usize,
    pub seed: u64,
    pub min_word_len: usize,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            min_documents: 10,
            max_topics: 10,
            words_per_topic: 10,
            iterations: 50,
            seed: 42,
            min_word_len: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "pulsemap=info,analytics=info,corpus_store=info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => ConfigError::Unreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            },
        })?;
        Self::from_toml_str(&raw)
    }

    /// Reads `path` if it exists, otherwise returns the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::info!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("corpus.max_rows", self.corpus.max_rows),
            ("classifier.max_tokens", self.classifier.max_tokens),
            ("classifier.truncate_chars", self.classifier.truncate_chars),
            ("topics.max_topics", self.topics.max_topics),
            ("topics.words_per_topic", self.topics.words_per_topic),
            ("topics.iterations", self.topics.iterations),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.to_string(),
                });
            }
        }

        if self.corpus.path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed {
                reason: "corpus.path must not be empty".to_string(),
            });
        }

        Ok(())
    }
}
