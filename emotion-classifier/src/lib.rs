mod bert;

pub use bert::BertEmotionBackend;

use pulsemap_core::{ClassifierConfig, ClassifierError, EmotionLabel};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Maps post text to one of the eleven emotion labels.
pub trait EmotionClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Result<EmotionLabel, ClassifierError>;
}

/// Raw model access: tokenization length and the arg-max class ordinal.
pub trait InferenceBackend: Send + Sync {
    fn token_count(&self, text: &str) -> Result<usize, ClassifierError>;

    fn predict_ordinal(&self, text: &str) -> Result<i64, ClassifierError>;
}

/// Returns at most `max_chars` characters of `text`, cut on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Classifier that shortens over-budget inputs instead of rejecting them.
pub struct TruncatingClassifier<B> {
    backend: B,
    max_tokens: usize,
    truncate_chars: usize,
}

impl<B: InferenceBackend> TruncatingClassifier<B> {
    pub fn new(backend: B, max_tokens: usize, truncate_chars: usize) -> Self {
        Self {
            backend,
            max_tokens,
            truncate_chars,
        }
    }

    pub fn from_config(backend: B, config: &ClassifierConfig) -> Self {
        Self::new(backend, config.max_tokens, config.truncate_chars)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: InferenceBackend> EmotionClassifier for TruncatingClassifier<B> {
    fn classify(&self, text: &str) -> Result<EmotionLabel, ClassifierError> {
        let tokens = self.backend.token_count(text)?;
        let input = if tokens > self.max_tokens {
            warn!(
                "Input of {} tokens exceeds the {} token limit, truncating to {} characters",
                tokens, self.max_tokens, self.truncate_chars
            );
            truncate_chars(text, self.truncate_chars)
        } else {
            text
        };

        let ordinal = self.backend.predict_ordinal(input)?;
        EmotionLabel::from_ordinal(ordinal)
    }
}

/// Runs one inference at a time for backends that are not reentrant.
pub struct SerializedClassifier<C> {
    inner: Mutex<C>,
}

impl<C: EmotionClassifier> SerializedClassifier<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }
}

impl<C: EmotionClassifier> EmotionClassifier for SerializedClassifier<C> {
    fn classify(&self, text: &str) -> Result<EmotionLabel, ClassifierError> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| ClassifierError::InferenceFailed {
                reason: "classifier lock poisoned by an earlier panic".to_string(),
            })?;
        guard.classify(text)
    }
}

/// Wraps a backend according to the classifier config, ready to share across queries.
pub fn shared_classifier<B>(backend: B, config: &ClassifierConfig) -> Arc<dyn EmotionClassifier>
where
    B: InferenceBackend + 'static,
{
    let classifier = TruncatingClassifier::from_config(backend, config);
    if config.serialize_inference {
        info!("Emotion inference is serialized behind a mutex");
        Arc::new(SerializedClassifier::new(classifier))
    } else {
        Arc::new(classifier)
    }
}

/// Loads the BERT emotion model named in the config.
pub fn load_classifier(config: &ClassifierConfig) -> Result<Arc<dyn EmotionClassifier>, ClassifierError> {
    let backend = BertEmotionBackend::load(&config.model_dir)?;
    Ok(shared_classifier(backend, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubBackend {
        ordinal: i64,
        seen: Mutex<Vec<String>>,
    }

    impl StubBackend {
        fn returning(ordinal: i64) -> Self {
            Self {
                ordinal,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl InferenceBackend for StubBackend {
        fn token_count(&self, text: &str) -> Result<usize, ClassifierError> {
            Ok(text.split_whitespace().count())
        }

        fn predict_ordinal(&self, text: &str) -> Result<i64, ClassifierError> {
            self.seen.lock().unwrap().push(text.to_string());
            Ok(self.ordinal)
        }
    }

    struct FailingBackend;

    impl InferenceBackend for FailingBackend {
        fn token_count(&self, _text: &str) -> Result<usize, ClassifierError> {
            Ok(1)
        }

        fn predict_ordinal(&self, _text: &str) -> Result<i64, ClassifierError> {
            Err(ClassifierError::InferenceFailed {
                reason: "device lost".to_string(),
            })
        }
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("short", 300), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_short_input_passes_through() {
        let classifier = TruncatingClassifier::new(StubBackend::returning(4), 512, 300);
        let label = classifier.classify("I am happy today").unwrap();
        assert_eq!(label, EmotionLabel::Joy);
        assert_eq!(classifier.backend().seen.lock().unwrap()[0], "I am happy today");
    }

    #[test]
    fn test_long_input_is_truncated_not_rejected() {
        let classifier = TruncatingClassifier::new(StubBackend::returning(8), 512, 300);
        let long_text = "word ".repeat(600);

        let label = classifier.classify(&long_text).unwrap();
        assert_eq!(label, EmotionLabel::Sadness);

        let seen = classifier.backend().seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].chars().count(), 300);
    }

    #[test]
    fn test_out_of_range_ordinal_is_invalid_label() {
        let classifier = TruncatingClassifier::new(StubBackend::returning(11), 512, 300);
        assert!(matches!(
            classifier.classify("text"),
            Err(ClassifierError::InvalidLabel { ordinal: 11 })
        ));
    }

    #[test]
    fn test_backend_failure_propagates() {
        let classifier = TruncatingClassifier::new(FailingBackend, 512, 300);
        assert!(matches!(
            classifier.classify("text"),
            Err(ClassifierError::InferenceFailed { .. })
        ));
    }

    #[test]
    fn test_shared_classifier_honours_serialization_flag() {
        let config = ClassifierConfig {
            serialize_inference: true,
            ..ClassifierConfig::default()
        };
        let classifier = shared_classifier(StubBackend::returning(10), &config);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let classifier = Arc::clone(&classifier);
                std::thread::spawn(move || classifier.classify("trust me"))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), EmotionLabel::Trust);
        }
    }
}
