use emotion_classifier::EmotionClassifier;
use pulsemap_core::{
    ClassifierError, Diagnostic, EmotionLabel, EmotionSummary, FailurePolicy, FilteredSet, Region,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Per-post predictions in filter order, plus the label histogram over them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmotionTally {
    pub predicted: Vec<EmotionLabel>,
    pub counts: BTreeMap<EmotionLabel, usize>,
    pub diagnostics: Vec<Diagnostic>,
}

impl EmotionTally {
    pub fn into_summary(self, region: Region, keyword: impl Into<String>) -> EmotionSummary {
        EmotionSummary {
            region,
            keyword: keyword.into(),
            predicted_emotions: self.predicted,
            emotion_counts: self.counts,
            diagnostics: self.diagnostics,
        }
    }
}

pub struct EmotionAggregator<'c> {
    classifier: &'c dyn EmotionClassifier,
    policy: FailurePolicy,
}

impl<'c> EmotionAggregator<'c> {
    pub fn new(classifier: &'c dyn EmotionClassifier, policy: FailurePolicy) -> Self {
        Self { classifier, policy }
    }

    /// Classifies every post of the set once. Under `FailFast` the first
    /// classifier error aborts the whole aggregation; under `Skip` the post is
    /// left out and a diagnostic is recorded instead.
    pub fn aggregate(&self, set: &FilteredSet<'_>) -> Result<EmotionTally, ClassifierError> {
        let mut tally = EmotionTally {
            diagnostics: set.diagnostics.clone(),
            ..EmotionTally::default()
        };

        for post in &set.posts {
            match self.classifier.classify(post.text) {
                Ok(label) => {
                    tally.predicted.push(label);
                    *tally.counts.entry(label).or_insert(0) += 1;
                }
                Err(error) => match self.policy {
                    FailurePolicy::FailFast => return Err(error),
                    FailurePolicy::Skip => {
                        warn!("Skipping post {}: {}", post.position, error);
                        tally.diagnostics.push(Diagnostic::ClassificationSkipped {
                            position: post.position,
                            reason: error.to_string(),
                        });
                    }
                },
            }
        }

        debug!(
            "Classified {} posts into {} distinct emotions",
            tally.predicted.len(),
            tally.counts.len()
        );
        Ok(tally)
    }
}
