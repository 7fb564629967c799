mod frequencies;
mod lda;

pub use frequencies::WordFrequencies;
pub use lda::{LdaConfig, LdaTopicModel};

use pulsemap_core::{FilteredSet, TopicConfig, TopicModelError};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Topic identifier. `Outlier` is the "no-topic" class for documents that fit nowhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TopicId {
    Outlier,
    Topic(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    pub id: TopicId,
    /// Ranked (word, relevance) pairs, most relevant first.
    pub words: Vec<(String, f64)>,
}

pub trait TopicModel: Send + Sync {
    fn extract_topics(
        &self,
        documents: &[&str],
        max_topics: usize,
    ) -> Result<Vec<Topic>, TopicModelError>;
}

/// Turns a filtered post set into a flat word -> relevance map.
pub struct TopicExtractor {
    model: Arc<dyn TopicModel>,
    min_documents: usize,
    max_topics: usize,
}

impl TopicExtractor {
    pub fn new(model: Arc<dyn TopicModel>, min_documents: usize, max_topics: usize) -> Self {
        Self {
            model,
            min_documents,
            max_topics,
        }
    }

    pub fn from_config(model: Arc<dyn TopicModel>, config: &TopicConfig) -> Self {
        Self::new(model, config.min_documents, config.max_topics)
    }

    pub fn extract(&self, set: &FilteredSet<'_>) -> Result<BTreeMap<String, f64>, TopicModelError> {
        self.extract_documents(&set.texts())
    }

    pub fn extract_documents(
        &self,
        documents: &[&str],
    ) -> Result<BTreeMap<String, f64>, TopicModelError> {
        if documents.is_empty() || documents.len() < self.min_documents {
            debug!(
                "Skipping topic modeling: {} documents, {} required",
                documents.len(),
                self.min_documents
            );
            return Ok(BTreeMap::new());
        }

        let topics = self.model.extract_topics(documents, self.max_topics)?;
        Ok(merge_topics(topics, self.max_topics))
    }
}

/// Flattens topics into one map. Topics are visited by ascending id, the outlier
/// topic is dropped, and a word shared by several topics keeps its highest
/// relevance (the lower topic id on ties).
pub fn merge_topics(mut topics: Vec<Topic>, max_topics: usize) -> BTreeMap<String, f64> {
    topics.sort_by_key(|topic| topic.id);

    let mut words: BTreeMap<String, f64> = BTreeMap::new();
    for topic in topics
        .iter()
        .filter(|topic| topic.id != TopicId::Outlier)
        .take(max_topics)
    {
        for (word, relevance) in &topic.words {
            words
                .entry(word.clone())
                .and_modify(|existing| {
                    if *relevance > *existing {
                        *existing = *relevance;
                    }
                })
                .or_insert(*relevance);
        }
    }
    words
}

/// Seeded LDA model built from the topic config.
pub fn default_topic_model(config: &TopicConfig) -> Arc<dyn TopicModel> {
    Arc::new(LdaTopicModel::new(LdaConfig::from(config)))
}
