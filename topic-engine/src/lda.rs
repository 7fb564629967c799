use crate::{Topic, TopicId, TopicModel};
use pulsemap_core::{TopicConfig, TopicModelError};
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "your", "all", "can", "had", "her", "was",
    "one", "our", "out", "get", "has", "him", "his", "how", "its", "may", "now", "who", "did",
    "what", "when", "where", "will", "with", "this", "that", "have", "from", "they", "been",
    "some", "very", "just", "like", "than", "them", "well", "were", "there", "their", "would",
    "could", "should", "does", "being", "having", "doing", "more", "most", "also", "too",
    "even", "still", "really", "about", "into", "then", "these", "those", "which", "while",
    "here", "only", "because", "http", "https", "www", "com", "amp",
];

#[derive(Debug, Clone, PartialEq)]
pub struct LdaConfig {
    pub iterations: usize,
    pub alpha: f64, // document-topic concentration
    pub beta: f64,  // topic-word concentration
    pub words_per_topic: usize,
    pub min_word_len: usize,
    pub min_word_freq: usize,
    pub max_vocab_size: usize,
    pub seed: u64,
}

impl Default for LdaConfig {
    fn default() -> Self {
        Self {
            iterations: 50,
            alpha: 0.1,
            beta: 0.01,
            words_per_topic: 10,
            min_word_len: 3,
            min_word_freq: 2,
            max_vocab_size: 1000,
            seed: 42,
        }
    }
}

impl From<&TopicConfig> for LdaConfig {
    fn from(config: &TopicConfig) -> Self {
        Self {
            iterations: config.iterations,
            words_per_topic: config.words_per_topic,
            min_word_len: config.min_word_len,
            seed: config.seed,
            ..Self::default()
        }
    }
}

/// Collapsed Gibbs sampling LDA. A fixed seed makes every run identical.
pub struct LdaTopicModel {
    config: LdaConfig,
    word_re: Regex,
}

impl LdaTopicModel {
    pub fn new(config: LdaConfig) -> Self {
        Self {
            config,
            word_re: Regex::new(r"\p{Alphabetic}+").expect("compile word pattern"),
        }
    }

    fn tokenize(&self, document: &str) -> Vec<String> {
        let lowered = document.to_lowercase();
        self.word_re
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|word| {
                word.chars().count() >= self.config.min_word_len && !STOP_WORDS.contains(word)
            })
            .map(str::to_string)
            .collect()
    }

    /// Words seen at least `min_word_freq` times, most frequent first.
    fn build_vocabulary(&self, documents: &[Vec<String>]) -> Vec<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for word in documents.iter().flatten() {
            *counts.entry(word.as_str()).or_insert(0) += 1;
        }

        let mut vocabulary: Vec<(&str, usize)> = counts
            .into_iter()
            .filter(|(_, count)| *count >= self.config.min_word_freq)
            .collect();
        vocabulary.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        vocabulary.truncate(self.config.max_vocab_size);

        vocabulary
            .into_iter()
            .map(|(word, _)| word.to_string())
            .collect()
    }

    fn ranked(&self, mut scored: Vec<(String, f64)>) -> Vec<(String, f64)> {
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(self.config.words_per_topic);
        scored
    }

    /// Raw term frequencies of documents no topic could claim.
    fn outlier_topic(&self, documents: &[Vec<String>], outliers: &[usize]) -> Topic {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut total = 0usize;
        for &doc in outliers {
            for word in &documents[doc] {
                *counts.entry(word.as_str()).or_insert(0) += 1;
                total += 1;
            }
        }

        let scored = counts
            .into_iter()
            .map(|(word, count)| (word.to_string(), count as f64 / total.max(1) as f64))
            .collect();

        Topic {
            id: TopicId::Outlier,
            words: self.ranked(scored),
        }
    }
}

struct GibbsState {
    num_topics: usize,
    vocab_size: usize,
    alpha: f64,
    beta: f64,
    doc_topic: Vec<Vec<usize>>,
    topic_word: Vec<Vec<usize>>,
    topic_totals: Vec<usize>,
    assignments: Vec<Vec<usize>>,
}

impl GibbsState {
    fn new(
        word_docs: &[Vec<usize>],
        vocab_size: usize,
        num_topics: usize,
        config: &LdaConfig,
        rng: &mut fastrand::Rng,
    ) -> Self {
        let mut state = Self {
            num_topics,
            vocab_size,
            alpha: config.alpha,
            beta: config.beta,
            doc_topic: vec![vec![0; num_topics]; word_docs.len()],
            topic_word: vec![vec![0; vocab_size]; num_topics],
            topic_totals: vec![0; num_topics],
            assignments: Vec::with_capacity(word_docs.len()),
        };

        for (doc, words) in word_docs.iter().enumerate() {
            let mut topics = Vec::with_capacity(words.len());
            for &word in words {
                let topic = rng.usize(0..num_topics);
                state.add(doc, word, topic);
                topics.push(topic);
            }
            state.assignments.push(topics);
        }
        state
    }

    fn add(&mut self, doc: usize, word: usize, topic: usize) {
        self.doc_topic[doc][topic] += 1;
        self.topic_word[topic][word] += 1;
        self.topic_totals[topic] += 1;
    }

    fn remove(&mut self, doc: usize, word: usize, topic: usize) {
        self.doc_topic[doc][topic] -= 1;
        self.topic_word[topic][word] -= 1;
        self.topic_totals[topic] -= 1;
    }

    fn word_probability(&self, topic: usize, word: usize) -> f64 {
        (self.topic_word[topic][word] as f64 + self.beta)
            / (self.topic_totals[topic] as f64 + self.vocab_size as f64 * self.beta)
    }

    fn sweep(&mut self, word_docs: &[Vec<usize>], rng: &mut fastrand::Rng) {
        let mut weights = vec![0.0; self.num_topics];
        for (doc, words) in word_docs.iter().enumerate() {
            for (position, &word) in words.iter().enumerate() {
                let old_topic = self.assignments[doc][position];
                self.remove(doc, word, old_topic);

                for (topic, weight) in weights.iter_mut().enumerate() {
                    *weight = (self.doc_topic[doc][topic] as f64 + self.alpha)
                        * self.word_probability(topic, word);
                }
                let new_topic = sample(&weights, rng);

                self.add(doc, word, new_topic);
                self.assignments[doc][position] = new_topic;
            }
        }
    }

    /// Topic with the most tokens in `doc`; `None` when the doc has no vocabulary words.
    fn dominant_topic(&self, doc: usize) -> Option<usize> {
        let counts = &self.doc_topic[doc];
        let best = (0..self.num_topics).max_by(|&a, &b| counts[a].cmp(&counts[b]).then(b.cmp(&a)))?;
        (counts[best] > 0).then_some(best)
    }
}

fn sample(weights: &[f64], rng: &mut fastrand::Rng) -> usize {
    let total: f64 = weights.iter().sum();
    let mut target = rng.f64() * total;
    for (index, weight) in weights.iter().enumerate() {
        if target < *weight {
            return index;
        }
        target -= weight;
    }
    weights.len() - 1
}

impl TopicModel for LdaTopicModel {
    fn extract_topics(
        &self,
        documents: &[&str],
        max_topics: usize,
    ) -> Result<Vec<Topic>, TopicModelError> {
        if max_topics == 0 {
            return Err(TopicModelError::NoTopicsRequested);
        }

        let tokenized: Vec<Vec<String>> = documents.iter().map(|doc| self.tokenize(doc)).collect();
        let vocabulary = self.build_vocabulary(&tokenized);
        let index: HashMap<&str, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(i, word)| (word.as_str(), i))
            .collect();
        let word_docs: Vec<Vec<usize>> = tokenized
            .iter()
            .map(|doc| doc.iter().filter_map(|w| index.get(w.as_str()).copied()).collect())
            .collect();

        debug!(
            "Topic modeling {} documents over {} vocabulary words",
            documents.len(),
            vocabulary.len()
        );

        let mut rng = fastrand::Rng::with_seed(self.config.seed);
        let mut state = GibbsState::new(&word_docs, vocabulary.len(), max_topics, &self.config, &mut rng);
        if !vocabulary.is_empty() {
            for _ in 0..self.config.iterations {
                state.sweep(&word_docs, &mut rng);
            }
        }

        let mut members: Vec<Vec<usize>> = vec![Vec::new(); max_topics];
        let mut outliers = Vec::new();
        for doc in 0..documents.len() {
            match state.dominant_topic(doc) {
                Some(topic) => members[topic].push(doc),
                None => outliers.push(doc),
            }
        }

        let mut topics = Vec::new();
        if !outliers.is_empty() {
            topics.push(self.outlier_topic(&tokenized, &outliers));
        }
        for (topic, docs) in members.iter().enumerate() {
            if docs.is_empty() {
                continue;
            }
            let scored = (0..vocabulary.len())
                .filter(|&word| state.topic_word[topic][word] > 0)
                .map(|word| (vocabulary[word].clone(), state.word_probability(topic, word)))
                .collect();
            topics.push(Topic {
                id: TopicId::Topic(topic),
                words: self.ranked(scored),
            });
        }

        Ok(topics)
    }
}
