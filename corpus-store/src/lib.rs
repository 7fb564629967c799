mod loader;
mod tests;

use chrono::{DateTime, Utc};
use pulsemap_core::{canonical_state, CoreError, CorpusConfig, Post};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct CorpusMetadata {
    pub source: PathBuf,
    pub rows: usize,
    pub has_sentiment: bool,
    pub loaded_at: DateTime<Utc>,
}

/// Immutable post snapshot shared by every query.
#[derive(Debug)]
pub struct Corpus {
    posts: Vec<Post>,
    metadata: CorpusMetadata,
}

impl Corpus {
    pub fn from_posts(posts: Vec<Post>, source: impl Into<PathBuf>, has_sentiment: bool) -> Self {
        let metadata = CorpusMetadata {
            source: source.into(),
            rows: posts.len(),
            has_sentiment,
            loaded_at: Utc::now(),
        };
        Self { posts, metadata }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn metadata(&self) -> &CorpusMetadata {
        &self.metadata
    }

    /// Distinct states in canonical form, sorted.
    pub fn states(&self) -> BTreeSet<String> {
        self.posts
            .iter()
            .map(|post| canonical_state(&post.state))
            .filter(|state| !state.is_empty())
            .collect()
    }

    /// State of the first record whose short or full college name matches.
    pub fn resolve_college_state(&self, college: &str) -> Option<&str> {
        self.posts
            .iter()
            .find(|post| post.matches_college(college))
            .map(|post| post.state.as_str())
    }
}

/// Loads the corpus on first use and hands out the same snapshot afterwards.
#[derive(Debug)]
pub struct CorpusStore {
    source: PathBuf,
    max_rows: usize,
    corpus: OnceLock<Arc<Corpus>>,
    load_lock: Mutex<()>,
}

impl CorpusStore {
    pub fn new(config: &CorpusConfig) -> Self {
        Self {
            source: config.path.clone(),
            max_rows: config.max_rows,
            corpus: OnceLock::new(),
            load_lock: Mutex::new(()),
        }
    }

    pub fn load(&self) -> Result<Arc<Corpus>, CoreError> {
        if let Some(corpus) = self.corpus.get() {
            return Ok(Arc::clone(corpus));
        }

        // one reader at a time; late arrivals pick up the stored snapshot
        let _guard = self.load_lock.lock().map_err(|_| CoreError::Internal {
            message: "corpus load lock poisoned".to_string(),
        })?;
        if let Some(corpus) = self.corpus.get() {
            return Ok(Arc::clone(corpus));
        }

        let started = Instant::now();
        debug!("Reading corpus from {}", self.source.display());
        let rows = loader::read_posts(&self.source, self.max_rows)?;
        let corpus = Arc::new(Corpus::from_posts(
            rows.posts,
            self.source.clone(),
            rows.has_sentiment,
        ));

        info!(
            "Loaded {} posts from {} in {:?}",
            corpus.len(),
            self.source.display(),
            started.elapsed()
        );

        let _ = self.corpus.set(Arc::clone(&corpus));
        Ok(corpus)
    }
}
