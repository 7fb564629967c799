use crate::emotion::EmotionAggregator;
use crate::filter::{filter, filter_scope};
use crate::sentiment::{aggregate_sentiment, sentiment_by_state};
use corpus_store::Corpus;
use emotion_classifier::EmotionClassifier;
use pulsemap_core::{
    AppConfig, CommonWords, CoreError, EmotionSummary, FailurePolicy, KeywordSet, QueryScope,
    Region, SentimentSummary, WordCloud,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use topic_engine::{TopicExtractor, TopicModel, WordFrequencies};
use tracing::{info, info_span};
use uuid::Uuid;

const COMMON_WORDS_LIMIT: usize = 5;

/// Synchronous query evaluation over one corpus snapshot.
pub struct QueryEngine {
    corpus: Arc<Corpus>,
    classifier: Arc<dyn EmotionClassifier>,
    topics: TopicExtractor,
    frequencies: WordFrequencies,
    policy: FailurePolicy,
}

impl QueryEngine {
    pub fn new(
        corpus: Arc<Corpus>,
        classifier: Arc<dyn EmotionClassifier>,
        topic_model: Arc<dyn TopicModel>,
        config: &AppConfig,
    ) -> Self {
        Self {
            corpus,
            classifier,
            topics: TopicExtractor::from_config(topic_model, &config.topics),
            frequencies: WordFrequencies::new(),
            policy: config.classifier.failure_policy,
        }
    }

    pub fn state_emotions(
        &self,
        state: &str,
        keyword: &str,
        year: i32,
    ) -> Result<EmotionSummary, CoreError> {
        let span = info_span!("query", kind = "state_emotions", query_id = %Uuid::new_v4());
        let _enter = span.enter();

        require("state", state)?;
        let keywords = KeywordSet::single(keyword)?;
        let scope = QueryScope::new().with_state(state).with_year(year);
        self.emotions(&scope, &keywords, Region::state(state))
    }

    pub fn college_emotions(
        &self,
        college: &str,
        keyword: &str,
        year: i32,
    ) -> Result<EmotionSummary, CoreError> {
        let span = info_span!("query", kind = "college_emotions", query_id = %Uuid::new_v4());
        let _enter = span.enter();

        require("college", college)?;
        let keywords = KeywordSet::single(keyword)?;
        let scope = QueryScope::new().with_college(college).with_year(year);
        self.emotions(&scope, &keywords, self.college_region(college))
    }

    pub fn state_word_cloud(
        &self,
        state: &str,
        keyword: &str,
        year: i32,
    ) -> Result<WordCloud, CoreError> {
        let span = info_span!("query", kind = "state_word_cloud", query_id = %Uuid::new_v4());
        let _enter = span.enter();

        require("state", state)?;
        let keywords = KeywordSet::single(keyword)?;
        let scope = QueryScope::new().with_state(state).with_year(year);
        self.word_cloud(&scope, &keywords, Region::state(state))
    }

    pub fn college_word_cloud(
        &self,
        college: &str,
        keyword: &str,
        year: i32,
    ) -> Result<WordCloud, CoreError> {
        let span = info_span!("query", kind = "college_word_cloud", query_id = %Uuid::new_v4());
        let _enter = span.enter();

        require("college", college)?;
        let keywords = KeywordSet::single(keyword)?;
        let scope = QueryScope::new().with_college(college).with_year(year);
        self.word_cloud(&scope, &keywords, self.college_region(college))
    }

    /// Mean sentiment of matching posts for every state in the corpus.
    pub fn sentiment_map(
        &self,
        keyword: &str,
        year: i32,
    ) -> Result<BTreeMap<String, SentimentSummary>, CoreError> {
        let span = info_span!("query", kind = "sentiment_map", query_id = %Uuid::new_v4());
        let _enter = span.enter();

        let keywords = KeywordSet::single(keyword)?;
        let set = filter(self.corpus.posts(), &QueryScope::new().with_year(year), &keywords);
        let map = sentiment_by_state(&set, &self.corpus.states());

        info!("Sentiment map over {} posts and {} states", set.len(), map.len());
        Ok(map)
    }

    /// Mean sentiment of matching posts for a single state.
    pub fn state_sentiment(
        &self,
        state: &str,
        keyword: &str,
        year: i32,
    ) -> Result<SentimentSummary, CoreError> {
        let span = info_span!("query", kind = "state_sentiment", query_id = %Uuid::new_v4());
        let _enter = span.enter();

        require("state", state)?;
        let keywords = KeywordSet::single(keyword)?;
        let scope = QueryScope::new().with_state(state).with_year(year);
        let set = filter(self.corpus.posts(), &scope, &keywords);
        Ok(aggregate_sentiment(&set, Region::state(state)))
    }

    pub fn common_words(&self, state: &str, year: i32) -> Result<CommonWords, CoreError> {
        let span = info_span!("query", kind = "common_words", query_id = %Uuid::new_v4());
        let _enter = span.enter();

        require("state", state)?;
        let scope = QueryScope::new().with_state(state).with_year(year);
        let set = filter_scope(self.corpus.posts(), &scope);
        let words = self.frequencies.top(set.texts(), COMMON_WORDS_LIMIT);

        info!("Counted words over {} posts", set.len());
        Ok(CommonWords {
            region: Region::state(state),
            year,
            words,
        })
    }

    fn emotions(
        &self,
        scope: &QueryScope,
        keywords: &KeywordSet,
        region: Region,
    ) -> Result<EmotionSummary, CoreError> {
        let set = filter(self.corpus.posts(), scope, keywords);
        let tally = EmotionAggregator::new(self.classifier.as_ref(), self.policy).aggregate(&set)?;

        info!(
            "Classified {} of {} matching posts for {}",
            tally.predicted.len(),
            set.len(),
            region.name()
        );
        Ok(tally.into_summary(region, keywords.display()))
    }

    fn word_cloud(
        &self,
        scope: &QueryScope,
        keywords: &KeywordSet,
        region: Region,
    ) -> Result<WordCloud, CoreError> {
        let set = filter(self.corpus.posts(), scope, keywords);
        let words = self.topics.extract(&set)?;

        info!(
            "Extracted {} topic words from {} posts for {}",
            words.len(),
            set.len(),
            region.name()
        );
        Ok(WordCloud {
            region,
            keyword: keywords.display(),
            words,
        })
    }

    fn college_region(&self, college: &str) -> Region {
        Region::College {
            college: college.trim().to_string(),
            state: self
                .corpus
                .resolve_college_state(college)
                .map(|state| state.trim().to_string())
                .unwrap_or_default(),
        }
    }
}

/// Async front for [`QueryEngine`]; each query runs on the blocking pool.
#[derive(Clone)]
pub struct QueryService {
    engine: Arc<QueryEngine>,
}

impl QueryService {
    pub fn new(engine: QueryEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    pub async fn state_emotions(
        &self,
        state: &str,
        keyword: &str,
        year: i32,
    ) -> Result<EmotionSummary, CoreError> {
        let (state, keyword) = (state.to_string(), keyword.to_string());
        self.run(move |engine| engine.state_emotions(&state, &keyword, year))
            .await
    }

    pub async fn college_emotions(
        &self,
        college: &str,
        keyword: &str,
        year: i32,
    ) -> Result<EmotionSummary, CoreError> {
        let (college, keyword) = (college.to_string(), keyword.to_string());
        self.run(move |engine| engine.college_emotions(&college, &keyword, year))
            .await
    }

    pub async fn state_word_cloud(
        &self,
        state: &str,
        keyword: &str,
        year: i32,
    ) -> Result<WordCloud, CoreError> {
        let (state, keyword) = (state.to_string(), keyword.to_string());
        self.run(move |engine| engine.state_word_cloud(&state, &keyword, year))
            .await
    }

    pub async fn college_word_cloud(
        &self,
        college: &str,
        keyword: &str,
        year: i32,
    ) -> Result<WordCloud, CoreError> {
        let (college, keyword) = (college.to_string(), keyword.to_string());
        self.run(move |engine| engine.college_word_cloud(&college, &keyword, year))
            .await
    }

    pub async fn sentiment_map(
        &self,
        keyword: &str,
        year: i32,
    ) -> Result<BTreeMap<String, SentimentSummary>, CoreError> {
        let keyword = keyword.to_string();
        self.run(move |engine| engine.sentiment_map(&keyword, year))
            .await
    }

    pub async fn state_sentiment(
        &self,
        state: &str,
        keyword: &str,
        year: i32,
    ) -> Result<SentimentSummary, CoreError> {
        let (state, keyword) = (state.to_string(), keyword.to_string());
        self.run(move |engine| engine.state_sentiment(&state, &keyword, year))
            .await
    }

    pub async fn common_words(&self, state: &str, year: i32) -> Result<CommonWords, CoreError> {
        let state = state.to_string();
        self.run(move |engine| engine.common_words(&state, year))
            .await
    }

    async fn run<T, F>(&self, query: F) -> Result<T, CoreError>
    where
        F: FnOnce(&QueryEngine) -> Result<T, CoreError> + Send + 'static,
        T: Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || query(&engine))
            .await
            .map_err(|e| CoreError::Internal {
                message: format!("query task failed: {}", e),
            })?
    }
}

fn require(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::InvalidInput {
            message: format!("{} must not be empty", field),
        });
    }
    Ok(())
}
