use crate::error::{ClassifierError, CoreError, RecordCoercionError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum PostText {
    Text(String),
    Missing,
    /// Source bytes that were not valid UTF-8.
    Raw(Vec<u8>),
}

impl PostText {
    /// Coerces the stored value to a string slice. Missing text is empty.
    pub fn coerce(&self, position: usize) -> Result<&str, RecordCoercionError> {
        match self {
            PostText::Text(text) => Ok(text),
            PostText::Missing => Ok(""),
            PostText::Raw(bytes) => std::str::from_utf8(bytes).map_err(|e| RecordCoercionError {
                position,
                reason: e.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentScores {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub state: String,
    pub college: Option<String>,
    pub full_college_name: Option<String>,
    pub year: i32,
    pub text: PostText,
    pub sentiment: SentimentScores,
}

impl Post {
    pub fn matches_college(&self, query: &str) -> bool {
        let query = query.trim();
        [&self.college, &self.full_college_name]
            .into_iter()
            .flatten()
            .any(|name| name.trim().eq_ignore_ascii_case(query))
    }

    pub fn matches_state(&self, query: &str) -> bool {
        self.state.trim().to_lowercase() == query.trim().to_lowercase()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    Anger,
    Anticipation,
    Disgust,
    Fear,
    Joy,
    Love,
    Optimism,
    Pessimism,
    Sadness,
    Surprise,
    Trust,
}

impl EmotionLabel {
    /// Labels in classifier output order.
    pub const ALL: [EmotionLabel; 11] = [
        EmotionLabel::Anger,
        EmotionLabel::Anticipation,
        EmotionLabel::Disgust,
        EmotionLabel::Fear,
        EmotionLabel::Joy,
        EmotionLabel::Love,
        EmotionLabel::Optimism,
        EmotionLabel::Pessimism,
        EmotionLabel::Sadness,
        EmotionLabel::Surprise,
        EmotionLabel::Trust,
    ];

    pub fn from_ordinal(ordinal: i64) -> Result<Self, ClassifierError> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .ok_or(ClassifierError::InvalidLabel { ordinal })
    }

    pub fn ordinal(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EmotionLabel::Anger => "anger",
            EmotionLabel::Anticipation => "anticipation",
            EmotionLabel::Disgust => "disgust",
            EmotionLabel::Fear => "fear",
            EmotionLabel::Joy => "joy",
            EmotionLabel::Love => "love",
            EmotionLabel::Optimism => "optimism",
            EmotionLabel::Pessimism => "pessimism",
            EmotionLabel::Sadness => "sadness",
            EmotionLabel::Surprise => "surprise",
            EmotionLabel::Trust => "trust",
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capitalized form used for state region names: "new york" -> "New york".
pub fn canonical_state(state: &str) -> String {
    let trimmed = state.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Lower-cased, trimmed, non-empty keywords. Matching is OR over the set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if !keyword.is_empty() && !normalized.contains(&keyword) {
                normalized.push(keyword);
            }
        }

        if normalized.is_empty() {
            return Err(CoreError::InvalidInput {
                message: "at least one non-empty keyword is required".to_string(),
            });
        }

        Ok(Self {
            keywords: normalized,
        })
    }

    pub fn single(keyword: &str) -> Result<Self, CoreError> {
        Self::new([keyword])
    }

    /// `lowered_text` must already be lower-cased.
    pub fn matches(&self, lowered_text: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| lowered_text.contains(keyword.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }

    /// Keywords joined for display in result payloads.
    pub fn display(&self) -> String {
        self.keywords.join(",")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryScope {
    pub state: Option<String>,
    pub college: Option<String>,
    pub year: Option<i32>,
}

impl QueryScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_college(mut self, college: impl Into<String>) -> Self {
        self.college = Some(college.into());
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn admits(&self, post: &Post) -> bool {
        if let Some(year) = self.year {
            if post.year != year {
                return false;
            }
        }
        if let Some(state) = &self.state {
            if !post.matches_state(state) {
                return false;
            }
        }
        if let Some(college) = &self.college {
            if !post.matches_college(college) {
                return false;
            }
        }
        true
    }
}

/// A post admitted by the filter, with its coerced text.
#[derive(Debug, Clone, Copy)]
pub struct FilteredPost<'a> {
    pub position: usize,
    pub post: &'a Post,
    pub text: &'a str,
}

#[derive(Debug, Clone, Default)]
pub struct FilteredSet<'a> {
    pub posts: Vec<FilteredPost<'a>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> FilteredSet<'a> {
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn texts(&self) -> Vec<&'a str> {
        self.posts.iter().map(|p| p.text).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    TextCoercion { position: usize, reason: String },
    ClassificationSkipped { position: usize, reason: String },
}

impl From<RecordCoercionError> for Diagnostic {
    fn from(error: RecordCoercionError) -> Self {
        Diagnostic::TextCoercion {
            position: error.position,
            reason: error.reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Region {
    State { state: String },
    College { college: String, state: String },
}

impl Region {
    pub fn state(state: &str) -> Self {
        Region::State {
            state: canonical_state(state),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Region::State { state } => state,
            Region::College { college, .. } => college,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionSummary {
    pub region: Region,
    pub keyword: String,
    pub predicted_emotions: Vec<EmotionLabel>,
    pub emotion_counts: BTreeMap<EmotionLabel, usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentSummary {
    pub region: Region,
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordCloud {
    pub region: Region,
    pub keyword: String,
    pub words: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommonWords {
    pub region: Region,
    pub year: i32,
    pub words: Vec<WordCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(state: &str, college: Option<&str>, full: Option<&str>, year: i32) -> Post {
        Post {
            state: state.to_string(),
            college: college.map(str::to_string),
            full_college_name: full.map(str::to_string),
            year,
            text: PostText::Text("text".to_string()),
            sentiment: SentimentScores::default(),
        }
    }

    #[test]
    fn test_label_ordinals_round_trip_table() {
        for (index, label) in EmotionLabel::ALL.iter().enumerate() {
            assert_eq!(label.ordinal(), index);
            assert_eq!(EmotionLabel::from_ordinal(index as i64).unwrap(), *label);
        }
        assert_eq!(EmotionLabel::from_ordinal(4).unwrap().as_str(), "joy");
    }

    #[test]
    fn test_out_of_range_ordinal_is_invalid_label() {
        for ordinal in [-1, 11, 250] {
            let err = EmotionLabel::from_ordinal(ordinal).unwrap_err();
            assert!(matches!(err, ClassifierError::InvalidLabel { ordinal: o } if o == ordinal));
        }
    }

    #[test]
    fn test_canonical_state() {
        assert_eq!(canonical_state(" texas "), "Texas");
        assert_eq!(canonical_state("TEXAS"), "Texas");
        assert_eq!(canonical_state("new york"), "New york");
        assert_eq!(canonical_state(""), "");
    }

    #[test]
    fn test_keyword_set_normalizes() {
        let set = KeywordSet::new([" Happy ", "SAD", "happy", "  "]).unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["happy", "sad"]);
        assert!(set.matches("i am so happy today"));
        assert!(!set.matches("nothing here"));
    }

    #[test]
    fn test_keyword_set_rejects_blank() {
        assert!(matches!(
            KeywordSet::new(["", "   "]),
            Err(CoreError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_scope_is_conjunctive() {
        let scope = QueryScope::new().with_state("texas").with_year(2022);
        assert!(scope.admits(&post("Texas", None, None, 2022)));
        assert!(!scope.admits(&post("Texas", None, None, 2021)));
        assert!(!scope.admits(&post("Ohio", None, None, 2022)));
    }

    #[test]
    fn test_college_matches_short_or_full_name() {
        let p = post("Georgia", Some("GT"), Some("Georgia Institute of Technology"), 2022);
        assert!(p.matches_college("GT"));
        assert!(p.matches_college(" georgia institute of technology "));
        assert!(!p.matches_college("UGA"));
    }

    #[test]
    fn test_text_coercion() {
        assert_eq!(PostText::Missing.coerce(0).unwrap(), "");
        assert_eq!(PostText::Raw(b"ok".to_vec()).coerce(0).unwrap(), "ok");
        let err = PostText::Raw(vec![0xff, 0xfe]).coerce(7).unwrap_err();
        assert_eq!(err.position, 7);
    }

    #[test]
    fn test_emotion_counts_serialize_with_label_keys() {
        let mut counts = BTreeMap::new();
        counts.insert(EmotionLabel::Joy, 2);
        let json = serde_json::to_value(&counts).unwrap();
        assert_eq!(json["joy"], 2);
    }
}
