use pulsemap_core::WordCount;
use regex::Regex;
use std::collections::HashMap;

const STOP_WORDS: [&str; 15] = [
    "the", "and", "to", "a", "of", "in", "for", "on", "with", "at", "by", "an", "this", "that",
    "it",
];

/// Plain term counting for the "most common words" view.
pub struct WordFrequencies {
    split_re: Regex,
}

impl WordFrequencies {
    pub fn new() -> Self {
        Self {
            split_re: Regex::new(r"\W+").expect("compile split pattern"),
        }
    }

    /// The `limit` most frequent words, ties broken alphabetically.
    pub fn top<'a>(&self, texts: impl IntoIterator<Item = &'a str>, limit: usize) -> Vec<WordCount> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for word in self.split_re.split(text) {
                let word = word.to_lowercase();
                if word.is_empty() || STOP_WORDS.contains(&word.as_str()) {
                    continue;
                }
                *counts.entry(word).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<WordCount> = counts
            .into_iter()
            .map(|(word, count)| WordCount { word, count })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
        ranked.truncate(limit);
        ranked
    }
}

impl Default for WordFrequencies {
    fn default() -> Self {
        Self::new()
    }
}
