use pulsemap_core::{canonical_state, FilteredSet, Region, SentimentScores, SentimentSummary};
use std::collections::{BTreeMap, BTreeSet};

/// Running sums for a mean over sentiment scores.
#[derive(Debug, Clone, Copy, Default)]
struct SentimentAccumulator {
    sum: SentimentScores,
    count: usize,
}

impl SentimentAccumulator {
    fn push(&mut self, scores: &SentimentScores) {
        self.sum.positive += scores.positive;
        self.sum.neutral += scores.neutral;
        self.sum.negative += scores.negative;
        self.count += 1;
    }

    fn finish(self, region: Region) -> SentimentSummary {
        if self.count == 0 {
            return SentimentSummary {
                region,
                positive: 0.0,
                neutral: 0.0,
                negative: 0.0,
            };
        }
        let n = self.count as f64;
        SentimentSummary {
            region,
            positive: self.sum.positive / n,
            neutral: self.sum.neutral / n,
            negative: self.sum.negative / n,
        }
    }
}

/// Mean positive/neutral/negative over the set; all zeros when it is empty.
pub fn aggregate_sentiment(set: &FilteredSet<'_>, region: Region) -> SentimentSummary {
    let mut acc = SentimentAccumulator::default();
    for post in &set.posts {
        acc.push(&post.post.sentiment);
    }
    acc.finish(region)
}

/// One summary per state in `states`, grouped by canonical state name.
/// States with no post in the set get zeros.
pub fn sentiment_by_state(
    set: &FilteredSet<'_>,
    states: &BTreeSet<String>,
) -> BTreeMap<String, SentimentSummary> {
    let mut groups: BTreeMap<String, SentimentAccumulator> = states
        .iter()
        .map(|state| (state.clone(), SentimentAccumulator::default()))
        .collect();

    for post in &set.posts {
        let state = canonical_state(&post.post.state);
        if state.is_empty() {
            continue;
        }
        groups.entry(state).or_default().push(&post.post.sentiment);
    }

    groups
        .into_iter()
        .map(|(state, acc)| {
            let summary = acc.finish(Region::state(&state));
            (state, summary)
        })
        .collect()
}
