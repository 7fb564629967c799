mod emotion;
mod filter;
mod sentiment;
mod service;

pub use emotion::{EmotionAggregator, EmotionTally};
pub use filter::{filter, filter_scope};
pub use sentiment::{aggregate_sentiment, sentiment_by_state};
pub use service::{QueryEngine, QueryService};
