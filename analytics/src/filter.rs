use pulsemap_core::{Diagnostic, FilteredPost, FilteredSet, KeywordSet, Post, QueryScope};
use tracing::{debug, warn};

/// Posts admitted by `scope` whose text contains at least one keyword, in corpus order.
pub fn filter<'a>(posts: &'a [Post], scope: &QueryScope, keywords: &KeywordSet) -> FilteredSet<'a> {
    select(posts, scope, Some(keywords))
}

/// Posts admitted by `scope` alone.
pub fn filter_scope<'a>(posts: &'a [Post], scope: &QueryScope) -> FilteredSet<'a> {
    select(posts, scope, None)
}

fn select<'a>(posts: &'a [Post], scope: &QueryScope, keywords: Option<&KeywordSet>) -> FilteredSet<'a> {
    let mut set = FilteredSet::default();

    for (position, post) in posts.iter().enumerate() {
        if !scope.admits(post) {
            continue;
        }

        let text = match post.text.coerce(position) {
            Ok(text) => text,
            Err(error) => {
                warn!("Skipping record: {}", error);
                set.diagnostics.push(Diagnostic::from(error));
                continue;
            }
        };

        if let Some(keywords) = keywords {
            if !keywords.matches(&text.to_lowercase()) {
                continue;
            }
        }

        set.posts.push(FilteredPost {
            position,
            post,
            text,
        });
    }

    debug!(
        "Filter admitted {} of {} posts ({} skipped)",
        set.len(),
        posts.len(),
        set.diagnostics.len()
    );
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsemap_core::{PostText, SentimentScores};

    fn post(state: &str, year: i32, text: &str) -> Post {
        Post {
            state: state.to_string(),
            college: None,
            full_college_name: None,
            year,
            text: PostText::Text(text.to_string()),
            sentiment: SentimentScores::default(),
        }
    }

    fn texts<'a>(set: &FilteredSet<'a>) -> Vec<&'a str> {
        set.texts()
    }

    #[test]
    fn test_keywords_are_or_combined() {
        let posts = vec![
            post("Texas", 2022, "I am happy today"),
            post("Texas", 2022, "I am sad"),
            post("Texas", 2022, "Nothing to see"),
        ];
        let keywords = KeywordSet::new(["happy", "sad"]).unwrap();
        let set = filter(&posts, &QueryScope::new(), &keywords);
        assert_eq!(texts(&set), vec!["I am happy today", "I am sad"]);
    }

    #[test]
    fn test_keyword_case_and_whitespace_insensitive() {
        let posts = vec![post("Texas", 2022, "so HAPPY right now")];
        let keywords = KeywordSet::single(" Happy ").unwrap();
        assert_eq!(filter(&posts, &QueryScope::new(), &keywords).len(), 1);
    }

    #[test]
    fn test_scope_narrowing_is_conjunctive() {
        let posts = vec![
            post("Texas", 2022, "happy"),
            post("Texas", 2021, "happy"),
            post("Ohio", 2022, "happy"),
            post("texas", 2022, "happy again"),
        ];
        let scope = QueryScope::new().with_state("Texas").with_year(2022);
        let set = filter(&posts, &scope, &KeywordSet::single("happy").unwrap());
        let positions: Vec<usize> = set.posts.iter().map(|p| p.position).collect();
        assert_eq!(positions, vec![0, 3]);
    }

    #[test]
    fn test_uncoercible_text_is_skipped_and_recorded() {
        let mut broken = post("Texas", 2022, "");
        broken.text = PostText::Raw(vec![b'h', b'a', 0xff]);
        let posts = vec![post("Texas", 2022, "happy one"), broken, post("Texas", 2022, "happy two")];

        let set = filter(&posts, &QueryScope::new(), &KeywordSet::single("happy").unwrap());
        assert_eq!(texts(&set), vec!["happy one", "happy two"]);
        assert_eq!(set.diagnostics.len(), 1);
        assert!(matches!(
            set.diagnostics[0],
            Diagnostic::TextCoercion { position: 1, .. }
        ));
    }

    #[test]
    fn test_missing_text_matches_nothing() {
        let mut missing = post("Texas", 2022, "");
        missing.text = PostText::Missing;
        let posts = vec![missing];
        let set = filter(&posts, &QueryScope::new(), &KeywordSet::single("a").unwrap());
        assert!(set.is_empty());
        assert!(set.diagnostics.is_empty());
    }

    #[test]
    fn test_filter_is_deterministic() {
        let posts: Vec<Post> = (0..50)
            .map(|i| post("Texas", 2022, if i % 3 == 0 { "game day" } else { "quiet" }))
            .collect();
        let keywords = KeywordSet::single("game").unwrap();
        let first: Vec<usize> = filter(&posts, &QueryScope::new(), &keywords)
            .posts
            .iter()
            .map(|p| p.position)
            .collect();
        let second: Vec<usize> = filter(&posts, &QueryScope::new(), &keywords)
            .posts
            .iter()
            .map(|p| p.position)
            .collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 17);
    }

    #[test]
    fn test_filter_scope_ignores_keywords() {
        let posts = vec![post("Texas", 2022, "anything"), post("Ohio", 2022, "else")];
        let set = filter_scope(&posts, &QueryScope::new().with_state("TEXAS"));
        assert_eq!(texts(&set), vec!["anything"]);
    }
}
