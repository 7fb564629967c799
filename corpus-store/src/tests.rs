#[cfg(test)]
mod tests {
    use crate::CorpusStore;
    use pulsemap_core::{CoreError, CorpusConfig, CorpusError, PostText};
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tempfile::NamedTempFile;

    const HEADER: &str = "State,College,Full College Name,Year,preprocessed_text,positive,neutral,negative";

    fn write_csv(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp corpus");
        file.write_all(body.as_bytes()).expect("Failed to write temp corpus");
        file
    }

    fn store_for(path: PathBuf) -> CorpusStore {
        CorpusStore::new(&CorpusConfig {
            path,
            max_rows: 100_000,
        })
    }

    #[test]
    fn test_load_parses_rows() {
        let file = write_csv(&format!(
            "{HEADER}\nTexas,UT,University of Texas,2022,I am happy today,0.9,0.05,0.05\n\
             Georgia,,,2021.0,,0.1,0.2,0.7\n"
        ));
        let store = store_for(file.path().to_path_buf());
        let corpus = store.load().expect("corpus should load");

        assert_eq!(corpus.len(), 2);
        let first = &corpus.posts()[0];
        assert_eq!(first.state, "Texas");
        assert_eq!(first.college.as_deref(), Some("UT"));
        assert_eq!(first.full_college_name.as_deref(), Some("University of Texas"));
        assert_eq!(first.year, 2022);
        assert_eq!(first.text, PostText::Text("I am happy today".to_string()));
        assert_eq!(first.sentiment.positive, 0.9);

        let second = &corpus.posts()[1];
        assert_eq!(second.college, None);
        assert_eq!(second.year, 2021);
        assert_eq!(second.text, PostText::Missing);
        assert!(corpus.metadata().has_sentiment);
    }

    #[test]
    fn test_load_is_memoized() {
        let file = write_csv(&format!("{HEADER}\nOhio,OSU,Ohio State,2022,hello,0.3,0.3,0.4\n"));
        let path = file.path().to_path_buf();
        let store = store_for(path);

        let first = store.load().unwrap();
        // the source disappearing must not matter once the snapshot exists
        drop(file);
        let second = store.load().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_concurrent_first_loads_share_one_snapshot() {
        let file = write_csv(&format!("{HEADER}\nOhio,OSU,Ohio State,2022,hello,0.3,0.3,0.4\n"));
        let store = store_for(file.path().to_path_buf());
        let barrier = Barrier::new(8);

        let snapshots: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        store.load().expect("corpus should load")
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("loader thread panicked"))
                .collect()
        });

        assert_eq!(snapshots.len(), 8);
        for snapshot in &snapshots[1..] {
            assert!(Arc::ptr_eq(&snapshots[0], snapshot));
        }
    }

    #[test]
    fn test_missing_source_is_data_unavailable() {
        let store = store_for(PathBuf::from("/no/such/corpus.csv"));
        let err = store.load().unwrap_err();
        assert!(matches!(
            err,
            CoreError::Corpus(CorpusError::SourceMissing { .. })
        ));
    }

    #[test]
    fn test_failed_load_is_retried() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("posts.csv");
        let store = store_for(path.clone());
        assert!(store.load().is_err());

        std::fs::write(&path, format!("{HEADER}\nOhio,OSU,Ohio State,2022,hello,0.3,0.3,0.4\n"))
            .expect("Failed to write corpus");
        assert_eq!(store.load().expect("second load should read the file").len(), 1);
    }

    #[test]
    fn test_missing_required_column() {
        let file = write_csv("State,College,Year,text\nTexas,UT,2022,hi\n");
        let err = store_for(file.path().to_path_buf()).load().unwrap_err();
        match err {
            CoreError::Corpus(CorpusError::MissingColumn { column }) => {
                assert_eq!(column, "full_college_name")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_year() {
        let file = write_csv(&format!("{HEADER}\nTexas,UT,UT Austin,twenty,hi,0.1,0.1,0.8\n"));
        let err = store_for(file.path().to_path_buf()).load().unwrap_err();
        assert!(matches!(
            err,
            CoreError::Corpus(CorpusError::MalformedValue { row: 1, ref column, .. }) if column == "year"
        ));
    }

    #[test]
    fn test_sentiment_columns_optional() {
        let file = write_csv("state,college,full_college_name,year,text\nTexas,UT,UT Austin,2022,hi\n");
        let corpus = store_for(file.path().to_path_buf()).load().unwrap();
        assert!(!corpus.metadata().has_sentiment);
        assert_eq!(corpus.posts()[0].sentiment.negative, 0.0);
    }

    #[test]
    fn test_invalid_utf8_text_is_kept_raw() {
        let mut bytes = b"state,college,full_college_name,year,text\nTexas,UT,UT Austin,2022,".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe, b'\n']);
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();

        let corpus = store_for(file.path().to_path_buf()).load().unwrap();
        assert!(matches!(corpus.posts()[0].text, PostText::Raw(_)));
    }

    #[test]
    fn test_max_rows_caps_load() {
        let mut body = HEADER.to_string();
        for i in 0..5 {
            body.push_str(&format!("\nTexas,UT,UT Austin,2022,post {i},0.3,0.3,0.4"));
        }
        let file = write_csv(&body);
        let store = CorpusStore::new(&CorpusConfig {
            path: file.path().to_path_buf(),
            max_rows: 3,
        });
        assert_eq!(store.load().unwrap().len(), 3);
    }

    #[test]
    fn test_states_and_college_resolution() {
        let file = write_csv(&format!(
            "{HEADER}\ntexas,UT,University of Texas,2022,a,0,1,0\n\
             Georgia,GT,Georgia Institute of Technology,2022,b,0,1,0\n\
             TEXAS,TAMU,Texas A&M University,2021,c,0,1,0\n"
        ));
        let corpus = store_for(file.path().to_path_buf()).load().unwrap();

        let states: Vec<String> = corpus.states().into_iter().collect();
        assert_eq!(states, vec!["Georgia".to_string(), "Texas".to_string()]);

        assert_eq!(corpus.resolve_college_state("GT"), Some("Georgia"));
        assert_eq!(
            corpus.resolve_college_state("Georgia Institute of Technology"),
            Some("Georgia")
        );
        assert_eq!(corpus.resolve_college_state("MIT"), None);
    }

    #[test]
    fn test_preprocessed_text_preferred_over_raw() {
        let file = write_csv(
            "state,college,full_college_name,year,text,preprocessed_text\n\
             Texas,UT,UT Austin,2022,Loving the GAME!!! http://t.co/x,loving game\n",
        );
        let corpus = store_for(file.path().to_path_buf()).load().unwrap();
        assert_eq!(corpus.posts()[0].text, PostText::Text("loving game".to_string()));
    }
}
