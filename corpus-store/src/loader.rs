use pulsemap_core::{CorpusError, Post, PostText, SentimentScores};
use std::fs::File;
use std::path::Path;
use tracing::{debug, warn};

// cleaned text wins over the raw post when a source carries both
const TEXT_COLUMNS: [&str; 3] = ["preprocessed_text", "text", "raw_text"];

#[derive(Debug)]
pub(crate) struct LoadedRows {
    pub posts: Vec<Post>,
    pub has_sentiment: bool,
}

#[derive(Debug)]
struct ColumnMap {
    state: usize,
    college: usize,
    full_college_name: usize,
    year: usize,
    text: usize,
    sentiment: Option<[usize; 3]>,
}

/// "Full College Name" and "full-college-name" both become "full_college_name".
fn normalize_header(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim()
        .to_lowercase()
        .replace([' ', '-'], "_")
}

impl ColumnMap {
    fn from_headers(headers: &csv::ByteRecord) -> Result<Self, CorpusError> {
        let names: Vec<String> = headers.iter().map(normalize_header).collect();
        let find = |column: &str| names.iter().position(|name| name == column);
        let require = |column: &str| {
            find(column).ok_or_else(|| CorpusError::MissingColumn {
                column: column.to_string(),
            })
        };

        let text = TEXT_COLUMNS
            .iter()
            .find_map(|column| find(column))
            .ok_or_else(|| CorpusError::MissingColumn {
                column: "text".to_string(),
            })?;

        let sentiment = match (find("positive"), find("neutral"), find("negative")) {
            (Some(pos), Some(neu), Some(neg)) => Some([pos, neu, neg]),
            (None, None, None) => None,
            _ => {
                return Err(CorpusError::MissingColumn {
                    column: "positive/neutral/negative".to_string(),
                })
            }
        };

        Ok(Self {
            state: require("state")?,
            college: require("college")?,
            full_college_name: require("full_college_name")?,
            year: require("year")?,
            text,
            sentiment,
        })
    }
}

struct RowReader<'r> {
    record: &'r csv::ByteRecord,
    row: usize,
}

impl<'r> RowReader<'r> {
    fn raw(&self, index: usize) -> &'r [u8] {
        self.record.get(index).unwrap_or_default()
    }

    fn string(&self, index: usize, column: &str) -> Result<String, CorpusError> {
        let raw = self.raw(index);
        std::str::from_utf8(raw)
            .map(|s| s.trim().to_string())
            .map_err(|_| self.malformed(column, raw))
    }

    fn optional_string(&self, index: usize, column: &str) -> Result<Option<String>, CorpusError> {
        let value = self.string(index, column)?;
        Ok((!value.is_empty()).then_some(value))
    }

    fn year(&self, index: usize) -> Result<i32, CorpusError> {
        let value = self.string(index, "year")?;
        if let Ok(year) = value.parse::<i32>() {
            return Ok(year);
        }
        // exports that went through a float column write "2022.0"
        match value.parse::<f64>() {
            Ok(year) if year.fract() == 0.0 && year.abs() < i32::MAX as f64 => Ok(year as i32),
            _ => Err(self.malformed("year", value.as_bytes())),
        }
    }

    fn score(&self, index: usize, column: &str) -> Result<f64, CorpusError> {
        let value = self.string(index, column)?;
        match value.parse::<f64>() {
            Ok(score) if score.is_finite() => Ok(score),
            _ => Err(self.malformed(column, value.as_bytes())),
        }
    }

    fn text(&self, index: usize) -> PostText {
        let raw = self.raw(index);
        if raw.is_empty() {
            return PostText::Missing;
        }
        match std::str::from_utf8(raw) {
            Ok(text) => PostText::Text(text.to_string()),
            Err(_) => PostText::Raw(raw.to_vec()),
        }
    }

    fn malformed(&self, column: &str, raw: &[u8]) -> CorpusError {
        CorpusError::MalformedValue {
            row: self.row,
            column: column.to_string(),
            value: String::from_utf8_lossy(raw).into_owned(),
        }
    }
}

pub(crate) fn read_posts(path: &Path, max_rows: usize) -> Result<LoadedRows, CorpusError> {
    if !path.exists() {
        return Err(CorpusError::SourceMissing {
            path: path.display().to_string(),
        });
    }

    let file = File::open(path).map_err(|e| CorpusError::Unreadable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(file);
    let columns = ColumnMap::from_headers(reader.byte_headers()?)?;
    debug!("Resolved corpus columns: {:?}", columns);

    if columns.sentiment.is_none() {
        warn!(
            "{} has no sentiment columns; sentiment scores default to zero",
            path.display()
        );
    }

    let mut posts = Vec::new();
    let mut record = csv::ByteRecord::new();
    while posts.len() < max_rows && reader.read_byte_record(&mut record)? {
        let row = RowReader {
            record: &record,
            row: posts.len() + 1,
        };

        let sentiment = match columns.sentiment {
            Some([pos, neu, neg]) => SentimentScores {
                positive: row.score(pos, "positive")?,
                neutral: row.score(neu, "neutral")?,
                negative: row.score(neg, "negative")?,
            },
            None => SentimentScores::default(),
        };

        posts.push(Post {
            state: row.string(columns.state, "state")?,
            college: row.optional_string(columns.college, "college")?,
            full_college_name: row
                .optional_string(columns.full_college_name, "full_college_name")?,
            year: row.year(columns.year)?,
            text: row.text(columns.text),
            sentiment,
        });
    }

    Ok(LoadedRows {
        posts,
        has_sentiment: columns.sentiment.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header(b" Full College Name "), "full_college_name");
        assert_eq!(normalize_header(b"Full-College-Name"), "full_college_name");
        assert_eq!(normalize_header(b"State"), "state");
    }

    #[test]
    fn test_text_column_fallbacks() {
        let headers =
            csv::ByteRecord::from(vec!["State", "College", "Full College Name", "Year", "preprocessed_text"]);
        let map = ColumnMap::from_headers(&headers).unwrap();
        assert_eq!(map.text, 4);
        assert!(map.sentiment.is_none());
    }

    #[test]
    fn test_partial_sentiment_columns_rejected() {
        let headers = csv::ByteRecord::from(vec![
            "state",
            "college",
            "full_college_name",
            "year",
            "text",
            "positive",
        ]);
        assert!(matches!(
            ColumnMap::from_headers(&headers),
            Err(CorpusError::MissingColumn { .. })
        ));
    }
}
