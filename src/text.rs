use tracing::warn;

use crate::domain::{Advisory, Outcome, SightError};
use crate::frequency::count_values;
use crate::table::{ColumnData, Table};

const STOPWORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "but", "by", "can", "could", "did", "do", "does", "for", "from", "had", "has", "have", "he",
    "her", "him", "his", "how", "if", "in", "into", "is", "it", "its", "just", "me", "more", "my",
    "no", "not", "of", "on", "one", "only", "or", "other", "our", "out", "over", "she", "so",
    "some", "such", "than", "that", "the", "their", "them", "then", "there", "these", "they",
    "this", "to", "too", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "will", "with", "would", "you", "your",
];

#[derive(Debug, Clone, PartialEq)]
pub struct WordWeight {
    pub word: String,
    pub count: usize,
    /// Count relative to the most frequent word, in `(0, 1]`.
    pub weight: f64,
}

/// Join every non-missing value of a text column with single spaces, in row
/// order. Numeric columns are not eligible.
pub fn word_cloud_document(table: &Table, column: &str) -> Result<Outcome<String>, SightError> {
    let source = table.column(column)?;
    match source.data() {
        ColumnData::Text(cells) => {
            let parts: Vec<&str> = cells.iter().flatten().map(String::as_str).collect();
            Ok(Outcome::Ready(parts.join(" ")))
        }
        ColumnData::Integer(_) | ColumnData::Numeric(_) => {
            let advisory = Advisory::UnsupportedTextColumn {
                column: column.to_string(),
            };
            warn!("{advisory}");
            Ok(Outcome::Skipped(advisory))
        }
    }
}

// Alphanumeric runs, apostrophes allowed inside a word.
fn tokens(document: &str) -> impl Iterator<Item = String> + '_ {
    document
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|w| w.trim_matches('\''))
        .filter(|w| w.chars().count() >= 2)
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
}

/// The `limit` most frequent words of `document`, most frequent first.
pub fn word_weights(document: &str, limit: usize) -> Vec<WordWeight> {
    let counted = count_values(tokens(document));
    let top = counted.first().map(|(_, c)| *c).unwrap_or(0);
    counted
        .into_iter()
        .take(limit)
        .map(|(word, count)| WordWeight {
            word,
            count,
            weight: count as f64 / top as f64,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn table() -> Table {
        Table::new(
            "t",
            vec![
                Column::text(
                    "description",
                    vec![Some("A heist in Madrid"), None, Some("Madrid nights"), Some("")],
                ),
                Column::numeric("year", vec![Some(2017.0), None, Some(2019.0), None]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn document_joins_present_values() {
        let Outcome::Ready(doc) = word_cloud_document(&table(), "description").unwrap() else {
            panic!("expected a document");
        };
        assert_eq!(doc, "A heist in Madrid Madrid nights ");
        let values = ["A heist in Madrid", "Madrid nights", ""];
        let expected: usize =
            values.iter().map(|v| v.chars().count()).sum::<usize>() + values.len() - 1;
        assert_eq!(doc.chars().count(), expected);
    }

    #[test]
    fn numeric_column_is_an_advisory() {
        assert!(matches!(
            word_cloud_document(&table(), "year").unwrap(),
            Outcome::Skipped(Advisory::UnsupportedTextColumn { .. })
        ));
    }

    #[test]
    fn all_missing_text_gives_empty_document() {
        let table = Table::new("t", vec![Column::text::<&str>("d", vec![None])]).unwrap();
        assert_eq!(
            word_cloud_document(&table, "d").unwrap(),
            Outcome::Ready(String::new())
        );
    }

    #[test]
    fn weights_drop_stopwords_and_short_words() {
        let weights = word_weights("The heist in Madrid. Madrid's heist, a MADRID night x", 10);
        let words: Vec<&str> = weights.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(words, vec!["heist", "madrid", "madrid's", "night"]);
        assert_eq!(weights[0].count, 2);
        assert_eq!(weights[0].weight, 1.0);
        assert_eq!(weights[1].weight, 1.0);
        assert_eq!(weights[2].weight, 0.5);
    }

    #[test]
    fn weights_respect_limit() {
        assert_eq!(word_weights("alpha beta gamma delta", 2).len(), 2);
        assert!(word_weights("", 5).is_empty());
    }
}
