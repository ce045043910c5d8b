use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use tracing::trace;

use crate::domain::SightError;
use crate::table::{ColumnData, Table, format_number};

#[derive(Debug, Clone, PartialEq)]
pub enum Label {
    Text(String),
    Integer(i64),
    Number(f64),
}

impl Label {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Label::Integer(i) => Some(*i as f64),
            Label::Number(f) => Some(*f),
            Label::Text(_) => None,
        }
    }

    // Labels of one table share a variant. Mixed pairs only need a total order.
    fn cmp_value(&self, other: &Label) -> Ordering {
        match (self, other) {
            (Label::Integer(a), Label::Integer(b)) => a.cmp(b),
            (Label::Text(a), Label::Text(b)) => a.cmp(b),
            (Label::Text(_), _) => Ordering::Greater,
            (_, Label::Text(_)) => Ordering::Less,
            (a, b) => {
                let (x, y) = (a.as_f64().unwrap_or_default(), b.as_f64().unwrap_or_default());
                x.total_cmp(&y)
            }
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Text(s) => f.pad(s),
            Label::Integer(i) => f.pad(&i.to_string()),
            Label::Number(n) => f.pad(&format_number(*n)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyTable {
    pub column: String,
    pub entries: Vec<(Label, usize)>,
}

impl FrequencyTable {
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, c)| c).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn head(&self, n: usize) -> FrequencyTable {
        FrequencyTable {
            column: self.column.clone(),
            entries: self.entries.iter().take(n).cloned().collect(),
        }
    }

    pub fn sorted_by_value(mut self) -> FrequencyTable {
        self.entries.sort_by(|(a, _), (b, _)| a.cmp_value(b));
        self
    }

    pub fn max_count(&self) -> usize {
        self.entries.iter().map(|(_, c)| *c).max().unwrap_or(0)
    }
}

/// Count occurrences, most frequent first. Ties keep the order in which the
/// values were first seen.
pub(crate) fn count_values<K, I>(values: I) -> Vec<(K, usize)>
where
    K: Hash + Eq + Clone,
    I: IntoIterator<Item = K>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut counted: Vec<(K, usize)> = Vec::new();
    for value in values {
        match index.get(&value) {
            Some(&idx) => counted[idx].1 += 1,
            None => {
                index.insert(value.clone(), counted.len());
                counted.push((value, 1));
            }
        }
    }
    // sort_by is stable, first-seen order survives for equal counts
    counted.sort_by(|a, b| b.1.cmp(&a.1));
    counted
}

// f64 is not Hash. -0.0 and 0.0 share one bucket.
fn number_key(value: f64) -> u64 {
    if value == 0.0 { 0.0f64.to_bits() } else { value.to_bits() }
}

/// Build the frequency table of `column`.
///
/// With `multi_value` set, categorical cells are split on `,` and every
/// trimmed fragment counts once, so `"Action, Drama"` adds one to each genre.
/// Numeric columns are counted by exact value and ignore `multi_value`.
/// Integer columns never pass through `f64`.
pub fn frequency_table(
    table: &Table,
    column: &str,
    multi_value: bool,
) -> Result<FrequencyTable, SightError> {
    let source = table.column(column)?;
    let entries = match source.data() {
        ColumnData::Text(cells) => {
            let present = cells.iter().flatten();
            let counted = if multi_value {
                count_values(present.flat_map(|c| c.split(',').map(str::trim)))
            } else {
                count_values(present.map(String::as_str))
            };
            counted
                .into_iter()
                .map(|(v, c)| (Label::Text(v.to_string()), c))
                .collect()
        }
        ColumnData::Integer(cells) => count_values(cells.iter().flatten().copied())
            .into_iter()
            .map(|(i, c)| (Label::Integer(i), c))
            .collect(),
        ColumnData::Numeric(cells) => count_values(cells.iter().flatten().map(|&f| number_key(f)))
            .into_iter()
            .map(|(bits, c)| (Label::Number(f64::from_bits(bits)), c))
            .collect(),
    };
    let freq = FrequencyTable {
        column: source.name().to_string(),
        entries,
    };
    trace!(
        "Frequency table for \"{}\": {} distinct, {} total",
        freq.column,
        freq.len(),
        freq.total()
    );
    Ok(freq)
}
