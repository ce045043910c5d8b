use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::domain::SightError;
use crate::table::{ColumnData, ColumnKind, Table, format_number};

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Keep rows whose categorical value is one of these. Empty means no filter.
    AllowSet(BTreeSet<String>),
    /// Inclusive range on a numeric column.
    Range { min: f64, max: f64 },
}

impl Filter {
    fn expected_kind(&self) -> ColumnKind {
        match self {
            Filter::AllowSet(_) => ColumnKind::Categorical,
            Filter::Range { .. } => ColumnKind::Numeric,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::AllowSet(values) => {
                let joined: Vec<&str> = values.iter().map(String::as_str).collect();
                write!(f, "{}", joined.join("|"))
            }
            Filter::Range { min, max } => {
                write!(f, "{}..{}", format_number(*min), format_number(*max))
            }
        }
    }
}

/// Per-column filters, combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    rules: BTreeMap<String, Filter>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow<I, S>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules.insert(
            column.to_string(),
            Filter::AllowSet(values.into_iter().map(Into::into).collect()),
        );
        self
    }

    pub fn range(mut self, column: &str, min: f64, max: f64) -> Self {
        self.rules
            .insert(column.to_string(), Filter::Range { min, max });
        self
    }

    /// Add or replace the filter of one column.
    pub fn insert(&mut self, column: String, filter: Filter) {
        self.rules.insert(column, filter);
    }

    pub fn clear(&mut self) {
        self.rules.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Filter)> {
        self.rules.iter()
    }

    /// Row indices of `table` that pass every filter.
    pub fn matching_rows(&self, table: &Table) -> Result<Vec<usize>, SightError> {
        let mut keep = vec![true; table.nrows()];
        for (name, filter) in self.rules.iter() {
            let column = table.column(name)?;
            if column.kind() != filter.expected_kind() {
                return Err(SightError::FilterKindMismatch(name.clone()));
            }
            match (filter, column.data()) {
                (Filter::AllowSet(allowed), ColumnData::Text(cells)) => {
                    if allowed.is_empty() {
                        continue;
                    }
                    for (k, cell) in keep.iter_mut().zip(cells) {
                        *k &= cell.as_ref().is_some_and(|v| allowed.contains(v));
                    }
                }
                (Filter::Range { min, max }, ColumnData::Numeric(cells)) => {
                    // A range covering the whole column is not a restriction.
                    let narrower = match column.numeric_bounds() {
                        Some((lo, hi)) => *min > lo || *max < hi,
                        None => false,
                    };
                    if !narrower {
                        trace!("Range on \"{name}\" spans the column, skipped");
                        continue;
                    }
                    for (k, cell) in keep.iter_mut().zip(cells) {
                        *k &= cell.is_some_and(|v| *min <= v && v <= *max);
                    }
                }
                (Filter::Range { min, max }, ColumnData::Integer(cells)) => {
                    // Integer cells are compared against the whole numbers inside
                    // the range, without widening them to f64.
                    let (lo, hi) = (min.ceil() as i64, max.floor() as i64);
                    let narrower = match column.integer_bounds() {
                        Some((first, last)) => lo > first || hi < last,
                        None => false,
                    };
                    if !narrower {
                        trace!("Range on \"{name}\" spans the column, skipped");
                        continue;
                    }
                    for (k, cell) in keep.iter_mut().zip(cells) {
                        *k &= cell.is_some_and(|v| lo <= v && v <= hi);
                    }
                }
                _ => return Err(SightError::FilterKindMismatch(name.clone())),
            }
        }
        Ok(keep
            .into_iter()
            .enumerate()
            .filter_map(|(idx, k)| k.then_some(idx))
            .collect())
    }

    /// Filtered copy of `table`. The source table is left untouched.
    pub fn apply(&self, table: &Table) -> Result<Table, SightError> {
        let rows = self.matching_rows(table)?;
        debug!(
            "Filters kept {} of {} rows ({} filters)",
            rows.len(),
            table.nrows(),
            self.len()
        );
        Ok(table.take(&rows))
    }
}

/// A single filter clause: `column=a|b|c` or `column=lo..hi`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    pub column: String,
    pub filter: Filter,
}

impl FromStr for FilterClause {
    type Err = SightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SightError::InvalidFilter(s.to_string());
        let (column, rhs) = s.split_once('=').ok_or_else(invalid)?;
        let column = column.trim().to_lowercase();
        if column.is_empty() {
            return Err(invalid());
        }

        // `lo..hi` is a range only when both ends are numbers, so a title such
        // as `Wait..What` stays a plain value.
        let bounds = rhs.split_once("..").and_then(|(lo, hi)| {
            let min: f64 = lo.trim().parse().ok()?;
            let max: f64 = hi.trim().parse().ok()?;
            Some((min, max))
        });
        let filter = match bounds {
            Some((min, max)) if min.is_nan() || max.is_nan() || min > max => {
                return Err(invalid());
            }
            Some((min, max)) => Filter::Range { min, max },
            None => Filter::AllowSet(
                rhs.split('|')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
        };
        Ok(FilterClause { column, filter })
    }
}

impl fmt::Display for FilterClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.column, self.filter)
    }
}

impl FromIterator<FilterClause> for FilterSet {
    fn from_iter<T: IntoIterator<Item = FilterClause>>(iter: T) -> Self {
        let mut set = FilterSet::new();
        for clause in iter {
            set.insert(clause.column, clause.filter);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn titles() -> Table {
        Table::new(
            "titles",
            vec![
                Column::text(
                    "type",
                    vec![Some("Movie"), Some("TV Show"), Some("Movie"), None, Some("Movie")],
                ),
                Column::numeric(
                    "rating",
                    vec![Some(1.0), Some(5.0), Some(9.8), Some(7.2), None],
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn allow_set_keeps_matching_rows() {
        let filtered = FilterSet::new()
            .allow("type", ["Movie"])
            .apply(&titles())
            .unwrap();
        assert_eq!(filtered.nrows(), 3);
    }

    #[test]
    fn empty_allow_set_is_no_filter() {
        let filtered = FilterSet::new()
            .allow("type", Vec::<String>::new())
            .apply(&titles())
            .unwrap();
        assert_eq!(filtered.nrows(), 5);
    }

    #[test]
    fn range_is_inclusive() {
        let filtered = FilterSet::new()
            .range("rating", 5.0, 9.8)
            .apply(&titles())
            .unwrap();
        let ColumnData::Numeric(ratings) = filtered.column("rating").unwrap().data() else {
            panic!("rating is numeric");
        };
        assert_eq!(ratings, &vec![Some(5.0), Some(9.8), Some(7.2)]);
        assert!(ratings.iter().flatten().all(|&r| r >= 5.0));
    }

    #[test]
    fn full_range_keeps_missing_values() {
        let filtered = FilterSet::new()
            .range("rating", 1.0, 9.8)
            .apply(&titles())
            .unwrap();
        assert_eq!(filtered.nrows(), 5);
    }

    #[test]
    fn filters_compose_and_never_grow() {
        let table = titles();
        let one = FilterSet::new().allow("type", ["Movie"]);
        let two = one.clone().range("rating", 2.0, 10.0);
        let n1 = one.apply(&table).unwrap().nrows();
        let n2 = two.apply(&table).unwrap().nrows();
        assert!(n2 <= n1);
        assert_eq!(n2, 1);
    }

    #[test]
    fn no_match_yields_empty_table() {
        let filtered = FilterSet::new()
            .allow("type", ["Documentary"])
            .apply(&titles())
            .unwrap();
        assert_eq!(filtered.nrows(), 0);
        assert_eq!(filtered.ncols(), 2);
    }

    #[test]
    fn source_table_is_untouched() {
        let table = titles();
        let before = table.clone();
        FilterSet::new().allow("type", ["Movie"]).apply(&table).unwrap();
        assert_eq!(table, before);
    }

    #[test]
    fn kind_mismatch_and_unknown_column() {
        let table = titles();
        assert!(matches!(
            FilterSet::new().range("type", 0.0, 1.0).apply(&table),
            Err(SightError::FilterKindMismatch(_))
        ));
        assert!(matches!(
            FilterSet::new().allow("nope", ["x"]).apply(&table),
            Err(SightError::UnknownColumn(_))
        ));
    }

    #[test]
    fn parse_clauses() {
        let clause: FilterClause = "Rating = 5..9.8".parse().unwrap();
        assert_eq!(clause.column, "rating");
        assert_eq!(clause.filter, Filter::Range { min: 5.0, max: 9.8 });

        let clause: FilterClause = "type=Movie| TV Show".parse().unwrap();
        assert_eq!(
            clause.filter,
            Filter::AllowSet(["Movie".to_string(), "TV Show".to_string()].into())
        );
        assert_eq!(clause.to_string(), "type=Movie|TV Show");

        let clause: FilterClause = "title=Wait..What".parse().unwrap();
        assert_eq!(clause.filter, Filter::AllowSet(["Wait..What".to_string()].into()));

        assert!("no-equals".parse::<FilterClause>().is_err());
        assert!("rating=9..1".parse::<FilterClause>().is_err());
        assert!("=x".parse::<FilterClause>().is_err());
    }

    #[test]
    fn integer_ranges_compare_exactly() {
        let table = Table::new(
            "ids",
            vec![Column::integer(
                "id",
                vec![
                    Some(9007199254740991),
                    Some(9007199254740993),
                    None,
                    Some(9007199254740995),
                ],
            )],
        )
        .unwrap();
        let filtered = FilterSet::new()
            .range("id", 9007199254740992.0, 9007199254740994.0)
            .apply(&table)
            .unwrap();
        let ColumnData::Integer(ids) = filtered.column("id").unwrap().data() else {
            panic!("id is an integer column");
        };
        assert_eq!(ids, &vec![Some(9007199254740993)]);

        let whole = FilterSet::new().range("id", 0.0, 1e17).apply(&table).unwrap();
        assert_eq!(whole.nrows(), 4);
    }

    #[test]
    fn clauses_collect_into_set() {
        let set: FilterSet = ["type=Movie", "rating=5..9.8"]
            .iter()
            .map(|c| c.parse::<FilterClause>().unwrap())
            .collect();
        assert_eq!(set.len(), 2);
        assert_eq!(set.apply(&titles()).unwrap().nrows(), 1);
    }
}
