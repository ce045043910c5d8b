use tracing::debug;

use crate::frequency::count_values;
use crate::table::{Column, ColumnData, Table};

#[derive(Debug, Clone, PartialEq)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub p25: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSummary {
    Categorical {
        column: String,
        top: Vec<(String, usize)>,
    },
    Numeric {
        column: String,
        stats: NumericSummary,
    },
}

impl ColumnSummary {
    pub fn column(&self) -> &str {
        match self {
            ColumnSummary::Categorical { column, .. } => column,
            ColumnSummary::Numeric { column, .. } => column,
        }
    }
}

/// Summaries for every column, in column order.
pub fn summarize(table: &Table, top_n: usize) -> Vec<ColumnSummary> {
    let summaries: Vec<ColumnSummary> = table
        .columns()
        .iter()
        .map(|c| summarize_column(c, top_n))
        .collect();
    debug!("Summarized {} columns", summaries.len());
    summaries
}

pub fn summarize_column(column: &Column, top_n: usize) -> ColumnSummary {
    match column.data() {
        ColumnData::Text(cells) => {
            let top = count_values(cells.iter().flatten().map(String::as_str))
                .into_iter()
                .take(top_n)
                .map(|(v, c)| (v.to_string(), c))
                .collect();
            ColumnSummary::Categorical {
                column: column.name().to_string(),
                top,
            }
        }
        data => ColumnSummary::Numeric {
            column: column.name().to_string(),
            stats: describe(data.widened().unwrap_or_default()),
        },
    }
}

fn describe(mut values: Vec<f64>) -> NumericSummary {
    let count = values.len();
    values.sort_by(|a, b| a.total_cmp(b));

    let mean = if count > 0 {
        Some(values.iter().sum::<f64>() / count as f64)
    } else {
        None
    };
    // Sample standard deviation, undefined below two values.
    let std = match mean {
        Some(m) if count > 1 => {
            let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
            Some((ss / (count - 1) as f64).sqrt())
        }
        _ => None,
    };

    NumericSummary {
        count,
        mean,
        std,
        min: values.first().copied(),
        p25: quantile(&values, 0.25),
        p50: quantile(&values, 0.50),
        p75: quantile(&values, 0.75),
        max: values.last().copied(),
    }
}

/// Linear interpolation between the closest ranks of sorted `values`.
fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Option<f64>, b: f64) -> bool {
        a.map(|a| (a - b).abs() < 1e-9).unwrap_or(false)
    }

    #[test]
    fn describe_matches_reference_values() {
        let column = Column::numeric(
            "rating",
            vec![Some(4.0), None, Some(1.0), Some(3.0), Some(2.0)],
        );
        let ColumnSummary::Numeric { stats, .. } = summarize_column(&column, 5) else {
            panic!("expected numeric summary");
        };
        assert_eq!(stats.count, 4);
        assert!(close(stats.mean, 2.5));
        assert!(close(stats.std, 1.2909944487358056));
        assert!(close(stats.min, 1.0));
        assert!(close(stats.p25, 1.75));
        assert!(close(stats.p50, 2.5));
        assert!(close(stats.p75, 3.25));
        assert!(close(stats.max, 4.0));
    }

    #[test]
    fn describe_single_and_empty() {
        let one = describe(vec![7.0]);
        assert_eq!(one.count, 1);
        assert!(one.std.is_none());
        assert!(close(one.p75, 7.0));

        let none = describe(Vec::new());
        assert_eq!(none.count, 0);
        assert!(none.mean.is_none());
        assert!(none.min.is_none());
    }

    #[test]
    fn categorical_top_values() {
        let column = Column::text(
            "country",
            vec![
                Some("US"),
                Some("IN"),
                None,
                Some("UK"),
                Some("IN"),
                Some("FR"),
                Some("DE"),
                Some("JP"),
                Some("US"),
            ],
        );
        let ColumnSummary::Categorical { top, column } = summarize_column(&column, 5) else {
            panic!("expected categorical summary");
        };
        assert_eq!(column, "country");
        assert_eq!(
            top,
            vec![
                ("US".to_string(), 2),
                ("IN".to_string(), 2),
                ("UK".to_string(), 1),
                ("FR".to_string(), 1),
                ("DE".to_string(), 1),
            ]
        );
    }

    #[test]
    fn integer_columns_widen_for_statistics() {
        let column = Column::integer("year", vec![Some(2001), None, Some(1999), Some(2003)]);
        let ColumnSummary::Numeric { stats, .. } = summarize_column(&column, 5) else {
            panic!("expected numeric summary");
        };
        assert_eq!(stats.count, 3);
        assert!(close(stats.mean, 2001.0));
        assert!(close(stats.min, 1999.0));
        assert!(close(stats.max, 2003.0));
    }

    #[test]
    fn one_summary_per_column() {
        let table = Table::new(
            "t",
            vec![
                Column::text("a", vec![Some("x")]),
                Column::numeric("b", vec![Some(1.0)]),
            ],
        )
        .unwrap();
        let summaries = summarize(&table, 5);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[1].column(), "b");
    }
}
