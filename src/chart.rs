use std::fmt;

use clap::ValueEnum;
use tracing::{trace, warn};

use crate::domain::{Advisory, ChartConfig, Outcome, SightError};
use crate::frequency::{FrequencyTable, frequency_table};
use crate::table::{ColumnKind, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ChartKind {
    #[default]
    Bar,
    Pie,
    Line,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartKind::Bar => write!(f, "Bar"),
            ChartKind::Pie => write!(f, "Pie"),
            ChartKind::Line => write!(f, "Line"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub data: FrequencyTable,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub color_by_count: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieChart {
    pub data: FrequencyTable,
    pub title: String,
    /// Inner radius as a fraction of the outer radius.
    pub hole: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    pub data: FrequencyTable,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartSpec {
    Bar(BarChart),
    Pie(PieChart),
    Line(LineChart),
}

impl ChartSpec {
    pub fn kind(&self) -> ChartKind {
        match self {
            ChartSpec::Bar(_) => ChartKind::Bar,
            ChartSpec::Pie(_) => ChartKind::Pie,
            ChartSpec::Line(_) => ChartKind::Line,
        }
    }

    pub fn data(&self) -> &FrequencyTable {
        match self {
            ChartSpec::Bar(c) => &c.data,
            ChartSpec::Pie(c) => &c.data,
            ChartSpec::Line(c) => &c.data,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            ChartSpec::Bar(c) => &c.title,
            ChartSpec::Pie(c) => &c.title,
            ChartSpec::Line(c) => &c.title,
        }
    }
}

const COUNT_LABEL: &str = "Frequency";

/// Capitalize the first letter of every alphabetic run, lowercase the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

/// Build the chart for `column`. Line charts need a numeric column; any other
/// combination always yields a chart unless the column has nothing to count.
pub fn select_chart(
    table: &Table,
    column: &str,
    kind: ChartKind,
    multi_value: bool,
    cfg: &ChartConfig,
) -> Result<Outcome<ChartSpec>, SightError> {
    let source = table.column(column)?;
    if kind == ChartKind::Line && source.kind() != ColumnKind::Numeric {
        let advisory = Advisory::UnsupportedChartCombination {
            column: column.to_string(),
            chart: kind.to_string(),
        };
        warn!("{advisory}");
        return Ok(Outcome::Skipped(advisory));
    }

    let freq = frequency_table(table, column, multi_value)?;
    if freq.is_empty() {
        return Ok(Outcome::Skipped(Advisory::NothingToPlot {
            column: column.to_string(),
        }));
    }

    let spec = match kind {
        ChartKind::Bar => ChartSpec::Bar(BarChart {
            data: freq.head(cfg.bar_limit),
            title: format!("Top {} Values in '{column}'", cfg.bar_limit),
            x_label: title_case(column),
            y_label: COUNT_LABEL.to_string(),
            color_by_count: true,
        }),
        ChartKind::Pie => ChartSpec::Pie(PieChart {
            data: freq.head(cfg.pie_limit),
            title: format!("Top {} Distribution in '{column}'", cfg.pie_limit),
            hole: cfg.pie_hole,
        }),
        ChartKind::Line => ChartSpec::Line(LineChart {
            data: freq.sorted_by_value(),
            title: format!("Line Chart of '{column}'"),
            x_label: title_case(column),
            y_label: COUNT_LABEL.to_string(),
        }),
    };
    trace!("{} chart with {} entries", spec.kind(), spec.data().len());
    Ok(Outcome::Ready(spec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::Label;
    use crate::table::Column;

    fn table() -> Table {
        let genres: Vec<Option<String>> = (0..30).map(|i| Some(format!("g{i}"))).collect();
        let years: Vec<Option<f64>> = vec![2001.0, 1999.0, 2001.0, 2010.0, 1985.0]
            .into_iter()
            .cycle()
            .take(30)
            .map(Some)
            .collect();
        Table::new(
            "t",
            vec![
                Column::text("genre", genres),
                Column::numeric("release_year", years),
                Column::numeric("empty", vec![None; 30]),
            ],
        )
        .unwrap()
    }

    fn chart(column: &str, kind: ChartKind) -> Outcome<ChartSpec> {
        select_chart(&table(), column, kind, true, &ChartConfig::default()).unwrap()
    }

    #[test]
    fn bar_truncates_to_twenty() {
        let Outcome::Ready(ChartSpec::Bar(bar)) = chart("genre", ChartKind::Bar) else {
            panic!("expected bar chart");
        };
        assert_eq!(bar.data.len(), 20);
        assert_eq!(bar.title, "Top 20 Values in 'genre'");
        assert_eq!(bar.x_label, "Genre");
        assert_eq!(bar.y_label, "Frequency");
        assert!(bar.color_by_count);
    }

    #[test]
    fn pie_truncates_to_ten_with_hole() {
        let Outcome::Ready(ChartSpec::Pie(pie)) = chart("genre", ChartKind::Pie) else {
            panic!("expected pie chart");
        };
        assert_eq!(pie.data.len(), 10);
        assert_eq!(pie.hole, 0.4);
    }

    #[test]
    fn line_on_numeric_is_sorted_by_value() {
        let Outcome::Ready(ChartSpec::Line(line)) = chart("release_year", ChartKind::Line) else {
            panic!("expected line chart");
        };
        let values: Vec<f64> = line.data.entries.iter().filter_map(|(l, _)| l.as_f64()).collect();
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(line.data.entries[0], (Label::Number(1985.0), 6));
        assert_eq!(line.x_label, "Release_Year");
        assert_eq!(line.data.total(), 30);
    }

    #[test]
    fn line_on_categorical_is_an_advisory() {
        let outcome = chart("genre", ChartKind::Line);
        assert!(matches!(
            outcome,
            Outcome::Skipped(Advisory::UnsupportedChartCombination { .. })
        ));
    }

    #[test]
    fn empty_column_has_nothing_to_plot() {
        assert!(matches!(
            chart("empty", ChartKind::Bar),
            Outcome::Skipped(Advisory::NothingToPlot { .. })
        ));
    }

    #[test]
    fn unknown_column_is_an_error() {
        assert!(select_chart(&table(), "nope", ChartKind::Bar, true, &ChartConfig::default()).is_err());
    }

    #[test]
    fn title_case_words() {
        assert_eq!(title_case("release_year"), "Release_Year");
        assert_eq!(title_case("DATE added"), "Date Added");
    }
}
