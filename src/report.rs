use std::fmt::Write;

use derive_setters::Setters;
use tracing::{debug, instrument};

use crate::chart::{ChartKind, ChartSpec, select_chart};
use crate::domain::{Outcome, SightConfig, SightError};
use crate::filter::FilterSet;
use crate::summary::{ColumnSummary, summarize};
use crate::table::{ColumnKind, Table, format_number};
use crate::text::{word_cloud_document, word_weights};

/// Everything one interaction asks of the pipeline.
#[derive(Debug, Clone, PartialEq, Setters)]
#[setters(prefix = "with_", strip_option)]
pub struct Request {
    /// Column to chart. `None` picks the first column.
    pub column: Option<String>,
    pub chart: ChartKind,
    /// Split categorical cells on commas before counting.
    pub multi_value: bool,
    pub filters: FilterSet,
    /// Column for the word cloud. `None` picks the first categorical column.
    pub text_column: Option<String>,
}

impl Default for Request {
    fn default() -> Self {
        Request {
            column: None,
            chart: ChartKind::Bar,
            multi_value: true,
            filters: FilterSet::new(),
            text_column: None,
        }
    }
}

impl Request {
    pub fn resolve_column(&self, table: &Table) -> Option<String> {
        self.column
            .clone()
            .or_else(|| table.columns().first().map(|c| c.name().to_string()))
    }

    pub fn resolve_text_column(&self, table: &Table) -> Option<String> {
        self.text_column.clone().or_else(|| {
            table
                .columns()
                .iter()
                .find(|c| c.kind() == ColumnKind::Categorical)
                .map(|c| c.name().to_string())
        })
    }
}

/// One full pass over the table. Nothing is cached between passes.
#[derive(Debug, Clone)]
pub struct Report {
    pub columns: Vec<String>,
    pub summaries: Vec<ColumnSummary>,
    pub chart_column: Option<String>,
    pub chart: Option<Outcome<ChartSpec>>,
    pub filtered: Table,
    /// First rows of the whole table.
    pub data_preview: Table,
    pub filtered_preview: Table,
    pub text_column: Option<String>,
    pub document: Option<Outcome<String>>,
}

impl Report {
    /// The chart is drawn from the full table. The preview and the word cloud
    /// use the filtered rows.
    #[instrument(skip_all, fields(table = table.name(), rows = table.nrows()))]
    pub fn build(table: &Table, request: &Request, cfg: &SightConfig) -> Result<Report, SightError> {
        let summaries = summarize(table, cfg.summary_top_n);

        let chart_column = request.resolve_column(table);
        let chart = match &chart_column {
            Some(column) => Some(select_chart(
                table,
                column,
                request.chart,
                request.multi_value,
                &cfg.chart,
            )?),
            None => None,
        };

        let filtered = request.filters.apply(table)?;
        let data_preview = table.head(cfg.preview_rows);
        let filtered_preview = filtered.head(cfg.preview_rows);

        let text_column = request.resolve_text_column(table);
        let document = match &text_column {
            Some(column) => Some(word_cloud_document(&filtered, column)?),
            None => None,
        };

        debug!(
            "Report built: chart {:?}, {} filtered rows",
            chart.as_ref().map(|c| c.is_ready()),
            filtered.nrows()
        );
        Ok(Report {
            columns: table.column_names(),
            summaries,
            chart_column,
            chart,
            filtered,
            data_preview,
            filtered_preview,
            text_column,
            document,
        })
    }

    /// Plain text rendering used by `--print`.
    pub fn render_text(&self, cfg: &SightConfig) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Columns: {}", self.columns.join(", "));

        let _ = writeln!(out, "\nSummary statistics");
        for summary in self.summaries.iter() {
            let _ = writeln!(out, "{}", summary_text(summary));
        }

        if let Some(outcome) = &self.chart {
            let _ = writeln!(out);
            match outcome {
                Outcome::Ready(spec) => {
                    let _ = writeln!(out, "{} ({} chart)", spec.title(), spec.kind());
                    for (label, count) in spec.data().entries.iter() {
                        let _ = writeln!(out, "  {label:<30} {count}");
                    }
                }
                Outcome::Skipped(advisory) => {
                    let _ = writeln!(out, "No chart: {advisory}");
                }
            }
        }

        let _ = writeln!(out, "\nData preview (first {} rows)", self.data_preview.nrows());
        out.push_str(&preview_text(&self.data_preview, cfg.max_column_width));

        let _ = writeln!(
            out,
            "\nFiltered preview ({} of {} rows)",
            self.filtered_preview.nrows(),
            self.filtered.nrows()
        );
        out.push_str(&preview_text(&self.filtered_preview, cfg.max_column_width));

        if let Some(outcome) = &self.document {
            let column = self.text_column.as_deref().unwrap_or_default();
            let _ = writeln!(out, "\nWord cloud text from '{column}'");
            match outcome {
                Outcome::Ready(doc) => {
                    for w in word_weights(doc, cfg.word_limit) {
                        let _ = writeln!(out, "  {:<20} {}", w.word, w.count);
                    }
                }
                Outcome::Skipped(advisory) => {
                    let _ = writeln!(out, "  {advisory}");
                }
            }
        }
        out
    }
}

pub fn summary_text(summary: &ColumnSummary) -> String {
    let opt = |v: Option<f64>| v.map(format_number_short).unwrap_or_else(|| "NaN".into());
    match summary {
        ColumnSummary::Categorical { column, top } => {
            let values: Vec<String> = top.iter().map(|(v, c)| format!("{v} ({c})")).collect();
            format!("{}: top values {}", column.to_uppercase(), values.join(", "))
        }
        ColumnSummary::Numeric { column, stats } => format!(
            "{}: count {} mean {} std {} min {} 25% {} 50% {} 75% {} max {}",
            column.to_uppercase(),
            stats.count,
            opt(stats.mean),
            opt(stats.std),
            opt(stats.min),
            opt(stats.p25),
            opt(stats.p50),
            opt(stats.p75),
            opt(stats.max),
        ),
    }
}

fn format_number_short(value: f64) -> String {
    if value.fract() == 0.0 {
        format_number(value)
    } else {
        format!("{value:.3}")
    }
}

fn preview_text(table: &Table, max_width: usize) -> String {
    let clip = |s: String| -> String {
        if s.chars().count() > max_width {
            let mut c: String = s.chars().take(max_width.saturating_sub(3)).collect();
            c.push_str("...");
            c
        } else {
            s
        }
    };
    let mut out = String::new();
    let header: Vec<String> = table.column_names().into_iter().map(clip).collect();
    let _ = writeln!(out, "  {}", header.join(" | "));
    for row in 0..table.nrows() {
        let cells: Vec<String> = table
            .columns()
            .iter()
            .map(|c| clip(c.display_cell(row)))
            .collect();
        let _ = writeln!(out, "  {}", cells.join(" | "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Advisory;
    use crate::table::Column;

    fn table() -> Table {
        Table::new(
            "titles",
            vec![
                Column::text("title", vec![Some("Dark"), Some("Narcos"), Some("Ozark")]),
                Column::numeric("rating", vec![Some(8.7), Some(8.8), Some(8.4)]),
                Column::text(
                    "listed_in",
                    vec![Some("Drama, Mystery"), Some("Crime, Drama"), Some("Crime")],
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn defaults_pick_first_columns() {
        let report = Report::build(&table(), &Request::default(), &SightConfig::default()).unwrap();
        assert_eq!(report.chart_column.as_deref(), Some("title"));
        assert_eq!(report.text_column.as_deref(), Some("title"));
        assert_eq!(report.summaries.len(), 3);
        assert_eq!(
            report.document,
            Some(Outcome::Ready("Dark Narcos Ozark".to_string()))
        );
    }

    #[test]
    fn line_on_categorical_does_not_fail_the_pass() {
        let request = Request::default()
            .with_column("listed_in".to_string())
            .with_chart(ChartKind::Line);
        let report = Report::build(&table(), &request, &SightConfig::default()).unwrap();
        assert!(matches!(
            report.chart,
            Some(Outcome::Skipped(Advisory::UnsupportedChartCombination { .. }))
        ));
        assert_eq!(report.filtered.nrows(), 3);
    }

    #[test]
    fn preview_and_document_follow_filters() {
        let request = Request::default()
            .with_filters(FilterSet::new().range("rating", 8.5, 9.0))
            .with_text_column("title".to_string());
        let cfg = SightConfig::default().with_preview_rows(1);
        let report = Report::build(&table(), &request, &cfg).unwrap();
        assert_eq!(report.filtered.nrows(), 2);
        assert_eq!(report.filtered_preview.nrows(), 1);
        assert_eq!(
            report.document,
            Some(Outcome::Ready("Dark Narcos".to_string()))
        );
        // chart still sees every row
        assert_eq!(report.chart.unwrap().ready().unwrap().data().total(), 3);
    }

    #[test]
    fn data_preview_ignores_filters() {
        let request = Request::default().with_filters(FilterSet::new().range("rating", 8.75, 9.0));
        let report = Report::build(&table(), &request, &SightConfig::default()).unwrap();
        assert_eq!(report.data_preview.nrows(), 3);
        assert_eq!(report.data_preview.columns()[0].display_cell(0), "Dark");
        assert_eq!(report.filtered_preview.nrows(), 1);
        assert_eq!(report.filtered_preview.columns()[0].display_cell(0), "Narcos");
    }

    #[test]
    fn malformed_request_is_an_error() {
        let request = Request::default().with_column("nope".to_string());
        assert!(Report::build(&table(), &request, &SightConfig::default()).is_err());
    }

    #[test]
    fn text_rendering_mentions_every_part() {
        let request = Request::default().with_column("listed_in".to_string());
        let cfg = SightConfig::default();
        let text = Report::build(&table(), &request, &cfg)
            .unwrap()
            .render_text(&cfg);
        assert!(text.contains("Columns: title, rating, listed_in"));
        assert!(text.contains("RATING: count 3"));
        assert!(text.contains("Top 20 Values in 'listed_in'"));
        assert!(text.contains("Data preview (first 3 rows)"));
        assert!(text.contains("Filtered preview (3 of 3 rows)"));
        assert!(text.contains("Word cloud text from 'title'"));
    }
}
