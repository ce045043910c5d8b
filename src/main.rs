use clap::Parser;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod controller;
mod inputter;
mod model;
mod ui;

use controller::Controller;
use csvsight::chart::ChartKind;
use csvsight::domain::{ChartConfig, SightConfig, SightError};
use csvsight::filter::FilterClause;
use csvsight::report::{Report, Request};
use csvsight::table::Table;
use model::{Model, Status};
use ui::TableUI;

/// Summarize, chart and filter a CSV file.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// File to analyze (.csv, .parquet, .arrow). `-` reads CSV from stdin.
    path: String,

    /// Column to chart, defaults to the first column
    #[arg(short, long)]
    column: Option<String>,

    /// Chart kind
    #[arg(short = 'k', long, value_enum, default_value_t = ChartKind::Bar)]
    chart: ChartKind,

    /// Count whole categorical cells instead of splitting them on commas
    #[arg(long)]
    single_value: bool,

    /// Filter clause, `col=a|b` or `col=lo..hi`. Repeatable.
    #[arg(short, long = "filter", value_name = "CLAUSE")]
    filters: Vec<FilterClause>,

    /// Column for the word cloud, defaults to the first text column
    #[arg(short, long)]
    text_column: Option<String>,

    /// Print the report to stdout instead of starting the viewer
    #[arg(short, long)]
    print: bool,

    #[arg(long, default_value = "csvsight.log")]
    log_file: String,

    /// Used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    #[arg(long, default_value_t = 40)]
    max_column_width: usize,

    #[arg(long, default_value_t = 10)]
    preview_rows: usize,

    /// Rows shown in the bar chart
    #[arg(long, default_value_t = 20)]
    bar_limit: usize,

    /// Slices shown in the pie chart
    #[arg(long, default_value_t = 10)]
    pie_limit: usize,
}

impl Args {
    fn config(&self) -> SightConfig {
        SightConfig::default()
            .with_max_column_width(self.max_column_width)
            .with_preview_rows(self.preview_rows)
            .with_chart(
                ChartConfig::default()
                    .with_bar_limit(self.bar_limit)
                    .with_pie_limit(self.pie_limit),
            )
    }

    fn request(&self) -> Request {
        Request {
            column: self.column.as_deref().map(|c| c.trim().to_lowercase()),
            chart: self.chart,
            multi_value: !self.single_value,
            filters: self.filters.iter().cloned().collect(),
            text_column: self.text_column.as_deref().map(|c| c.trim().to_lowercase()),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_logging(&args.log_file, &args.log_level) {
        eprintln!("Error: cannot open log file: {e}");
        return ExitCode::FAILURE;
    }
    match run(&args) {
        Err(e) => {
            error!("{e}");
            eprintln!("❌ {e}");
            if let Some(trace) = e.span_trace() {
                eprintln!("{trace}");
            }
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

// The viewer owns stdout, so logs go to a file.
fn init_logging(log_file: &str, level: &str) -> Result<(), SightError> {
    let path = expand_path(log_file)?;
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn expand_path(path: &str) -> Result<PathBuf, SightError> {
    let expanded = shellexpand::full(path)
        .map_err(|e| SightError::load(format!("cannot expand {path}: {e}")))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

fn load(path: &str) -> Result<Table, SightError> {
    if path == "-" {
        let mut bytes = Vec::new();
        std::io::stdin().read_to_end(&mut bytes)?;
        Table::from_csv_bytes("stdin", bytes)
    } else {
        Table::from_path(&expand_path(path)?)
    }
}

fn run(args: &Args) -> Result<(), SightError> {
    info!("Starting csvsight on {}", args.path);
    let cfg = args.config();
    let table = load(&args.path)?;
    let request = args.request();

    if args.print {
        let report = Report::build(&table, &request, &cfg)?;
        print!("{}", report.render_text(&cfg));
        return Ok(());
    }

    let mut model = Model::init(&cfg, table, request)?;
    let mut ui = TableUI::new(&cfg);
    let controller = Controller::new(&cfg);

    let mut terminal = ratatui::init();
    let result = (|| -> Result<(), SightError> {
        while model.status != Status::QUITTING {
            terminal.draw(|f| ui.draw(&model, f))?;
            if let Some(message) = controller.handle_event(&model)? {
                model.update(Some(message))?;
            };
        }
        Ok(())
    })();
    ratatui::restore();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_build_request() {
        let args = Args::parse_from([
            "csvsight",
            "titles.csv",
            "--column",
            " Genre ",
            "-k",
            "line",
            "--single-value",
            "-f",
            "rating=5..9.8",
            "-f",
            "type=Movie",
        ]);
        let request = args.request();
        assert_eq!(request.column.as_deref(), Some("genre"));
        assert_eq!(request.chart, ChartKind::Line);
        assert!(!request.multi_value);
        assert_eq!(request.filters.len(), 2);
        assert!(request.text_column.is_none());
    }

    #[test]
    fn args_build_config() {
        let args = Args::parse_from(["csvsight", "-", "--bar-limit", "5", "--preview-rows", "3"]);
        let cfg = args.config();
        assert_eq!(cfg.chart.bar_limit, 5);
        assert_eq!(cfg.chart.pie_limit, 10);
        assert_eq!(cfg.preview_rows, 3);
    }

    #[test]
    fn bad_filter_is_rejected_by_the_parser() {
        assert!(Args::try_parse_from(["csvsight", "a.csv", "-f", "nonsense"]).is_err());
    }

    #[test]
    fn expand_plain_path() {
        assert_eq!(expand_path("data/a.csv").unwrap(), PathBuf::from("data/a.csv"));
    }
}
