use std::fmt;
use std::io::Error;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use tracing_error::SpanTrace;

pub const NULL_SYMBOL: &str = "∅";

#[derive(Debug)]
pub enum SightError {
    IoError(Error),
    Load {
        message: String,
        span_trace: SpanTrace,
    },
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
    DuplicateColumn(String),
    RaggedColumn {
        column: String,
        expected: usize,
        found: usize,
    },
    UnknownColumn(String),
    FilterKindMismatch(String),
    InvalidFilter(String),
}

impl SightError {
    pub fn load(message: impl Into<String>) -> Self {
        SightError::Load {
            message: message.into(),
            span_trace: SpanTrace::capture(),
        }
    }

    /// True for failures that abort an upload. Everything else is a
    /// malformed request against an already loaded table.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            SightError::IoError(_)
                | SightError::Load { .. }
                | SightError::FileNotFound
                | SightError::PermissionDenied
                | SightError::UnknownFileType
                | SightError::DuplicateColumn(_)
                | SightError::RaggedColumn { .. }
        )
    }

    pub fn span_trace(&self) -> Option<&SpanTrace> {
        match self {
            SightError::Load { span_trace, .. } => Some(span_trace),
            _ => None,
        }
    }
}

impl fmt::Display for SightError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SightError::IoError(e) => write!(f, "I/O error: {e}"),
            SightError::Load { message, .. } => write!(f, "Error loading file: {message}"),
            SightError::FileNotFound => write!(f, "File not found"),
            SightError::PermissionDenied => write!(f, "Permission denied"),
            SightError::UnknownFileType => write!(f, "Unknown file type"),
            SightError::DuplicateColumn(name) => {
                write!(f, "Column \"{name}\" appears more than once after normalization")
            }
            SightError::RaggedColumn {
                column,
                expected,
                found,
            } => write!(f, "Column \"{column}\" has {found} rows, expected {expected}"),
            SightError::UnknownColumn(name) => write!(f, "Unknown column \"{name}\""),
            SightError::FilterKindMismatch(name) => {
                write!(f, "Filter does not match the kind of column \"{name}\"")
            }
            SightError::InvalidFilter(clause) => write!(f, "Invalid filter \"{clause}\""),
        }
    }
}

impl std::error::Error for SightError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SightError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Error> for SightError {
    fn from(err: Error) -> Self {
        SightError::IoError(err)
    }
}

impl From<PolarsError> for SightError {
    fn from(err: PolarsError) -> Self {
        SightError::load(err.to_string())
    }
}

/// A requested operation that does not apply to the selected column.
/// The pipeline carries on without its output.
#[derive(Debug, Clone, PartialEq)]
pub enum Advisory {
    UnsupportedChartCombination { column: String, chart: String },
    UnsupportedTextColumn { column: String },
    NothingToPlot { column: String },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::UnsupportedChartCombination { column, chart } => write!(
                f,
                "{chart} chart is suitable only for numeric columns, \"{column}\" is categorical"
            ),
            Advisory::UnsupportedTextColumn { column } => write!(
                f,
                "Word cloud is only available for text columns, \"{column}\" is numeric"
            ),
            Advisory::NothingToPlot { column } => {
                write!(f, "Column \"{column}\" has no values to plot")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ready(T),
    Skipped(Advisory),
}

impl<T> Outcome<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Outcome::Ready(v) => Some(v),
            Outcome::Skipped(_) => None,
        }
    }

    pub fn advisory(&self) -> Option<&Advisory> {
        match self {
            Outcome::Ready(_) => None,
            Outcome::Skipped(a) => Some(a),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Outcome::Ready(_))
    }
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct ChartConfig {
    pub bar_limit: usize,
    pub pie_limit: usize,
    pub pie_hole: f64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            bar_limit: 20,
            pie_limit: 10,
            pie_hole: 0.4,
        }
    }
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct SightConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
    pub preview_rows: usize,
    pub summary_top_n: usize,
    pub word_limit: usize,
    pub chart: ChartConfig,
}

impl Default for SightConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            max_column_width: 40,
            preview_rows: 10,
            summary_top_n: 5,
            word_limit: 60,
            chart: ChartConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    Filter,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    Exit,
    Enter,
    Help,
    NextPane,
    PrevPane,
    MoveUp,
    MoveDown,
    MovePageUp,
    MovePageDown,
    BarChart,
    PieChart,
    LineChart,
    ToggleMultiValue,
    UseAsTextColumn,
    Filter,
    ClearFilters,
    CopyDocument,
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
q        Quit
Tab      Next pane
S-Tab    Previous pane
j/k ↑/↓  Select column
PgUp/Dn  Jump ten columns
b p l    Bar / Pie / Line chart
m        Toggle comma splitting of categorical cells
t        Use selected column for the word cloud
f        Add a filter: col=a|b or col=lo..hi
x        Clear filters
y        Copy word cloud text to clipboard
?        Help
Esc      Close popup / cancel input";
